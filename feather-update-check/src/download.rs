use crate::api::ReleaseServer;
use crate::check::VerifiedUpdate;
use crate::config::UpdaterConfig;
use crate::error::DownloadError;
use crate::platform::PlatformTag;
use indicatif::ProgressStyle;
use sha2::Digest as _;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt as _;
use tokio_util::sync::CancellationToken;
use tracing_indicatif::span_ext::IndicatifSpanExt as _;

const PROGRESS_TEMPLATE: &str = "{wide_bar} {bytes}/{total_bytes} ({bytes_per_sec})";

/// Download the archive of a verified update into `directory` and check it
/// against the signed hash.
///
/// An archive already present with the right hash is not downloaded again.
/// Cancelling `cancel` stops the transfer and removes the partial file.
#[tracing::instrument(
    skip_all,
    fields(file = update.binary_filename(), directory = %directory.display())
)]
pub async fn download_verified(
    server: &ReleaseServer,
    config: &UpdaterConfig,
    update: &VerifiedUpdate,
    platform: PlatformTag,
    directory: &Path,
    cancel: &CancellationToken,
) -> Result<PathBuf, DownloadError> {
    tokio::fs::create_dir_all(directory).await?;

    let final_path = directory.join(update.binary_filename());
    if tokio::fs::try_exists(&final_path).await? {
        let existing = file_sha256(&final_path).await?;
        if hex::encode(existing).eq_ignore_ascii_case(update.hash()) {
            tracing::info!("{} already downloaded", final_path.display());
            return Ok(final_path);
        }

        tracing::warn!("Replacing {} since its hash does not match", final_path.display());
    }

    let part_path = directory.join(format!("{}.part", update.binary_filename()));
    let url = config.download_url(platform, update.binary_filename());

    let span = tracing::Span::current();
    if let Ok(style) = ProgressStyle::with_template(PROGRESS_TEMPLATE) {
        span.pb_set_style(&style);
    }

    let mut file = tokio::fs::File::create(&part_path).await?;
    let mut hasher = sha2::Sha256::new();
    let mut length_known = false;

    let transfer = server.download(url, &mut file, |chunk, total| {
        if let (false, Some(total)) = (length_known, total) {
            span.pb_set_length(total);
            length_known = true;
        }

        hasher.update(chunk);
        span.pb_inc(chunk.len() as u64);
    });

    let result = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DownloadError::Cancelled),
        result = transfer => result,
    };
    drop(file);

    if let Err(err) = result {
        tracing::warn!("Download of {} failed: {}", update.binary_filename(), err);
        let _ = tokio::fs::remove_file(&part_path).await;
        return Err(err);
    }

    finish_download(&part_path, &final_path, &hasher.finalize(), update.hash()).await
}

/// Move a finished download into place, or delete it when `actual` does not
/// match `expected_hex`.
pub async fn finish_download(
    part_path: &Path,
    final_path: &Path,
    actual: &[u8],
    expected_hex: &str,
) -> Result<PathBuf, DownloadError> {
    let actual = hex::encode(actual);

    if !actual.eq_ignore_ascii_case(expected_hex) {
        tracing::error!(
            "Hash mismatch for {}: expected {}, got {}",
            final_path.display(),
            expected_hex,
            actual
        );

        let _ = tokio::fs::remove_file(part_path).await;
        return Err(DownloadError::HashMismatch {
            expected: expected_hex.to_owned(),
            actual,
        });
    }

    tokio::fs::rename(part_path, final_path).await?;
    tracing::info!("Saved {}", final_path.display());

    Ok(final_path.to_owned())
}

pub async fn file_sha256(path: &Path) -> Result<[u8; 32], DownloadError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = sha2::Sha256::new();

    let mut buffer = vec![0u8; 8192];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

mod args;

use crate::args::{CheckArgs, Command, SignArgs, UpdaterArgs};
use clap::Parser as _;
use ed25519_dalek::SigningKey;
use feather_update_check::api::ReleaseServer;
use feather_update_check::download::download_verified;
use feather_update_check::error::{DownloadError, UpdaterError};
use feather_update_check::feed::UpdatesFeed;
use feather_update_check::keyring::{TrustedKeyring, TrustedSigner};
use feather_update_check::manifest::SignedHashManifest;
use feather_update_check::notify::LogNotifier;
use feather_update_check::version::parse_version;
use feather_update_check::{CheckOutcome, UpdateChecker, UpdaterConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt as _;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

fn main() {
    let indicatif_layer = tracing_indicatif::IndicatifLayer::new();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_env(
            "FEATHER_UPDATE_CHECK_LOG",
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(indicatif_layer.get_stdout_writer()))
        .with(indicatif_layer)
        .init();

    let args = UpdaterArgs::parse();

    let result = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build() {
        Ok(v) => v.block_on(async_main(args)),
        Err(err) => {
            tracing::error!("Failed to create tokio runtime: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        log_error(&err);
        std::process::exit(1);
    }
}

async fn async_main(args: UpdaterArgs) -> Result<(), UpdaterError> {
    tracing::trace!("args = {:#?}", args);

    match args.command {
        Command::Check(check) => {
            let checker = prepare_checker(&check).await?;
            run_check(&checker, &check).await
        }
        Command::Watch { check, interval } => watch(&check, interval).await,
        Command::Sign(sign) => sign_hashes(&sign).await,
    }
}

async fn prepare_checker(args: &CheckArgs) -> Result<UpdateChecker<ReleaseServer>, UpdaterError> {
    let current_version = args
        .current_version
        .as_deref()
        .unwrap_or(env!("CARGO_PKG_VERSION"));
    let current_version = parse_version(current_version)
        .ok_or_else(|| UpdaterError::InvalidVersion(current_version.to_owned()))?;

    let config = UpdaterConfig::new(current_version, args.platform()?)
        .with_host(args.host.clone())
        .with_request_timeout(Duration::from_secs(args.timeout))
        .with_proxy(args.proxy.clone());

    match config.platform {
        Some(platform) => tracing::debug!("Checking as {} {}", platform, config.current_version),
        None => tracing::debug!("Checking as unsupported platform {}", config.current_version),
    }

    let keyring = TrustedKeyring::load(&args.keyring).await?;
    let server = ReleaseServer::new(&config)?;

    Ok(UpdateChecker::new(
        config,
        server,
        Arc::new(keyring),
        Arc::new(LogNotifier),
    ))
}

async fn run_check(
    checker: &UpdateChecker<ReleaseServer>,
    args: &CheckArgs,
) -> Result<(), UpdaterError> {
    let feed = UpdatesFeed::load(
        &args.feed,
        checker.source().client(),
        checker.config().request_timeout,
    )
    .await?;

    let update = match checker.on_updates_available(&feed).await {
        CheckOutcome::VerifiedReady(update) => update,
        CheckOutcome::Aborted(reason) => {
            tracing::info!("No update: {}", reason);
            return Ok(());
        }
    };

    if let (Some(directory), Some(platform)) = (&args.download_dir, checker.config().platform) {
        download_verified(
            checker.source(),
            checker.config(),
            &update,
            platform,
            directory,
            &checker.shutdown_token(),
        )
        .await?;
    }

    Ok(())
}

async fn watch(args: &CheckArgs, interval: u64) -> Result<(), UpdaterError> {
    let checker = prepare_checker(args).await?;
    let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {},
            _ = tokio::signal::ctrl_c() => break,
        }

        let check = run_check(&checker, args);
        tokio::pin!(check);

        let result = tokio::select! {
            result = &mut check => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, cancelling update check");
                checker.shutdown();
                check.await
            }
        };

        // A failing feed or download should not end the watch.
        match result {
            Ok(()) => {}
            Err(UpdaterError::Download(DownloadError::Cancelled)) => {
                tracing::info!("Download cancelled");
            }
            Err(err) => log_error(&err),
        }

        if checker.is_shut_down() {
            return Ok(());
        }
    }

    checker.shutdown();
    Ok(())
}

async fn sign_hashes(args: &SignArgs) -> Result<(), UpdaterError> {
    let hashes = tokio::fs::read_to_string(&args.hashes).await?;
    let secret = tokio::fs::read_to_string(&args.secret_key).await?;

    let key = hex::decode(secret.trim())
        .ok()
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .map(|bytes| SigningKey::from_bytes(&bytes))
        .ok_or_else(|| UpdaterError::InvalidSecretKey(args.secret_key.display().to_string()))?;

    let armored = SignedHashManifest::armor(&hashes, &key);

    // Refuse to sign something the wallet would not be able to read.
    let entries = SignedHashManifest::parse(armored.as_bytes())?.entries()?;

    let signer = TrustedSigner::new("release", key.verifying_key());
    tracing::info!(
        "Signed {} entries with key {} (fingerprint {})",
        entries.len(),
        hex::encode(signer.public_key.as_bytes()),
        signer.fingerprint()
    );

    match &args.output {
        Some(path) => tokio::fs::write(path, armored).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(armored.as_bytes()).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}

fn log_error(err: &UpdaterError) {
    tracing::error!("Error: {}", err);

    let mut src = std::error::Error::source(err);
    while let Some(err) = src {
        tracing::error!("-> Caused by: {}", err);
        src = err.source();
    }
}

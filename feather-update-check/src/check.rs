//! The update check: feed in, verified update (or nothing) out.
//!
//! ```text
//! Idle -> FeedReceived -> VersionCompared -> HashFetchInFlight -> VerifiedReady
//!                                 \                  \
//!                                  +-----------------+--> Aborted
//! ```
//!
//! Every abort is silent apart from a log line; the only thing a user ever
//! sees is a [`VerifiedUpdate`] handed to the [`NotificationSink`].

use crate::api::ReleaseSource;
use crate::config::UpdaterConfig;
use crate::error::VerifyError;
use crate::feed::UpdatesFeed;
use crate::keyring::TrustedKeyring;
use crate::notify::NotificationSink;
use crate::platform::binary_filename;
use crate::verify::{SignedHash, verify_parse_signed_hashes};
use crate::version::is_newer;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

/// A release whose hash was taken from a manifest signed by a trusted key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUpdate {
    version: String,
    binary_filename: String,
    hash: String,
    signer: String,
}

impl VerifiedUpdate {
    pub(crate) fn from_signed(
        version: String,
        binary_filename: String,
        signed: SignedHash,
    ) -> Self {
        Self {
            version,
            binary_filename,
            hash: hex::encode(signed.hash),
            signer: signed.signer,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn binary_filename(&self) -> &str {
        &self.binary_filename
    }

    /// Lowercase hex SHA-256 of the release archive.
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn signer(&self) -> &str {
        &self.signer
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    UnsupportedPlatform,
    FeedDataMissing,
    VersionNotNewer,
    NetworkFailure,
    VerificationFailure,
    CheckInFlight,
    Cancelled,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UnsupportedPlatform => "unsupported platform",
            Self::FeedDataMissing => "no data for this platform in feed",
            Self::VersionNotNewer => "already up to date",
            Self::NetworkFailure => "failed to fetch signed hashes",
            Self::VerificationFailure => "signed hashes failed verification",
            Self::CheckInFlight => "another check is in progress",
            Self::Cancelled => "cancelled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    VerifiedReady(VerifiedUpdate),
    Aborted(AbortReason),
}

pub struct UpdateChecker<S> {
    config: UpdaterConfig,
    source: S,
    keyring: Arc<TrustedKeyring>,
    sink: Arc<dyn NotificationSink>,
    shutdown: CancellationToken,
    in_flight: AtomicBool,
}

impl<S: ReleaseSource> UpdateChecker<S> {
    pub fn new(
        config: UpdaterConfig,
        source: S,
        keyring: Arc<TrustedKeyring>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        if keyring.is_empty() {
            tracing::warn!("Trusted keyring is empty, no update will ever verify");
        }

        Self {
            config,
            source,
            keyring,
            sink,
            shutdown: CancellationToken::new(),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Stop the checker. Running checks end as [`AbortReason::Cancelled`]
    /// without notifying, later checks abort right away.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Token cancelled by [`UpdateChecker::shutdown`], for follow-up work
    /// such as downloading the archive.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handle a feed announcement.
    ///
    /// A second call while a check is still running is rejected with
    /// [`AbortReason::CheckInFlight`].
    #[tracing::instrument(skip_all)]
    pub async fn on_updates_available(&self, feed: &UpdatesFeed) -> CheckOutcome {
        if self.shutdown.is_cancelled() {
            tracing::debug!("Checker shut down, ignoring feed");
            return CheckOutcome::Aborted(AbortReason::Cancelled);
        }

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!("Update check already in progress, ignoring feed");
            return CheckOutcome::Aborted(AbortReason::CheckInFlight);
        };

        match self.run(feed).await {
            Ok((update, download_url)) => {
                self.sink.update_available(&update, &download_url);
                CheckOutcome::VerifiedReady(update)
            }
            Err(reason) => {
                tracing::debug!("Update check aborted: {}", reason);
                CheckOutcome::Aborted(reason)
            }
        }
    }

    async fn run(&self, feed: &UpdatesFeed) -> Result<(VerifiedUpdate, url::Url), AbortReason> {
        let Some(platform) = self.config.platform else {
            tracing::warn!("Unsupported platform, unable to fetch update");
            return Err(AbortReason::UnsupportedPlatform);
        };

        let Some(release) = feed.release_for(platform) else {
            tracing::warn!("Unable to find current platform in updates data");
            return Err(AbortReason::FeedDataMissing);
        };
        tracing::trace!(state = "FeedReceived", platform = %platform, version = %release.version);

        let version = release.version.trim().to_owned();
        if !is_newer(&version, &self.config.current_version.to_string()) {
            tracing::debug!(
                "Announced version {} is not newer than {}",
                version,
                self.config.current_version
            );
            return Err(AbortReason::VersionNotNewer);
        }
        tracing::trace!(state = "VersionCompared", newer = true);

        let binary_filename = binary_filename(&version, platform);
        if let Some(announced) = release
            .binary_filename
            .as_deref()
            .filter(|announced| *announced != binary_filename)
        {
            tracing::debug!(
                "Feed names the archive {}, expecting {}",
                announced,
                binary_filename
            );
        }

        let hashes_url = self.config.hashes_url(&version);
        tracing::trace!(state = "HashFetchInFlight", url = hashes_url.as_str());

        let armored = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(AbortReason::Cancelled),
            result = self.source.fetch_signed_hashes(hashes_url) => result.map_err(|err| {
                tracing::warn!("Unable to fetch signed hashes: {}", err);
                AbortReason::NetworkFailure
            })?,
        };

        let verification = tokio::task::spawn_blocking({
            let keyring = self.keyring.clone();
            let binary_filename = binary_filename.clone();

            move || verify_parse_signed_hashes(&armored, &binary_filename, &keyring)
        });

        let signed = tokio::select! {
            _ = self.shutdown.cancelled() => return Err(AbortReason::Cancelled),
            joined = verification => flatten_verification(joined).map_err(|err| {
                tracing::warn!("Failed to verify signed hashes: {}", err);
                AbortReason::VerificationFailure
            })?,
        };

        // The window may have gone away while we were verifying.
        if self.shutdown.is_cancelled() {
            return Err(AbortReason::Cancelled);
        }

        let update = VerifiedUpdate::from_signed(version, binary_filename, signed);
        tracing::info!(
            "Update found: {} {} signed by: {}",
            update.binary_filename(),
            update.hash(),
            update.signer()
        );

        let download_url = self.config.download_url(platform, update.binary_filename());
        Ok((update, download_url))
    }
}

/// Fold a failed verification task into the verification error.
fn flatten_verification(
    joined: Result<Result<SignedHash, VerifyError>, JoinError>,
) -> Result<SignedHash, VerifyError> {
    joined.map_err(|err| VerifyError::TaskFailed(err.to_string()))?
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#![allow(dead_code)]

use ed25519_dalek::SigningKey;
use feather_update_check::api::ReleaseSource;
use feather_update_check::error::UpdaterError;
use feather_update_check::feed::UpdatesFeed;
use feather_update_check::keyring::{TrustedKeyring, TrustedSigner};
use feather_update_check::manifest::SignedHashManifest;
use feather_update_check::notify::{ChannelNotifier, UpdateNotification};
use feather_update_check::{PlatformTag, UpdateChecker, UpdaterConfig};
use semver::Version;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::sync::mpsc::UnboundedReceiver;
use url::Url;

pub const HOST: &str = "https://releases.example.org/";
pub const DIGEST: &str = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08";

pub fn maintainer() -> SigningKey {
    SigningKey::from_bytes(&[42; 32])
}

pub fn stranger() -> SigningKey {
    SigningKey::from_bytes(&[13; 32])
}

pub fn keyring() -> TrustedKeyring {
    TrustedKeyring::new(vec![TrustedSigner::new(
        "featherwallet",
        maintainer().verifying_key(),
    )])
}

pub fn signed_hashes(entries: &[(&str, &str)], key: &SigningKey) -> Vec<u8> {
    let body = entries
        .iter()
        .map(|(digest, file)| format!("{}  {}", digest, file))
        .collect::<Vec<_>>()
        .join("\n");

    SignedHashManifest::armor(&body, key).into_bytes()
}

pub fn feed(json: &str) -> UpdatesFeed {
    UpdatesFeed::from_slice(json.as_bytes()).unwrap()
}

/// Release host serving canned manifests and recording every request.
#[derive(Default)]
pub struct FakeReleaseHost {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    requests: Mutex<Vec<Url>>,
    hang: bool,
    started: Arc<Notify>,
}

impl FakeReleaseHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host whose requests never complete.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn serve(self, url: &str, body: Vec<u8>) -> Self {
        self.responses.lock().unwrap().insert(url.to_owned(), body);
        self
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    /// Resolves once a request has been made.
    pub async fn request_started(&self) {
        self.started.notified().await
    }
}

impl ReleaseSource for FakeReleaseHost {
    async fn fetch_signed_hashes(&self, url: Url) -> Result<Vec<u8>, UpdaterError> {
        self.requests.lock().unwrap().push(url.clone());
        self.started.notify_one();

        if self.hang {
            std::future::pending::<()>().await;
        }

        self.responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| UpdaterError::GenericIo(std::io::Error::other("404 Not Found")))
    }
}

pub fn checker(
    current: &str,
    platform: Option<PlatformTag>,
    host: FakeReleaseHost,
) -> (
    UpdateChecker<FakeReleaseHost>,
    UnboundedReceiver<UpdateNotification>,
) {
    let config = UpdaterConfig::new(Version::parse(current).unwrap(), platform)
        .with_host(Url::parse(HOST).unwrap());
    let (notifier, receiver) = ChannelNotifier::new();

    (
        UpdateChecker::new(config, host, Arc::new(keyring()), Arc::new(notifier)),
        receiver,
    )
}

use crate::error::UpdaterError;
use crate::platform::PlatformTag;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Update announcement pushed to the wallet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatesFeed {
    #[serde(default)]
    pub platform: BTreeMap<String, PlatformRelease>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlatformRelease {
    pub version: String,

    /// Informational, the expected file name is always derived locally.
    #[serde(default)]
    pub binary_filename: Option<String>,
}

impl UpdatesFeed {
    pub fn from_slice(data: &[u8]) -> Result<Self, UpdaterError> {
        serde_json::from_slice(data).map_err(UpdaterError::from)
    }

    pub fn release_for(&self, platform: PlatformTag) -> Option<&PlatformRelease> {
        self.platform.get(platform.as_str())
    }

    /// Load a feed from a local file or an `http(s)` URL.
    #[tracing::instrument(skip(client))]
    pub async fn load(
        location: &str,
        client: &Client,
        timeout: Duration,
    ) -> Result<Self, UpdaterError> {
        let data = match Url::parse(location) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                client
                    .get(url)
                    .timeout(timeout)
                    .send()
                    .await?
                    .error_for_status()?
                    .bytes()
                    .await?
                    .to_vec()
            }
            _ => tokio::fs::read(Path::new(location)).await?,
        };

        Self::from_slice(&data)
    }
}

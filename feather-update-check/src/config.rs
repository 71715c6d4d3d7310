use crate::platform::PlatformTag;
use semver::Version;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HOST: &str = "https://featherwallet.org/";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything an update check needs to know about the running application.
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Release host, hashes and archives live under `files/releases/`.
    pub host: Url,
    pub current_version: Version,
    /// `None` when no releases are published for this platform.
    pub platform: Option<PlatformTag>,
    /// Deadline for the feed and hashes requests, archive downloads only use
    /// it to bound connecting.
    pub request_timeout: Duration,
    /// Route all requests through this proxy, e.g. `socks5h://127.0.0.1:9050`
    /// for Tor. Requests go out directly when unset.
    pub proxy: Option<Url>,
}

impl UpdaterConfig {
    pub fn new(current_version: Version, platform: Option<PlatformTag>) -> Self {
        Self {
            host: Url::parse(DEFAULT_HOST).expect("default host is a valid url"),
            current_version,
            platform,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            proxy: None,
        }
    }

    pub fn with_host(mut self, host: Url) -> Self {
        self.host = host;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, proxy: Option<Url>) -> Self {
        self.proxy = proxy;
        self
    }

    /// `<host>/files/releases/hashes-<version>-plain.txt`
    pub fn hashes_url(&self, version: &str) -> Url {
        self.releases_path([format!("hashes-{}-plain.txt", version)])
    }

    /// `<host>/files/releases/<platform>/<binary_filename>`
    pub fn download_url(&self, platform: PlatformTag, binary_filename: &str) -> Url {
        self.releases_path([platform.as_str(), binary_filename])
    }

    fn releases_path(&self, segments: impl IntoIterator<Item = impl AsRef<str>>) -> Url {
        let mut url = self.host.clone();

        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(["files", "releases"]).extend(segments);
        }

        url
    }
}

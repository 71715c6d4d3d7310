use crate::config::UpdaterConfig;
use crate::error::{DownloadError, UpdaterError};
use reqwest::redirect::Policy;
use reqwest::{Client, Proxy};
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt as _;
use url::Url;

/// Where signed hash manifests come from.
pub trait ReleaseSource: Send + Sync + 'static {
    fn fetch_signed_hashes(
        &self,
        url: Url,
    ) -> impl Future<Output = Result<Vec<u8>, UpdaterError>> + Send;
}

#[derive(Debug, Clone)]
pub struct ReleaseServer {
    client: Client,
    request_timeout: Duration,
}

impl ReleaseServer {
    /// Prepare the HTTP client.
    ///
    /// The request timeout is applied per request to the small metadata
    /// fetches, archive downloads may take as long as they need.
    pub fn new(config: &UpdaterConfig) -> Result<Self, UpdaterError> {
        let builder = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .redirect(Policy::limited(10))
            .connect_timeout(config.request_timeout)
            .hickory_dns(true);

        let builder = match &config.proxy {
            Some(proxy) => {
                tracing::debug!("Sending requests through proxy {}", proxy);
                builder.proxy(Proxy::all(proxy.clone())?)
            }
            None => builder.no_proxy(),
        };

        Ok(Self {
            client: builder.build()?,
            request_timeout: config.request_timeout,
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Stream the body of `url` into `sink`, feeding every chunk to `on_chunk`.
    ///
    /// Returns the number of bytes written.
    #[tracing::instrument(skip_all, fields(url = url.as_str()))]
    pub async fn download<W>(
        &self,
        url: Url,
        sink: &mut W,
        mut on_chunk: impl FnMut(&[u8], Option<u64>),
    ) -> Result<u64, DownloadError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut response = self.client.get(url).send().await?.error_for_status()?;
        let total = response.content_length();

        let mut written = 0;
        while let Some(chunk) = response.chunk().await? {
            sink.write_all(&chunk).await?;
            on_chunk(&chunk, total);
            written += chunk.len() as u64;
        }

        sink.flush().await?;

        Ok(written)
    }
}

impl ReleaseSource for ReleaseServer {
    #[tracing::instrument(skip_all, fields(url = url.as_str()))]
    async fn fetch_signed_hashes(&self, url: Url) -> Result<Vec<u8>, UpdaterError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?
            .error_for_status()?;
        let data = response.bytes().await?;

        tracing::trace!("Received {} bytes of signed hashes", data.len());

        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::PlatformTag;
    use crate::test_support::{Reply, TestServer};
    use semver::Version;

    fn config(host: Url, timeout_ms: u64) -> UpdaterConfig {
        UpdaterConfig::new(Version::new(1, 2, 0), Some(PlatformTag::Linux))
            .with_host(host)
            .with_request_timeout(Duration::from_millis(timeout_ms))
    }

    #[tokio::test]
    async fn test_download_may_outlast_request_timeout() {
        let server = TestServer::start(Reply::Slow {
            chunks: vec![b"hello".to_vec(), b" ".to_vec(), b"wor".to_vec(), b"ld".to_vec()],
            delay: Duration::from_millis(100),
        })
        .await;
        let release_server = ReleaseServer::new(&config(server.url("/"), 200)).unwrap();

        let mut sink = Vec::new();
        let mut seen = 0;
        let written = release_server
            .download(server.url("/archive.zip"), &mut sink, |chunk, total| {
                assert_eq!(total, Some(11));
                seen += chunk.len();
            })
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(seen, 11);
        assert_eq!(sink, b"hello world");
    }

    #[tokio::test]
    async fn test_signed_hashes_fetch_times_out() {
        let server = TestServer::start(Reply::Stall).await;
        let release_server = ReleaseServer::new(&config(server.url("/"), 200)).unwrap();

        let result = release_server
            .fetch_signed_hashes(server.url("/files/releases/hashes-1.3.0-plain.txt"))
            .await;

        match result {
            Err(UpdaterError::HttpClientError(err)) => assert!(err.is_timeout()),
            other => panic!("expected a timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_requests_go_through_proxy() {
        let proxy = TestServer::start(Reply::Body(b"signed".to_vec())).await;
        let host = Url::parse("http://releases.example.org/").unwrap();
        let config = config(host, 2000).with_proxy(Some(proxy.url("/")));
        let release_server = ReleaseServer::new(&config).unwrap();

        let data = release_server
            .fetch_signed_hashes(config.hashes_url("1.0.0"))
            .await
            .unwrap();

        assert_eq!(data, b"signed");
        assert_eq!(
            proxy.requests(),
            vec!["GET http://releases.example.org/files/releases/hashes-1.0.0-plain.txt HTTP/1.1"]
        );
    }

    #[test]
    fn test_socks_proxy_is_accepted() {
        let config = config(Url::parse(crate::config::DEFAULT_HOST).unwrap(), 1000)
            .with_proxy(Some(Url::parse("socks5h://127.0.0.1:9050").unwrap()));

        assert!(ReleaseServer::new(&config).is_ok());
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("an I/O error occurred: {0}")]
    GenericIo(#[from] std::io::Error),

    #[error("http client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] KeyringError),

    #[error("download error: {0}")]
    Download(#[from] DownloadError),

    #[error("manifest error: {0}")]
    Verify(#[from] VerifyError),

    #[error(transparent)]
    InvalidPlatform(#[from] crate::platform::UnknownPlatform),

    #[error("invalid version: {0}")]
    InvalidVersion(String),

    #[error("bad secret key: {0}")]
    InvalidSecretKey(String),
}

/// Reasons a signed hash manifest is rejected.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("bad signature encoding: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("signature does not match any trusted signer")]
    UntrustedSignature,

    #[error("no hash entry for {0}")]
    MissingEntry(String),

    #[error("verification task failed: {0}")]
    TaskFailed(String),
}

#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("an I/O error occurred: {0}")]
    GenericIo(#[from] std::io::Error),

    #[error("deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("bad public key for signer '{0}'")]
    InvalidPublicKey(String),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("an I/O error occurred: {0}")]
    GenericIo(#[from] std::io::Error),

    #[error("http client error: {0}")]
    HttpClientError(#[from] reqwest::Error),

    #[error("hash mismatch: expected {expected}, got {actual}")]
    HashMismatch { expected: String, actual: String },

    #[error("download cancelled")]
    Cancelled,
}

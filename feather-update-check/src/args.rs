use clap::{Args, Parser, Subcommand};
use feather_update_check::PlatformTag;
use feather_update_check::config::DEFAULT_HOST;
use feather_update_check::platform::UnknownPlatform;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Parser)]
#[command(version, about = "Check for, verify and fetch Feather wallet updates")]
pub struct UpdaterArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run a single update check.
    Check(CheckArgs),

    /// Re-run the update check on a fixed interval until interrupted.
    Watch {
        #[command(flatten)]
        check: CheckArgs,

        /// Seconds between checks.
        #[arg(long, default_value = "3600")]
        interval: u64,
    },

    /// Sign a sha256sum listing into an armored hash manifest.
    Sign(SignArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Update feed, a local JSON file or an http(s) URL.
    #[arg(short, long, env = "FEATHER_UPDATE_FEED")]
    pub feed: String,

    /// Trusted signer keyring (JSON).
    #[arg(short, long, env = "FEATHER_UPDATE_KEYRING")]
    pub keyring: PathBuf,

    /// Version to compare against, defaults to this tool's own version.
    #[arg(long)]
    pub current_version: Option<String>,

    /// Platform tag, detected from the running build when omitted.
    /// Pass an empty string to act as an unsupported platform.
    #[arg(long)]
    pub platform: Option<String>,

    #[arg(long, default_value = DEFAULT_HOST, env = "FEATHER_UPDATE_HOST")]
    pub host: Url,

    /// Proxy for all requests, e.g. `socks5h://127.0.0.1:9050` to go through Tor.
    #[arg(long, env = "FEATHER_UPDATE_PROXY")]
    pub proxy: Option<Url>,

    /// Timeout in seconds for the feed and hashes requests and for connecting.
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Download and verify the release archive into this directory.
    #[arg(long)]
    pub download_dir: Option<PathBuf>,
}

impl CheckArgs {
    /// `Ok(None)` stands for an unsupported platform.
    pub fn platform(&self) -> Result<Option<PlatformTag>, UnknownPlatform> {
        match self.platform.as_deref() {
            None => Ok(PlatformTag::detect()),
            Some("") => Ok(None),
            Some(tag) => tag.parse().map(Some),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SignArgs {
    /// Output of `sha256sum` over the release files.
    #[arg(long)]
    pub hashes: PathBuf,

    /// Hex encoded ed25519 secret key.
    #[arg(long)]
    pub secret_key: PathBuf,

    /// Where to write the manifest, stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

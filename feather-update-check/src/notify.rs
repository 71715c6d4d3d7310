use crate::check::VerifiedUpdate;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use url::Url;

/// Receives updates that passed verification.
pub trait NotificationSink: Send + Sync {
    fn update_available(&self, update: &VerifiedUpdate, download_url: &Url);
}

/// Status text shown for an available update.
pub fn display_text(version: &str) -> String {
    format!("Update to Feather {} is available", version.replace("beta", "Beta"))
}

/// Writes available updates to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn update_available(&self, update: &VerifiedUpdate, download_url: &Url) {
        tracing::info!("{}", display_text(update.version()));
        tracing::info!("  file:      {}", update.binary_filename());
        tracing::info!("  sha256:    {}", update.hash());
        tracing::info!("  signed by: {}", update.signer());
        tracing::info!("  download:  {}", download_url);
    }
}

#[derive(Debug, Clone)]
pub struct UpdateNotification {
    pub update: VerifiedUpdate,
    pub download_url: Url,
}

/// Forwards available updates over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<UpdateNotification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, UnboundedReceiver<UpdateNotification>) {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotifier {
    fn update_available(&self, update: &VerifiedUpdate, download_url: &Url) {
        // A closed receiver means nobody is interested anymore.
        let _ = self.sender.send(UpdateNotification {
            update: update.clone(),
            download_url: download_url.clone(),
        });
    }
}

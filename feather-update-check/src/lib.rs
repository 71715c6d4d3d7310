//! Update checking for the Feather wallet.
//!
//! A feed announces a new version, the signed hash manifest for that version
//! is fetched and checked against the trusted keyring, and only a hash that
//! verifies is ever handed to the [`notify::NotificationSink`].

pub mod api;
pub mod check;
pub mod config;
pub mod download;
pub mod error;
pub mod feed;
pub mod keyring;
pub mod manifest;
pub mod notify;
pub mod platform;
pub mod verify;
pub mod version;

#[cfg(test)]
mod test_support;

pub use check::{AbortReason, CheckOutcome, UpdateChecker, VerifiedUpdate};
pub use config::UpdaterConfig;
pub use platform::PlatformTag;

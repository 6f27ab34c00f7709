//! Delivery of one message per new feed entry.

mod sendmail;

use async_trait::async_trait;
use thiserror::Error;

use crate::feed::Entry;

pub use sendmail::SendmailNotifier;

/// Errors raised while delivering a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The mail transport could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    /// Writing the message to the transport failed
    #[error("Failed to hand message to transport: {0}")]
    Io(#[from] std::io::Error),
    /// The transport ran but reported failure
    #[error("Transport exited with {0}")]
    Exit(String),
}

/// Delivers a message about `entry` to a single recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: &str, feed_url: &str, entry: &Entry)
        -> Result<(), DeliveryError>;
}

//! The fetch → diff → notify pipeline.
//!
//! [`Processor::process_feed`] handles one feed; [`Processor::run_once`] runs
//! it over every configured feed in declaration order. Failures are returned
//! as [`PassError`] values rather than raised, so one broken feed or one
//! undeliverable entry never stops the rest of the pass.

use thiserror::Error;

use crate::feed::{FeedFetcher, FetchError};
use crate::notify::{DeliveryError, Notifier};
use crate::recipients::Recipients;
use crate::storage::{DatabaseError, EntryStore};

/// One failure recorded during a pass, tagged with the feed it belongs to.
#[derive(Debug, Error)]
pub enum PassError {
    #[error("{feed}: failed to fetch feed: {source}")]
    Fetch {
        feed: String,
        #[source]
        source: FetchError,
    },
    #[error("{feed}: failed to notify {recipient} about {entry}: {source}")]
    Delivery {
        feed: String,
        entry: String,
        recipient: String,
        #[source]
        source: DeliveryError,
    },
    #[error("{feed}: failed to record {entry} as seen: {source}")]
    Persistence {
        feed: String,
        entry: String,
        #[source]
        source: DatabaseError,
    },
}

impl PassError {
    pub fn feed_url(&self) -> &str {
        match self {
            PassError::Fetch { feed, .. }
            | PassError::Delivery { feed, .. }
            | PassError::Persistence { feed, .. } => feed,
        }
    }
}

/// Immutable per-process settings handed to every pass.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub recipients: Recipients,
    pub verbose: bool,
}

/// Borrowed handles on the three collaborators a pass needs.
#[derive(Clone, Copy)]
pub struct Processor<'a> {
    fetcher: &'a dyn FeedFetcher,
    notifier: &'a dyn Notifier,
    store: &'a dyn EntryStore,
}

impl<'a> Processor<'a> {
    pub fn new(
        fetcher: &'a dyn FeedFetcher,
        notifier: &'a dyn Notifier,
        store: &'a dyn EntryStore,
    ) -> Self {
        Self {
            fetcher,
            notifier,
            store,
        }
    }

    /// Notify every recipient about each unseen entry of one feed.
    ///
    /// An entry is marked seen only after delivery to all recipients
    /// succeeded. If any recipient fails, the entry stays unseen and every
    /// recipient is tried again on the next pass.
    pub async fn process_feed(&self, feed_url: &str, settings: &RunSettings) -> Vec<PassError> {
        if settings.verbose {
            println!("Fetching {}", feed_url);
        }

        let entries = match self.fetcher.fetch(feed_url).await {
            Ok(entries) => entries,
            Err(source) => {
                tracing::warn!(feed = %feed_url, error = %source, "Feed fetch failed");
                return vec![PassError::Fetch {
                    feed: feed_url.to_string(),
                    source,
                }];
            }
        };

        let mut errors = Vec::new();
        let mut notified = 0usize;

        for entry in &entries {
            if self.store.has_seen(feed_url, &entry.guid).await {
                tracing::debug!(feed = %feed_url, guid = %entry.guid, "Skipping seen entry");
                continue;
            }

            let mut delivered = true;
            for recipient in settings.recipients.iter() {
                if let Err(source) = self.notifier.notify(recipient, feed_url, entry).await {
                    tracing::warn!(
                        feed = %feed_url,
                        guid = %entry.guid,
                        recipient = %recipient,
                        error = %source,
                        "Delivery failed, entry left unseen"
                    );
                    delivered = false;
                    errors.push(PassError::Delivery {
                        feed: feed_url.to_string(),
                        entry: entry.guid.clone(),
                        recipient: recipient.to_string(),
                        source,
                    });
                }
            }

            if !delivered {
                continue;
            }

            match self.store.mark_seen(feed_url, &entry.guid).await {
                Ok(()) => notified += 1,
                Err(source) => {
                    tracing::warn!(feed = %feed_url, guid = %entry.guid, error = %source, "Failed to record seen entry");
                    errors.push(PassError::Persistence {
                        feed: feed_url.to_string(),
                        entry: entry.guid.clone(),
                        source,
                    });
                }
            }
        }

        tracing::info!(
            feed = %feed_url,
            entries = entries.len(),
            notified = notified,
            errors = errors.len(),
            "Processed feed"
        );
        if settings.verbose {
            println!("{}: {} new entries notified", feed_url, notified);
        }

        errors
    }

    /// One pass over every feed, in order, with no short-circuiting.
    ///
    /// Errors are concatenated in feed-then-entry order; an empty result
    /// means the whole pass succeeded.
    pub async fn run_once(&self, feeds: &[String], settings: &RunSettings) -> Vec<PassError> {
        let mut errors = Vec::new();
        for feed_url in feeds {
            errors.extend(self.process_feed(feed_url, settings).await);
        }
        errors
    }
}

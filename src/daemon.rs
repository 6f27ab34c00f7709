//! The perpetual poll loop.
//!
//! Two phases, forever: run one pass over every feed, then sleep for
//! [`PASS_INTERVAL`]. Errors from a pass are reported and never stop the loop.

use std::convert::Infallible;
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;

use thiserror::Error;

use crate::feed::FeedFetcher;
use crate::notify::Notifier;
use crate::processor::{PassError, Processor, RunSettings};
use crate::recipients::{Recipients, UsageError};
use crate::storage::EntryStore;

/// Fixed wait between the end of one pass and the start of the next.
pub const PASS_INTERVAL: Duration = Duration::from_secs(60 * 15);

/// Whether [`start`] runs a single pass or loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Once,
    Forever,
}

/// Everything a run needs besides its recipients.
pub struct Pipeline {
    pub fetcher: Box<dyn FeedFetcher>,
    pub notifier: Box<dyn Notifier>,
    pub store: Box<dyn EntryStore>,
    pub feeds: Vec<String>,
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Usage(#[from] UsageError),

    #[error(transparent)]
    Setup(#[from] anyhow::Error),
}

/// Validate `tokens` as recipients, then build the pipeline and run it.
///
/// `setup` is only invoked once the recipient list is accepted, so a bad list
/// never loads config, opens a store, fetches or notifies. In
/// [`Mode::Forever`] this only returns on error.
pub async fn start<F, Fut>(
    tokens: Vec<String>,
    verbose: bool,
    mode: Mode,
    setup: F,
) -> Result<Vec<PassError>, StartError>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<Pipeline>>,
{
    let recipients = Recipients::parse(tokens)?;
    let Pipeline {
        fetcher,
        notifier,
        store,
        feeds,
    } = setup().await?;

    tracing::info!(
        feeds = feeds.len(),
        recipients = recipients.len(),
        mode = ?mode,
        "Starting feedmail"
    );

    let processor = Processor::new(fetcher.as_ref(), notifier.as_ref(), store.as_ref());
    let scheduler = Scheduler::new(processor, feeds, RunSettings { recipients, verbose });
    match mode {
        Mode::Once => Ok(scheduler.run_pass().await),
        Mode::Forever => match scheduler.run_forever().await {},
    }
}

pub struct Scheduler<'a> {
    processor: Processor<'a>,
    feeds: Vec<String>,
    settings: RunSettings,
}

impl<'a> Scheduler<'a> {
    pub fn new(processor: Processor<'a>, feeds: Vec<String>, settings: RunSettings) -> Self {
        Self {
            processor,
            feeds,
            settings,
        }
    }

    /// Run one pass and write its errors to stderr.
    pub async fn run_pass(&self) -> Vec<PassError> {
        tracing::info!(feeds = self.feeds.len(), "Starting pass");
        let errors = self.processor.run_once(&self.feeds, &self.settings).await;

        if let Err(e) = report_errors(&errors, &mut io::stderr().lock()) {
            tracing::warn!(error = %e, "Failed to write pass errors to stderr");
        }
        tracing::info!(errors = errors.len(), "Pass complete");
        errors
    }

    /// Loop forever. Only process termination ends it.
    pub async fn run_forever(&self) -> Infallible {
        loop {
            self.run_pass().await;

            if let Err(e) = self.sleep_notice(&mut io::stdout().lock()) {
                tracing::warn!(error = %e, "Failed to write sleep notice to stdout");
            }
            tokio::time::sleep(PASS_INTERVAL).await;
        }
    }

    /// In verbose mode, announce the wait before the next pass.
    pub fn sleep_notice(&self, out: &mut dyn Write) -> io::Result<()> {
        if !self.settings.verbose {
            return Ok(());
        }
        writeln!(out, "sleeping for {} minutes", PASS_INTERVAL.as_secs() / 60)?;
        out.flush()
    }
}

/// Write each error on its own line.
pub fn report_errors(errors: &[PassError], out: &mut dyn Write) -> io::Result<()> {
    for error in errors {
        writeln!(out, "{}", error)?;
    }
    out.flush()
}

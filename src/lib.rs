//! feedmail: poll syndication feeds and mail every entry not seen before.
//!
//! ```text
//! Scheduler ──► Processor::run_once ──► Processor::process_feed (per feed)
//!                                          ├─► FeedFetcher  (read)
//!                                          ├─► EntryStore   (read/append)
//!                                          └─► Notifier     (deliver)
//! ```
//!
//! * **`feed`** - entry parsing and the HTTP fetcher.
//! * **`storage`** - the durable per-feed seen-set (SQLite).
//! * **`notify`** - message delivery through a sendmail binary.
//! * **`processor`** - fetch → diff → notify for one feed, and one pass over all feeds.
//! * **`daemon`** - the forever loop with its fixed 15 minute sleep.
//! * **`recipients`** / **`config`** - validated startup inputs.

pub mod config;
pub mod daemon;
pub mod feed;
pub mod notify;
pub mod processor;
pub mod recipients;
pub mod storage;
pub mod util;

pub use daemon::{start, Mode, Pipeline, Scheduler, StartError, PASS_INTERVAL};
pub use processor::{PassError, Processor, RunSettings};
pub use recipients::{Recipients, UsageError, USAGE};

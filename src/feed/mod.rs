//! Feed retrieval for RSS/Atom sources.
//!
//! - [`parser`] - Converts feed XML into [`Entry`] values with stable identifiers
//! - [`fetcher`] - The [`FeedFetcher`] seam and its HTTP implementation
//!
//! Fetches are single attempts: a failed feed is simply retried on the next pass.

mod fetcher;
mod parser;

pub use fetcher::{FeedFetcher, FetchError, HttpFetcher};
pub use parser::{parse_feed, Entry};

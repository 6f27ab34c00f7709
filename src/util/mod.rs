//! Feed URL validation.
//!
//! Rejects non-HTTP(S) schemes along with localhost and private network
//! targets, so a config file cannot point the daemon at internal services.

mod url_validator;

pub use url_validator::{validate_feed_url, validate_url, UrlValidationError};

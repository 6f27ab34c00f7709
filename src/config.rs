//! Configuration file parser for ~/.config/feedmail/config.toml.
//!
//! The config file is optional - a missing file yields `Config::default()`,
//! though a daemon with no feeds refuses to start. Unknown keys are accepted
//! and logged as a warning.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::util::{validate_feed_url, UrlValidationError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid feed URL '{url}': {source}")]
    InvalidFeed {
        url: String,
        #[source]
        source: UrlValidationError,
    },

    #[error("No feeds configured")]
    NoFeeds,
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feed URLs, processed in this order every pass.
    pub feeds: Vec<String>,

    /// Seen-entry database path. Defaults to `seen.db` beside the config file.
    pub database: Option<PathBuf>,

    /// Sender address written into every message.
    pub from: String,

    /// sendmail-compatible binary that receives each message on stdin.
    pub sendmail: PathBuf,

    /// Per-request timeout for feed fetches.
    pub fetch_timeout_secs: u64,

    /// Permit feeds on localhost or private networks.
    pub allow_private_feeds: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            database: None,
            from: "feedmail@localhost".to_string(),
            sendmail: PathBuf::from("/usr/sbin/sendmail"),
            fetch_timeout_secs: 30,
            allow_private_feeds: false,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 6] = [
        "feeds",
        "database",
        "from",
        "sendmail",
        "fetch_timeout_secs",
        "allow_private_feeds",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), feeds = config.feeds.len(), "Loaded configuration");
        Ok(config)
    }

    /// The configured feeds, validated, whitespace-trimmed, in declaration order.
    ///
    /// Duplicate URLs are dropped (first occurrence wins) so one feed is never
    /// processed twice in a pass.
    pub fn validated_feeds(&self) -> Result<Vec<String>, ConfigError> {
        let mut feeds: Vec<String> = Vec::with_capacity(self.feeds.len());
        for raw in &self.feeds {
            let url = raw.trim();
            validate_feed_url(url, self.allow_private_feeds).map_err(|source| {
                ConfigError::InvalidFeed {
                    url: url.to_string(),
                    source,
                }
            })?;

            if feeds.iter().any(|f| f == url) {
                tracing::warn!(feed = %url, "Duplicate feed in config, ignoring");
                continue;
            }
            feeds.push(url.to_string());
        }

        if feeds.is_empty() {
            return Err(ConfigError::NoFeeds);
        }
        Ok(feeds)
    }

    /// Resolve the database path against `config_dir`, defaulting to `seen.db`.
    pub fn database_path(&self, config_dir: &Path) -> PathBuf {
        match &self.database {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => config_dir.join(path),
            None => config_dir.join("seen.db"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(name: &str, content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("feedmail_config_test_{name}"));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.feeds.is_empty());
        assert!(config.database.is_none());
        assert_eq!(config.from, "feedmail@localhost");
        assert_eq!(config.sendmail, PathBuf::from("/usr/sbin/sendmail"));
        assert_eq!(config.fetch_timeout_secs, 30);
        assert!(!config.allow_private_feeds);
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedmail_test_nonexistent_config.toml");
        let config = Config::load(path).unwrap();
        assert!(config.feeds.is_empty());
    }

    #[test]
    fn test_whitespace_only_file_returns_default() {
        let (dir, path) = write_config("whitespace", "   \n  \n  ");
        let config = Config::load(&path).unwrap();
        assert_eq!(config.fetch_timeout_secs, 30);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let content = r#"
feeds = ["https://blog.example.com/rss", "https://news.example.org/atom.xml"]
database = "/var/lib/feedmail/seen.db"
from = "rss@example.com"
sendmail = "/usr/bin/msmtp"
fetch_timeout_secs = 10
"#;
        let (dir, path) = write_config("full", content);

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.feeds,
            vec!["https://blog.example.com/rss", "https://news.example.org/atom.xml"]
        );
        assert_eq!(
            config.database_path(&dir),
            PathBuf::from("/var/lib/feedmail/seen.db")
        );
        assert_eq!(config.from, "rss@example.com");
        assert_eq!(config.sendmail, PathBuf::from("/usr/bin/msmtp"));
        assert_eq!(config.fetch_timeout_secs, 10);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let (dir, path) = write_config("invalid", "this is not [valid toml");
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_unknown_keys_accepted() {
        let (dir, path) = write_config("unknown", "feeds = []\ninterval = 5\n");
        let config = Config::load(&path).unwrap();
        assert!(config.feeds.is_empty());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let (dir, path) = write_config("too_large", &"a".repeat(1_048_577));
        let err = Config::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_default_database_path_is_beside_config() {
        let config = Config::default();
        assert_eq!(
            config.database_path(Path::new("/home/u/.config/feedmail")),
            PathBuf::from("/home/u/.config/feedmail/seen.db")
        );
    }

    #[test]
    fn test_relative_database_path_resolves_against_config_dir() {
        let config = Config {
            database: Some(PathBuf::from("state/seen.db")),
            ..Config::default()
        };
        assert_eq!(
            config.database_path(Path::new("/etc/feedmail")),
            PathBuf::from("/etc/feedmail/state/seen.db")
        );
    }

    #[test]
    fn test_validated_feeds_keeps_order_and_drops_duplicates() {
        let config = Config {
            feeds: vec![
                "https://b.example.com/rss".to_string(),
                " https://a.example.com/rss ".to_string(),
                "https://b.example.com/rss".to_string(),
            ],
            ..Config::default()
        };
        assert_eq!(
            config.validated_feeds().unwrap(),
            vec!["https://b.example.com/rss", "https://a.example.com/rss"]
        );
    }

    #[test]
    fn test_validated_feeds_rejects_private_by_default() {
        let mut config = Config {
            feeds: vec!["http://127.0.0.1:8080/rss".to_string()],
            ..Config::default()
        };
        assert!(matches!(
            config.validated_feeds(),
            Err(ConfigError::InvalidFeed { .. })
        ));

        config.allow_private_feeds = true;
        assert_eq!(
            config.validated_feeds().unwrap(),
            vec!["http://127.0.0.1:8080/rss"]
        );
    }

    #[test]
    fn test_allow_private_feeds_keeps_http_only() {
        for url in ["file:///etc/passwd", "ftp://example.com/rss"] {
            let config = Config {
                feeds: vec![url.to_string()],
                allow_private_feeds: true,
                ..Config::default()
            };
            assert!(
                matches!(
                    config.validated_feeds(),
                    Err(ConfigError::InvalidFeed {
                        source: UrlValidationError::UnsupportedScheme(_),
                        ..
                    })
                ),
                "{url} should be rejected even with allow_private_feeds"
            );
        }
    }

    #[test]
    fn test_validated_feeds_empty_is_error() {
        assert!(matches!(
            Config::default().validated_feeds(),
            Err(ConfigError::NoFeeds)
        ));
    }

    #[test]
    fn test_non_http_feed_rejected() {
        let config = Config {
            feeds: vec!["file:///etc/passwd".to_string()],
            ..Config::default()
        };
        assert!(config.validated_feeds().is_err());
    }
}

use feed_rs::parser;
use sha2::{Digest, Sha256};

/// One syndicated item, as handed to the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable identifier: the feed's own id/guid, or a content hash
    pub guid: String,
    pub title: String,
    pub link: Option<String>,
    /// Unix timestamp (published, falling back to updated)
    pub published: Option<i64>,
    pub summary: Option<String>,
}

/// Parse RSS/Atom bytes into entries, preserving feed order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<Entry>, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| {
            let link = entry.links.first().map(|l| l.href.clone());
            let published = entry.published.or(entry.updated).map(|dt| dt.timestamp());
            let summary = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body));
            let title = entry
                .title
                .map(|t| t.content)
                .unwrap_or_else(|| "Untitled".to_string());

            let guid = generate_guid(Some(entry.id.as_str()), link.as_deref(), &title, published);

            Entry {
                guid,
                title,
                link,
                published,
                summary,
            }
        })
        .collect();

    Ok(entries)
}

fn generate_guid(
    existing: Option<&str>,
    link: Option<&str>,
    title: &str,
    published: Option<i64>,
) -> String {
    if let Some(guid) = existing {
        let trimmed = guid.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let input = format!(
        "{}|{}|{}",
        link.unwrap_or(""),
        title,
        published.map(|p| p.to_string()).unwrap_or_default()
    );
    let hash = Sha256::digest(input.as_bytes());
    format!("{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ITEMS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>T</title>
    <item><guid>first</guid><title>First</title><link>https://example.com/1</link>
        <pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate><description>One</description></item>
    <item><guid>second</guid><title>Second</title><link>https://example.com/2</link></item>
</channel></rss>"#;

    #[test]
    fn test_parse_keeps_feed_order_and_guids() {
        let entries = parse_feed(TWO_ITEMS.as_bytes()).unwrap();
        let guids: Vec<&str> = entries.iter().map(|e| e.guid.as_str()).collect();
        assert_eq!(guids, vec!["first", "second"]);
        assert_eq!(entries[0].title, "First");
        assert_eq!(entries[0].link.as_deref(), Some("https://example.com/1"));
        assert_eq!(entries[0].published, Some(1704067200));
        assert_eq!(entries[0].summary.as_deref(), Some("One"));
    }

    #[test]
    fn test_generated_guid_is_deterministic() {
        let a = generate_guid(None, Some("https://example.com/a"), "Title", Some(1));
        let b = generate_guid(None, Some("https://example.com/a"), "Title", Some(1));
        let c = generate_guid(None, Some("https://example.com/b"), "Title", Some(1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_blank_guid_falls_back_to_hash() {
        let guid = generate_guid(Some("   "), None, "Title", None);
        assert_eq!(guid.len(), 64);
        assert_eq!(generate_guid(Some(" kept "), None, "Title", None), "kept");
    }

    #[test]
    fn test_invalid_xml_is_error() {
        assert!(parse_feed(b"<not valid xml").is_err());
    }
}

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{DeliveryError, Notifier};
use crate::feed::Entry;

/// Hands plain-text messages to a sendmail-compatible binary (`sendmail -t`).
#[derive(Debug, Clone)]
pub struct SendmailNotifier {
    program: PathBuf,
    from: String,
}

impl SendmailNotifier {
    pub fn new(program: impl Into<PathBuf>, from: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            from: from.into(),
        }
    }

    /// Render the RFC 5322 message for one entry.
    pub fn render_message(&self, recipient: &str, feed_url: &str, entry: &Entry) -> String {
        let mut message = String::new();
        push_header(&mut message, "From", &self.from);
        push_header(&mut message, "To", recipient);
        push_header(&mut message, "Subject", &entry.title);
        push_header(&mut message, "Date", &Utc::now().to_rfc2822());
        push_header(&mut message, "X-RSS-Feed", feed_url);
        if let Some(link) = &entry.link {
            push_header(&mut message, "X-RSS-Link", link);
        }
        push_header(&mut message, "MIME-Version", "1.0");
        push_header(&mut message, "Content-Type", "text/plain; charset=UTF-8");
        message.push_str("\r\n");

        if let Some(link) = &entry.link {
            message.push_str(link);
            message.push_str("\r\n\r\n");
        }
        if let Some(ts) = entry.published {
            if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
                message.push_str(&format!("Published: {}\r\n\r\n", dt.to_rfc2822()));
            }
        }
        if let Some(summary) = &entry.summary {
            for line in summary.lines() {
                message.push_str(line);
                message.push_str("\r\n");
            }
        }
        message
    }
}

// CR/LF in a value would let feed content inject headers
fn push_header(out: &mut String, name: &str, value: &str) {
    let value: String = value
        .chars()
        .map(|c| if c == '\r' || c == '\n' { ' ' } else { c })
        .collect();
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value.trim());
    out.push_str("\r\n");
}

#[async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(
        &self,
        recipient: &str,
        feed_url: &str,
        entry: &Entry,
    ) -> Result<(), DeliveryError> {
        let message = self.render_message(recipient, feed_url, entry);

        let mut child = Command::new(&self.program)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| DeliveryError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(message.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                recipient = %recipient,
                guid = %entry.guid,
                stderr = %stderr.trim(),
                "sendmail rejected message"
            );
            return Err(DeliveryError::Exit(output.status.to_string()));
        }

        tracing::debug!(recipient = %recipient, guid = %entry.guid, "Delivered notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> Entry {
        Entry {
            guid: "guid-1".to_string(),
            title: "Hello\r\nBcc: evil@example.com".to_string(),
            link: Some("https://example.com/post".to_string()),
            published: Some(1704067200),
            summary: Some("Line one\nLine two".to_string()),
        }
    }

    #[test]
    fn test_render_message_headers_and_body() {
        let notifier = SendmailNotifier::new("/usr/sbin/sendmail", "feeds@example.com");
        let message =
            notifier.render_message("user@example.com", "https://example.com/rss", &entry());

        assert!(message.starts_with("From: feeds@example.com\r\nTo: user@example.com\r\n"));
        assert!(message.contains("X-RSS-Feed: https://example.com/rss\r\n"));
        assert!(message.contains("X-RSS-Link: https://example.com/post\r\n"));
        assert!(message.contains("Published: Mon, "));
        assert!(message.contains("Jan 2024 00:00:00 +0000"));
        assert!(message.contains("Line one\r\nLine two\r\n"));
    }

    #[test]
    fn test_render_message_strips_header_injection() {
        let notifier = SendmailNotifier::new("/usr/sbin/sendmail", "feeds@example.com");
        let message =
            notifier.render_message("user@example.com", "https://example.com/rss", &entry());

        assert!(message.contains("Subject: Hello  Bcc: evil@example.com\r\n"));
        assert!(!message.contains("\r\nBcc:"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let notifier =
            SendmailNotifier::new("/nonexistent/feedmail-sendmail", "feeds@example.com");
        let result = notifier
            .notify("user@example.com", "https://example.com/rss", &entry())
            .await;
        assert!(matches!(result, Err(DeliveryError::Spawn { .. })));
    }
}

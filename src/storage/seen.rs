use async_trait::async_trait;

use super::schema::Database;
use super::types::{DatabaseError, SeenEntry};

/// Per-feed record of entry identifiers that have already been notified.
///
/// Identifiers are scoped to the feed: the same guid under two feeds is two
/// distinct records.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Whether `guid` has already been notified for `feed_url`.
    ///
    /// Never fails. Unknown feeds and unknown entries are both `false`.
    async fn has_seen(&self, feed_url: &str, guid: &str) -> bool;

    /// Record `guid` as notified for `feed_url`.
    ///
    /// Idempotent. The record is durable once this returns `Ok`.
    async fn mark_seen(&self, feed_url: &str, guid: &str) -> Result<(), DatabaseError>;
}

#[async_trait]
impl EntryStore for Database {
    async fn has_seen(&self, feed_url: &str, guid: &str) -> bool {
        let row: Result<Option<(i64,)>, sqlx::Error> =
            sqlx::query_as("SELECT 1 FROM seen_entries WHERE feed_url = ? AND guid = ?")
                .bind(feed_url)
                .bind(guid)
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(found) => found.is_some(),
            Err(e) => {
                // A false negative costs a duplicate mail, never a lost one
                tracing::warn!(feed = %feed_url, guid = %guid, error = %e, "Seen lookup failed, treating entry as unseen");
                false
            }
        }
    }

    async fn mark_seen(&self, feed_url: &str, guid: &str) -> Result<(), DatabaseError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO seen_entries (feed_url, guid, notified_at)
            VALUES (?, ?, ?)
            ON CONFLICT(feed_url, guid) DO NOTHING
        "#,
        )
        .bind(feed_url)
        .bind(guid)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;
        Ok(())
    }
}

impl Database {
    /// All entries recorded for a feed, in the order they were notified.
    pub async fn seen_for_feed(&self, feed_url: &str) -> Result<Vec<SeenEntry>, DatabaseError> {
        let rows = sqlx::query_as::<_, SeenEntry>(
            r#"
            SELECT feed_url, guid, notified_at
            FROM seen_entries
            WHERE feed_url = ?
            ORDER BY seq ASC
        "#,
        )
        .bind(feed_url)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

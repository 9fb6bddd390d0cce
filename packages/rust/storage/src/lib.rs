//! libSQL storage layer for publication records and cadence state.
//!
//! The [`Store`] struct wraps a local libSQL database holding the
//! publication ledger (one row per processed candidate URL) and the
//! single-row cadence state.
//!
//! **Access rules:**
//! - The publish cycle is the sole writer, via [`Store::open`].
//! - Reporting commands may use [`Store::open_readonly`].

mod legacy;
mod migrations;

use std::path::Path;

use coalwire_shared::{CadenceState, Category, CoalwireError, Platform, PublicationRecord, Result};
use libsql::{Connection, Database, params};

pub use legacy::{import_legacy_db, import_legacy_state};

/// Primary storage handle wrapping a libSQL database.
pub struct Store {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

/// Aggregate counts for the `stats` command.
#[derive(Debug, Clone, Default)]
pub struct PublicationStats {
    pub total: u64,
    pub channel_delivered: u64,
    pub docstore_delivered: u64,
    pub by_category: Vec<(String, u64)>,
}

impl Store {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CoalwireError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        let store = Self {
            db,
            conn,
            readonly: false,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    CoalwireError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CoalwireError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Publication ledger
    // -----------------------------------------------------------------------

    /// Whether a publication record exists for `url`. A record means the URL
    /// was attempted, regardless of per-platform outcome.
    pub async fn exists(&self, url: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query("SELECT 1 FROM publications WHERE url = ?1", params![url])
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(CoalwireError::Storage(e.to_string())),
        }
    }

    /// Insert a publication record. URLs are unique; re-inserting an existing
    /// URL updates the platform slots instead of duplicating the row.
    pub async fn insert_publication(&self, record: &PublicationRecord) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO publications (url, category, channel_message_id, doc_record_id, published_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(url) DO UPDATE SET
                   channel_message_id = COALESCE(excluded.channel_message_id, channel_message_id),
                   doc_record_id = COALESCE(excluded.doc_record_id, doc_record_id)",
                params![
                    record.url.as_str(),
                    record.category.as_str(),
                    record.channel_message_id.as_deref(),
                    record.doc_record_id.as_deref(),
                    record.published_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Fill one platform slot on an existing record. Supports slot-level
    /// retry: a later cycle can complete a platform that failed earlier
    /// without re-selecting the candidate.
    pub async fn set_platform_id(&self, url: &str, platform: Platform, id: &str) -> Result<()> {
        self.check_writable()?;
        let sql = match platform {
            Platform::Channel => "UPDATE publications SET channel_message_id = ?1 WHERE url = ?2",
            Platform::DocStore => "UPDATE publications SET doc_record_id = ?1 WHERE url = ?2",
        };
        let affected = self
            .conn
            .execute(sql, params![id, url])
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(CoalwireError::Storage(format!(
                "no publication record for {url}"
            )));
        }
        Ok(())
    }

    /// Fetch a publication record by URL.
    pub async fn get_publication(&self, url: &str) -> Result<Option<PublicationRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT url, category, channel_message_id, doc_record_id, published_at
                 FROM publications WHERE url = ?1",
                params![url],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_record(&row)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(CoalwireError::Storage(e.to_string())),
        }
    }

    /// Aggregate counts over the ledger.
    pub async fn publication_stats(&self) -> Result<PublicationStats> {
        let mut stats = PublicationStats::default();

        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*),
                        COUNT(channel_message_id),
                        COUNT(doc_record_id)
                 FROM publications",
                params![],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        if let Ok(Some(row)) = rows.next().await {
            stats.total = row.get::<u64>(0).unwrap_or(0);
            stats.channel_delivered = row.get::<u64>(1).unwrap_or(0);
            stats.docstore_delivered = row.get::<u64>(2).unwrap_or(0);
        }

        let mut rows = self
            .conn
            .query(
                "SELECT category, COUNT(*) FROM publications GROUP BY category ORDER BY COUNT(*) DESC",
                params![],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        while let Ok(Some(row)) = rows.next().await {
            let category: String = row
                .get(0)
                .map_err(|e| CoalwireError::Storage(e.to_string()))?;
            let count: u64 = row.get(1).unwrap_or(0);
            stats.by_category.push((category, count));
        }

        Ok(stats)
    }

    // -----------------------------------------------------------------------
    // Cadence state
    // -----------------------------------------------------------------------

    /// Load cadence state; a fresh database yields the default state.
    pub async fn load_cadence(&self) -> Result<CadenceState> {
        let mut rows = self
            .conn
            .query(
                "SELECT post_count, freight_topics, last_filler_at FROM cadence WHERE id = 1",
                params![],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let post_count: u64 = row
                    .get(0)
                    .map_err(|e| CoalwireError::Storage(e.to_string()))?;
                let topics_json: String = row
                    .get(1)
                    .map_err(|e| CoalwireError::Storage(e.to_string()))?;
                let freight_topics: Vec<String> = serde_json::from_str(&topics_json)
                    .map_err(|e| CoalwireError::Storage(format!("bad topic log: {e}")))?;
                Ok(CadenceState {
                    post_count,
                    freight_topics,
                    last_filler_at: row.get::<u64>(2).ok(),
                })
            }
            Ok(None) => Ok(CadenceState::default()),
            Err(e) => Err(CoalwireError::Storage(e.to_string())),
        }
    }

    /// Persist cadence state (upserts the single row).
    pub async fn save_cadence(&self, state: &CadenceState) -> Result<()> {
        self.check_writable()?;
        let topics_json = serde_json::to_string(&state.freight_topics)
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        self.conn
            .execute(
                "INSERT INTO cadence (id, post_count, freight_topics, last_filler_at)
                 VALUES (1, ?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET
                   post_count = excluded.post_count,
                   freight_topics = excluded.freight_topics,
                   last_filler_at = excluded.last_filler_at",
                params![
                    state.post_count,
                    topics_json.as_str(),
                    state.last_filler_at.map(|v| v as i64),
                ],
            )
            .await
            .map_err(|e| CoalwireError::Storage(e.to_string()))?;
        Ok(())
    }
}

/// Convert a database row to a [`PublicationRecord`].
fn row_to_record(row: &libsql::Row) -> Result<PublicationRecord> {
    let category: String = row
        .get(1)
        .map_err(|e| CoalwireError::Storage(e.to_string()))?;
    Ok(PublicationRecord {
        url: row
            .get::<String>(0)
            .map_err(|e| CoalwireError::Storage(e.to_string()))?,
        category: category.parse::<Category>().unwrap_or(Category::Markets),
        channel_message_id: row.get::<String>(2).ok(),
        doc_record_id: row.get::<String>(3).ok(),
        published_at: {
            let s: String = row
                .get(4)
                .map_err(|e| CoalwireError::Storage(e.to_string()))?;
            chrono::DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&chrono::Utc))
                .map_err(|e| CoalwireError::Storage(format!("invalid date: {e}")))?
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Create a temp file store for testing.
    async fn test_store() -> Store {
        let tmp = std::env::temp_dir().join(format!("cw_test_{}.db", Uuid::now_v7()));
        Store::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let store = test_store().await;
        assert_eq!(store.schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("cw_test_{}.db", Uuid::now_v7()));
        let s1 = Store::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Store::open(&tmp).await.expect("second open");
        assert_eq!(s2.schema_version().await, 1);
    }

    #[tokio::test]
    async fn record_lifecycle() {
        let store = test_store().await;
        let url = "https://example.org/coal-news";

        assert!(!store.exists(url).await.unwrap());

        let record = PublicationRecord::new(url, Category::Coal);
        store.insert_publication(&record).await.expect("insert");

        assert!(store.exists(url).await.unwrap());

        let found = store.get_publication(url).await.unwrap().expect("found");
        assert_eq!(found.url, url);
        assert_eq!(found.category, Category::Coal);
        assert!(found.channel_message_id.is_none());
        assert!(found.doc_record_id.is_none());
    }

    #[tokio::test]
    async fn set_platform_id_fills_exactly_one_slot() {
        let store = test_store().await;
        let url = "https://example.org/a";
        store
            .insert_publication(&PublicationRecord::new(url, Category::Energy))
            .await
            .unwrap();

        store
            .set_platform_id(url, Platform::Channel, "msg-42")
            .await
            .expect("set channel slot");

        let found = store.get_publication(url).await.unwrap().unwrap();
        assert_eq!(found.channel_message_id.as_deref(), Some("msg-42"));
        assert!(found.doc_record_id.is_none());
    }

    #[tokio::test]
    async fn set_platform_id_requires_existing_record() {
        let store = test_store().await;
        let result = store
            .set_platform_id("https://example.org/missing", Platform::DocStore, "x")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reinsert_merges_slots() {
        let store = test_store().await;
        let url = "https://example.org/b";

        let mut first = PublicationRecord::new(url, Category::Coal);
        first.channel_message_id = Some("msg-1".into());
        store.insert_publication(&first).await.unwrap();

        // A later attempt fills the docstore slot without erasing the channel slot
        let mut second = PublicationRecord::new(url, Category::Coal);
        second.doc_record_id = Some("rec-1".into());
        store.insert_publication(&second).await.unwrap();

        let found = store.get_publication(url).await.unwrap().unwrap();
        assert_eq!(found.channel_message_id.as_deref(), Some("msg-1"));
        assert_eq!(found.doc_record_id.as_deref(), Some("rec-1"));
    }

    #[tokio::test]
    async fn stats_counts_delivered_slots() {
        let store = test_store().await;

        let mut a = PublicationRecord::new("https://example.org/1", Category::Coal);
        a.channel_message_id = Some("m1".into());
        store.insert_publication(&a).await.unwrap();

        let mut b = PublicationRecord::new("https://example.org/2", Category::Coal);
        b.channel_message_id = Some("m2".into());
        b.doc_record_id = Some("r2".into());
        store.insert_publication(&b).await.unwrap();

        store
            .insert_publication(&PublicationRecord::new(
                "https://example.org/3",
                Category::Markets,
            ))
            .await
            .unwrap();

        let stats = store.publication_stats().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.channel_delivered, 2);
        assert_eq!(stats.docstore_delivered, 1);
        assert_eq!(stats.by_category[0].0, "Coal");
        assert_eq!(stats.by_category[0].1, 2);
    }

    #[tokio::test]
    async fn cadence_roundtrip() {
        let store = test_store().await;

        // Fresh db yields defaults
        let state = store.load_cadence().await.unwrap();
        assert_eq!(state.post_count, 0);
        assert!(state.freight_topics.is_empty());

        let mut state = CadenceState {
            post_count: 7,
            freight_topics: vec!["port congestion and queuing delays".into()],
            last_filler_at: Some(6),
        };
        store.save_cadence(&state).await.unwrap();

        let loaded = store.load_cadence().await.unwrap();
        assert_eq!(loaded, state);

        // Upsert overwrites
        state.post_count = 8;
        state.record_topic("weather-related port closures");
        store.save_cadence(&state).await.unwrap();
        let loaded = store.load_cadence().await.unwrap();
        assert_eq!(loaded.post_count, 8);
        assert_eq!(loaded.freight_topics.len(), 2);
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("cw_test_{}.db", Uuid::now_v7()));
        let rw = Store::open(&tmp).await.unwrap();
        rw.insert_publication(&PublicationRecord::new(
            "https://example.org/x",
            Category::Coal,
        ))
        .await
        .unwrap();
        drop(rw);

        let ro = Store::open_readonly(&tmp).await.unwrap();
        assert!(ro.exists("https://example.org/x").await.unwrap());
        let result = ro
            .insert_publication(&PublicationRecord::new(
                "https://example.org/y",
                Category::Coal,
            ))
            .await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}

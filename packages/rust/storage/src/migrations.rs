//! SQL migration definitions for the coalwire database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed within a transaction.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: publications, cadence",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version   INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One row per processed candidate. The row existing at all means the URL
-- was attempted; nullable platform slots record per-platform success.
CREATE TABLE IF NOT EXISTS publications (
    url                TEXT PRIMARY KEY,
    category           TEXT NOT NULL,
    channel_message_id TEXT,
    doc_record_id      TEXT,
    published_at       TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_publications_category ON publications(category);
CREATE INDEX IF NOT EXISTS idx_publications_published_at ON publications(published_at);

-- Single-row cadence state: post counter + recent filler topics (JSON array)
CREATE TABLE IF NOT EXISTS cadence (
    id             INTEGER PRIMARY KEY CHECK (id = 1),
    post_count     INTEGER NOT NULL,
    freight_topics TEXT NOT NULL,
    last_filler_at INTEGER
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}

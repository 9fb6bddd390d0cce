//! One-shot import of the legacy publication stores.
//!
//! The system this replaces tracked published URLs in two places at once: a
//! flat `state.json` file and a separate SQLite `published_news` table, with
//! dedup reads OR-ing both. Importing both into the `publications` table
//! preserves that union; the live system then reads a single store.
//!
//! Malformed legacy entries are logged and skipped, never fatal.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use coalwire_shared::{Category, CoalwireError, PublicationRecord, Result};
use libsql::params;
use serde::Deserialize;

use crate::Store;

/// Shape of the legacy `state.json` file.
#[derive(Debug, Deserialize)]
struct LegacyState {
    #[serde(default)]
    published_urls: Vec<String>,
    #[serde(default)]
    published_news: Vec<LegacyEntry>,
}

#[derive(Debug, Deserialize)]
struct LegacyEntry {
    url: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

/// Import a legacy `state.json` into the publication ledger.
/// Returns the number of newly imported URLs.
pub async fn import_legacy_state(store: &Store, path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path).map_err(|e| CoalwireError::io(path, e))?;
    let state: LegacyState = serde_json::from_str(&content)
        .map_err(|e| CoalwireError::parse(format!("invalid legacy state file: {e}")))?;

    let mut imported = 0;

    for entry in &state.published_news {
        if entry.url.is_empty() {
            tracing::warn!("skipping legacy entry with empty url");
            continue;
        }
        if store.exists(&entry.url).await? {
            continue;
        }
        let mut record = PublicationRecord::new(
            &entry.url,
            entry
                .category
                .as_deref()
                .and_then(|c| c.parse::<Category>().ok())
                .unwrap_or(Category::Markets),
        );
        if let Some(ts) = entry.published_at.as_deref() {
            if let Some(parsed) = parse_legacy_timestamp(ts) {
                record.published_at = parsed;
            } else {
                tracing::warn!(url = %entry.url, ts, "unparseable legacy timestamp, using now");
            }
        }
        store.insert_publication(&record).await?;
        imported += 1;
    }

    // Bare URLs without a structured entry still count as published.
    for url in &state.published_urls {
        if url.is_empty() || store.exists(url).await? {
            continue;
        }
        store
            .insert_publication(&PublicationRecord::new(url, Category::Markets))
            .await?;
        imported += 1;
    }

    tracing::info!(imported, path = %path.display(), "legacy state import complete");
    Ok(imported)
}

/// Import a legacy SQLite `published_news` database into the ledger.
/// Returns the number of newly imported URLs.
pub async fn import_legacy_db(store: &Store, path: &Path) -> Result<u64> {
    let db = libsql::Builder::new_local(path)
        .build()
        .await
        .map_err(|e| CoalwireError::Storage(e.to_string()))?;
    let conn = db
        .connect()
        .map_err(|e| CoalwireError::Storage(e.to_string()))?;

    let mut rows = conn
        .query(
            "SELECT news_url, category, tg_message_id, published_at FROM published_news",
            params![],
        )
        .await
        .map_err(|e| CoalwireError::Storage(format!("legacy db read failed: {e}")))?;

    let mut imported = 0;

    while let Ok(Some(row)) = rows.next().await {
        let url: String = match row.get(0) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed legacy row");
                continue;
            }
        };
        if url.is_empty() || store.exists(&url).await? {
            continue;
        }

        let category: Option<String> = row.get(1).ok();
        let mut record = PublicationRecord::new(
            &url,
            category
                .as_deref()
                .and_then(|c| c.parse::<Category>().ok())
                .unwrap_or(Category::Markets),
        );
        record.channel_message_id = row.get::<String>(2).ok();
        if let Ok(ts) = row.get::<String>(3) {
            if let Some(parsed) = parse_legacy_timestamp(&ts) {
                record.published_at = parsed;
            }
        }

        store.insert_publication(&record).await?;
        imported += 1;
    }

    tracing::info!(imported, path = %path.display(), "legacy db import complete");
    Ok(imported)
}

/// Legacy timestamps appear as RFC 3339 or as SQLite `YYYY-MM-DD HH:MM:SS`.
fn parse_legacy_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

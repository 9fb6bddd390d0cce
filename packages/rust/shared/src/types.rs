//! Core domain types for the coalwire publication pipeline.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Candidate
// ---------------------------------------------------------------------------

/// A discovered, not-yet-published news item.
///
/// Immutable once scored: scoring reads `title`/`summary`/`source_url` and
/// never mutates them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Exact headline from the source.
    pub title: String,
    /// Source content, expected to carry concrete figures.
    pub summary: String,
    /// Source outlet name (e.g. "Reuters").
    #[serde(default)]
    pub source_name: String,
    /// Stable external identifier. May be empty for non-URL items.
    #[serde(default)]
    pub source_url: String,
    /// Publication date as reported by the source, when known.
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    /// When the discovery service returned this item.
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

impl Candidate {
    /// Lowercased title + summary, the text most checks run against.
    pub fn text_lower(&self) -> String {
        let mut text = String::with_capacity(self.title.len() + self.summary.len() + 1);
        text.push_str(&self.title.to_lowercase());
        text.push(' ');
        text.push_str(&self.summary.to_lowercase());
        text
    }
}

// ---------------------------------------------------------------------------
// Category
// ---------------------------------------------------------------------------

/// Editorial category assigned to a published item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Coal,
    Energy,
    Logistics,
    Steel,
    Markets,
    /// Cadence-triggered filler content about freight logistics.
    Freight,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coal => "Coal",
            Category::Energy => "Energy",
            Category::Logistics => "Logistics",
            Category::Steel => "Steel",
            Category::Markets => "Markets",
            Category::Freight => "Freight",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ();

    /// Case-insensitive; unknown labels map to `Markets`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "coal" => Category::Coal,
            "energy" => Category::Energy,
            "logistics" => Category::Logistics,
            "steel" => Category::Steel,
            "freight" => Category::Freight,
            _ => Category::Markets,
        })
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// A publishing surface with its own result slot in [`PublicationRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// The messaging channel (Telegram-style bot API).
    Channel,
    /// The document-store-of-truth (Notion-style API).
    DocStore,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Channel => "channel",
            Platform::DocStore => "docstore",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PublicationRecord
// ---------------------------------------------------------------------------

/// Durable proof that a candidate was processed.
///
/// The record existing at all is proof-of-attempt, not proof-of-success:
/// a URL with a record is never re-offered by the selector, even when every
/// platform slot is empty. Failed slots are retried per-slot, never by
/// re-selecting the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationRecord {
    /// Unique key.
    pub url: String,
    pub category: Category,
    pub published_at: DateTime<Utc>,
    /// Message id returned by the channel; `None` = not attempted/failed.
    pub channel_message_id: Option<String>,
    /// Record id returned by the document store; `None` = not attempted/failed.
    pub doc_record_id: Option<String>,
}

impl PublicationRecord {
    pub fn new(url: impl Into<String>, category: Category) -> Self {
        Self {
            url: url.into(),
            category,
            published_at: Utc::now(),
            channel_message_id: None,
            doc_record_id: None,
        }
    }

    /// The slot for `platform`, if filled.
    pub fn platform_id(&self, platform: Platform) -> Option<&str> {
        match platform {
            Platform::Channel => self.channel_message_id.as_deref(),
            Platform::DocStore => self.doc_record_id.as_deref(),
        }
    }
}

// ---------------------------------------------------------------------------
// CadenceState
// ---------------------------------------------------------------------------

/// Bound on the filler-topic history window.
pub const FREIGHT_TOPIC_LOG_CAP: usize = 20;

/// Counter and topic log governing filler-item cadence.
///
/// Loaded at cycle start, persisted at cycle end — never ambient global state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CadenceState {
    /// Monotonic count of successfully published *regular* items.
    /// Filler cycles never increment it.
    pub post_count: u64,
    /// Recent filler topics, oldest first, capped at [`FREIGHT_TOPIC_LOG_CAP`].
    #[serde(default)]
    pub freight_topics: Vec<String>,
    /// Counter value at which the last filler was emitted. Since filler
    /// cycles leave `post_count` untouched, this marker is what stops the
    /// same multiple from firing filler on every subsequent cycle.
    #[serde(default)]
    pub last_filler_at: Option<u64>,
}

impl CadenceState {
    /// Append a filler topic, evicting the oldest entry beyond the cap.
    /// A topic already in the window is not duplicated.
    pub fn record_topic(&mut self, topic: impl Into<String>) {
        let topic = topic.into();
        if self.freight_topics.contains(&topic) {
            return;
        }
        self.freight_topics.push(topic);
        while self.freight_topics.len() > FREIGHT_TOPIC_LOG_CAP {
            self.freight_topics.remove(0);
        }
    }
}

// ---------------------------------------------------------------------------
// PostVersions
// ---------------------------------------------------------------------------

/// Platform-specific renderings of one item, produced by the content generator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostVersions {
    /// Channel version: short, HTML-tagged, fits the caption budget.
    pub channel_version: String,
    /// Web version: full HTML article body for the document store.
    pub web_version: String,
}

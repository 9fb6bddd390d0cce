//! Publication pipeline: validation gates, per-platform delivery, and
//! outcome accounting.
//!
//! Delivery is sequential (channel first, then the document store) and each
//! platform retries independently. The item counts as published when at
//! least one platform accepted it; per-platform failures are recorded so a
//! later cycle can fill the missing slot.

pub mod blocks;
pub mod channel;
pub mod chunk;
pub mod docstore;
pub mod retry;
pub mod validate;

use chrono::Utc;
use coalwire_shared::{Category, Platform, Result, ScoringConfig, slugify};
use reqwest::Client;
use tracing::{info, instrument, warn};

pub use blocks::{Block, Span, html_to_blocks};
pub use channel::ChannelClient;
pub use docstore::{ArticleFields, DocRecord, DocStoreClient, article_blocks};
pub use retry::{DEFAULT_MAX_ATTEMPTS, with_backoff};

/// One item ready for publication.
#[derive(Debug, Clone)]
pub struct PublishItem {
    pub title: String,
    pub summary: String,
    pub category: Category,
    pub source_name: String,
    /// Absent for filler posts, which have no external source to verify.
    pub source_url: Option<String>,
    /// Channel-formatted text (limited HTML, hashtags appended).
    pub channel_text: String,
    /// Web-formatted article HTML.
    pub web_html: String,
}

/// Delivery result for one platform.
#[derive(Debug, Clone)]
pub struct PlatformOutcome {
    pub platform: Platform,
    pub attempted: bool,
    pub external_id: Option<String>,
    pub error: Option<String>,
}

impl PlatformOutcome {
    pub fn delivered(&self) -> bool {
        self.external_id.is_some()
    }
}

/// Result of one publication attempt.
#[derive(Debug, Clone)]
pub enum PublishOutcome {
    /// A validation gate failed; nothing was sent anywhere.
    Rejected { reason: String },
    /// Delivery ran; per-platform outcomes inside.
    Delivered { outcomes: Vec<PlatformOutcome> },
}

impl PublishOutcome {
    /// Published means at least one platform accepted the item.
    pub fn overall_success(&self) -> bool {
        match self {
            PublishOutcome::Rejected { .. } => false,
            PublishOutcome::Delivered { outcomes } => outcomes.iter().any(PlatformOutcome::delivered),
        }
    }

    pub fn outcome_for(&self, platform: Platform) -> Option<&PlatformOutcome> {
        match self {
            PublishOutcome::Rejected { .. } => None,
            PublishOutcome::Delivered { outcomes } => {
                outcomes.iter().find(|o| o.platform == platform)
            }
        }
    }
}

/// Drives one item through gates and platform delivery.
pub struct Orchestrator {
    channel: ChannelClient,
    docstore: DocStoreClient,
    head: Client,
    scoring: ScoringConfig,
    max_attempts: u32,
}

impl Orchestrator {
    pub fn new(
        channel: ChannelClient,
        docstore: DocStoreClient,
        scoring: ScoringConfig,
    ) -> Result<Self> {
        Ok(Self {
            channel,
            docstore,
            head: validate::head_client()?,
            scoring,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Publish one item: gates, then channel, then the document store.
    #[instrument(skip_all, fields(title = %item.title))]
    pub async fn publish(&self, item: &PublishItem) -> Result<PublishOutcome> {
        // Gates are terminal: no partial delivery on a rejected item
        if let Some(url) = &item.source_url {
            if let Err(e) = validate::head_check(&self.head, url).await {
                warn!(error = %e, "source check failed, rejecting");
                return Ok(PublishOutcome::Rejected {
                    reason: e.to_string(),
                });
            }
        }
        let gate_text = format!("{} {}", item.title, item.channel_text);
        if let Err(e) = validate::relevance_check(&gate_text, &self.scoring) {
            warn!(error = %e, "relevance check failed, rejecting");
            return Ok(PublishOutcome::Rejected {
                reason: e.to_string(),
            });
        }

        let mut outcomes = Vec::with_capacity(2);
        outcomes.push(self.deliver_channel(item).await);
        outcomes.push(self.deliver_docstore(item).await);

        let delivered: Vec<&str> = outcomes
            .iter()
            .filter(|o| o.delivered())
            .map(|o| o.platform.as_str())
            .collect();
        info!(platforms = ?delivered, "delivery finished");

        Ok(PublishOutcome::Delivered { outcomes })
    }

    async fn deliver_channel(&self, item: &PublishItem) -> PlatformOutcome {
        let result = with_backoff(self.max_attempts, "channel send", || {
            self.channel.send_message(&item.channel_text)
        })
        .await;
        platform_outcome(Platform::Channel, result)
    }

    async fn deliver_docstore(&self, item: &PublishItem) -> PlatformOutcome {
        let fields = ArticleFields {
            title: item.title.clone(),
            slug: slugify(&item.title),
            category: item.category,
            source_name: item.source_name.clone(),
            source_url: item.source_url.clone(),
            published_date: Utc::now().date_naive(),
        };
        let blocks = article_blocks(&fields, &item.summary, &item.web_html, &item.channel_text);
        let result = with_backoff(self.max_attempts, "docstore create", || {
            self.docstore.create_record(&fields, &blocks)
        })
        .await;
        platform_outcome(Platform::DocStore, result)
    }

    /// Send a publication summary to the admin chat. Failures are logged
    /// inside the channel client and never escalate.
    pub async fn notify_admin(&self, text: &str) {
        self.channel.notify_admin(text).await;
    }
}

fn platform_outcome(platform: Platform, result: Result<String>) -> PlatformOutcome {
    match result {
        Ok(id) => PlatformOutcome {
            platform,
            attempted: true,
            external_id: Some(id),
            error: None,
        },
        Err(e) => PlatformOutcome {
            platform,
            attempted: true,
            external_id: None,
            error: Some(e.to_string()),
        },
    }
}

/// Human-readable cycle summary for the admin chat.
pub fn format_status_summary(title: &str, outcome: &PublishOutcome) -> String {
    match outcome {
        PublishOutcome::Rejected { reason } => {
            format!("❌ Rejected: {title}\nReason: {reason}")
        }
        PublishOutcome::Delivered { outcomes } => {
            let mut lines = vec![if outcome.overall_success() {
                format!("✅ Published: {title}")
            } else {
                format!("❌ Failed: {title}")
            }];
            for o in outcomes {
                lines.push(match (&o.external_id, &o.error) {
                    (Some(id), _) => format!("  {} → {id}", o.platform.as_str()),
                    (None, Some(e)) => format!("  {} ✗ {e}", o.platform.as_str()),
                    (None, None) => format!("  {} ✗", o.platform.as_str()),
                });
            }
            lines.join("\n")
        }
    }
}

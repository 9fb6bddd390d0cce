//! Candidate discovery and content generation.
//!
//! The pipeline talks to its generative collaborators through the
//! [`DiscoverySource`] and [`ContentGenerator`] traits; [`SearchClient`] is
//! the HTTP implementation of both. Keeping the traits here lets the cycle
//! logic be tested with in-memory stubs.

mod content;
mod parser;
mod search;

use async_trait::async_trait;
use coalwire_shared::{Candidate, PostVersions, Result};

pub use content::{append_hashtags, extract_category, hashtags_for};
pub use parser::{extract_json, is_fake_url, parse_news_envelope, parse_post_versions};
pub use search::SearchClient;

/// Produces raw candidates for one cycle.
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    async fn discover(&self) -> Result<Vec<Candidate>>;
}

/// Renders platform-specific post versions.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Render the channel and web versions of a news item.
    async fn render_news(&self, candidate: &Candidate) -> Result<PostVersions>;

    /// Render an evergreen freight-logistics filler post on `topic`.
    async fn render_filler(&self, topic: &str) -> Result<PostVersions>;
}

//! HTTP client for the generative-search endpoint.
//!
//! One client serves both roles: discovering candidate news items and
//! rendering the platform-specific post versions. Both are chat-completions
//! calls that differ only in prompt and response shape.

use std::time::Duration;

use async_trait::async_trait;
use coalwire_shared::{Candidate, CoalwireError, PostVersions, Result, SearchConfig};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::parser;
use crate::{ContentGenerator, DiscoverySource};

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("coalwire/", env!("CARGO_PKG_VERSION"));

/// Client for a chat-completions-style search/generation API.
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

impl SearchClient {
    /// Build a client from config plus the resolved API key.
    pub fn new(config: &SearchConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoalwireError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries.max(1),
        })
    }

    /// One chat-completions call, returning the raw assistant text.
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| CoalwireError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoalwireError::Network(format!("{url}: HTTP {status}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CoalwireError::parse(format!("invalid completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CoalwireError::parse("completion response has no choices"))
    }

    /// Retry `complete` with exponential backoff on transient failures.
    /// Parse errors are retried too: a malformed response usually means the
    /// model rambled, and a fresh call tends to fix it.
    async fn complete_with_retry(&self, system: &str, user: &str) -> Result<String> {
        let mut last_err = None;
        for attempt in 0..self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1));
                tokio::time::sleep(delay).await;
            }
            match self.complete(system, user).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    warn!(attempt = attempt + 1, max = self.max_retries, error = %e, "search call failed");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| CoalwireError::Network("search retries exhausted".into())))
    }
}

#[async_trait]
impl DiscoverySource for SearchClient {
    #[instrument(skip_all)]
    async fn discover(&self) -> Result<Vec<Candidate>> {
        let system = "You are a commodities news researcher covering the global coal market. \
             Respond with strict JSON only: {\"news\": [{\"title\", \"summary\", \
             \"source_name\", \"source_url\", \"publication_date\"}]}. \
             Summaries must carry concrete figures (prices, volumes, percentages, dates). \
             Never invent items or URLs; return an empty array over vague or fabricated news.";
        let user = "Find today's most significant coal market news: prices, exports, imports, \
             production, freight, and policy. publication_date format: YYYY-MM-DD.";

        let text = self.complete_with_retry(system, user).await?;
        let candidates = parser::parse_news_envelope(&text)?;
        tracing::info!(count = candidates.len(), "discovery complete");
        Ok(candidates)
    }
}

#[async_trait]
impl ContentGenerator for SearchClient {
    #[instrument(skip_all, fields(title = %candidate.title))]
    async fn render_news(&self, candidate: &Candidate) -> Result<PostVersions> {
        let system = "You are a commodities market analyst. Produce two renderings of one \
             news item as strict JSON: {\"channel_version\", \"web_version\"}. \
             channel_version: short, HTML tags <b>/<i>/<a> only, category tag like \
             [COAL] in the headline, under 1024 characters. \
             web_version: full HTML article with <h1>/<h2>/<p>/<ul>/<li>.";
        let user = format!(
            "Title: {}\nSummary: {}\nSource: {} ({})",
            candidate.title, candidate.summary, candidate.source_name, candidate.source_url
        );

        let text = self.complete_with_retry(system, &user).await?;
        parser::parse_post_versions(&text)
    }

    #[instrument(skip_all, fields(topic))]
    async fn render_filler(&self, topic: &str) -> Result<PostVersions> {
        let system = "You are a commodities market analyst writing evergreen analysis of \
             freight logistics challenges in bulk trading. No invented figures or events; \
             describe real, general industry problems. Respond with strict JSON: \
             {\"channel_version\", \"web_version\"}. channel_version under 1024 characters \
             with a [FREIGHT] tag; web_version as a full HTML article.";
        let user = format!("Write an analytical post focused on: {topic}");

        let text = self.complete_with_retry(system, &user).await?;
        parser::parse_post_versions(&text)
    }
}

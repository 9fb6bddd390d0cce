//! Upstream validation gates.
//!
//! Both gates are terminal: a candidate that fails here is rejected without
//! retry and no publication record is written. Platform-delivery failures
//! are a separate, retryable class.

use std::time::Duration;

use coalwire_shared::{CoalwireError, Result, ScoringConfig};
use reqwest::Client;

/// Redirect budget for reachability probes.
const MAX_REDIRECTS: usize = 5;

/// Timeout for reachability probes.
const HEAD_TIMEOUT_SECS: u64 = 15;

/// Build the client used for reachability probes. Redirects are followed;
/// a URL that redirects to a live page is reachable.
pub fn head_client() -> Result<Client> {
    Client::builder()
        .user_agent(concat!("coalwire/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .timeout(Duration::from_secs(HEAD_TIMEOUT_SECS))
        .build()
        .map_err(|e| CoalwireError::Network(format!("failed to build HTTP client: {e}")))
}

/// Probe a source URL with a HEAD request.
///
/// Any 4xx/5xx status or transport error is a terminal rejection: a dead
/// source link must not be republished.
pub async fn head_check(client: &Client, url: &str) -> Result<()> {
    let response = client
        .head(url)
        .send()
        .await
        .map_err(|e| CoalwireError::validation(format!("source unreachable: {url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CoalwireError::validation(format!(
            "source unreachable: {url}: HTTP {status}"
        )));
    }
    Ok(())
}

/// Re-check domain relevance just before publication.
///
/// The scorer already validated the candidate, but generation happens in
/// between; this guards against publishing an item whose text drifted off
/// topic.
pub fn relevance_check(text: &str, cfg: &ScoringConfig) -> Result<()> {
    let lower = text.to_lowercase();
    let has_domain = cfg
        .domain_keywords
        .iter()
        .any(|k| lower.contains(k.as_str()));
    let has_irrelevant = cfg
        .irrelevant_markers
        .iter()
        .any(|k| lower.contains(k.as_str()));

    if has_irrelevant && !has_domain {
        return Err(CoalwireError::validation(
            "item is off-topic for the coal desk",
        ));
    }
    if !has_domain {
        return Err(CoalwireError::validation("item has no domain keyword"));
    }
    Ok(())
}

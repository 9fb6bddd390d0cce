//! Parsing of generative-search responses.
//!
//! The search model is asked for a strict-JSON envelope, but real responses
//! arrive wrapped in markdown code fences, prefixed with prose, or both.
//! These helpers locate and decode the JSON, then drop entries the model
//! plainly invented (placeholder or non-http URLs).

use chrono::{NaiveDate, Utc};
use coalwire_shared::{Candidate, CoalwireError, PostVersions, Result};
use serde::Deserialize;

/// URL fragments that mark a fabricated source.
const FAKE_URL_PATTERNS: &[&str] = &[
    "example.com",
    "test.com",
    "localhost",
    "127.0.0.1",
    "placeholder",
    "dummy",
    "fake",
    "mock",
    "none",
    "null",
];

/// Raw news entry as the model emits it.
#[derive(Debug, Deserialize)]
struct RawNewsItem {
    title: String,
    summary: String,
    #[serde(default)]
    source_name: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    publication_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsEnvelope {
    #[serde(default)]
    news: Vec<RawNewsItem>,
}

/// Strip markdown code fences and locate the embedded JSON object.
///
/// Accepts ```json ... ```, bare ``` fences, or prose around a top-level
/// `{...}`. Returns the candidate JSON slice.
pub fn extract_json(text: &str) -> Result<&str> {
    let mut s = text.trim();

    if let Some(rest) = s.strip_prefix("```json") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s = s.trim();

    // Fall back to the outermost brace pair when prose surrounds the object
    if !s.starts_with('{') {
        let start = s
            .find('{')
            .ok_or_else(|| CoalwireError::parse("no JSON object in response"))?;
        let end = s
            .rfind('}')
            .ok_or_else(|| CoalwireError::parse("unterminated JSON object in response"))?;
        if end < start {
            return Err(CoalwireError::parse("malformed JSON object in response"));
        }
        s = &s[start..=end];
    }

    Ok(s)
}

/// Whether a source URL looks fabricated or unusable.
pub fn is_fake_url(url: &str, source_name: &str) -> bool {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return true;
    }
    let url_lower = url.to_lowercase();
    let source_lower = source_name.to_lowercase();
    FAKE_URL_PATTERNS
        .iter()
        .any(|p| url_lower.contains(p) || source_lower.contains(p))
}

/// Parse a `{"news": [...]}` envelope into candidates.
///
/// Entries with fabricated URLs are dropped with a warning; an entirely
/// empty result is valid (the model found nothing worth reporting).
pub fn parse_news_envelope(text: &str) -> Result<Vec<Candidate>> {
    let json = extract_json(text)?;
    let envelope: NewsEnvelope = serde_json::from_str(json)
        .map_err(|e| CoalwireError::parse(format!("invalid news envelope: {e}")))?;

    let now = Utc::now();
    let mut candidates = Vec::with_capacity(envelope.news.len());

    for raw in envelope.news {
        if is_fake_url(&raw.source_url, &raw.source_name) {
            tracing::warn!(title = %raw.title, url = %raw.source_url, "dropping entry with fabricated url");
            continue;
        }
        candidates.push(Candidate {
            title: raw.title,
            summary: raw.summary,
            source_name: raw.source_name,
            source_url: raw.source_url,
            publication_date: raw
                .publication_date
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            discovered_at: now,
        });
    }

    Ok(candidates)
}

/// Parse a `{"channel_version": ..., "web_version": ...}` response.
pub fn parse_post_versions(text: &str) -> Result<PostVersions> {
    let json = extract_json(text)?;

    #[derive(Deserialize)]
    struct RawVersions {
        channel_version: String,
        web_version: String,
    }

    let raw: RawVersions = serde_json::from_str(json)
        .map_err(|e| CoalwireError::parse(format!("invalid post versions: {e}")))?;

    if raw.channel_version.trim().is_empty() || raw.web_version.trim().is_empty() {
        return Err(CoalwireError::parse("empty post version in response"));
    }

    Ok(PostVersions {
        channel_version: raw.channel_version,
        web_version: raw.web_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_plain_json() {
        assert_eq!(extract_json(r#"{"news": []}"#).unwrap(), r#"{"news": []}"#);
    }

    #[test]
    fn extract_fenced_json() {
        let fenced = "```json\n{\"news\": []}\n```";
        assert_eq!(extract_json(fenced).unwrap(), r#"{"news": []}"#);

        let bare = "```\n{\"news\": []}\n```";
        assert_eq!(extract_json(bare).unwrap(), r#"{"news": []}"#);
    }

    #[test]
    fn extract_json_surrounded_by_prose() {
        let text = "Here is the result you asked for:\n{\"news\": []}\nHope that helps!";
        assert_eq!(extract_json(text).unwrap(), r#"{"news": []}"#);
    }

    #[test]
    fn extract_json_without_object_fails() {
        assert!(extract_json("no json here at all").is_err());
    }

    #[test]
    fn fake_url_detection() {
        assert!(is_fake_url("https://example.com/news/1", "Reuters"));
        assert!(is_fake_url("https://reuters.com/x", "Placeholder News"));
        assert!(is_fake_url("ftp://reuters.com/x", "Reuters"));
        assert!(is_fake_url("", "Reuters"));
        assert!(!is_fake_url("https://reuters.com/markets/coal", "Reuters"));
    }

    #[test]
    fn envelope_filters_fake_entries() {
        let text = r#"```json
{
  "news": [
    {"title": "Real", "summary": "Coal exports rose 12%.", "source_name": "Reuters",
     "source_url": "https://reuters.com/a", "publication_date": "2025-03-04"},
    {"title": "Invented", "summary": "Something happened.", "source_name": "News",
     "source_url": "https://example.com/b"}
  ]
}
```"#;
        let candidates = parse_news_envelope(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Real");
        assert_eq!(
            candidates[0].publication_date,
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
    }

    #[test]
    fn envelope_tolerates_bad_dates() {
        let text = r#"{"news": [{"title": "T", "summary": "S", "source_url": "https://reuters.com/a", "publication_date": "yesterday"}]}"#;
        let candidates = parse_news_envelope(text).unwrap();
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].publication_date.is_none());
    }

    #[test]
    fn empty_envelope_is_valid() {
        assert!(parse_news_envelope(r#"{"news": []}"#).unwrap().is_empty());
        assert!(parse_news_envelope(r#"{}"#).unwrap().is_empty());
    }

    #[test]
    fn post_versions_roundtrip() {
        let text = r#"{"channel_version": "<b>Coal</b> up", "web_version": "<h1>Coal</h1>"}"#;
        let versions = parse_post_versions(text).unwrap();
        assert_eq!(versions.channel_version, "<b>Coal</b> up");
        assert_eq!(versions.web_version, "<h1>Coal</h1>");
    }

    #[test]
    fn empty_post_version_rejected() {
        let text = r#"{"channel_version": "", "web_version": "<h1>x</h1>"}"#;
        assert!(parse_post_versions(text).is_err());
    }
}

//! Candidate scoring and selection.
//!
//! [`score`] is a pure function: for a fixed candidate, config, and date it
//! always returns the same verdict. All weights and keyword lists come from
//! [`ScoringConfig`] so operators can tune them without a rebuild.

use std::sync::LazyLock;

use chrono::NaiveDate;
use coalwire_shared::{Candidate, ScoringConfig};
use regex::Regex;

static NUMERAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// Validity verdict plus numeric priority for one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// Whether the candidate may be published at all.
    pub valid: bool,
    /// Weighted-sum priority. Computed even for invalid candidates so the
    /// rejection can be logged with context.
    pub priority: i64,
}

/// Score one candidate against the configured weights.
///
/// Validity requires, over the lowercased title + summary:
/// - combined length at or above the configured minimum;
/// - at least one domain keyword;
/// - no irrelevant marker without a domain keyword alongside it;
/// - at least one numeral, or fewer than two vague phrases. An item carrying
///   only vague language and zero numbers is generic or invented content.
pub fn score(candidate: &Candidate, cfg: &ScoringConfig, today: NaiveDate) -> Score {
    let text = candidate.text_lower();

    let numeral_count = NUMERAL_RE.find_iter(&text).count();

    let has_domain = cfg.domain_keywords.iter().any(|k| text.contains(k.as_str()));
    let has_irrelevant = cfg
        .irrelevant_markers
        .iter()
        .any(|k| text.contains(k.as_str()));
    let vague_count = cfg
        .vague_phrases
        .iter()
        .filter(|p| text.contains(p.as_str()))
        .count();

    let valid = text.len() >= cfg.min_summary_len
        && has_domain
        && !(has_irrelevant && !has_domain)
        && (numeral_count > 0 || vague_count < 2);

    // All factors are computed and summed; there is no short-circuit.
    let mut priority: i64 = 0;

    // 1. Recency
    match candidate.publication_date {
        Some(date) if date == today => priority += cfg.recency_same_day,
        Some(_) => priority += cfg.recency_dated,
        None => {}
    }

    // 2. Keyword density: each distinct keyword counts once
    let keyword_hits = cfg
        .priority_keywords
        .iter()
        .filter(|k| text.contains(k.as_str()))
        .count() as i64;
    priority += keyword_hits * cfg.keyword_weight;

    // 3. Outlook/forecast language
    if cfg
        .outlook_keywords
        .iter()
        .any(|k| text.contains(k.as_str()))
    {
        priority += cfg.outlook_bonus;
    }

    // 4. Source quality (matched on outlet name or URL, never body text)
    let source_name = candidate.source_name.to_lowercase();
    let source_url = candidate.source_url.to_lowercase();
    if cfg
        .premium_sources
        .iter()
        .any(|p| source_name.contains(p.as_str()) || source_url.contains(p.as_str()))
    {
        priority += cfg.premium_bonus;
    }

    // 5. Has a source URL
    if !candidate.source_url.is_empty() {
        priority += cfg.url_bonus;
    }

    // 6. Summary length within the target band
    let summary_len = candidate.summary.len();
    if (cfg.length_band_min..=cfg.length_band_max).contains(&summary_len) {
        priority += ((summary_len / 10) as i64).min(cfg.length_bonus_cap);
    }

    // 7. Numeral richness
    if numeral_count > 0 {
        priority += (numeral_count as i64 * cfg.numeral_weight).min(cfg.numeral_bonus_cap);
    }

    // 8. Vagueness penalty
    if vague_count >= 2 && numeral_count == 0 {
        priority -= cfg.vague_penalty;
    }

    Score { valid, priority }
}

/// Pick the strictly-highest-priority valid candidate.
///
/// Returns the index into `candidates`. Exact priority ties go to the
/// earlier candidate in the batch: the comparison is strict, so a later
/// equal score never displaces an earlier one. This keeps selection
/// deterministic for a fixed input order.
pub fn select_best(
    candidates: &[Candidate],
    cfg: &ScoringConfig,
    today: NaiveDate,
) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;

    for (idx, candidate) in candidates.iter().enumerate() {
        let verdict = score(candidate, cfg, today);
        if !verdict.valid {
            tracing::debug!(
                title = %candidate.title,
                priority = verdict.priority,
                "candidate rejected as invalid"
            );
            continue;
        }
        match best {
            Some((_, best_priority)) if verdict.priority <= best_priority => {}
            _ => best = Some((idx, verdict.priority)),
        }
    }

    if let Some((idx, priority)) = best {
        tracing::info!(
            title = %candidates[idx].title,
            priority,
            considered = candidates.len(),
            "selected best candidate"
        );
    }
    best.map(|(idx, _)| idx)
}

//! Reconciliation: rebuild the static site corpus from the document store.
//!
//! The document store is the system of record; the site repo is a derived
//! view. Reconciliation pulls published records, renders each one to a
//! static page, regenerates the derived artifacts (index, sitemap, feed),
//! and optionally pushes the result.

pub mod artifacts;
pub mod render;
pub mod site;

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use coalwire_publish::{Block, DocStoreClient, blocks::spans_text};
use coalwire_shared::{Result, slugify};
use tracing::{info, instrument, warn};

use render::ArticleView;
pub use site::SitePublisher;

/// Description length on index cards and in the feed.
const DESCRIPTION_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Trailing window in days; `None` rebuilds the full corpus.
    pub window_days: Option<u32>,
    /// Absolute site URL without trailing slash.
    pub base_url: String,
    /// Repo-relative directory for article pages.
    pub out_dir: String,
}

/// One file to write into the site repo, path repo-relative.
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Date-window membership with one day of slack on both ends, so records
/// stamped in a neighboring timezone's "today" are never dropped.
pub fn in_window(date: NaiveDate, today: NaiveDate, window_days: u32) -> bool {
    let earliest = today - chrono::Duration::days(i64::from(window_days) + 1);
    let latest = today + chrono::Duration::days(1);
    date >= earliest && date <= latest
}

/// Assign a collision-free slug, appending `-2`, `-3`, ... when taken.
fn unique_slug(base: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2u32;
    loop {
        let candidate = format!("{base}-{n}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

fn derive_description(title: &str, blocks: &[Block]) -> String {
    let text = blocks
        .iter()
        .find_map(|block| match block {
            Block::Paragraph(spans) if !spans.is_empty() => Some(spans_text(spans)),
            _ => None,
        })
        .unwrap_or_else(|| title.to_string());
    text.chars().take(DESCRIPTION_LIMIT).collect()
}

/// Rebuild the generated file set from published records.
///
/// A record that cannot be fetched or rendered is logged and skipped; one
/// bad record never aborts the run.
#[instrument(skip_all, fields(window_days = ?options.window_days))]
pub async fn reconcile(
    docstore: &DocStoreClient,
    options: &ReconcileOptions,
) -> Result<Vec<GeneratedFile>> {
    let now = Utc::now();
    let today = now.date_naive();

    let mut records = docstore.query_published().await?;
    records.retain(|record| match record.published_date {
        Some(date) => options
            .window_days
            .is_none_or(|days| in_window(date, today, days)),
        None => {
            warn!(record_id = %record.id, "record has no published date, skipping");
            false
        }
    });
    // Newest first drives index and feed ordering
    records.sort_by(|a, b| b.published_date.cmp(&a.published_date));
    info!(count = records.len(), "records selected for reconciliation");

    let mut taken = HashSet::new();
    let mut files = Vec::new();
    let mut views = Vec::new();

    for record in &records {
        let blocks = match docstore.list_blocks(&record.id).await {
            Ok(blocks) => blocks,
            Err(e) => {
                warn!(record_id = %record.id, error = %e, "failed to fetch blocks, skipping");
                continue;
            }
        };

        let slug = unique_slug(&slugify(&record.slug), &mut taken);
        let view = ArticleView {
            url: format!("{}/{}/{slug}.html", options.base_url, options.out_dir),
            slug,
            title: record.title.clone(),
            description: derive_description(&record.title, &blocks),
            category: record.category,
            source_name: record.source_name.clone(),
            source_url: record.source_url.clone(),
            // retain() above dropped undated records
            published_date: record.published_date.unwrap_or(today),
        };

        let body = render::blocks_to_html(&blocks);
        files.push(GeneratedFile {
            path: PathBuf::from(format!("{}/{}.html", options.out_dir, view.slug)),
            content: render::render_article(&view, &body, now),
        });
        views.push(view);
    }

    files.push(GeneratedFile {
        path: PathBuf::from("index.html"),
        content: artifacts::render_index(&views, now),
    });
    files.push(GeneratedFile {
        path: PathBuf::from("sitemap.xml"),
        content: artifacts::render_sitemap(&options.base_url, &views, today),
    });
    files.push(GeneratedFile {
        path: PathBuf::from("feed.xml"),
        content: artifacts::render_rss(&options.base_url, &views, now),
    });

    info!(
        articles = views.len(),
        files = files.len(),
        "reconciliation complete"
    );
    Ok(files)
}

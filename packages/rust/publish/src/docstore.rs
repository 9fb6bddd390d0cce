//! Document-store client (Notion-style records API).
//!
//! The store is the system of record for web-version articles: publication
//! creates a record with structured fields plus a block body, and
//! reconciliation later queries published records back out to render the
//! static site.

use std::time::Duration;

use chrono::NaiveDate;
use coalwire_shared::{Category, CoalwireError, DocStoreConfig, Result};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::blocks::{Block, Span, html_to_blocks};

/// Request timeout for records API calls.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size for paginated queries.
const PAGE_SIZE: u32 = 100;

/// Summary text cap inside the record's callout block.
const SUMMARY_BLOCK_LIMIT: usize = 500;

/// SEO description cap.
const SEO_DESCRIPTION_LIMIT: usize = 160;

/// Structured fields of an article record.
#[derive(Debug, Clone)]
pub struct ArticleFields {
    pub title: String,
    pub slug: String,
    pub category: Category,
    pub source_name: String,
    pub source_url: Option<String>,
    pub published_date: NaiveDate,
}

/// A published record as returned by the store, trimmed to the fields
/// reconciliation needs.
#[derive(Debug, Clone)]
pub struct DocRecord {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub category: Category,
    pub source_name: String,
    pub source_url: Option<String>,
    pub published_date: Option<NaiveDate>,
}

/// Thin client over the records HTTP API.
pub struct DocStoreClient {
    client: Client,
    base_url: String,
    token: String,
    api_version: String,
    database_id: String,
}

impl DocStoreClient {
    /// Build a client from config plus the resolved API token.
    pub fn new(config: &DocStoreConfig, token: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("coalwire/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CoalwireError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            api_version: config.api_version.clone(),
            database_id: config.database_id.clone(),
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.token)
            .header("Notion-Version", &self.api_version)
    }

    async fn parse_response(response: reqwest::Response, what: &str) -> Result<Value> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoalwireError::Publish(format!(
                "{what}: HTTP {status}: {body}"
            )));
        }
        response
            .json()
            .await
            .map_err(|e| CoalwireError::parse(format!("{what}: invalid response: {e}")))
    }

    /// Create an article record with its block body; returns the record id.
    #[instrument(skip_all, fields(slug = %fields.slug))]
    pub async fn create_record(&self, fields: &ArticleFields, blocks: &[Block]) -> Result<String> {
        let body = json!({
            "parent": {"database_id": self.database_id},
            "properties": record_properties(fields),
            "children": blocks.iter().map(Block::to_json).collect::<Vec<_>>(),
        });

        let response = self
            .request(reqwest::Method::POST, "/v1/pages")
            .json(&body)
            .send()
            .await
            .map_err(|e| CoalwireError::Network(format!("create record: {e}")))?;

        let parsed = Self::parse_response(response, "create record").await?;
        let id = parsed
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| CoalwireError::parse("create record: response has no id"))?
            .to_string();
        info!(record_id = %id, "record created");
        Ok(id)
    }

    /// Fetch every published record, following pagination. Records the
    /// parser cannot make sense of are skipped with a warning rather than
    /// failing the whole query.
    #[instrument(skip_all)]
    pub async fn query_published(&self) -> Result<Vec<DocRecord>> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut body = json!({
                "filter": {"property": "Published", "checkbox": {"equals": true}},
                "page_size": PAGE_SIZE,
            });
            if let Some(cursor) = &cursor {
                body["start_cursor"] = json!(cursor);
            }

            let response = self
                .request(
                    reqwest::Method::POST,
                    &format!("/v1/databases/{}/query", self.database_id),
                )
                .json(&body)
                .send()
                .await
                .map_err(|e| CoalwireError::Network(format!("query records: {e}")))?;

            let parsed = Self::parse_response(response, "query records").await?;
            let results = parsed
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| CoalwireError::parse("query records: no results array"))?;

            for page in results {
                match parse_record(page) {
                    Some(record) => records.push(record),
                    None => {
                        let id = page.get("id").and_then(Value::as_str).unwrap_or("?");
                        warn!(record_id = id, "skipping malformed record");
                    }
                }
            }

            let has_more = parsed
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_more {
                break;
            }
            cursor = parsed
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        info!(count = records.len(), "published records fetched");
        Ok(records)
    }

    /// Fetch a record's block body, following pagination.
    pub async fn list_blocks(&self, record_id: &str) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut path = format!("/v1/blocks/{record_id}/children?page_size={PAGE_SIZE}");
            if let Some(cursor) = &cursor {
                path.push_str(&format!("&start_cursor={cursor}"));
            }

            let response = self
                .request(reqwest::Method::GET, &path)
                .send()
                .await
                .map_err(|e| CoalwireError::Network(format!("list blocks: {e}")))?;

            let parsed = Self::parse_response(response, "list blocks").await?;
            let results = parsed
                .get("results")
                .and_then(Value::as_array)
                .ok_or_else(|| CoalwireError::parse("list blocks: no results array"))?;

            for value in results {
                if let Some(block) = Block::from_json(value) {
                    blocks.push(block);
                }
            }

            let has_more = parsed
                .get("has_more")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if !has_more {
                break;
            }
            cursor = parsed
                .get("next_cursor")
                .and_then(Value::as_str)
                .map(String::from);
            if cursor.is_none() {
                break;
            }
        }

        Ok(blocks)
    }
}

// ---------------------------------------------------------------------------
// Record layout
// ---------------------------------------------------------------------------

fn rich_text(content: &str) -> Value {
    json!([{"type": "text", "text": {"content": content}}])
}

fn record_properties(fields: &ArticleFields) -> Value {
    let seo_description: String = fields
        .title
        .chars()
        .take(SEO_DESCRIPTION_LIMIT)
        .collect();
    let mut properties = json!({
        "Name": {"title": rich_text(&fields.title)},
        "Title": {"rich_text": rich_text(&fields.title)},
        "Slug": {"rich_text": rich_text(&fields.slug)},
        "Category": {"rich_text": rich_text(fields.category.as_str())},
        "Source": {"rich_text": rich_text(&fields.source_name)},
        "Published": {"checkbox": true},
        "Published Date": {"date": {"start": fields.published_date.format("%Y-%m-%d").to_string()}},
        "SEO Title": {"rich_text": rich_text(&format!("{} | Coalwire", fields.title))},
        "SEO Description": {"rich_text": rich_text(&seo_description)},
    });
    if let Some(url) = &fields.source_url {
        properties["Source URL"] = json!({"url": url});
    }
    properties
}

/// Assemble the block body of an article record: title heading, summary
/// callout, the web version rendered from generated HTML, then the raw
/// channel version kept for audit in a code block.
pub fn article_blocks(fields: &ArticleFields, summary: &str, web_html: &str, channel_text: &str) -> Vec<Block> {
    let summary_head: String = summary.chars().take(SUMMARY_BLOCK_LIMIT).collect();
    let mut blocks = vec![
        Block::Heading1(vec![Span::plain(fields.title.clone())]),
        Block::Callout(vec![Span::plain(format!("Summary: {summary_head}"))]),
        Block::Divider,
        Block::Heading2(vec![Span::plain("Web Version")]),
    ];
    blocks.extend(html_to_blocks(web_html));
    blocks.push(Block::Divider);
    blocks.push(Block::Heading2(vec![Span::plain("Channel Version")]));
    blocks.push(Block::Code {
        text: channel_text.to_string(),
        language: "html".into(),
    });
    blocks
}

fn plain_text(property: &Value, kind: &str) -> Option<String> {
    let items = property.get(kind)?.as_array()?;
    let text: String = items
        .iter()
        .filter_map(|item| {
            item.pointer("/text/content")
                .or_else(|| item.get("plain_text"))
                .and_then(Value::as_str)
        })
        .collect();
    Some(text)
}

fn parse_record(page: &Value) -> Option<DocRecord> {
    let id = page.get("id").and_then(Value::as_str)?.to_string();
    let props = page.get("properties")?;

    let title = plain_text(props.get("Name")?, "title")
        .filter(|t| !t.is_empty())
        .or_else(|| plain_text(props.get("Title")?, "rich_text"))?;
    let slug = props
        .get("Slug")
        .and_then(|p| plain_text(p, "rich_text"))
        .filter(|s| !s.is_empty())?;
    let category = props
        .get("Category")
        .and_then(|p| plain_text(p, "rich_text"))
        .map(|c| c.parse().unwrap_or(Category::Markets))
        .unwrap_or(Category::Markets);
    let source_name = props
        .get("Source")
        .and_then(|p| plain_text(p, "rich_text"))
        .unwrap_or_default();
    let source_url = props
        .pointer("/Source URL/url")
        .and_then(Value::as_str)
        .map(String::from);
    let published_date = props
        .pointer("/Published Date/date/start")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok());

    Some(DocRecord {
        id,
        title,
        slug,
        category,
        source_name,
        source_url,
        published_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> DocStoreClient {
        let config = DocStoreConfig {
            base_url: server.uri(),
            database_id: "db123".into(),
            ..DocStoreConfig::default()
        };
        DocStoreClient::new(&config, "SECRET".into()).unwrap()
    }

    fn test_fields() -> ArticleFields {
        ArticleFields {
            title: "Newcastle coal hits $140".into(),
            slug: "newcastle-coal-hits-140".into(),
            category: Category::Coal,
            source_name: "Reuters".into(),
            source_url: Some("https://reuters.com/a".into()),
            published_date: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        }
    }

    fn record_page(id: &str, title: &str, slug: &str, date: &str) -> Value {
        json!({
            "id": id,
            "properties": {
                "Name": {"title": [{"text": {"content": title}}]},
                "Slug": {"rich_text": [{"text": {"content": slug}}]},
                "Category": {"rich_text": [{"text": {"content": "Coal"}}]},
                "Source": {"rich_text": [{"text": {"content": "Reuters"}}]},
                "Source URL": {"url": "https://reuters.com/a"},
                "Published Date": {"date": {"start": date}},
            }
        })
    }

    #[tokio::test]
    async fn create_record_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .and(header("Notion-Version", "2022-06-28"))
            .and(body_string_contains("newcastle-coal-hits-140"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "rec-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let fields = test_fields();
        let blocks = article_blocks(&fields, "Prices rose.", "<p>Body</p>", "channel text");
        let id = client.create_record(&fields, &blocks).await.unwrap();
        assert_eq!(id, "rec-1");
    }

    #[tokio::test]
    async fn query_published_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/databases/db123/query"))
            .and(body_string_contains("cursor-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [record_page("p2", "Second", "second", "2025-03-11")],
                "has_more": false,
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/databases/db123/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [record_page("p1", "First", "first", "2025-03-10")],
                "has_more": true,
                "next_cursor": "cursor-2",
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let records = client.query_published().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].slug, "first");
        assert_eq!(records[1].slug, "second");
        assert_eq!(
            records[0].published_date,
            NaiveDate::from_ymd_opt(2025, 3, 10)
        );
    }

    #[tokio::test]
    async fn malformed_record_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/databases/db123/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    json!({"id": "broken", "properties": {}}),
                    record_page("ok", "Fine", "fine", "2025-03-12"),
                ],
                "has_more": false,
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let records = client.query_published().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "ok");
    }

    #[tokio::test]
    async fn list_blocks_parses_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/blocks/rec-1/children"))
            .and(query_param("page_size", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [
                    {"type": "heading_1", "heading_1": {"rich_text": [{"text": {"content": "Title"}}]}},
                    {"type": "paragraph", "paragraph": {"rich_text": [{"text": {"content": "Body"}}]}},
                ],
                "has_more": false,
            })))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let blocks = client.list_blocks("rec-1").await.unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], Block::Heading1(vec![Span::plain("Title")]));
    }

    #[tokio::test]
    async fn api_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/pages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let fields = test_fields();
        let err = client.create_record(&fields, &[]).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn article_blocks_layout() {
        let fields = test_fields();
        let blocks = article_blocks(
            &fields,
            "Prices rose sharply.",
            "<h2>Market</h2><p>Details here.</p>",
            "<b>[COAL]</b> channel post",
        );

        assert_eq!(
            blocks[0],
            Block::Heading1(vec![Span::plain("Newcastle coal hits $140")])
        );
        match &blocks[1] {
            Block::Callout(spans) => assert!(spans[0].text.starts_with("Summary: ")),
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(blocks[2], Block::Divider);
        assert_eq!(blocks[3], Block::Heading2(vec![Span::plain("Web Version")]));
        // Web body lands between the heading and the trailing divider
        assert!(blocks[4..].contains(&Block::Heading2(vec![Span::plain("Market")])));
        match blocks.last() {
            Some(Block::Code { language, .. }) => assert_eq!(language, "html"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

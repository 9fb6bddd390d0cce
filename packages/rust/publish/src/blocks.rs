//! Document-store block model.
//!
//! Records in the document store carry their article body as a tree of
//! typed blocks with rich-text spans. This module owns the wire mapping in
//! both directions: generated HTML becomes blocks on publish, and stored
//! blocks become HTML again during reconciliation.

use scraper::{ElementRef, Html};
use serde_json::{Value, json};

/// Per-block text cap enforced by the records API.
const BLOCK_TEXT_LIMIT: usize = 2000;

/// One rich-text span with annotations.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    pub href: Option<String>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    fn to_json(&self) -> Value {
        let mut obj = json!({
            "type": "text",
            "text": {"content": self.text},
            "annotations": {
                "bold": self.bold,
                "italic": self.italic,
                "code": self.code,
            },
        });
        if let Some(href) = &self.href {
            obj["text"]["link"] = json!({"url": href});
            obj["href"] = json!(href);
        }
        obj
    }

    fn from_json(value: &Value) -> Option<Self> {
        let text = value
            .pointer("/text/content")
            .or_else(|| value.get("plain_text"))
            .and_then(Value::as_str)?
            .to_string();
        let annotations = value.get("annotations");
        let flag = |name: &str| {
            annotations
                .and_then(|a| a.get(name))
                .and_then(Value::as_bool)
                .unwrap_or(false)
        };
        Some(Self {
            text,
            bold: flag("bold"),
            italic: flag("italic"),
            code: flag("code"),
            href: value.get("href").and_then(Value::as_str).map(String::from),
        })
    }
}

/// One content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading1(Vec<Span>),
    Heading2(Vec<Span>),
    Heading3(Vec<Span>),
    Paragraph(Vec<Span>),
    BulletedListItem(Vec<Span>),
    NumberedListItem(Vec<Span>),
    Callout(Vec<Span>),
    Code { text: String, language: String },
    Image { url: String, caption: String },
    Divider,
}

impl Block {
    /// Block type tag on the wire.
    fn type_name(&self) -> &'static str {
        match self {
            Block::Heading1(_) => "heading_1",
            Block::Heading2(_) => "heading_2",
            Block::Heading3(_) => "heading_3",
            Block::Paragraph(_) => "paragraph",
            Block::BulletedListItem(_) => "bulleted_list_item",
            Block::NumberedListItem(_) => "numbered_list_item",
            Block::Callout(_) => "callout",
            Block::Code { .. } => "code",
            Block::Image { .. } => "image",
            Block::Divider => "divider",
        }
    }

    /// Serialize to the records API shape.
    pub fn to_json(&self) -> Value {
        let type_name = self.type_name();
        let payload = match self {
            Block::Heading1(spans)
            | Block::Heading2(spans)
            | Block::Heading3(spans)
            | Block::Paragraph(spans)
            | Block::BulletedListItem(spans)
            | Block::NumberedListItem(spans)
            | Block::Callout(spans) => {
                json!({"rich_text": spans.iter().map(Span::to_json).collect::<Vec<_>>()})
            }
            Block::Code { text, language } => json!({
                "rich_text": [Span::plain(text.clone()).to_json()],
                "language": language,
            }),
            Block::Image { url, caption } => json!({
                "external": {"url": url},
                "caption": [Span::plain(caption.clone()).to_json()],
            }),
            Block::Divider => json!({}),
        };
        json!({
            "object": "block",
            "type": type_name,
            type_name: payload,
        })
    }

    /// Parse one block from the records API shape. Unknown or malformed
    /// block types yield `None`; the caller decides whether to skip or fail.
    pub fn from_json(value: &Value) -> Option<Self> {
        let type_name = value.get("type").and_then(Value::as_str)?;
        let data = value.get(type_name)?;
        let spans = || -> Vec<Span> {
            data.get("rich_text")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(Span::from_json).collect())
                .unwrap_or_default()
        };

        Some(match type_name {
            "heading_1" => Block::Heading1(spans()),
            "heading_2" => Block::Heading2(spans()),
            "heading_3" => Block::Heading3(spans()),
            "paragraph" => Block::Paragraph(spans()),
            "bulleted_list_item" => Block::BulletedListItem(spans()),
            "numbered_list_item" => Block::NumberedListItem(spans()),
            "callout" => Block::Callout(spans()),
            "code" => Block::Code {
                text: spans().into_iter().map(|s| s.text).collect(),
                language: data
                    .get("language")
                    .and_then(Value::as_str)
                    .unwrap_or("plain text")
                    .to_string(),
            },
            "image" => {
                let url = data
                    .pointer("/file/url")
                    .or_else(|| data.pointer("/external/url"))
                    .and_then(Value::as_str)?
                    .to_string();
                let caption = data
                    .get("caption")
                    .and_then(Value::as_array)
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(Span::from_json)
                            .map(|s| s.text)
                            .collect::<String>()
                    })
                    .unwrap_or_default();
                Block::Image { url, caption }
            }
            "divider" => Block::Divider,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------------------
// HTML → blocks
// ---------------------------------------------------------------------------

/// Convert generated article HTML into blocks.
///
/// Handles the tag set the content generator is instructed to emit:
/// h1–h3, p, ul/ol + li, blockquote (stored as a callout), hr, img.
/// Anything else contributes its text as a paragraph.
pub fn html_to_blocks(html: &str) -> Vec<Block> {
    let doc = Html::parse_fragment(html);
    let mut blocks = Vec::new();

    for child in doc.root_element().children() {
        let Some(el) = ElementRef::wrap(child) else {
            // Stray top-level text becomes its own paragraph
            if let Some(text) = child.value().as_text() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    blocks.push(Block::Paragraph(vec![Span::plain(clip(trimmed))]));
                }
            }
            continue;
        };
        element_to_blocks(&el, &mut blocks);
    }
    blocks
}

fn element_to_blocks(el: &ElementRef, blocks: &mut Vec<Block>) {
    match el.value().name() {
        "h1" => blocks.push(Block::Heading1(inline_spans(el))),
        "h2" => blocks.push(Block::Heading2(inline_spans(el))),
        "h3" => blocks.push(Block::Heading3(inline_spans(el))),
        "p" => {
            let spans = inline_spans(el);
            if !spans.is_empty() {
                blocks.push(Block::Paragraph(spans));
            }
        }
        "ul" | "ol" => {
            let numbered = el.value().name() == "ol";
            for item in el.child_elements() {
                if item.value().name() != "li" {
                    continue;
                }
                let spans = inline_spans(&item);
                if spans.is_empty() {
                    continue;
                }
                blocks.push(if numbered {
                    Block::NumberedListItem(spans)
                } else {
                    Block::BulletedListItem(spans)
                });
            }
        }
        "blockquote" => blocks.push(Block::Callout(inline_spans(el))),
        "hr" => blocks.push(Block::Divider),
        "img" => {
            if let Some(src) = el.value().attr("src") {
                blocks.push(Block::Image {
                    url: src.to_string(),
                    caption: el.value().attr("alt").unwrap_or_default().to_string(),
                });
            }
        }
        // Containers like div/section/article: recurse
        "div" | "section" | "article" | "body" | "html" => {
            for inner in el.child_elements() {
                element_to_blocks(&inner, blocks);
            }
        }
        _ => {
            let text: String = el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                blocks.push(Block::Paragraph(vec![Span::plain(clip(&text))]));
            }
        }
    }
}

/// Flatten an element's inline content into annotated spans.
/// Nested formatting collapses to the outermost annotation.
fn inline_spans(el: &ElementRef) -> Vec<Span> {
    let mut spans = Vec::new();
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            let s = text.to_string();
            if !s.trim().is_empty() {
                spans.push(Span::plain(clip(&s)));
            }
            continue;
        }
        let Some(inner) = ElementRef::wrap(child) else {
            continue;
        };
        let text: String = inner.text().collect();
        let text = clip(text.trim());
        if text.is_empty() {
            continue;
        }
        let span = match inner.value().name() {
            "b" | "strong" => Span {
                text,
                bold: true,
                ..Span::default()
            },
            "i" | "em" => Span {
                text,
                italic: true,
                ..Span::default()
            },
            "code" => Span {
                text,
                code: true,
                ..Span::default()
            },
            "a" => Span {
                text,
                href: inner.value().attr("href").map(String::from),
                ..Span::default()
            },
            _ => Span::plain(text),
        };
        spans.push(span);
    }
    spans
}

fn clip(text: &str) -> String {
    match text.char_indices().nth(BLOCK_TEXT_LIMIT) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Plain text of a span list (annotations dropped).
pub fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

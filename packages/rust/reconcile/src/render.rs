//! Block tree → HTML rendering for the static site.

use chrono::{DateTime, NaiveDate, Utc};
use coalwire_publish::{Block, Span};
use coalwire_shared::Category;

/// Article metadata flowing into page templates and derived artifacts.
#[derive(Debug, Clone)]
pub struct ArticleView {
    pub slug: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub source_name: String,
    pub source_url: Option<String>,
    /// Absolute permalink.
    pub url: String,
    pub published_date: NaiveDate,
}

/// Escape text for HTML element and attribute content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn spans_to_html(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut text = escape_html(&span.text);
        if span.code {
            text = format!("<code>{text}</code>");
        }
        if span.bold {
            text = format!("<strong>{text}</strong>");
        }
        if span.italic {
            text = format!("<em>{text}</em>");
        }
        if let Some(href) = &span.href {
            text = format!("<a href=\"{}\">{text}</a>", escape_html(href));
        }
        out.push_str(&text);
    }
    out
}

/// Render a block tree to article-body HTML.
///
/// Consecutive list items of the same kind are grouped into one `<ul>`/`<ol>`.
pub fn blocks_to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    let mut open_list: Option<&'static str> = None;

    let close_list = |out: &mut String, open_list: &mut Option<&'static str>| {
        if let Some(tag) = open_list.take() {
            out.push_str(&format!("</{tag}>\n"));
        }
    };

    for block in blocks {
        let list_tag = match block {
            Block::BulletedListItem(_) => Some("ul"),
            Block::NumberedListItem(_) => Some("ol"),
            _ => None,
        };
        if open_list != list_tag {
            close_list(&mut out, &mut open_list);
            if let Some(tag) = list_tag {
                out.push_str(&format!("<{tag}>\n"));
                open_list = Some(tag);
            }
        }

        match block {
            Block::Heading1(spans) => {
                out.push_str(&format!("<h1>{}</h1>\n", spans_to_html(spans)));
            }
            Block::Heading2(spans) => {
                out.push_str(&format!("<h2>{}</h2>\n", spans_to_html(spans)));
            }
            Block::Heading3(spans) => {
                out.push_str(&format!("<h3>{}</h3>\n", spans_to_html(spans)));
            }
            Block::Paragraph(spans) => {
                out.push_str(&format!("<p>{}</p>\n", spans_to_html(spans)));
            }
            Block::BulletedListItem(spans) | Block::NumberedListItem(spans) => {
                out.push_str(&format!("<li>{}</li>\n", spans_to_html(spans)));
            }
            Block::Callout(spans) => {
                out.push_str(&format!(
                    "<blockquote class=\"callout\">{}</blockquote>\n",
                    spans_to_html(spans)
                ));
            }
            Block::Code { text, language } => {
                out.push_str(&format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>\n",
                    escape_html(language),
                    escape_html(text)
                ));
            }
            Block::Image { url, caption } => {
                out.push_str(&format!(
                    "<figure><img src=\"{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>\n",
                    escape_html(url),
                    escape_html(caption),
                    escape_html(caption)
                ));
            }
            Block::Divider => out.push_str("<hr>\n"),
        }
    }
    close_list(&mut out, &mut open_list);
    out
}

/// Render a full article page.
///
/// Output is a pure function of the article and body; `generated_at` is the
/// only run-dependent field and lives in a single meta tag.
pub fn render_article(view: &ArticleView, body_html: &str, generated_at: DateTime<Utc>) -> String {
    let title = escape_html(&view.title);
    let description = escape_html(&view.description);
    let url = escape_html(&view.url);
    let pub_date = view.published_date.format("%Y-%m-%dT00:00:00+00:00");
    let pub_date_display = view.published_date.format("%B %d, %Y");
    let source_line = match &view.source_url {
        Some(source_url) => format!(
            "<p class=\"source\">Source: <a href=\"{}\" rel=\"nofollow\">{}</a></p>",
            escape_html(source_url),
            escape_html(&view.source_name)
        ),
        None => format!(
            "<p class=\"source\">Source: {}</p>",
            escape_html(&view.source_name)
        ),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title} | Coalwire</title>
<meta name="description" content="{description}">
<meta name="generated_at" content="{generated_at}">
<link rel="canonical" href="{url}">
<meta property="og:type" content="article">
<meta property="og:url" content="{url}">
<meta property="og:title" content="{title}">
<meta property="og:description" content="{description}">
<meta property="article:published_time" content="{pub_date}">
<meta property="article:section" content="{category}">
</head>
<body>
<article>
<p class="meta">{category} · {pub_date_display}</p>
{body_html}{source_line}
</article>
</body>
</html>
"#,
        generated_at = generated_at.format("%Y-%m-%dT%H:%M:%S+00:00"),
        category = view.category.as_str(),
    )
}

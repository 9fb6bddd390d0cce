//! Derived site artifacts: index page, sitemap, RSS feed.
//!
//! Each artifact is regenerated in full from the article set on every run.

use chrono::{DateTime, NaiveDate, Utc};

use crate::render::{ArticleView, escape_html};

/// Render the site index: newest first, one card per article.
pub fn render_index(articles: &[ArticleView], generated_at: DateTime<Utc>) -> String {
    let mut cards = String::new();
    for article in articles {
        cards.push_str(&format!(
            r#"<article class="card">
<h2><a href="{url}">{title}</a></h2>
<p class="meta">{category} · {date}</p>
<p>{description}</p>
</article>
"#,
            url = escape_html(&article.url),
            title = escape_html(&article.title),
            category = article.category.as_str(),
            date = article.published_date.format("%B %d, %Y"),
            description = escape_html(&article.description),
        ));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Coalwire — Coal Market News</title>
<meta name="description" content="Coal market news, prices, and freight updates.">
<meta name="generated_at" content="{generated_at}">
</head>
<body>
<h1>Coalwire</h1>
<main>
{cards}</main>
</body>
</html>
"#,
        generated_at = generated_at.format("%Y-%m-%dT%H:%M:%S+00:00"),
    )
}

/// Render sitemap.xml. The site root entry comes first, then one entry per
/// article with its publication date as lastmod.
pub fn render_sitemap(base_url: &str, articles: &[ArticleView], today: NaiveDate) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>{}</loc>
    <lastmod>{}</lastmod>
    <changefreq>daily</changefreq>
    <priority>1.0</priority>
  </url>
"#,
        escape_html(base_url),
        today.format("%Y-%m-%d"),
    );
    for article in articles {
        xml.push_str(&format!(
            r#"  <url>
    <loc>{}</loc>
    <lastmod>{}</lastmod>
    <changefreq>monthly</changefreq>
    <priority>0.8</priority>
  </url>
"#,
            escape_html(&article.url),
            article.published_date.format("%Y-%m-%d"),
        ));
    }
    xml.push_str("</urlset>\n");
    xml
}

/// Render the RSS 2.0 feed. Dates are RFC 2822; each item's guid is its
/// permalink.
pub fn render_rss(base_url: &str, articles: &[ArticleView], built_at: DateTime<Utc>) -> String {
    let feed_url = format!("{base_url}/feed.xml");
    let build_date = built_at.to_rfc2822();

    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Coalwire — Coal Market News</title>
    <link>{base}</link>
    <description>Coal market news, prices, and freight updates.</description>
    <language>en-US</language>
    <lastBuildDate>{build_date}</lastBuildDate>
    <ttl>60</ttl>
    <atom:link href="{feed_url}" rel="self" type="application/rss+xml"/>
"#,
        base = escape_html(base_url),
        feed_url = escape_html(&feed_url),
    );

    for article in articles {
        let pub_date = article
            .published_date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().to_rfc2822())
            .unwrap_or_else(|| build_date.clone());
        xml.push_str(&format!(
            r#"    <item>
      <title>{title}</title>
      <link>{url}</link>
      <guid isPermaLink="true">{url}</guid>
      <description>{description}</description>
      <pubDate>{pub_date}</pubDate>
    </item>
"#,
            title = escape_html(&article.title),
            url = escape_html(&article.url),
            description = escape_html(&article.description),
        ));
    }
    xml.push_str("  </channel>\n</rss>\n");
    xml
}

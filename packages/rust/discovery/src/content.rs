//! Post-processing of generated channel text: category extraction and
//! technical hashtags.

use std::sync::LazyLock;

use coalwire_shared::Category;
use regex::Regex;

static BRACKET_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(COAL|ENERGY|LOGISTICS|STEEL|MARKETS|FREIGHT)\]").expect("valid regex")
});
static HASHTAG_TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)#(Coal|Energy|Logistics|Steel|Markets|Freight)\b").expect("valid regex")
});
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("valid regex"));

/// Region, commodity, and market-term keyword → hashtag mappings.
const TAG_RULES: &[(&str, &str)] = &[
    // Regions and ports
    ("australia", "#Australia"),
    ("newcastle", "#Newcastle"),
    ("gladstone", "#Gladstone"),
    ("china", "#China"),
    ("qinhuangdao", "#Qinhuangdao"),
    ("india", "#India"),
    ("mundra", "#Mundra"),
    ("indonesia", "#Indonesia"),
    ("kalimantan", "#Kalimantan"),
    ("south africa", "#SouthAfrica"),
    ("richards bay", "#RichardsBay"),
    ("europe", "#Europe"),
    ("ara", "#ARA"),
    ("usa", "#USA"),
    ("united states", "#USA"),
    // Coal grades
    ("thermal coal", "#ThermalCoal"),
    ("steam coal", "#ThermalCoal"),
    ("coking coal", "#CokingCoal"),
    ("metallurgical coal", "#CokingCoal"),
    ("anthracite", "#Coal"),
    ("bituminous", "#Coal"),
    // Market terms
    ("fob", "#FOB"),
    ("cif", "#CIF"),
    ("freight", "#Freight"),
    ("shipping", "#Freight"),
    ("panamax", "#Freight"),
    ("supramax", "#Freight"),
    ("capesize", "#Freight"),
];

/// Extract the editorial category from generated channel text.
///
/// Looks for a `[COAL]`-style bracket tag first, then a category hashtag,
/// then falls back to keyword matching. Unclassifiable text is `Markets`.
pub fn extract_category(post_text: &str) -> Category {
    if let Some(caps) = BRACKET_TAG_RE.captures(post_text) {
        return caps[1].parse().unwrap_or(Category::Markets);
    }
    if let Some(caps) = HASHTAG_TAG_RE.captures(post_text) {
        return caps[1].parse().unwrap_or(Category::Markets);
    }

    let text = post_text.to_lowercase();
    let matches = |words: &[&str]| words.iter().any(|w| text.contains(w));
    if matches(&["coal", "thermal", "coking", "steam"]) {
        Category::Coal
    } else if matches(&["energy", "power", "electricity"]) {
        Category::Energy
    } else if matches(&["freight", "shipping", "vessel", "port"]) {
        Category::Logistics
    } else if matches(&["steel", "metallurgical"]) {
        Category::Steel
    } else {
        Category::Markets
    }
}

/// Technical hashtags for a news text, in rule order, deduplicated.
pub fn hashtags_for(text: &str) -> Vec<&'static str> {
    let lower = text.to_lowercase();
    let mut tags = Vec::new();
    for (keyword, tag) in TAG_RULES {
        if lower.contains(keyword) && !tags.contains(tag) {
            tags.push(*tag);
        }
    }
    tags
}

/// Append hashtags the channel text is missing.
///
/// New tags land before a trailing source link if one exists, otherwise at
/// the end. Tags already present (case-insensitive) are not duplicated.
pub fn append_hashtags(channel_text: &str, tags: &[&str]) -> String {
    let existing: Vec<String> = HASHTAG_RE
        .find_iter(channel_text)
        .map(|m| m.as_str().to_lowercase())
        .collect();

    let new_tags: Vec<&str> = tags
        .iter()
        .filter(|t| !existing.contains(&t.to_lowercase()))
        .copied()
        .collect();

    if new_tags.is_empty() {
        return channel_text.to_string();
    }
    let tags_str = new_tags.join(" ");

    if let Some(link_pos) = channel_text.rfind("<a href") {
        let head = channel_text[..link_pos].trim_end();
        let tail = &channel_text[link_pos..];
        format!("{head} {tags_str}\n\n{tail}")
    } else {
        format!("{} {tags_str}", channel_text.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bracket_tag_wins() {
        assert_eq!(
            extract_category("<b>⚡ [COAL] | Exports rise</b> shipping news"),
            Category::Coal
        );
        assert_eq!(extract_category("🚢 [FREIGHT] | Rates"), Category::Freight);
    }

    #[test]
    fn hashtag_tag_fallback() {
        assert_eq!(extract_category("Big news today #Energy"), Category::Energy);
    }

    #[test]
    fn keyword_fallback_and_default() {
        assert_eq!(extract_category("thermal output dropped"), Category::Coal);
        assert_eq!(extract_category("vessel queue grows"), Category::Logistics);
        assert_eq!(extract_category("nothing matches here"), Category::Markets);
    }

    #[test]
    fn hashtags_dedupe_by_tag() {
        let tags = hashtags_for("Thermal coal and steam coal cargoes from Newcastle, Australia");
        assert_eq!(tags, vec!["#Australia", "#Newcastle", "#ThermalCoal"]);
    }

    #[test]
    fn append_skips_existing_tags() {
        let text = "<b>[COAL]</b> exports rose #Newcastle";
        let out = append_hashtags(text, &["#Newcastle", "#ThermalCoal"]);
        assert_eq!(out.matches("#Newcastle").count(), 1);
        assert!(out.ends_with("#ThermalCoal"));
    }

    #[test]
    fn append_inserts_before_source_link() {
        let text = "<b>[COAL]</b> exports rose\n\n<a href=\"https://reuters.com\">Source</a>";
        let out = append_hashtags(text, &["#China"]);
        let tag_pos = out.find("#China").unwrap();
        let link_pos = out.find("<a href").unwrap();
        assert!(tag_pos < link_pos);
    }

    #[test]
    fn append_noop_when_nothing_new() {
        let text = "news #China";
        assert_eq!(append_hashtags(text, &["#china"]), text);
    }
}

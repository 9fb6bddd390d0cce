//! Small text utilities shared across crates.

/// Longest slug emitted; keeps file names and URLs manageable.
const SLUG_MAX_LEN: usize = 80;

/// Derive a URL slug from a title.
///
/// Lowercases, drops everything but alphanumerics, whitespace, and hyphens,
/// then collapses separator runs into single hyphens. The result is capped
/// at 80 characters with no trailing hyphen. An empty result (all-symbol
/// titles) falls back to `"untitled"`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_sep = false;

    for c in title.to_lowercase().chars() {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_sep = true;
        }
        // Other punctuation is dropped without acting as a separator
    }

    let mut slug: String = slug.chars().take(SLUG_MAX_LEN).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

//! URL handling module for ux-sweep
//!
//! This module provides traversal normalization, deduplication keys, domain
//! extraction, exclusion rules, and the path classification used by sampling.

mod domain;
mod exclusion;
mod normalize;

use url::Url;

// Re-export main functions
pub use domain::{extract_domain, is_same_domain};
pub use exclusion::{is_legal_page, ExclusionFilter, DEFAULT_EXCLUDE_PATTERNS};
pub use normalize::{deduplication_key, is_tracking_param, normalize_url};

/// Category assigned to the root page
pub const ROOT_CATEGORY: &str = "root";

/// Returns the non-empty, lowercased path segments of a URL
pub fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segments| {
            segments
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect()
        })
        .unwrap_or_default()
}

/// Number of path segments; the root page has depth 0
pub fn path_depth(url: &Url) -> usize {
    path_segments(url).len()
}

/// Returns true for the site root (no path segments)
pub fn is_root(url: &Url) -> bool {
    path_segments(url).is_empty()
}

/// Top-level category: the first path segment, or `root`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use ux_sweep::url::top_category;
///
/// let url = Url::parse("https://example.com/services/housing").unwrap();
/// assert_eq!(top_category(&url), "services");
/// ```
pub fn top_category(url: &Url) -> String {
    path_segments(url)
        .into_iter()
        .next()
        .unwrap_or_else(|| ROOT_CATEGORY.to_string())
}

/// Two-level category: the first two path segments joined with `/`
pub fn two_level_category(url: &Url) -> String {
    let segments = path_segments(url);
    if segments.is_empty() {
        return ROOT_CATEGORY.to_string();
    }
    segments
        .into_iter()
        .take(2)
        .collect::<Vec<_>>()
        .join("/")
}

/// Returns true if any path segment names an "about" page
pub fn is_about_page(url: &Url) -> bool {
    path_segments(url).iter().any(|s| s.contains("about"))
}

//! Reduction of a deduplicated URL set to a bounded, representative sample
//!
//! Two strategies exist. The aggressive filter is used when the set is larger
//! than the hard cap; otherwise the hierarchical sampler followed by the
//! category limiter keeps a few pages per section of the site. Either way the
//! result never exceeds `max_urls_total` and keeps the root when it is present.

use crate::crawler::DiscoveryOptions;
use crate::output::SamplingStrategy;
use crate::url::{
    is_about_page, is_legal_page, is_root, path_depth, top_category, two_level_category,
};
use std::collections::HashMap;
use url::Url;

/// Deeper content pages kept per top-level category by the aggressive filter
pub const AGGRESSIVE_PAGES_PER_CATEGORY: usize = 2;

/// Applies the sampling strategy selected by `options`
pub fn apply_sampling(urls: Vec<Url>, options: &DiscoveryOptions) -> (Vec<Url>, SamplingStrategy) {
    let cap = options.max_urls_total;

    if !options.enable_sampling {
        let mut urls = urls;
        urls.truncate(cap);
        return (urls, SamplingStrategy::None);
    }

    if urls.len() > cap && options.aggressive_filtering {
        return (aggressive_filter(urls, cap), SamplingStrategy::Aggressive);
    }

    let sampled = hierarchical_sample(urls, options.max_depth, options.samples_per_category);
    let mut limited = limit_categories(sampled, options.category_limit);
    limited.truncate(cap);
    (limited, SamplingStrategy::Hierarchical)
}

/// Keeps the root, one overview page per category, a few content pages per
/// category and at most one "about" page, then truncates to `cap`
///
/// Output order is root, overview pages in the order their categories were
/// first seen, then content pages in the same category order. Content pages
/// within a category are ranked shortest URL first.
pub fn aggressive_filter(urls: Vec<Url>, cap: usize) -> Vec<Url> {
    let mut root: Option<Url> = None;
    let mut category_order: Vec<String> = Vec::new();
    let mut overviews: HashMap<String, Url> = HashMap::new();
    let mut content: HashMap<String, Vec<Url>> = HashMap::new();

    for url in urls {
        if is_root(&url) {
            root.get_or_insert(url);
            continue;
        }

        let category = top_category(&url);
        if !overviews.contains_key(&category) && !content.contains_key(&category) {
            category_order.push(category.clone());
        }

        if path_depth(&url) == 1 {
            overviews.entry(category).or_insert(url);
        } else {
            content.entry(category).or_default().push(url);
        }
    }

    let mut about_taken = false;
    let mut admit = |url: &Url| -> bool {
        if is_about_page(url) {
            if about_taken {
                return false;
            }
            about_taken = true;
        }
        true
    };

    let mut kept: Vec<Url> = Vec::new();
    if let Some(root) = root {
        kept.push(root);
    }

    for category in &category_order {
        if let Some(overview) = overviews.get(category) {
            if admit(overview) {
                kept.push(overview.clone());
            }
        }
    }

    for category in &category_order {
        let Some(pages) = content.get_mut(category) else {
            continue;
        };
        pages.sort_by_key(|url| url.as_str().len());

        let mut taken = 0;
        for page in pages.iter() {
            if taken == AGGRESSIVE_PAGES_PER_CATEGORY {
                break;
            }
            if admit(page) {
                kept.push(page.clone());
                taken += 1;
            }
        }
    }

    kept.truncate(cap);
    kept
}

/// Keeps up to `samples_per_category` pages per two-segment category
///
/// Pages deeper than `max_depth` and legal or footer pages are dropped. The
/// root is always kept and comes first; categories follow in first-seen
/// order, each ranked shortest URL first.
///
/// Crawled URLs have already passed the exclusion filter, so the legal-page
/// check only matters for lists built by callers.
pub fn hierarchical_sample(urls: Vec<Url>, max_depth: usize, samples_per_category: usize) -> Vec<Url> {
    let mut root: Option<Url> = None;
    let mut category_order: Vec<String> = Vec::new();
    let mut buckets: HashMap<String, Vec<Url>> = HashMap::new();

    for url in urls {
        if is_root(&url) {
            root.get_or_insert(url);
            continue;
        }
        if path_depth(&url) > max_depth || is_legal_page(&url) {
            continue;
        }

        let category = two_level_category(&url);
        let bucket = buckets.entry(category.clone()).or_insert_with(|| {
            category_order.push(category);
            Vec::new()
        });
        bucket.push(url);
    }

    let mut sampled: Vec<Url> = root.into_iter().collect();
    for category in &category_order {
        if let Some(mut bucket) = buckets.remove(category) {
            bucket.sort_by_key(|url| (path_depth(url), url.as_str().len()));
            sampled.extend(bucket.into_iter().take(samples_per_category));
        }
    }
    sampled
}

/// Keeps at most `limit` URLs per top-level path segment, preserving order
///
/// The root is its own category and is never dropped.
pub fn limit_categories(urls: Vec<Url>, limit: usize) -> Vec<Url> {
    let mut counts: HashMap<String, usize> = HashMap::new();

    urls.into_iter()
        .filter(|url| {
            if is_root(url) {
                return true;
            }
            let count = counts.entry(top_category(url)).or_insert(0);
            *count += 1;
            *count <= limit
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(paths: &[&str]) -> Vec<Url> {
        paths
            .iter()
            .map(|p| Url::parse(&format!("https://example.com{}", p)).unwrap())
            .collect()
    }

    fn paths(list: &[Url]) -> Vec<&str> {
        list.iter().map(|u| u.path()).collect()
    }

    fn options(cap: usize) -> DiscoveryOptions {
        DiscoveryOptions {
            max_urls_total: cap,
            ..DiscoveryOptions::default()
        }
    }

    fn twelve_urls() -> Vec<Url> {
        urls(&[
            "/",
            "/services",
            "/services/housing",
            "/services/food-bank",
            "/services/legal-aid/intake",
            "/news",
            "/news/2024-gala",
            "/news/volunteer-week",
            "/news/annual-report-published",
            "/about",
            "/about-us",
            "/donate",
        ])
    }

    #[test]
    fn test_aggressive_filter_respects_cap_and_keeps_root() {
        let (out, strategy) = apply_sampling(twelve_urls(), &options(10));
        assert_eq!(strategy, SamplingStrategy::Aggressive);
        assert!(out.len() <= 10);
        assert_eq!(out[0].path(), "/");
    }

    #[test]
    fn test_aggressive_filter_order_and_per_category_bound() {
        let out = aggressive_filter(twelve_urls(), 100);
        assert_eq!(
            paths(&out),
            vec![
                "/",
                "/services",
                "/news",
                "/about",
                "/donate",
                "/services/housing",
                "/services/food-bank",
                "/news/2024-gala",
                "/news/volunteer-week",
            ]
        );
    }

    #[test]
    fn test_aggressive_filter_single_about_variant() {
        let out = aggressive_filter(urls(&["/about-us", "/team/about", "/about"]), 10);
        let about_count = out.iter().filter(|u| is_about_page(u)).count();
        assert_eq!(about_count, 1);
    }

    #[test]
    fn test_aggressive_filter_truncates_to_cap() {
        let out = aggressive_filter(twelve_urls(), 3);
        assert_eq!(paths(&out), vec!["/", "/services", "/news"]);
    }

    #[test]
    fn test_hierarchical_sample_buckets_by_two_segments() {
        let input = urls(&[
            "/programs/youth/camp-registration-2024",
            "/programs/youth/camp",
            "/programs/youth/mentors",
            "/programs/youth/tutoring",
            "/programs/adults",
            "/",
        ]);
        let out = hierarchical_sample(input, 3, 3);
        assert_eq!(
            paths(&out),
            vec![
                "/",
                "/programs/youth/camp",
                "/programs/youth/mentors",
                "/programs/youth/tutoring",
                "/programs/adults",
            ]
        );
    }

    #[test]
    fn test_hierarchical_sample_drops_deep_and_legal_pages() {
        let input = urls(&["/", "/a/b/c/d", "/privacy-policy", "/contact"]);
        let out = hierarchical_sample(input, 3, 3);
        assert_eq!(paths(&out), vec!["/", "/contact"]);
    }

    #[test]
    fn test_limit_categories() {
        let input = urls(&["/", "/blog/a", "/blog/b", "/blog/c", "/shop/x"]);
        let out = limit_categories(input, 2);
        assert_eq!(paths(&out), vec!["/", "/blog/a", "/blog/b", "/shop/x"]);
    }

    #[test]
    fn test_small_set_uses_hierarchical() {
        let input = urls(&["/", "/contact", "/team"]);
        let (out, strategy) = apply_sampling(input, &options(10));
        assert_eq!(strategy, SamplingStrategy::Hierarchical);
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_oversized_set_without_aggressive_still_respects_cap() {
        let opts = DiscoveryOptions {
            aggressive_filtering: false,
            ..options(4)
        };
        let (out, strategy) = apply_sampling(twelve_urls(), &opts);
        assert_eq!(strategy, SamplingStrategy::Hierarchical);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].path(), "/");
    }
}

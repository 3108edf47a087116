//! Deduplication of discovered URLs by [`deduplication_key`]

use crate::url::deduplication_key;
use std::collections::HashMap;
use url::Url;

/// Collapses URLs that share a deduplication key
///
/// Among duplicates the survivor is the non-`www` variant, then the one with
/// fewer query parameters, then the one with the shorter path. The survivor
/// takes the position of the first occurrence.
///
/// Returns the surviving URLs and the number removed.
pub fn deduplicate(urls: Vec<Url>) -> (Vec<Url>, usize) {
    let total = urls.len();
    let mut slots: Vec<Url> = Vec::with_capacity(total);
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for url in urls {
        let key = deduplication_key(url.as_str()).unwrap_or_else(|_| url.to_string());
        match index_by_key.get(&key) {
            Some(&slot) => {
                if preference(&url) < preference(&slots[slot]) {
                    slots[slot] = url;
                }
            }
            None => {
                index_by_key.insert(key, slots.len());
                slots.push(url);
            }
        }
    }

    let removed = total - slots.len();
    (slots, removed)
}

/// Lower sorts first
fn preference(url: &Url) -> (bool, usize, usize) {
    let has_www = url
        .host_str()
        .map(|host| host.to_ascii_lowercase().starts_with("www."))
        .unwrap_or(false);
    (has_www, url.query_pairs().count(), url.path().len())
}

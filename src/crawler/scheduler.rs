//! Crawl frontier
//!
//! The frontier is owned by the coordinator loop. Workers never touch it:
//! they return links and the coordinator decides what gets enqueued.

use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedUrl {
    /// The traversal-normalized URL
    pub url: Url,

    /// Link distance from the start URL
    pub hops: u32,
}

/// FIFO frontier with a seen-set over normalized URLs
///
/// A URL is accepted at most once over the life of the frontier, so a page
/// is never fetched twice.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<QueuedUrl>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier seeded with the start URL
    pub fn seeded(start: Url) -> Self {
        let mut frontier = Self::default();
        frontier.push(start, 0);
        frontier
    }

    /// Enqueues `url` unless it has been seen before
    ///
    /// Returns true if the URL was new.
    pub fn push(&mut self, url: Url, hops: u32) -> bool {
        if !self.seen.insert(url.as_str().to_string()) {
            return false;
        }
        self.queue.push_back(QueuedUrl { url, hops });
        true
    }

    /// Takes the oldest queued URL
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of distinct URLs ever accepted
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Consumes the frontier, yielding unvisited URLs in discovery order
    pub fn into_unvisited(self) -> Vec<Url> {
        self.queue.into_iter().map(|queued| queued.url).collect()
    }
}

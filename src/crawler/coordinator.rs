//! Crawler coordinator - the discovery loop
//!
//! The coordinator owns the frontier and the statistics. Fetches run on a
//! `JoinSet` bounded by the configured concurrency; each finished fetch hands
//! its body back to the loop, which parses it and decides what to enqueue.

use crate::crawler::dedup::deduplicate;
use crate::crawler::parser::parse_html;
use crate::crawler::sampling::apply_sampling;
use crate::crawler::scheduler::{Frontier, QueuedUrl};
use crate::crawler::{build_http_client, fetch_url, DiscoveredUrl, Discovery, DiscoveryOptions, FetchResult};
use crate::output::CrawlStats;
use crate::state::PageState;
use crate::url::{is_same_domain, normalize_url, path_depth, top_category, ExclusionFilter};
use crate::{ConfigError, SweepError};
use reqwest::Client;
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use url::Url;

/// Main discovery coordinator
pub struct Coordinator {
    options: DiscoveryOptions,
    client: Client,
    start_url: Url,
    filter: ExclusionFilter,
    frontier: Frontier,
    stats: CrawlStats,
    excluded: HashSet<String>,
    succeeded: Vec<Url>,
}

impl Coordinator {
    /// Creates a coordinator for `start_url`
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SweepError)` - The start URL is invalid, an exclude pattern
    ///   does not compile, or the HTTP client could not be built
    pub fn new(start_url: &str, options: DiscoveryOptions) -> Result<Self, SweepError> {
        let start_url = normalize_url(start_url)?;

        let filter = ExclusionFilter::new(&options.exclude_patterns)
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;

        let client = build_http_client(
            &options.user_agent,
            Duration::from_millis(options.timeout_ms),
        )?;

        Ok(Self {
            frontier: Frontier::seeded(start_url.clone()),
            options,
            client,
            start_url,
            filter,
            stats: CrawlStats::default(),
            excluded: HashSet::new(),
            succeeded: Vec::new(),
        })
    }

    /// Runs the discovery loop to completion and reduces the result set
    pub async fn run(mut self) -> Discovery {
        tracing::info!("Starting discovery at {}", self.start_url);
        let start_time = Instant::now();

        let concurrency = self.options.concurrency.max(1);
        let mut in_flight: JoinSet<(QueuedUrl, FetchResult)> = JoinSet::new();
        let mut started = 0usize;

        loop {
            while in_flight.len() < concurrency && started < self.options.max_pages {
                let Some(queued) = self.frontier.pop() else {
                    break;
                };
                started += 1;
                tracing::debug!("Fetching {} (hops: {})", queued.url, queued.hops);

                let client = self.client.clone();
                in_flight.spawn(async move {
                    let result = fetch_url(&client, queued.url.as_str()).await;
                    (queued, result)
                });
            }

            let Some(joined) = in_flight.join_next().await else {
                tracing::debug!("Frontier is empty, discovery complete");
                break;
            };

            match joined {
                Ok((queued, result)) => self.handle_result(queued, result),
                Err(e) => tracing::error!("Fetch task failed: {}", e),
            }

            if self.stats.pages_visited % 10 == 0 && self.stats.pages_visited > 0 {
                tracing::info!(
                    "Progress: {} pages visited, {} in frontier",
                    self.stats.pages_visited,
                    self.frontier.len()
                );
            }
        }

        if started >= self.options.max_pages && !self.frontier.is_empty() {
            tracing::info!(
                "Reached max pages ({}), {} URLs left unvisited",
                self.options.max_pages,
                self.frontier.len()
            );
        }

        self.finish(start_time)
    }

    /// Records one fetch outcome and enqueues its links
    fn handle_result(&mut self, queued: QueuedUrl, result: FetchResult) {
        self.stats.pages_visited += 1;

        if let Some((state, reason)) = result.failure() {
            tracing::warn!("Skipping {}: {} ({})", queued.url, reason, state);
            self.stats.record_skipped(queued.url.as_str(), state, reason);
            return;
        }

        let FetchResult::Success { final_url, body, .. } = result else {
            return;
        };

        let base = Url::parse(&final_url).unwrap_or_else(|_| queued.url.clone());
        let parsed = parse_html(&body, &base);
        tracing::debug!(
            "Processed {} ({}): {} links",
            queued.url,
            parsed.title.as_deref().unwrap_or("untitled"),
            parsed.links.len()
        );

        self.stats.pages_succeeded += 1;
        self.succeeded.push(queued.url.clone());

        for link in parsed.links {
            let Ok(normalized) = normalize_url(&link) else {
                continue;
            };
            if !is_same_domain(&self.start_url, &normalized) {
                continue;
            }
            if self.filter.is_excluded(&normalized) {
                if self.excluded.insert(normalized.to_string()) {
                    tracing::trace!("Excluded {} ({})", normalized, PageState::Excluded);
                    self.stats.pages_excluded += 1;
                }
                continue;
            }
            self.frontier.push(normalized, queued.hops + 1);
        }
    }

    /// Builds the result set, deduplicates it and applies sampling
    fn finish(mut self, start_time: Instant) -> Discovery {
        let mut candidates = std::mem::take(&mut self.succeeded);
        candidates.extend(self.frontier.into_unvisited());
        self.stats.total_discovered = candidates.len();

        let (deduped, removed) = deduplicate(candidates);
        self.stats.duplicates_removed = removed;

        let (sampled, strategy) = apply_sampling(deduped, &self.options);
        self.stats.sampling_strategy = strategy;
        self.stats.after_sampling = sampled.len();
        self.stats.final_count = sampled.len();
        self.stats.duration_ms = start_time.elapsed().as_millis() as u64;
        self.stats.log_summary();

        let urls = sampled
            .iter()
            .map(|url| DiscoveredUrl {
                url: url.to_string(),
                depth: path_depth(url),
                category: top_category(url),
            })
            .collect();

        Discovery {
            start_url: self.start_url.to_string(),
            urls,
            stats: self.stats,
            exclude_patterns_used: self.filter.patterns().to_vec(),
            settings: self.options,
        }
    }
}

//! Crawl statistics recorded during URL discovery

use crate::state::PageState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which reduction pass produced the final URL list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingStrategy {
    #[default]
    None,
    Hierarchical,
    Aggressive,
}

impl fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Hierarchical => "hierarchical",
            Self::Aggressive => "aggressive",
        };
        write!(f, "{}", name)
    }
}

/// A page whose fetch did not produce usable HTML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedPage {
    pub url: String,
    pub reason: String,
    pub state: PageState,
}

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStats {
    /// Pages whose fetch was attempted
    pub pages_visited: usize,

    /// Pages fetched as HTML and parsed for links
    pub pages_succeeded: usize,

    /// Pages whose fetch failed, with the reason
    pub pages_skipped: Vec<SkippedPage>,

    /// Distinct same-domain URLs dropped by exclusion rules
    pub pages_excluded: usize,

    /// Size of the result set before deduplication
    pub total_discovered: usize,

    pub duplicates_removed: usize,

    /// Size of the result set after sampling
    pub after_sampling: usize,

    pub final_count: usize,

    pub sampling_strategy: SamplingStrategy,

    pub duration_ms: u64,
}

impl CrawlStats {
    /// Records a failed fetch
    pub fn record_skipped(&mut self, url: impl Into<String>, state: PageState, reason: impl Into<String>) {
        self.pages_skipped.push(SkippedPage {
            url: url.into(),
            reason: reason.into(),
            state,
        });
    }

    /// Count of skipped pages per failure state
    pub fn skipped_by_state(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for page in &self.pages_skipped {
            *counts.entry(page.state.as_str().to_string()).or_insert(0) += 1;
        }
        counts
    }

    /// Logs a one-paragraph summary at info level
    pub fn log_summary(&self) {
        tracing::info!(
            "Discovery finished in {:.1}s: {} visited, {} succeeded, {} skipped, {} excluded",
            self.duration_ms as f64 / 1000.0,
            self.pages_visited,
            self.pages_succeeded,
            self.pages_skipped.len(),
            self.pages_excluded
        );
        tracing::info!(
            "{} discovered, {} duplicates removed, {} after {} sampling, {} final",
            self.total_discovered,
            self.duplicates_removed,
            self.after_sampling,
            self.sampling_strategy,
            self.final_count
        );
        for (state, count) in self.skipped_by_state() {
            tracing::debug!("  {}: {}", state, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_skipped_and_group() {
        let mut stats = CrawlStats::default();
        stats.record_skipped("https://example.com/a", PageState::DeadLink, "HTTP 404");
        stats.record_skipped("https://example.com/b", PageState::DeadLink, "HTTP 410");
        stats.record_skipped("https://example.com/c", PageState::Timeout, "Request timeout");

        let grouped = stats.skipped_by_state();
        assert_eq!(grouped.get("dead_link"), Some(&2));
        assert_eq!(grouped.get("timeout"), Some(&1));
    }

    #[test]
    fn test_serialized_field_names() {
        let stats = CrawlStats {
            sampling_strategy: SamplingStrategy::Aggressive,
            ..CrawlStats::default()
        };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["samplingStrategy"], "aggressive");
        assert!(json["pagesSkipped"].is_array());
        assert_eq!(json["duplicatesRemoved"], 0);
    }
}

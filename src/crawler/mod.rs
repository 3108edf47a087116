//! Crawler module for URL discovery
//!
//! This module contains the discovery logic, including:
//! - HTTP fetching with per-request timeouts
//! - HTML parsing and link extraction
//! - The frontier and the bounded-concurrency coordinator loop
//! - Deduplication and sampling of the discovered set

mod coordinator;
pub mod dedup;
mod fetcher;
mod parser;
pub mod sampling;
mod scheduler;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, fetch_url, FetchResult, DEFAULT_USER_AGENT};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::{Frontier, QueuedUrl};

use crate::config::AnalysisOptions;
use crate::output::CrawlStats;
use crate::SweepError;
use serde::{Deserialize, Serialize};

/// Tuning for one discovery run
///
/// Serialized into `urls.json` as the `settings` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryOptions {
    /// Maximum number of pages fetched
    pub max_pages: usize,

    /// Fetches in flight at once
    pub concurrency: usize,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// Hard cap on the returned URL list
    pub max_urls_total: usize,

    pub max_depth: usize,
    pub samples_per_category: usize,
    pub category_limit: usize,

    /// When false the result set is only truncated to the cap
    pub enable_sampling: bool,

    pub aggressive_filtering: bool,

    /// Regex patterns excluded in addition to the defaults
    pub exclude_patterns: Vec<String>,

    pub user_agent: String,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::from(&AnalysisOptions::default())
    }
}

impl From<&AnalysisOptions> for DiscoveryOptions {
    fn from(options: &AnalysisOptions) -> Self {
        Self {
            max_pages: options.max_pages as usize,
            concurrency: options.concurrency as usize,
            timeout_ms: options.effective_timeout_ms(),
            max_urls_total: options.max_urls_total as usize,
            max_depth: options.max_depth as usize,
            samples_per_category: options.samples_per_category as usize,
            category_limit: options.category_limit as usize,
            enable_sampling: true,
            aggressive_filtering: options.aggressive_filtering,
            exclude_patterns: options.exclude_patterns.clone(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// One entry of the discovered URL set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredUrl {
    pub url: String,

    /// Number of path segments; 0 for the root
    pub depth: usize,

    /// First path segment, or `root`
    pub category: String,
}

/// Result of a discovery run
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Normalized start URL
    pub start_url: String,
    pub urls: Vec<DiscoveredUrl>,
    pub stats: CrawlStats,
    pub exclude_patterns_used: Vec<String>,
    pub settings: DiscoveryOptions,
}

impl Discovery {
    /// The final URLs as plain strings, in order
    pub fn url_strings(&self) -> Vec<String> {
        self.urls.iter().map(|u| u.url.clone()).collect()
    }
}

/// Discovers same-domain URLs starting from `start_url`
///
/// Per-page failures are recorded in the returned statistics. The call only
/// fails when the start URL is invalid, an exclude pattern does not compile,
/// or the HTTP client cannot be built.
///
/// # Example
///
/// ```no_run
/// use ux_sweep::crawler::{discover, DiscoveryOptions};
///
/// # async fn example() -> Result<(), ux_sweep::SweepError> {
/// let discovery = discover("https://example.com", &DiscoveryOptions::default()).await?;
/// for url in &discovery.urls {
///     println!("{} ({})", url.url, url.category);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn discover(start_url: &str, options: &DiscoveryOptions) -> Result<Discovery, SweepError> {
    let coordinator = Coordinator::new(start_url, options.clone())?;
    Ok(coordinator.run().await)
}

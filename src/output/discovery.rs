//! `urls.json` and `urls_simple.json` writers for the discovery stage

use crate::crawler::{DiscoveredUrl, Discovery, DiscoveryOptions};
use crate::output::{read_json, write_json, CrawlStats};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

/// Full discovery record
pub const URLS_FILE: &str = "urls.json";

/// Plain array of the final URLs, consumed by later stages
pub const URLS_SIMPLE_FILE: &str = "urls_simple.json";

/// On-disk shape of `urls.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlsFile {
    pub timestamp: String,
    pub start_url: String,
    pub total_final_urls: usize,
    pub crawl_stats: CrawlStats,
    pub urls: Vec<DiscoveredUrl>,
    pub exclude_patterns_used: Vec<String>,
    pub settings: DiscoveryOptions,
}

/// Writes both discovery files into `dir`, creating it if needed
///
/// Returns the path of `urls_simple.json`.
pub fn write_discovery(dir: &Path, discovery: &Discovery) -> io::Result<PathBuf> {
    let record = UrlsFile {
        timestamp: chrono::Utc::now().to_rfc3339(),
        start_url: discovery.start_url.clone(),
        total_final_urls: discovery.urls.len(),
        crawl_stats: discovery.stats.clone(),
        urls: discovery.urls.clone(),
        exclude_patterns_used: discovery.exclude_patterns_used.clone(),
        settings: discovery.settings.clone(),
    };
    write_json(&dir.join(URLS_FILE), &record)?;

    let simple_path = dir.join(URLS_SIMPLE_FILE);
    write_json(&simple_path, &discovery.url_strings())?;

    tracing::info!(
        "Wrote {} URLs to {}",
        discovery.urls.len(),
        simple_path.display()
    );
    Ok(simple_path)
}

/// Reads the plain URL list written by [`write_discovery`]
pub fn read_url_list(path: &Path) -> io::Result<Vec<String>> {
    read_json(path)
}

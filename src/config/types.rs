use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure for ux-sweep
///
/// A configuration file holds global pipeline settings plus any number of
/// named presets. Each preset is one analysis target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub presets: BTreeMap<String, Preset>,
}

/// Pipeline-wide settings shared by every preset
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PipelineConfig {
    /// Directory under which run directories are created
    pub output_dir: String,

    /// Headless browser used by the screenshot stage
    pub chrome_binary: String,

    /// Performance audit CLI used by the audit stage
    pub lighthouse_binary: String,

    /// Base URL of the OpenAI-compatible chat completions API
    pub api_base_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: "./runs".to_string(),
            chrome_binary: "google-chrome".to_string(),
            lighthouse_binary: "lighthouse".to_string(),
            api_base_url: "https://api.openai.com/v1".to_string(),
        }
    }
}

/// A named analysis target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Start URL of the site to analyze
    #[serde(rename = "URL")]
    pub url: String,

    #[serde(rename = "ORG_NAME")]
    pub organization_name: String,

    #[serde(rename = "ORG_TYPE", default)]
    pub organization_type: String,

    #[serde(rename = "ORG_PURPOSE", default)]
    pub organization_purpose: String,

    #[serde(rename = "ANALYSIS_OPTIONS", default)]
    pub analysis_options: AnalysisOptions,
}

/// Per-preset tuning of crawl, capture and analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    /// Maximum number of pages the crawler visits
    pub max_pages: u32,

    /// Per-request timeout in milliseconds
    pub timeout: u64,

    /// Cheaper capture and audit settings
    pub fast_mode: bool,

    /// Hard cap on the number of URLs handed to later stages
    pub max_urls_total: u32,

    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Model used for the per-page analysis
    pub llm_model: String,

    /// Number of model calls in flight at once
    pub llm_concurrency: u32,

    /// Model used to reformat free text into structured JSON
    pub formatting_model: String,

    /// Number of pages fetched in parallel during discovery
    pub concurrency: u32,

    /// Maximum path depth kept by the hierarchical sampler
    pub max_depth: u32,

    /// Items kept per two-segment category by the hierarchical sampler
    pub samples_per_category: u32,

    /// URLs kept per top-level segment after sampling
    pub category_limit: u32,

    /// Use the aggressive filter when the URL set exceeds the cap
    pub aggressive_filtering: bool,

    /// Extra regex patterns excluded from the crawl
    pub exclude_patterns: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_pages: 50,
            timeout: 30_000,
            fast_mode: false,
            max_urls_total: 20,
            viewport_width: 1440,
            viewport_height: 900,
            llm_model: "gpt-4o".to_string(),
            llm_concurrency: 3,
            formatting_model: "gpt-4o-mini".to_string(),
            concurrency: 5,
            max_depth: 3,
            samples_per_category: 3,
            category_limit: 5,
            aggressive_filtering: true,
            exclude_patterns: Vec::new(),
        }
    }
}

impl AnalysisOptions {
    /// Effective crawl timeout in milliseconds (halved in fast mode)
    pub fn effective_timeout_ms(&self) -> u64 {
        if self.fast_mode {
            (self.timeout / 2).max(1_000)
        } else {
            self.timeout
        }
    }
}

//! ux-sweep: a batch UX analysis pipeline
//!
//! This crate crawls a target website, captures screenshots and performance
//! audits per page, asks a hosted language model for a qualitative UX review,
//! and turns the model's free-text output into a strictly shaped report.
//!
//! The pipeline is driven per preset by the [`orchestrator`], which checkpoints
//! every stage into a dedicated run directory.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod output;
pub mod stages;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for ux-sweep operations
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: state::RunState,
        to: state::RunState,
    },

    #[error("Stage error: {0}")]
    Stage(#[from] stages::StageError),

    #[error("Model error: {0}")]
    Llm(#[from] llm::LlmError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid exclude pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for ux-sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{AnalysisOptions, Config, Preset};
pub use crawler::{discover, Discovery, DiscoveryOptions};
pub use extract::{validate_report, PageAnalysisRecord, Report, ValidationResult};
pub use orchestrator::{BatchReport, Orchestrator, RunOptions};
pub use state::{PageState, RunState};
pub use url::{deduplication_key, extract_domain, normalize_url};

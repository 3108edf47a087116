//! Configuration module for ux-sweep
//!
//! This module handles loading, parsing, and validating preset files.
//!
//! # Example
//!
//! ```no_run
//! use ux_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("presets.toml")).unwrap();
//! for (key, preset) in &config.presets {
//!     println!("{} -> {}", key, preset.url);
//! }
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{AnalysisOptions, Config, PipelineConfig, Preset};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, parse_json_presets, preset_hash,
};
pub use validation::{validate_preset, validate_preset_key};

use crate::config::types::{Config, Preset};
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Loads and parses a preset configuration file from the given path
///
/// Files ending in `.json` are read as a plain mapping of preset key to
/// preset. Anything else is parsed as TOML with an optional `[pipeline]`
/// table and one `[presets.<key>]` table per preset.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use ux_sweep::config::load_config;
///
/// let config = load_config(Path::new("presets.toml")).unwrap();
/// println!("{} presets loaded", config.presets.len());
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        parse_json_presets(&content)?
    } else {
        toml::from_str::<Config>(&content)?
    };

    validate(&config)?;

    Ok(config)
}

/// Parses the JSON preset format: `{ "<key>": { "URL": ..., ... }, ... }`
pub fn parse_json_presets(content: &str) -> Result<Config, ConfigError> {
    let presets: BTreeMap<String, Preset> = serde_json::from_str(content)?;
    Ok(Config {
        presets,
        ..Config::default()
    })
}

/// Computes a SHA-256 hash of the configuration file content
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Computes a stable SHA-256 hash of a single preset
///
/// Stored in each run record so a resumed run can be traced back to the
/// exact preset settings it was started with.
pub fn preset_hash(preset: &Preset) -> String {
    let serialized = serde_json::to_string(preset).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hex::encode(hasher.finalize())
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

use crate::config::types::{AnalysisOptions, Config, PipelineConfig, Preset};
use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_pipeline_config(&config.pipeline)?;

    if config.presets.is_empty() {
        return Err(ConfigError::Validation(
            "configuration must define at least one preset".to_string(),
        ));
    }

    for (key, preset) in &config.presets {
        validate_preset_key(key)?;
        validate_preset(key, preset)?;
    }

    Ok(())
}

/// Validates pipeline-wide settings
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.output_dir.is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    Url::parse(&config.api_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid api-base-url: {}", e)))?;

    Ok(())
}

/// Validates a preset key; it becomes part of a directory name
pub fn validate_preset_key(key: &str) -> Result<(), ConfigError> {
    if key.is_empty() {
        return Err(ConfigError::Validation(
            "preset key cannot be empty".to_string(),
        ));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "preset key must contain only ASCII alphanumerics, '-' and '_', got '{}'",
            key
        )));
    }

    Ok(())
}

/// Validates a single preset
pub fn validate_preset(key: &str, preset: &Preset) -> Result<(), ConfigError> {
    let url = Url::parse(&preset.url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Preset '{}' has invalid URL '{}': {}", key, preset.url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Preset '{}' URL must use http or https, got '{}'",
            key,
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "Preset '{}' URL has no host",
            key
        )));
    }

    if preset.organization_name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "Preset '{}' must set ORG_NAME",
            key
        )));
    }

    validate_analysis_options(key, &preset.analysis_options)
}

/// Validates analysis options
fn validate_analysis_options(key: &str, options: &AnalysisOptions) -> Result<(), ConfigError> {
    if options.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': maxPages must be >= 1",
            key
        )));
    }

    if options.max_urls_total < 1 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': maxUrlsTotal must be >= 1",
            key
        )));
    }

    if options.timeout < 1_000 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': timeout must be >= 1000ms, got {}ms",
            key, options.timeout
        )));
    }

    if options.concurrency < 1 || options.concurrency > 50 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': concurrency must be between 1 and 50, got {}",
            key, options.concurrency
        )));
    }

    if options.llm_concurrency < 1 || options.llm_concurrency > 20 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': llmConcurrency must be between 1 and 20, got {}",
            key, options.llm_concurrency
        )));
    }

    if options.viewport_width < 320 || options.viewport_height < 240 {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': viewport {}x{} is too small",
            key, options.viewport_width, options.viewport_height
        )));
    }

    if options.llm_model.trim().is_empty() || options.formatting_model.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "Preset '{}': llmModel and formattingModel cannot be empty",
            key
        )));
    }

    for pattern in &options.exclude_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("Preset '{}': '{}': {}", key, pattern, e))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset(url: &str) -> Preset {
        Preset {
            url: url.to_string(),
            organization_name: "Acme".to_string(),
            organization_type: "nonprofit".to_string(),
            organization_purpose: "Services".to_string(),
            analysis_options: AnalysisOptions::default(),
        }
    }

    #[test]
    fn test_validate_preset_key() {
        assert!(validate_preset_key("acme").is_ok());
        assert!(validate_preset_key("acme-org_2").is_ok());

        assert!(validate_preset_key("").is_err());
        assert!(validate_preset_key("acme org").is_err());
        assert!(validate_preset_key("../escape").is_err());
    }

    #[test]
    fn test_validate_preset_url() {
        assert!(validate_preset("a", &preset("https://acme.org")).is_ok());
        assert!(validate_preset("a", &preset("http://localhost:8080/")).is_ok());

        assert!(validate_preset("a", &preset("not a url")).is_err());
        assert!(validate_preset("a", &preset("ftp://acme.org")).is_err());
    }

    #[test]
    fn test_validate_requires_org_name() {
        let mut p = preset("https://acme.org");
        p.organization_name = "  ".to_string();
        assert!(matches!(
            validate_preset("a", &p),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_llm_concurrency_bounds() {
        let mut p = preset("https://acme.org");
        p.analysis_options.llm_concurrency = 0;
        assert!(validate_preset("a", &p).is_err());

        p.analysis_options.llm_concurrency = 21;
        assert!(validate_preset("a", &p).is_err());
    }

    #[test]
    fn test_validate_exclude_patterns() {
        let mut p = preset("https://acme.org");
        p.analysis_options.exclude_patterns = vec![r"/events/\d+".to_string()];
        assert!(validate_preset("a", &p).is_ok());

        p.analysis_options.exclude_patterns = vec!["([unclosed".to_string()];
        assert!(matches!(
            validate_preset("a", &p),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(validate(&Config::default()).is_err());
    }
}

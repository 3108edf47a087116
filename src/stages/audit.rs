//! Stage 3: performance audits
//!
//! Raw reports land in `3_lighthouse/reports/`; the handful of metrics the
//! analysis prompt needs are trimmed into `3_lighthouse/trimmed/`.

use crate::output::{read_json, read_url_list, write_json};
use crate::stages::{run_tool, Stage, StageContext, StageError, StageKind, StageOutput};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const ALL_CATEGORIES: &str = "performance,accessibility,best-practices,seo";

/// Key metrics of one audit report
///
/// Category scores are 0-100; timings are milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetrics {
    pub url: String,
    pub performance_score: Option<f64>,
    pub accessibility_score: Option<f64>,
    pub best_practices_score: Option<f64>,
    pub seo_score: Option<f64>,
    pub first_contentful_paint_ms: Option<f64>,
    pub largest_contentful_paint_ms: Option<f64>,
    pub total_blocking_time_ms: Option<f64>,
    pub cumulative_layout_shift: Option<f64>,
    pub speed_index_ms: Option<f64>,
    pub time_to_interactive_ms: Option<f64>,
}

impl AuditMetrics {
    /// One line per known metric, for prompts
    pub fn describe(&self) -> String {
        let rows = [
            ("Performance score", self.performance_score, ""),
            ("Accessibility score", self.accessibility_score, ""),
            ("Best practices score", self.best_practices_score, ""),
            ("SEO score", self.seo_score, ""),
            ("First Contentful Paint", self.first_contentful_paint_ms, " ms"),
            ("Largest Contentful Paint", self.largest_contentful_paint_ms, " ms"),
            ("Total Blocking Time", self.total_blocking_time_ms, " ms"),
            ("Cumulative Layout Shift", self.cumulative_layout_shift, ""),
            ("Speed Index", self.speed_index_ms, " ms"),
            ("Time to Interactive", self.time_to_interactive_ms, " ms"),
        ];

        let mut text = String::new();
        for (label, value, unit) in rows {
            if let Some(value) = value {
                let _ = writeln!(text, "- {}: {}{}", label, format_metric(value), unit);
            }
        }
        if text.is_empty() {
            text.push_str("- no metrics available\n");
        }
        text
    }
}

fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Extracts key metrics from a raw audit report
///
/// Missing categories or audits become `None`; the report shape is never
/// trusted.
pub fn trim_report(url: &str, report: &Value) -> AuditMetrics {
    let category = |name: &str| {
        report
            .pointer(&format!("/categories/{}/score", name))
            .and_then(Value::as_f64)
            .map(|score| (score * 100.0).round())
    };
    let audit = |name: &str| {
        report
            .pointer(&format!("/audits/{}/numericValue", name))
            .and_then(Value::as_f64)
            .map(|value| (value * 100.0).round() / 100.0)
    };

    AuditMetrics {
        url: report
            .get("finalUrl")
            .or_else(|| report.get("requestedUrl"))
            .and_then(Value::as_str)
            .unwrap_or(url)
            .to_string(),
        performance_score: category("performance"),
        accessibility_score: category("accessibility"),
        best_practices_score: category("best-practices"),
        seo_score: category("seo"),
        first_contentful_paint_ms: audit("first-contentful-paint"),
        largest_contentful_paint_ms: audit("largest-contentful-paint"),
        total_blocking_time_ms: audit("total-blocking-time"),
        cumulative_layout_shift: audit("cumulative-layout-shift"),
        speed_index_ms: audit("speed-index"),
        time_to_interactive_ms: audit("interactive"),
    }
}

/// Something that can audit a URL into a JSON report file
#[async_trait]
pub trait PerformanceAudit: Send + Sync {
    async fn audit(&self, url: &str, output: &Path, fast_mode: bool) -> Result<(), StageError>;
}

/// The `lighthouse` command-line tool
#[derive(Debug, Clone)]
pub struct LighthouseCli {
    binary: String,
    timeout: Duration,
}

impl LighthouseCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            timeout: Duration::from_secs(180),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PerformanceAudit for LighthouseCli {
    async fn audit(&self, url: &str, output: &Path, fast_mode: bool) -> Result<(), StageError> {
        let categories = if fast_mode { "performance" } else { ALL_CATEGORIES };

        let mut command = tokio::process::Command::new(&self.binary);
        command
            .arg(url)
            .arg("--output=json")
            .arg(format!("--output-path={}", output.display()))
            .arg(format!("--only-categories={}", categories))
            .arg("--chrome-flags=--headless=new --no-sandbox")
            .arg("--quiet");

        run_tool(command, &self.binary, self.timeout).await
    }
}

/// Audits every discovered URL
pub struct AuditStage {
    audit: Arc<dyn PerformanceAudit>,
}

impl AuditStage {
    pub fn new(audit: impl PerformanceAudit + 'static) -> Self {
        Self {
            audit: Arc::new(audit),
        }
    }
}

#[async_trait]
impl Stage for AuditStage {
    fn kind(&self) -> StageKind {
        StageKind::Lighthouse
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        ctx.require_inputs(StageKind::Lighthouse)?;

        let urls = read_url_list(&ctx.layout.urls_simple_file())?;
        let reports_dir = ctx.layout.lighthouse_reports_dir();
        tokio::fs::create_dir_all(&reports_dir).await?;
        tokio::fs::create_dir_all(ctx.layout.lighthouse_trimmed_dir()).await?;

        let fast_mode = ctx.preset.analysis_options.fast_mode;
        let mut output = StageOutput::default();

        for (index, url) in urls.iter().enumerate() {
            tracing::info!("Auditing [{}/{}] {}", index + 1, urls.len(), url);
            let report_path = reports_dir.join(format!("{}.json", super::url_slug(url)));

            if let Err(e) = self.audit.audit(url, &report_path, fast_mode).await {
                tracing::warn!("Audit failed for {}: {}", url, e);
                output.item_failed(format!("{}: {}", url, e));
                continue;
            }

            let report: Value = match read_json(&report_path) {
                Ok(report) => report,
                Err(e) => {
                    tracing::warn!("Unreadable audit report for {}: {}", url, e);
                    output.item_failed(format!("{}: unreadable report: {}", url, e));
                    continue;
                }
            };

            let trimmed_path = ctx.layout.trimmed_file(url);
            let mut metrics = trim_report(url, &report);
            // Evidence is joined on the requested URL, not wherever it redirected.
            metrics.url = url.clone();
            write_json(&trimmed_path, &metrics)?;

            output.items_ok += 1;
            output.artifact(report_path);
            output.artifact(trimmed_path);
        }

        if output.items_ok == 0 {
            return Err(StageError::NoOutput {
                stage: StageKind::Lighthouse,
                reason: format!("all {} audits failed", urls.len()),
            });
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trim_report() {
        let report = json!({
            "finalUrl": "https://example.com/",
            "categories": {
                "performance": {"score": 0.874},
                "seo": {"score": 1.0}
            },
            "audits": {
                "first-contentful-paint": {"numericValue": 1234.567},
                "cumulative-layout-shift": {"numericValue": 0.0123},
                "speed-index": {"score": 0.5}
            }
        });

        let metrics = trim_report("https://example.com", &report);
        assert_eq!(metrics.url, "https://example.com/");
        assert_eq!(metrics.performance_score, Some(87.0));
        assert_eq!(metrics.seo_score, Some(100.0));
        assert_eq!(metrics.accessibility_score, None);
        assert_eq!(metrics.first_contentful_paint_ms, Some(1234.57));
        assert_eq!(metrics.cumulative_layout_shift, Some(0.01));
        assert_eq!(metrics.speed_index_ms, None);
    }

    #[test]
    fn test_trim_garbage_report() {
        let metrics = trim_report("https://example.com/x", &json!(["not", "a", "report"]));
        assert_eq!(metrics.url, "https://example.com/x");
        assert_eq!(metrics.performance_score, None);
        assert_eq!(metrics.describe(), "- no metrics available\n");
    }

    #[test]
    fn test_describe_lists_known_metrics() {
        let metrics = AuditMetrics {
            url: "https://example.com/".to_string(),
            performance_score: Some(92.0),
            largest_contentful_paint_ms: Some(2500.5),
            ..AuditMetrics::default()
        };
        let text = metrics.describe();
        assert!(text.contains("- Performance score: 92\n"));
        assert!(text.contains("- Largest Contentful Paint: 2500.50 ms\n"));
        assert!(!text.contains("SEO"));
    }
}

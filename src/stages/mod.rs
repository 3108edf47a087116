//! Pipeline stages
//!
//! Each stage reads the artifacts of earlier stages from the run directory and
//! writes its own under a dedicated subdirectory before the next one starts.
//!
//! # Components
//!
//! - `discovery`: crawls the preset's site into `1_url_discovery/`
//! - `capture`: screenshots into `2_screenshots/desktop/`
//! - `audit`: performance audits into `3_lighthouse/`
//! - `analysis`: model analysis and formatting into `4_llm_analysis_and_formatting/`
//! - `report`: the final `index.html`

pub mod analysis;
pub mod audit;
pub mod capture;
pub mod discovery;
pub mod report;

use crate::config::{PipelineConfig, Preset};
use crate::llm::LlmError;
use crate::output::{URLS_FILE, URLS_SIMPLE_FILE};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use analysis::AnalysisStage;
pub use audit::AuditStage;
pub use capture::CaptureStage;
pub use discovery::DiscoveryStage;
pub use report::ReportStage;

/// File name of the model analyses
pub const ANALYSIS_FILE: &str = "analysis.json";

/// File name of the validated structured report
pub const STRUCTURED_FILE: &str = "structured-analysis.json";

/// File name of the rendered report
pub const REPORT_FILE: &str = "index.html";

/// File name of the per-run status record
pub const RUN_RECORD_FILE: &str = "run.json";

const MAX_SLUG_LEN: usize = 120;

/// The five ordered pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    UrlDiscovery,
    Screenshots,
    Lighthouse,
    Analysis,
    Report,
}

impl StageKind {
    pub const ALL: [StageKind; 5] = [
        Self::UrlDiscovery,
        Self::Screenshots,
        Self::Lighthouse,
        Self::Analysis,
        Self::Report,
    ];

    /// 1-based position in the pipeline
    pub fn number(&self) -> u8 {
        match self {
            Self::UrlDiscovery => 1,
            Self::Screenshots => 2,
            Self::Lighthouse => 3,
            Self::Analysis => 4,
            Self::Report => 5,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.number() == number)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UrlDiscovery => "url_discovery",
            Self::Screenshots => "screenshots",
            Self::Lighthouse => "lighthouse",
            Self::Analysis => "analysis",
            Self::Report => "report",
        }
    }

    /// Subdirectory of the run directory owned by this stage
    ///
    /// The report stage writes directly into the run directory.
    pub fn dir_name(&self) -> Option<&'static str> {
        match self {
            Self::UrlDiscovery => Some("1_url_discovery"),
            Self::Screenshots => Some("2_screenshots"),
            Self::Lighthouse => Some("3_lighthouse"),
            Self::Analysis => Some("4_llm_analysis_and_formatting"),
            Self::Report => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Paths inside one run directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLayout {
    root: PathBuf,
}

impl RunLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stage_dir(&self, kind: StageKind) -> PathBuf {
        match kind.dir_name() {
            Some(name) => self.root.join(name),
            None => self.root.clone(),
        }
    }

    pub fn urls_file(&self) -> PathBuf {
        self.stage_dir(StageKind::UrlDiscovery).join(URLS_FILE)
    }

    pub fn urls_simple_file(&self) -> PathBuf {
        self.stage_dir(StageKind::UrlDiscovery).join(URLS_SIMPLE_FILE)
    }

    pub fn screenshots_dir(&self) -> PathBuf {
        self.stage_dir(StageKind::Screenshots).join("desktop")
    }

    pub fn screenshot_file(&self, url: &str) -> PathBuf {
        self.screenshots_dir().join(format!("{}.png", url_slug(url)))
    }

    pub fn lighthouse_reports_dir(&self) -> PathBuf {
        self.stage_dir(StageKind::Lighthouse).join("reports")
    }

    pub fn lighthouse_trimmed_dir(&self) -> PathBuf {
        self.stage_dir(StageKind::Lighthouse).join("trimmed")
    }

    pub fn trimmed_file(&self, url: &str) -> PathBuf {
        self.lighthouse_trimmed_dir().join(format!("{}.json", url_slug(url)))
    }

    pub fn analysis_file(&self) -> PathBuf {
        self.stage_dir(StageKind::Analysis).join(ANALYSIS_FILE)
    }

    pub fn structured_file(&self) -> PathBuf {
        self.stage_dir(StageKind::Analysis).join(STRUCTURED_FILE)
    }

    pub fn report_file(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    pub fn run_record_file(&self) -> PathBuf {
        self.root.join(RUN_RECORD_FILE)
    }

    /// Artifacts that must exist before `kind` can run
    pub fn declared_inputs(&self, kind: StageKind) -> Vec<PathBuf> {
        match kind {
            StageKind::UrlDiscovery => Vec::new(),
            StageKind::Screenshots | StageKind::Lighthouse => vec![self.urls_simple_file()],
            StageKind::Analysis => vec![self.urls_simple_file(), self.screenshots_dir()],
            StageKind::Report => vec![self.structured_file()],
        }
    }

    /// First declared input of `kind` that is missing on disk
    pub fn missing_input(&self, kind: StageKind) -> Option<PathBuf> {
        self.declared_inputs(kind).into_iter().find(|path| !path.exists())
    }
}

/// Everything a stage needs to run for one preset
#[derive(Debug, Clone)]
pub struct StageContext {
    pub preset_key: String,
    pub preset: Preset,
    pub pipeline: PipelineConfig,
    pub layout: RunLayout,
}

impl StageContext {
    /// Fails with a precondition error if a declared input of `kind` is missing
    pub fn require_inputs(&self, kind: StageKind) -> Result<(), StageError> {
        match self.layout.missing_input(kind) {
            Some(path) => Err(StageError::Precondition { stage: kind, path }),
            None => Ok(()),
        }
    }
}

/// What a stage produced
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub artifacts: Vec<PathBuf>,
    pub items_ok: usize,
    pub items_failed: usize,
    /// Per-item diagnostics, kept for the orchestrator's logs
    pub log: Vec<String>,
}

impl StageOutput {
    pub fn artifact(&mut self, path: impl Into<PathBuf>) {
        self.artifacts.push(path.into());
    }

    /// Records a failed item
    pub fn item_failed(&mut self, message: impl Into<String>) {
        self.items_failed += 1;
        self.log.push(message.into());
    }
}

/// Errors that abort a stage, and with it the preset
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{stage} requires {} which does not exist", .path.display())]
    Precondition { stage: StageKind, path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} produced no usable output: {reason}")]
    NoOutput { stage: StageKind, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    #[error("{tool} failed: {message}")]
    Tool {
        tool: String,
        message: String,
        /// Captured stdout/stderr of the tool
        output: String,
    },
}

impl StageError {
    /// Captured tool output, if the error carries any
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Self::Tool { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// One step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    /// Checks configuration before any stage of the preset runs
    fn preflight(&self, _preset: &Preset, _pipeline: &PipelineConfig) -> Result<(), StageError> {
        Ok(())
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError>;
}

/// Ordered stages run for every preset
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five production stages
    pub fn standard(config: &PipelineConfig) -> Self {
        Self::new()
            .with_stage(DiscoveryStage)
            .with_stage(CaptureStage::new(capture::ChromeScreenshot::new(
                &config.chrome_binary,
            )))
            .with_stage(AuditStage::new(audit::LighthouseCli::new(
                &config.lighthouse_binary,
            )))
            .with_stage(AnalysisStage::new())
            .with_stage(ReportStage)
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stages at or after `start`, in pipeline order
    pub fn stages_from(
        &self,
        start: StageKind,
    ) -> impl Iterator<Item = &(dyn Stage + 'static)> + '_ {
        self.stages
            .iter()
            .map(|stage| stage.as_ref())
            .filter(move |stage| stage.kind() >= start)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Runs an external tool to completion within `timeout`
///
/// A non-zero exit, a spawn failure and a timeout all become
/// [`StageError::Tool`] carrying whatever the tool printed.
pub(crate) async fn run_tool(
    mut command: tokio::process::Command,
    tool: &str,
    timeout: std::time::Duration,
) -> Result<(), StageError> {
    command.kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(StageError::Tool {
                tool: tool.to_string(),
                message: format!("could not start: {}", e),
                output: String::new(),
            })
        }
        Err(_) => {
            return Err(StageError::Tool {
                tool: tool.to_string(),
                message: format!("timed out after {}s", timeout.as_secs()),
                output: String::new(),
            })
        }
    };

    if output.status.success() {
        return Ok(());
    }

    let mut captured = String::from_utf8_lossy(&output.stderr).into_owned();
    captured.push_str(&String::from_utf8_lossy(&output.stdout));
    Err(StageError::Tool {
        tool: tool.to_string(),
        message: format!("exited with {}", output.status),
        output: captured.trim().to_string(),
    })
}

/// File stem for per-URL artifacts
///
/// Screenshots and audits of the same URL share a stem, which is how the
/// analysis stage joins them. Long URLs are cut and suffixed with a hash so
/// stems stay unique.
pub fn url_slug(url: &str) -> String {
    let without_scheme = url
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(url);

    let mut slug = String::with_capacity(without_scheme.len());
    for c in without_scheme.chars() {
        if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('_') {
            slug.push('_');
        }
    }
    let slug = slug.trim_matches('_');

    if slug.len() <= MAX_SLUG_LEN {
        return slug.to_string();
    }

    let digest = hex::encode(Sha256::digest(url.as_bytes()));
    format!("{}_{}", &slug[..MAX_SLUG_LEN], &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_numbers_round_trip() {
        for kind in StageKind::ALL {
            assert_eq!(StageKind::from_number(kind.number()), Some(kind));
        }
        assert_eq!(StageKind::from_number(0), None);
        assert_eq!(StageKind::from_number(6), None);
        assert!(StageKind::UrlDiscovery < StageKind::Report);
    }

    #[test]
    fn test_layout_paths() {
        let layout = RunLayout::new("/tmp/run_demo_20240101_120000");
        assert_eq!(
            layout.urls_simple_file(),
            PathBuf::from("/tmp/run_demo_20240101_120000/1_url_discovery/urls_simple.json")
        );
        assert_eq!(
            layout.screenshots_dir(),
            PathBuf::from("/tmp/run_demo_20240101_120000/2_screenshots/desktop")
        );
        assert_eq!(
            layout.structured_file(),
            PathBuf::from(
                "/tmp/run_demo_20240101_120000/4_llm_analysis_and_formatting/structured-analysis.json"
            )
        );
        assert_eq!(
            layout.report_file(),
            PathBuf::from("/tmp/run_demo_20240101_120000/index.html")
        );
    }

    #[test]
    fn test_missing_input_reports_first_absent_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let layout = RunLayout::new(dir.path());

        assert_eq!(layout.missing_input(StageKind::UrlDiscovery), None);
        assert_eq!(
            layout.missing_input(StageKind::Analysis),
            Some(layout.urls_simple_file())
        );

        std::fs::create_dir_all(layout.stage_dir(StageKind::UrlDiscovery)).unwrap();
        std::fs::write(layout.urls_simple_file(), "[]").unwrap();
        assert_eq!(layout.missing_input(StageKind::Screenshots), None);
        assert_eq!(
            layout.missing_input(StageKind::Analysis),
            Some(layout.screenshots_dir())
        );
    }

    #[test]
    fn test_url_slug() {
        assert_eq!(url_slug("https://example.com/"), "example.com");
        assert_eq!(url_slug("https://example.com/about/team"), "example.com_about_team");
        assert_eq!(url_slug("https://Example.com/a?b=1"), "example.com_a_b_1");

        let long = format!("https://example.com/{}", "x".repeat(300));
        let slug = url_slug(&long);
        assert_eq!(slug.len(), MAX_SLUG_LEN + 9);
        assert_ne!(slug, url_slug(&format!("{}y", long)));
    }
}

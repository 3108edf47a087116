//! Stage 4: model analysis and formatting
//!
//! Pages are analyzed from their screenshot plus, when present, their trimmed
//! audit metrics. The free-text analyses are written to `analysis.json`, then
//! formatted and validated into `structured-analysis.json`.

use crate::config::{PipelineConfig, Preset};
use crate::extract::{Formatter, RawPageAnalysis, Report, ReportMetadata, ValidationResult};
use crate::llm::{prompts, CompletionRequest, ImageInput, LanguageModel, OpenAiModel};
use crate::output::{read_json, read_url_list, write_json};
use crate::stages::audit::AuditMetrics;
use crate::stages::{RunLayout, Stage, StageContext, StageError, StageKind, StageOutput};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

const ANALYSIS_MAX_TOKENS: u32 = 4_000;
const SUMMARY_MAX_TOKENS: u32 = 2_000;

/// Evidence gathered for one URL by the capture and audit stages
#[derive(Debug, Clone, PartialEq)]
pub struct PageEvidence {
    pub url: String,
    pub screenshot: Option<PathBuf>,
    pub metrics: Option<AuditMetrics>,
}

/// Joins screenshots and trimmed audits to `urls` by file stem
///
/// A metrics file that cannot be read is treated as absent.
pub fn collect_evidence(layout: &RunLayout, urls: &[String]) -> Vec<PageEvidence> {
    urls.iter()
        .map(|url| {
            let screenshot = Some(layout.screenshot_file(url)).filter(|path| path.exists());
            let metrics_path = layout.trimmed_file(url);
            let metrics = if metrics_path.exists() {
                read_json(&metrics_path)
                    .map_err(|e| tracing::warn!("Ignoring {}: {}", metrics_path.display(), e))
                    .ok()
            } else {
                None
            };
            PageEvidence {
                url: url.clone(),
                screenshot,
                metrics,
            }
        })
        .collect()
}

/// On-disk shape of `analysis.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisFile {
    pub timestamp: String,
    pub preset_key: String,
    pub organization_name: String,
    pub organization_type: String,
    pub organization_purpose: String,
    pub start_url: String,
    pub analysis_model: String,
    pub page_analyses: Vec<RawPageAnalysis>,
    pub technical_summary: Option<String>,
    pub overview: String,
    /// Pages that could not be analyzed
    pub errors: Vec<String>,
}

impl AnalysisFile {
    fn metadata(&self, formatting_model: &str) -> ReportMetadata {
        ReportMetadata {
            preset_key: self.preset_key.clone(),
            organization_name: self.organization_name.clone(),
            organization_type: self.organization_type.clone(),
            organization_purpose: self.organization_purpose.clone(),
            start_url: self.start_url.clone(),
            analysis_model: self.analysis_model.clone(),
            formatting_model: formatting_model.to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            ..ReportMetadata::default()
        }
    }
}

/// Formats an analysis file into a validated report
///
/// Formatting never fails; every diagnostic ends up in `metadata.errors` of
/// the returned report.
pub async fn build_report(
    model: Arc<dyn LanguageModel>,
    formatting_model: &str,
    concurrency: usize,
    analysis: &AnalysisFile,
) -> ValidationResult {
    let formatter = Formatter::new(model, formatting_model, concurrency);

    let formatted = formatter.format_pages(&analysis.page_analyses).await;
    let overall_summary = formatter
        .format_overall(&formatted.records, &analysis.overview)
        .await;

    let mut metadata = analysis.metadata(formatting_model);
    metadata.pages_heuristic_fallback = formatted.heuristic_fallbacks;
    metadata.errors = formatted.errors;

    let report = Report {
        timestamp: chrono::Utc::now().to_rfc3339(),
        overall_summary,
        page_analyses: formatted.records,
        metadata,
    };

    let mut result = report.validated();
    if !result.errors.is_empty() {
        tracing::warn!("Report needed {} repairs", result.errors.len());
        result.data.metadata.errors.extend(result.errors.iter().cloned());
    }
    result
}

/// Runs the analysis and formatting models
#[derive(Default)]
pub struct AnalysisStage {
    model: Option<Arc<dyn LanguageModel>>,
}

impl AnalysisStage {
    /// Uses the OpenAI-compatible API configured through the environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `model` for both analysis and formatting
    pub fn with_model(model: Arc<dyn LanguageModel>) -> Self {
        Self { model: Some(model) }
    }

    fn resolve_model(&self, pipeline: &PipelineConfig) -> Result<Arc<dyn LanguageModel>, StageError> {
        match &self.model {
            Some(model) => Ok(Arc::clone(model)),
            None => Ok(Arc::new(OpenAiModel::from_env(&pipeline.api_base_url)?)),
        }
    }

    async fn analyze_page(
        &self,
        model: &dyn LanguageModel,
        ctx: &StageContext,
        page: &PageEvidence,
    ) -> Result<RawPageAnalysis, String> {
        let screenshot = match &page.screenshot {
            Some(path) => tokio::fs::read(path)
                .await
                .map_err(|e| format!("{}: unreadable screenshot: {}", page.url, e))?,
            None => return Err(format!("{}: no screenshot", page.url)),
        };

        let request = CompletionRequest::new(
            &ctx.preset.analysis_options.llm_model,
            prompts::ANALYSIS_SYSTEM_PROMPT,
            prompts::page_analysis_prompt(&ctx.preset, &page.url, page.metrics.as_ref()),
        )
        .image(ImageInput::png(screenshot))
        .max_tokens(ANALYSIS_MAX_TOKENS);

        let analysis = model
            .complete(&request)
            .await
            .map_err(|e| format!("{}: analysis failed: {}", page.url, e))?;

        Ok(RawPageAnalysis {
            url: page.url.clone(),
            analysis,
        })
    }

    async fn summarize(&self, model: &dyn LanguageModel, request: CompletionRequest, what: &str) -> Option<String> {
        match model.complete(&request).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!("{} failed: {}", what, e);
                None
            }
        }
    }
}

#[async_trait]
impl Stage for AnalysisStage {
    fn kind(&self) -> StageKind {
        StageKind::Analysis
    }

    fn preflight(&self, _preset: &Preset, pipeline: &PipelineConfig) -> Result<(), StageError> {
        self.resolve_model(pipeline).map(|_| ())
    }

    async fn run(&self, ctx: &StageContext) -> Result<StageOutput, StageError> {
        let model = self.resolve_model(&ctx.pipeline)?;
        ctx.require_inputs(StageKind::Analysis)?;

        let options = &ctx.preset.analysis_options;
        let urls = read_url_list(&ctx.layout.urls_simple_file())?;
        let evidence: Vec<PageEvidence> = collect_evidence(&ctx.layout, &urls)
            .into_iter()
            .filter(|page| page.screenshot.is_some())
            .collect();

        if evidence.is_empty() {
            return Err(StageError::NoOutput {
                stage: StageKind::Analysis,
                reason: "no page has a screenshot".to_string(),
            });
        }

        let mut output = StageOutput::default();
        let mut analyses = Vec::with_capacity(evidence.len());
        let concurrency = (options.llm_concurrency as usize).max(1);

        for (index, chunk) in evidence.chunks(concurrency).enumerate() {
            tracing::info!("Analyzing batch {} ({} pages)", index + 1, chunk.len());
            let results = join_all(
                chunk
                    .iter()
                    .map(|page| self.analyze_page(model.as_ref(), ctx, page)),
            )
            .await;

            for result in results {
                match result {
                    Ok(analysis) => analyses.push(analysis),
                    Err(message) => {
                        tracing::warn!("{}", message);
                        output.item_failed(message);
                    }
                }
            }
        }

        if analyses.is_empty() {
            return Err(StageError::NoOutput {
                stage: StageKind::Analysis,
                reason: format!("all {} page analyses failed", evidence.len()),
            });
        }

        let metrics: Vec<AuditMetrics> = evidence.iter().filter_map(|p| p.metrics.clone()).collect();
        let technical_summary = if metrics.is_empty() {
            None
        } else {
            let request = CompletionRequest::new(
                &options.llm_model,
                prompts::TECHNICAL_SYSTEM_PROMPT,
                prompts::technical_summary_prompt(&metrics),
            )
            .max_tokens(SUMMARY_MAX_TOKENS);
            self.summarize(model.as_ref(), request, "Technical summary").await
        };

        let request = CompletionRequest::new(
            &options.llm_model,
            prompts::OVERVIEW_SYSTEM_PROMPT,
            prompts::overview_prompt(&ctx.preset, &analyses, technical_summary.as_deref()),
        )
        .max_tokens(SUMMARY_MAX_TOKENS);
        let overview = self
            .summarize(model.as_ref(), request, "Overview")
            .await
            .unwrap_or_default();

        output.items_ok = analyses.len();
        let analysis_file = AnalysisFile {
            timestamp: chrono::Utc::now().to_rfc3339(),
            preset_key: ctx.preset_key.clone(),
            organization_name: ctx.preset.organization_name.clone(),
            organization_type: ctx.preset.organization_type.clone(),
            organization_purpose: ctx.preset.organization_purpose.clone(),
            start_url: ctx.preset.url.clone(),
            analysis_model: options.llm_model.clone(),
            page_analyses: analyses,
            technical_summary,
            overview,
            errors: output.log.clone(),
        };
        let analysis_path = ctx.layout.analysis_file();
        write_json(&analysis_path, &analysis_file)?;
        output.artifact(analysis_path);

        let result = build_report(
            Arc::clone(&model),
            &options.formatting_model,
            concurrency,
            &analysis_file,
        )
        .await;
        tracing::info!(
            "Structured {} pages ({} via heuristic fallback)",
            result.data.page_analyses.len(),
            result.data.metadata.pages_heuristic_fallback
        );

        let structured_path = ctx.layout.structured_file();
        write_json(&structured_path, &result.data)?;
        output.artifact(structured_path);

        Ok(output)
    }
}

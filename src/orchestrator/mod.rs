//! Per-preset stage orchestration
//!
//! Presets run one after another. Each one gets its own run directory and
//! walks the pipeline's stages in order; a failing stage ends that preset
//! only, and the batch moves on to the next one.

mod record;
pub mod run_dir;

pub use record::RunRecord;

use crate::config::{validate_preset, validate_preset_key, PipelineConfig, Preset};
use crate::stages::{Pipeline, RunLayout, StageContext, StageError, StageKind};
use crate::state::RunState;
use crate::ConfigError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Options for one orchestrator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Directory that holds the run directories
    pub output_dir: PathBuf,

    /// Run only this preset
    pub specific_preset: Option<String>,

    /// Resume the latest run directory at this stage (1..=5)
    pub skip_to_step: Option<u8>,

    /// Remove existing run directories before starting
    pub force_overwrite: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(PipelineConfig::default().output_dir),
            specific_preset: None,
            skip_to_step: None,
            force_overwrite: false,
        }
    }
}

/// Terminal outcome of one preset
#[derive(Debug, Clone, PartialEq)]
pub struct PresetOutcome {
    pub preset_key: String,
    pub state: RunState,
    pub run_dir: Option<PathBuf>,
    pub stages_completed: Vec<StageKind>,
    pub duration_ms: u64,
}

impl PresetOutcome {
    /// True unless the preset failed; a skipped preset is not a failure
    pub fn is_success(&self) -> bool {
        !matches!(self.state, RunState::Failed { .. })
    }
}

/// Outcomes of every preset in a batch, in run order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub outcomes: Vec<PresetOutcome>,
}

impl BatchReport {
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(PresetOutcome::is_success)
    }

    pub fn outcome(&self, preset_key: &str) -> Option<&PresetOutcome> {
        self.outcomes.iter().find(|o| o.preset_key == preset_key)
    }

    fn count(&self, label: &str) -> usize {
        self.outcomes.iter().filter(|o| o.state.label() == label).count()
    }

    pub fn completed(&self) -> usize {
        self.count("completed")
    }

    pub fn failed(&self) -> usize {
        self.count("failed")
    }

    pub fn skipped(&self) -> usize {
        self.count("skipped")
    }

    pub fn log_summary(&self) {
        tracing::info!(
            "Batch finished: {} completed, {} failed, {} skipped",
            self.completed(),
            self.failed(),
            self.skipped()
        );
        for outcome in &self.outcomes {
            match &outcome.state {
                RunState::Failed { error, .. } => {
                    tracing::error!("  {}: {} - {}", outcome.preset_key, outcome.state, error)
                }
                state => tracing::info!("  {}: {}", outcome.preset_key, state),
            }
        }
    }
}

/// Where a preset's run starts
enum Start {
    Run { layout: RunLayout, stage: StageKind },
    Skip(PathBuf),
}

/// Runs the pipeline over a set of presets
pub struct Orchestrator {
    pipeline: Pipeline,
    config: PipelineConfig,
}

impl Orchestrator {
    pub fn new(pipeline: Pipeline, config: PipelineConfig) -> Self {
        Self { pipeline, config }
    }

    /// Orchestrator with the five production stages
    pub fn standard(config: PipelineConfig) -> Self {
        Self::new(Pipeline::standard(&config), config)
    }

    /// Runs every selected preset to a terminal state
    ///
    /// Never fails as a whole: configuration, precondition and stage errors
    /// are reported per preset in the returned [`BatchReport`].
    pub async fn run(&self, presets: &BTreeMap<String, Preset>, options: &RunOptions) -> BatchReport {
        let mut report = BatchReport::default();

        let selected: Vec<(&String, Option<&Preset>)> = match &options.specific_preset {
            Some(key) => match presets.get_key_value(key) {
                Some((key, preset)) => vec![(key, Some(preset))],
                None => vec![(key, None)],
            },
            None => presets.iter().map(|(key, preset)| (key, Some(preset))).collect(),
        };

        tracing::info!("Running {} preset(s)", selected.len());

        for (key, preset) in selected {
            let outcome = match preset {
                Some(preset) => self.run_preset(key, preset, options).await,
                None => {
                    let error = ConfigError::UnknownPreset(key.clone()).to_string();
                    tracing::error!("{}", error);
                    PresetOutcome {
                        preset_key: key.clone(),
                        state: RunState::Failed { stage: None, error },
                        run_dir: None,
                        stages_completed: Vec::new(),
                        duration_ms: 0,
                    }
                }
            };
            report.outcomes.push(outcome);
        }

        report.log_summary();
        report
    }

    async fn run_preset(&self, key: &str, preset: &Preset, options: &RunOptions) -> PresetOutcome {
        let started = Instant::now();
        let mut outcome = PresetOutcome {
            preset_key: key.to_string(),
            state: RunState::Pending,
            run_dir: None,
            stages_completed: Vec::new(),
            duration_ms: 0,
        };

        tracing::info!("=== Preset {} ({}) ===", key, preset.url);

        match self.prepare(key, preset, options) {
            Ok(Start::Skip(existing)) => {
                tracing::info!(
                    "Skipping {}: {} already exists (use --force-overwrite to rerun)",
                    key,
                    existing.display()
                );
                outcome.state = RunState::Skipped;
                outcome.run_dir = Some(existing);
            }
            Ok(Start::Run { layout, stage }) => {
                outcome.run_dir = Some(layout.root().to_path_buf());
                self.run_stages(key, preset, layout, stage, &mut outcome).await;
            }
            Err(error) => {
                tracing::error!("Preset {} failed before any stage ran: {}", key, error);
                outcome.state = RunState::Failed { stage: None, error };
            }
        }

        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    /// Validates the preset and decides where its run starts
    ///
    /// Everything that can fail without touching the run directory is checked
    /// before any directory is created or removed.
    fn prepare(&self, key: &str, preset: &Preset, options: &RunOptions) -> Result<Start, String> {
        validate_preset_key(key).map_err(|e| e.to_string())?;
        validate_preset(key, preset).map_err(|e| e.to_string())?;

        let start_stage = match options.skip_to_step {
            Some(step) => StageKind::from_number(step)
                .ok_or_else(|| format!("skip-to-step must be between 1 and 5, got {}", step))?,
            None => StageKind::UrlDiscovery,
        };

        let output_dir = options.output_dir.as_path();
        let io_error = |e: std::io::Error| format!("run directory error: {}", e);
        let resuming = options.skip_to_step.is_some();

        if !resuming && !options.force_overwrite {
            if let Some(existing) = run_dir::latest_run_dir(output_dir, key).map_err(io_error)? {
                return Ok(Start::Skip(existing));
            }
        }

        for stage in self.pipeline.stages_from(start_stage) {
            stage
                .preflight(preset, &self.config)
                .map_err(|e| format!("{} preflight: {}", stage.kind(), e))?;
        }

        if options.force_overwrite {
            run_dir::remove_run_dirs(output_dir, key).map_err(io_error)?;
        }

        let existing = if resuming {
            run_dir::latest_run_dir(output_dir, key).map_err(io_error)?
        } else {
            None
        };

        match existing {
            Some(root) => {
                let layout = RunLayout::new(root);
                if let Some(path) = layout.missing_input(start_stage) {
                    return Err(StageError::Precondition {
                        stage: start_stage,
                        path,
                    }
                    .to_string());
                }
                tracing::info!(
                    "Resuming {} at stage {} ({})",
                    layout.root().display(),
                    start_stage.number(),
                    start_stage
                );
                Ok(Start::Run {
                    layout,
                    stage: start_stage,
                })
            }
            None if start_stage == StageKind::UrlDiscovery => {
                let root = run_dir::create_run_dir(output_dir, key).map_err(io_error)?;
                Ok(Start::Run {
                    layout: RunLayout::new(root),
                    stage: start_stage,
                })
            }
            None => Err(format!(
                "cannot resume at {}: no run directory for preset '{}' in {}",
                start_stage,
                key,
                output_dir.display()
            )),
        }
    }

    async fn run_stages(
        &self,
        key: &str,
        preset: &Preset,
        layout: RunLayout,
        start: StageKind,
        outcome: &mut PresetOutcome,
    ) {
        let run_id = layout
            .root()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record_path = layout.run_record_file();
        let mut record = RunRecord::new(run_id, key, preset);

        let ctx = StageContext {
            preset_key: key.to_string(),
            preset: preset.clone(),
            pipeline: self.config.clone(),
            layout,
        };

        for stage in self.pipeline.stages_from(start) {
            let kind = stage.kind();
            self.advance(&mut record, &record_path, RunState::Running { stage: kind });
            tracing::info!("[{}] Stage {}: {}", key, kind.number(), kind);

            let stage_started = Instant::now();
            match stage.run(&ctx).await {
                Ok(output) => {
                    tracing::info!(
                        "[{}] {} finished in {:.1}s: {} ok, {} failed",
                        key,
                        kind,
                        stage_started.elapsed().as_secs_f64(),
                        output.items_ok,
                        output.items_failed
                    );
                    for line in &output.log {
                        tracing::debug!("[{}] {}: {}", key, kind, line);
                    }
                    outcome.stages_completed.push(kind);
                }
                Err(e) => {
                    tracing::error!("[{}] {} failed: {}", key, kind, e);
                    if let Some(captured) = e.captured_output() {
                        tracing::error!("[{}] {} output:\n{}", key, kind, captured);
                    }
                    self.advance(&mut record, &record_path, RunState::Failed {
                        stage: Some(kind),
                        error: e.to_string(),
                    });
                    outcome.state = record.state.clone();
                    return;
                }
            }
        }

        if outcome.stages_completed.is_empty() {
            // Nothing ran, so the state machine never left Pending.
            self.advance(&mut record, &record_path, RunState::Failed {
                stage: None,
                error: format!("pipeline has no stage at or after {}", start),
            });
        } else {
            self.advance(&mut record, &record_path, RunState::Completed);
            tracing::info!("[{}] Completed: {}", key, ctx.layout.root().display());
        }
        outcome.state = record.state.clone();
    }

    /// Applies a transition and persists the record
    ///
    /// The orchestrator only issues legal transitions; a failure to write
    /// `run.json` is logged and does not affect the run.
    fn advance(&self, record: &mut RunRecord, path: &Path, next: RunState) {
        if let Err(e) = record.transition(next) {
            tracing::error!("{}", e);
            return;
        }
        if let Err(e) = record.save(path) {
            tracing::warn!("Could not write {}: {}", path.display(), e);
        }
    }
}

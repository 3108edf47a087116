//! `run.json`: the persisted status of one Run

use crate::config::{preset_hash, Preset};
use crate::output::{read_json, write_json};
use crate::stages::StageKind;
use crate::state::RunState;
use crate::SweepError;
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;

/// Status record kept in the run directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Run directory name
    pub run_id: String,
    pub preset_key: String,
    pub start_url: String,
    /// Hash of the preset the run was started with
    pub preset_hash: String,
    pub state: RunState,
    /// Last stage that was entered
    pub last_stage: Option<StageKind>,
    pub error: Option<String>,
    pub started_at: String,
    pub updated_at: String,
    pub finished_at: Option<String>,
}

impl RunRecord {
    pub fn new(run_id: impl Into<String>, preset_key: &str, preset: &Preset) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            run_id: run_id.into(),
            preset_key: preset_key.to_string(),
            start_url: preset.url.clone(),
            preset_hash: preset_hash(preset),
            state: RunState::Pending,
            last_stage: None,
            error: None,
            started_at: now.clone(),
            updated_at: now,
            finished_at: None,
        }
    }

    /// Applies a state transition, rejecting illegal ones
    pub fn transition(&mut self, next: RunState) -> Result<(), SweepError> {
        self.state.transition(next)?;

        let now = chrono::Utc::now().to_rfc3339();
        match &self.state {
            RunState::Running { stage } => self.last_stage = Some(*stage),
            RunState::Failed { stage, error } => {
                if stage.is_some() {
                    self.last_stage = *stage;
                }
                self.error = Some(error.clone());
            }
            _ => {}
        }
        if self.state.is_terminal() {
            self.finished_at = Some(now.clone());
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        write_json(path, self)
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preset() -> Preset {
        Preset {
            url: "https://example.com".to_string(),
            organization_name: "Example".to_string(),
            organization_type: String::new(),
            organization_purpose: String::new(),
            analysis_options: Default::default(),
        }
    }

    #[test]
    fn test_record_follows_state_machine() {
        let mut record = RunRecord::new("run_demo_20240101_000000", "demo", &preset());
        record
            .transition(RunState::Running {
                stage: StageKind::UrlDiscovery,
            })
            .unwrap();
        record
            .transition(RunState::Running {
                stage: StageKind::Screenshots,
            })
            .unwrap();
        record
            .transition(RunState::Failed {
                stage: Some(StageKind::Screenshots),
                error: "chrome crashed".to_string(),
            })
            .unwrap();

        assert_eq!(record.last_stage, Some(StageKind::Screenshots));
        assert_eq!(record.error.as_deref(), Some("chrome crashed"));
        assert!(record.finished_at.is_some());
        assert!(record.transition(RunState::Completed).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        let mut record = RunRecord::new("run_demo_20240101_000000", "demo", &preset());
        record
            .transition(RunState::Running {
                stage: StageKind::Analysis,
            })
            .unwrap();
        record.save(&path).unwrap();

        let loaded = RunRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"status\": \"running\""));
        assert!(raw.contains("\"stage\": \"analysis\""));
    }
}

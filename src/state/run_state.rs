//! Run state machine for one preset
//!
//! `Pending → Running(stage) → Completed | Failed | Skipped`. Within
//! `Running`, stages only ever advance.

use crate::stages::StageKind;
use crate::SweepError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State of one Run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running {
        stage: StageKind,
    },
    Completed,
    Failed {
        stage: Option<StageKind>,
        error: String,
    },
    /// A run directory already existed and overwrite was not requested
    Skipped,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed { .. } | Self::Skipped
        )
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: &RunState) -> bool {
        match (self, next) {
            (Self::Pending, Self::Running { .. })
            | (Self::Pending, Self::Failed { .. })
            | (Self::Pending, Self::Skipped) => true,
            (Self::Running { stage: current }, Self::Running { stage: following }) => {
                following.number() > current.number()
            }
            (Self::Running { .. }, Self::Completed) | (Self::Running { .. }, Self::Failed { .. }) => {
                true
            }
            _ => false,
        }
    }

    /// Moves to `next`, rejecting illegal transitions
    pub fn transition(&mut self, next: RunState) -> Result<(), SweepError> {
        if !self.can_transition_to(&next) {
            return Err(SweepError::InvalidTransition {
                from: self.clone(),
                to: next,
            });
        }
        *self = next;
        Ok(())
    }

    /// Short status label used in logs and run records
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running { .. } => "running",
            Self::Completed => "completed",
            Self::Failed { .. } => "failed",
            Self::Skipped => "skipped",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running { stage } => write!(f, "running({})", stage),
            Self::Failed {
                stage: Some(stage),
                ..
            } => write!(f, "failed({})", stage),
            other => write!(f, "{}", other.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(stage: StageKind) -> RunState {
        RunState::Running { stage }
    }

    #[test]
    fn test_happy_path() {
        let mut state = RunState::Pending;
        state.transition(running(StageKind::UrlDiscovery)).unwrap();
        state.transition(running(StageKind::Screenshots)).unwrap();
        state.transition(running(StageKind::Lighthouse)).unwrap();
        state.transition(running(StageKind::Analysis)).unwrap();
        state.transition(running(StageKind::Report)).unwrap();
        state.transition(RunState::Completed).unwrap();
        assert!(state.is_terminal());
    }

    #[test]
    fn test_resume_starts_at_later_stage() {
        let mut state = RunState::Pending;
        assert!(state.transition(running(StageKind::Analysis)).is_ok());
    }

    #[test]
    fn test_stages_cannot_go_backwards() {
        let mut state = running(StageKind::Lighthouse);
        assert!(state.transition(running(StageKind::Screenshots)).is_err());
        assert!(state.transition(running(StageKind::Lighthouse)).is_err());
        assert_eq!(state, running(StageKind::Lighthouse));
    }

    #[test]
    fn test_precondition_failure_from_pending() {
        let mut state = RunState::Pending;
        state
            .transition(RunState::Failed {
                stage: None,
                error: "missing artifact".to_string(),
            })
            .unwrap();
        assert_eq!(state.label(), "failed");
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            RunState::Completed,
            RunState::Skipped,
            RunState::Failed {
                stage: None,
                error: String::new(),
            },
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(&running(StageKind::UrlDiscovery)));
            assert!(!terminal.can_transition_to(&RunState::Completed));
        }
    }

    #[test]
    fn test_skip_only_from_pending() {
        assert!(RunState::Pending.can_transition_to(&RunState::Skipped));
        assert!(!running(StageKind::UrlDiscovery).can_transition_to(&RunState::Skipped));
    }

    #[test]
    fn test_display_and_serde() {
        let state = running(StageKind::Screenshots);
        assert_eq!(state.to_string(), "running(screenshots)");

        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["stage"], "screenshots");
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CheckpointId, FlowCode, Intent, Position, SessionId, StepRecord, Tldr};

/// Which front-end originated the run (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformOrigin {
    Cli,
    Ide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Active,
    Completed,
    Aborted,
}

/// Why a run stopped advancing (spec §3, invariant 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    GoalMet,
    Aborted,
}

/// The orchestrator's live position bookkeeping, duplicated onto the
/// session record so a loader never has to re-derive it from `steps`
/// (spec §6: `orchestration: {flow_code, current_schedule, current_process}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationState {
    pub flow_code: FlowCode,
    pub position: Position,
    pub terminated_schedules: Vec<crate::Schedule>,
    pub termination_reason: Option<TerminationReason>,
}

impl OrchestrationState {
    pub fn new() -> Self {
        Self {
            flow_code: FlowCode::empty(),
            position: Position::START,
            terminated_schedules: Vec::new(),
            termination_reason: None,
        }
    }
}

impl Default for OrchestrationState {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregated run statistics (spec §3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_tokens: u64,
    pub steps_committed: u64,
    pub suspensions: u64,
    pub consultations: u64,
    pub retries: u64,
}

/// A named snapshot of a session at a specific step (spec §3, §4.9).
///
/// Checkpoints never overlap with the live state and may outlive their
/// parent session — they hold an owned copy, not a reference, so deleting
/// the originating session leaves restorable checkpoints behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    pub created_at: DateTime<Utc>,
    pub step_range: (crate::StepSeq, crate::StepSeq),
    pub snapshot: Box<Session>,
}

/// The persistent, portable record of a single run (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub created_at: DateTime<Utc>,
    pub platform_origin: PlatformOrigin,
    pub task_description: String,
    pub task_status: TaskStatus,
    pub intent: Intent,
    pub orchestration: OrchestrationState,
    pub steps: Vec<StepRecord>,
    pub checkpoints: Vec<Checkpoint>,
    pub stats: SessionStats,
    pub tldr: Option<Tldr>,
}

impl Session {
    pub fn new(
        task_description: impl Into<String>,
        platform_origin: PlatformOrigin,
        intent: Intent,
    ) -> Self {
        Self {
            id: SessionId::new(),
            created_at: Utc::now(),
            platform_origin,
            task_description: task_description.into(),
            task_status: TaskStatus::Active,
            intent,
            orchestration: OrchestrationState::new(),
            steps: Vec::new(),
            checkpoints: Vec::new(),
            stats: SessionStats::default(),
            tldr: None,
        }
    }

    /// Invariant 6 (spec §3): `tldr` is populated iff the run terminated
    /// with reason "goal met".
    pub fn tldr_invariant_holds(&self) -> bool {
        match self.orchestration.termination_reason {
            Some(TerminationReason::GoalMet) => self.tldr.is_some(),
            _ => self.tldr.is_none(),
        }
    }
}

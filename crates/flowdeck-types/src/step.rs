use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ModelRole, Position, StepSeq};

/// Outcome of a single committed step (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Ok,
    Failed,
    Suspended,
}

/// Where a consultation response came from (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationSource {
    Human,
    AiSubstitute,
}

/// The consultation outcome attached to a step record when the process
/// required one (spec §4.1 point 6, seed scenario 2 in §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub source: ConsultationSource,
    pub approved: Option<bool>,
}

/// A tool call the step body emitted and had validated against the Tool
/// Registry (spec §4.1 point 5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallAttempt {
    pub tool_id: String,
    pub accepted: bool,
    pub arguments: serde_json::Value,
}

/// Token accounting for a single step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenCounts {
    pub prompt: u64,
    pub completion: u64,
}

impl TokenCounts {
    pub fn total(self) -> u64 {
        self.prompt + self.completion
    }
}

/// A monotonically numbered record of one step execution (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub seq: StepSeq,
    pub position: Position,
    pub model_role: ModelRole,
    pub prompt_excerpt: String,
    pub response_excerpt: String,
    pub tool_calls: Vec<ToolCallAttempt>,
    pub outcome: Outcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub tokens: TokenCounts,
    pub notes: Vec<String>,
    /// Retry attempts made for this step body before `outcome` was decided
    /// (spec §4.1: recoverable errors "increment an attempt counter ...
    /// and retry ... up to 3 attempts").
    pub attempt: u8,
    pub consultation: Option<ConsultationRecord>,
}

impl StepRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seq: StepSeq,
        position: Position,
        model_role: ModelRole,
        prompt_excerpt: impl Into<String>,
        response_excerpt: impl Into<String>,
    ) -> Self {
        Self {
            seq,
            position,
            model_role,
            prompt_excerpt: prompt_excerpt.into(),
            response_excerpt: response_excerpt.into(),
            tool_calls: Vec::new(),
            outcome: Outcome::Ok,
            started_at: Utc::now(),
            duration_ms: 0,
            tokens: TokenCounts::default(),
            notes: Vec::new(),
            attempt: 0,
            consultation: None,
        }
    }
}

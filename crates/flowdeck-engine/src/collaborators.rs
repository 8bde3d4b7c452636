//! Ports the Orchestrator depends on but does not implement.
//!
//! The Model Coordinator, Consultation Handler and Judge Coordinator all
//! live in `flowdeck-runtime`, which itself depends on this crate — so
//! the dependency has to point the other way at the trait boundary, the
//! way `agtrace-providers::traits` lets `agtrace-runtime` plug in
//! concrete providers without the leaf crate knowing about them.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use flowdeck_types::{Intent, ModelRole, Process, Schedule, Tldr};
use tokio_util::sync::CancellationToken;

use crate::process_body::Emitter;
use crate::suspension::SuspensionAnalysis;
use crate::Result;

/// Selects and hands out LM clients per role (spec §4.3).
#[async_trait]
pub trait ModelCoordinator: Send + Sync {
    /// `Select(schedule, process, intent) -> role` (spec §4.3).
    fn select(&self, schedule: Schedule, process: Process, intent: Intent) -> ModelRole;

    /// Builds the emitter the orchestrator hands to a process body,
    /// already bound to the client for `role` with fallback-chain and
    /// token-recording behaviour applied (spec §4.3 "Fallback chain").
    async fn emitter_for(&self, role: ModelRole) -> Result<Arc<dyn Emitter>>;

    /// `Validate(ctx)` (spec §4.3): probe every configured model's
    /// existence before a run starts.
    async fn validate(&self) -> Result<()>;
}

/// What a process body or the mandatory-feedback step asks a human for
/// (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultationKind {
    Clarify,
    Feedback,
}

#[derive(Debug, Clone)]
pub struct ConsultationRequest {
    pub kind: ConsultationKind,
    pub question: String,
    pub context: String,
    pub options: Vec<String>,
    /// Whether the gateway may fall back to an LM-impersonated answer
    /// after the timeout elapses (spec §4.4). When `false`, a timeout
    /// resolves to `ErrConsultationTimeout` instead.
    pub allow_ai_sub: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsultationSource {
    Human,
    AiSubstitute,
}

#[derive(Debug, Clone)]
pub struct ConsultationResponse {
    pub content: String,
    pub source: ConsultationSource,
}

/// Solicits human input with timeout-plus-AI-substitute semantics (spec
/// §4.4).
#[async_trait]
pub trait ConsultationGateway: Send + Sync {
    async fn request(
        &self,
        request: ConsultationRequest,
        cancel: &CancellationToken,
    ) -> Result<ConsultationResponse>;
}

/// What the Judge Coordinator needs from a finished run to produce a
/// TLDR (spec §4.5: "input = {original_prompt, flow_code, actions[],
/// errors[], file_changes{path->lines}, test_results?, lint_results?}").
#[derive(Debug, Clone, Default)]
pub struct JudgeInput {
    pub original_prompt: String,
    pub flow_code: String,
    pub actions: Vec<String>,
    pub errors: Vec<String>,
    /// Lines touched per path, derived from accepted tool calls that
    /// carry a `path` argument (spec §4.5).
    pub file_changes: HashMap<String, u32>,
    pub test_results: Option<String>,
    pub lint_results: Option<String>,
}

/// Runs the multi-expert post-hoc synthesis (spec §4.5).
#[async_trait]
pub trait JudgeRunner: Send + Sync {
    async fn analyze(&self, input: JudgeInput) -> Result<Tldr>;
}

/// One short orchestrator-role call deciding whether the run may end, and
/// if not, which schedule to revisit next (spec §4.1: "Termination
/// policy").
#[async_trait]
pub trait TerminationOracle: Send + Sync {
    async fn decide(&self, flow_code: &str) -> Result<TerminationDecision>;
}

#[derive(Debug, Clone)]
pub enum TerminationDecision {
    Terminate { justification: String },
    Revisit { schedule: Schedule, justification: String },
}

/// Produces a structured root-cause analysis for a suspension whose
/// error code has no canned entry (spec §4.7 point 3: "else call the
/// orchestrator-role LM to produce a structured analysis"). Canned
/// codes never reach this collaborator -- the Suspension Handler
/// resolves those itself before falling back here.
#[async_trait]
pub trait SuspensionAnalyzer: Send + Sync {
    async fn analyze(&self, error_message: &str, flow_code: &str) -> Result<SuspensionAnalysis>;
}

use async_trait::async_trait;
use flowdeck_types::{Consultation, Intent, Process, Schedule, ToolCallAttempt};
use tokio_util::sync::CancellationToken;

use crate::Result;

/// What a process body wants said to the LM backend for one execution
/// (spec §4.2: "Process bodies are ... pure prompt templates plus
/// per-process housekeeping").
#[derive(Debug, Clone)]
pub struct EmitRequest {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// What the orchestrator's `emit` callback hands back to the body once the
/// LM stream has been fully consumed and any tool calls validated (spec
/// §4.1 points 4-5).
#[derive(Debug, Clone)]
pub struct EmitResponse {
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tool_calls: Vec<ToolCallAttempt>,
}

/// The orchestrator-supplied callback a process body drives the LM
/// through (spec §4.2: "`emit(prompt)` is the orchestrator-supplied
/// callback that actually talks to the LM"). Expressed as a trait object
/// rather than a boxed closure so bodies can be written and tested
/// against a fake emitter without pinning futures by hand.
#[async_trait]
pub trait Emitter: Send + Sync {
    async fn emit(&self, request: EmitRequest, cancel: &CancellationToken) -> Result<EmitResponse>;
}

/// Read-only facts a process body needs to build its prompt (spec §4.1
/// point 3: "Build prompt = system_prompt_for(next) (+) context_package
/// (+) task").
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub task_description: String,
    pub intent: Intent,
    pub flow_code: String,
    pub prior_notes: Vec<String>,
    pub attempt: u8,
}

/// What a process body decided, independent of how the orchestrator
/// commits it to the step record (spec §4.1 points 6-8).
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub response: String,
    pub notes: Vec<String>,
    /// Set by Plan.P2 when the body detects ambiguity; the orchestrator
    /// invokes Consultation only when this is true for an `optional`
    /// process (spec §4.1 point 6).
    pub requests_consultation: bool,
    /// Set by any P3 body that judges its schedule done (spec §4.1 point
    /// 8).
    pub schedule_complete: bool,
    /// Tool calls the LM emitted during this step, not yet validated
    /// against the Tool Registry (spec §4.1 point 5). The orchestrator
    /// does the validation once the body hands this outcome back.
    pub tool_calls: Vec<ToolCallAttempt>,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl ProcessOutcome {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            notes: Vec::new(),
            requests_consultation: false,
            schedule_complete: false,
            tool_calls: Vec::new(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// Folds an emitter's token accounting into the outcome, so the
    /// orchestrator can record it on the committed step without every
    /// process body repeating the same two assignments.
    pub fn with_tokens(mut self, response: &EmitResponse) -> Self {
        self.prompt_tokens = response.prompt_tokens;
        self.completion_tokens = response.completion_tokens;
        self
    }
}

/// One of the fifteen process bodies built by the Schedule Factory (spec
/// §4.2). Each implementor is a plain struct named for what it does
/// (`ImplementBody`, `VerifyBody`, ...), matching the teacher's one
/// small builder type per unit of assembly work rather than a single
/// large match statement.
#[async_trait]
pub trait ProcessBody: Send + Sync {
    fn schedule(&self) -> Schedule;
    fn process(&self) -> Process;
    fn consultation(&self) -> Consultation;

    fn system_prompt(&self, ctx: &ExecutionContext) -> String;

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome>;
}

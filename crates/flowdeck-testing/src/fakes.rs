//! Fake collaborators for driving the engine without a live Ollama
//! backend, grounded on the teacher's preference for hand-written fakes
//! over mocking frameworks (no `mockall` anywhere in the dependency
//! tree).

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowdeck_engine::collaborators::{
    ConsultationGateway, ConsultationRequest, ConsultationResponse, ConsultationSource, JudgeInput,
    JudgeRunner, ModelCoordinator, SuspensionAnalyzer, TerminationDecision, TerminationOracle,
};
use flowdeck_engine::process_body::{EmitRequest, EmitResponse, Emitter};
use flowdeck_engine::suspension::SuspensionAnalysis;
use flowdeck_providers::{Chunk, ChunkStream, GenerateRequest, LmClient, Message};
use flowdeck_types::{Intent, ModelRole, Process, Quality, Schedule, Tldr};
use futures::stream;
use tokio_util::sync::CancellationToken;

/// An `LmClient` that always answers the same canned text, for tests
/// that only care about orchestrator wiring and never inspect prompt
/// content.
pub struct FakeLmClient {
    response: String,
}

impl FakeLmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl Default for FakeLmClient {
    fn default() -> Self {
        Self::new("ok")
    }
}

#[async_trait]
impl LmClient for FakeLmClient {
    async fn probe(&self, _model: &str) -> flowdeck_providers::Result<bool> {
        Ok(true)
    }

    async fn stream_generate(&self, _request: GenerateRequest) -> flowdeck_providers::Result<ChunkStream> {
        Ok(canned_stream(&self.response))
    }

    async fn stream_chat(&self, _model: &str, _messages: &[Message]) -> flowdeck_providers::Result<ChunkStream> {
        Ok(canned_stream(&self.response))
    }

    async fn embeddings(&self, _model: &str, _input: &str) -> flowdeck_providers::Result<Vec<f32>> {
        Ok(vec![0.0; 8])
    }
}

fn canned_stream(text: &str) -> ChunkStream {
    let prompt_tokens = 10;
    let completion_tokens = text.split_whitespace().count() as u64;
    let chunks = vec![
        Ok(Chunk::Token(text.to_string())),
        Ok(Chunk::Done { prompt_tokens, completion_tokens }),
    ];
    Box::pin(stream::iter(chunks)) as Pin<Box<_>>
}

/// An `Emitter` that hands back a fixed response without touching an
/// `LmClient` at all, for process-body unit tests that want to stay
/// below the Model Coordinator.
pub struct FakeEmitter {
    response: EmitResponse,
}

impl FakeEmitter {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            response: EmitResponse {
                text: text.into(),
                prompt_tokens: 10,
                completion_tokens: 5,
                tool_calls: Vec::new(),
            },
        }
    }
}

#[async_trait]
impl Emitter for FakeEmitter {
    async fn emit(&self, _request: EmitRequest, _cancel: &CancellationToken) -> flowdeck_engine::Result<EmitResponse> {
        Ok(self.response.clone())
    }
}

/// A `ModelCoordinator` that hands out a `FakeEmitter` for every role
/// and never probes a real backend.
pub struct FakeModelCoordinator {
    response: String,
}

impl FakeModelCoordinator {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl Default for FakeModelCoordinator {
    fn default() -> Self {
        Self::new("ok")
    }
}

#[async_trait]
impl ModelCoordinator for FakeModelCoordinator {
    fn select(&self, schedule: Schedule, process: Process, intent: Intent) -> ModelRole {
        match (schedule, process) {
            (Schedule::Knowledge, _) => ModelRole::Researcher,
            (Schedule::Production, Process::P3) => ModelRole::Vision,
            _ => intent.default_role(),
        }
    }

    async fn emitter_for(&self, _role: ModelRole) -> flowdeck_engine::Result<Arc<dyn Emitter>> {
        Ok(Arc::new(FakeEmitter::new(self.response.clone())))
    }

    async fn validate(&self) -> flowdeck_engine::Result<()> {
        Ok(())
    }
}

/// A `ConsultationGateway` that answers every request with a queued
/// canned reply, FIFO, panicking if a test asks for more answers than
/// it queued -- surfacing a test bug immediately rather than hanging.
pub struct FakeConsultationGateway {
    answers: Mutex<VecDeque<String>>,
}

impl FakeConsultationGateway {
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { answers: Mutex::new(answers.into_iter().map(Into::into).collect()) }
    }
}

#[async_trait]
impl ConsultationGateway for FakeConsultationGateway {
    async fn request(
        &self,
        _request: ConsultationRequest,
        _cancel: &CancellationToken,
    ) -> flowdeck_engine::Result<ConsultationResponse> {
        let content = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .expect("FakeConsultationGateway ran out of queued answers");
        Ok(ConsultationResponse { content, source: ConsultationSource::Human })
    }
}

/// A `JudgeRunner` that always returns an acceptable, uneventful TLDR.
pub struct FakeJudgeRunner;

#[async_trait]
impl JudgeRunner for FakeJudgeRunner {
    async fn analyze(&self, input: JudgeInput) -> flowdeck_engine::Result<Tldr> {
        Ok(Tldr {
            prompt_goal: input.original_prompt,
            implementation: "fake implementation summary".to_string(),
            expert_consensus: "fake consensus".to_string(),
            discoveries: Vec::new(),
            issues: "none".to_string(),
            quality: Quality::Acceptable,
            justification: "fake judge always accepts".to_string(),
            recommendations: Vec::new(),
        })
    }
}

/// A `TerminationOracle` that terminates after a fixed number of
/// `decide` calls, revisiting `Schedule::Plan` until then -- enough to
/// drive a run to completion in a predictable number of steps.
pub struct FakeTerminationOracle {
    terminate_after: Mutex<u32>,
}

impl FakeTerminationOracle {
    pub fn new(terminate_after: u32) -> Self {
        Self { terminate_after: Mutex::new(terminate_after) }
    }

    pub fn terminate_immediately() -> Self {
        Self::new(0)
    }
}

/// A `SuspensionAnalyzer` that hands back a fixed, clearly-fake analysis
/// without touching an `LmClient`, for orchestrator tests that trigger a
/// suspension but don't care about the analysis text itself.
pub struct FakeSuspensionAnalyzer;

#[async_trait]
impl SuspensionAnalyzer for FakeSuspensionAnalyzer {
    async fn analyze(&self, error_message: &str, flow_code: &str) -> flowdeck_engine::Result<SuspensionAnalysis> {
        Ok(SuspensionAnalysis {
            what_happened: format!("fake analysis of: {error_message}"),
            root_cause: "fake root cause".to_string(),
            factors: vec![format!("flow code at suspension was {flow_code}")],
            proposed_solutions: vec!["retry the step".to_string()],
        })
    }
}

#[async_trait]
impl TerminationOracle for FakeTerminationOracle {
    async fn decide(&self, _flow_code: &str) -> flowdeck_engine::Result<TerminationDecision> {
        let mut remaining = self.terminate_after.lock().unwrap();
        if *remaining == 0 {
            Ok(TerminationDecision::Terminate { justification: "fake oracle is satisfied".to_string() })
        } else {
            *remaining -= 1;
            Ok(TerminationDecision::Revisit {
                schedule: Schedule::Plan,
                justification: "fake oracle wants another pass".to_string(),
            })
        }
    }
}

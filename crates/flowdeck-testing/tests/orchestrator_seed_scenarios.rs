//! Drives the real `Orchestrator`/`RunHandle` end to end against the fakes
//! in `flowdeck_testing::fakes`, plus a few scenario-specific fakes local
//! to this file. Lives here rather than in `flowdeck-engine` because the
//! fakes crate depends on the engine, runtime and sdk crates -- putting
//! these tests in any of those would need a dev-dependency cycle back
//! onto this one.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use flowdeck_engine::collaborators::{
    ConsultationGateway, ConsultationRequest, ConsultationResponse, ConsultationSource as GatewaySource,
    ModelCoordinator, TerminationDecision, TerminationOracle,
};
use flowdeck_engine::process_body::{EmitRequest, EmitResponse, Emitter};
use flowdeck_engine::{Error as EngineError, Orchestrator, StartOptions, StepOutcome, SuspensionVerdict};
use flowdeck_testing::fakes::{
    FakeConsultationGateway, FakeEmitter, FakeJudgeRunner, FakeModelCoordinator, FakeSuspensionAnalyzer,
};
use flowdeck_types::{ConsultationSource, Intent, ModelRole, Outcome, Process, Quality, Schedule, ToolCallAttempt};
use tokio_util::sync::CancellationToken;

/// Revisits each not-yet-terminated schedule in order, then terminates --
/// the minimum an orchestrator-role LM needs to drive a run through every
/// schedule exactly once, ending in Production (spec §8 seed scenario 1).
struct SequentialTerminationOracle {
    remaining: Mutex<VecDeque<Schedule>>,
}

impl SequentialTerminationOracle {
    fn new() -> Self {
        Self {
            remaining: Mutex::new(VecDeque::from([
                Schedule::Plan,
                Schedule::Implement,
                Schedule::Scale,
                Schedule::Production,
            ])),
        }
    }
}

#[async_trait]
impl TerminationOracle for SequentialTerminationOracle {
    async fn decide(&self, _flow_code: &str) -> flowdeck_engine::Result<TerminationDecision> {
        let mut remaining = self.remaining.lock().unwrap();
        match remaining.pop_front() {
            Some(schedule) => Ok(TerminationDecision::Revisit {
                schedule,
                justification: "advancing to the next schedule that hasn't terminated yet".to_string(),
            }),
            None => Ok(TerminationDecision::Terminate {
                justification: "every schedule has terminated and Production was last".to_string(),
            }),
        }
    }
}

/// Answers every consultation immediately with an AI-substitute response,
/// skipping the real timeout wait entirely (spec §4.4).
struct ImmediateAiSubstituteGateway;

#[async_trait]
impl ConsultationGateway for ImmediateAiSubstituteGateway {
    async fn request(
        &self,
        _request: ConsultationRequest,
        _cancel: &CancellationToken,
    ) -> flowdeck_engine::Result<ConsultationResponse> {
        Ok(ConsultationResponse {
            content: "AI-impersonated reviewer: changes look consistent with the plan.".to_string(),
            source: GatewaySource::AiSubstitute,
        })
    }
}

/// An emitter that claims an unregistered tool on its first call, then
/// behaves like a normal `FakeEmitter` afterwards -- for exercising a
/// suspend-then-retry-and-resume cycle without getting stuck suspended.
struct UnknownToolCallEmitter;

#[async_trait]
impl Emitter for UnknownToolCallEmitter {
    async fn emit(&self, _request: EmitRequest, _cancel: &CancellationToken) -> flowdeck_engine::Result<EmitResponse> {
        Ok(EmitResponse {
            text: "invoking a tool the registry has never heard of".to_string(),
            prompt_tokens: 10,
            completion_tokens: 5,
            tool_calls: vec![ToolCallAttempt {
                tool_id: "not_a_real_tool".to_string(),
                accepted: false,
                arguments: serde_json::Value::Null,
            }],
        })
    }
}

struct FlakyOnceModelCoordinator {
    calls: AtomicUsize,
}

impl FlakyOnceModelCoordinator {
    fn new() -> Self {
        Self { calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl ModelCoordinator for FlakyOnceModelCoordinator {
    fn select(&self, schedule: Schedule, _process: Process, intent: Intent) -> ModelRole {
        match schedule {
            Schedule::Knowledge => ModelRole::Researcher,
            _ => intent.default_role(),
        }
    }

    async fn emitter_for(&self, _role: ModelRole) -> flowdeck_engine::Result<Arc<dyn Emitter>> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(Arc::new(UnknownToolCallEmitter))
        } else {
            Ok(Arc::new(FakeEmitter::new("ok")))
        }
    }

    async fn validate(&self) -> flowdeck_engine::Result<()> {
        Ok(())
    }
}

/// A coordinator whose probe never succeeds, for seed scenario 4 (spec
/// §8): `Start` must fail before a `Session` is ever created.
struct FailingValidateCoordinator;

#[async_trait]
impl ModelCoordinator for FailingValidateCoordinator {
    fn select(&self, _schedule: Schedule, _process: Process, intent: Intent) -> ModelRole {
        intent.default_role()
    }

    async fn emitter_for(&self, _role: ModelRole) -> flowdeck_engine::Result<Arc<dyn Emitter>> {
        unreachable!("validate() fails before any step is ever attempted")
    }

    async fn validate(&self) -> flowdeck_engine::Result<()> {
        Err(EngineError::Types(flowdeck_types::Error::operational(
            flowdeck_types::OperationalCode::OllamaUnavailable,
            "no inference daemon reachable",
        )))
    }
}

#[tokio::test]
async fn happy_path_visits_every_schedule_and_ends_with_a_tldr() {
    let coordinator = Arc::new(FakeModelCoordinator::new("ok"));
    let gateway = Arc::new(FakeConsultationGateway::new(["looks good, proceed".to_string()]));
    let judge = Arc::new(FakeJudgeRunner);
    let termination = Arc::new(SequentialTerminationOracle::new());
    let analyzer = Arc::new(FakeSuspensionAnalyzer);

    let handle = Orchestrator::start(
        "add a helper function to the util module".to_string(),
        StartOptions::default(),
        coordinator,
        gateway,
        judge,
        termination,
        analyzer,
    )
    .await
    .expect("start should succeed with a healthy coordinator");

    loop {
        match handle.step().await.expect("no step should error on the happy path") {
            StepOutcome::Committed { .. } => continue,
            StepOutcome::Terminated { goal_met } => {
                assert!(goal_met);
                break;
            }
            StepOutcome::Suspended { report } => panic!("unexpected suspension: {}", report.message),
        }
    }

    let session = handle.state().await;
    for schedule in Schedule::ALL {
        assert!(
            session.orchestration.terminated_schedules.contains(&schedule),
            "{schedule:?} never reached a terminated P3 visit"
        );
    }
    assert_eq!(session.orchestration.terminated_schedules.last(), Some(&Schedule::Production));
    assert!(session.tldr.is_some());
    assert!(matches!(session.tldr.as_ref().unwrap().quality, Quality::Acceptable | Quality::Exceptional));
    assert!(session.tldr_invariant_holds());

    // invariant 1 (spec §3, §8): the flow code parses back into exactly
    // the sequence of positions committed, one legal move at a time.
    let positions = session.orchestration.flow_code.positions().expect("a well-formed flow code");
    assert_eq!(positions.len(), session.steps.len());
    for (position, step) in positions.iter().zip(session.steps.iter()) {
        assert_eq!(*position, step.position);
    }
}

#[tokio::test]
async fn mandatory_feedback_records_an_ai_substitute_consultation_source() {
    let coordinator = Arc::new(FakeModelCoordinator::new("ok"));
    let gateway = Arc::new(ImmediateAiSubstituteGateway);
    let judge = Arc::new(FakeJudgeRunner);
    let termination = Arc::new(SequentialTerminationOracle::new());
    let analyzer = Arc::new(FakeSuspensionAnalyzer);

    let handle = Orchestrator::start(
        "refactor the request parser".to_string(),
        StartOptions::default(),
        coordinator,
        gateway,
        judge,
        termination,
        analyzer,
    )
    .await
    .expect("start should succeed");

    let mut saw_ai_substitute = false;
    loop {
        match handle.step().await.expect("no step should error in this scenario") {
            StepOutcome::Committed { step } => {
                if let Some(consultation) = &step.consultation {
                    if consultation.source == ConsultationSource::AiSubstitute {
                        saw_ai_substitute = true;
                    }
                }
            }
            StepOutcome::Terminated { .. } => break,
            StepOutcome::Suspended { report } => panic!("unexpected suspension: {}", report.message),
        }
    }

    assert!(
        saw_ai_substitute,
        "Implement.P3's mandatory feedback consultation should have resolved through the AI substitute"
    );
}

#[tokio::test]
async fn unknown_tool_call_suspends_then_resumes_cleanly_on_retry() {
    let coordinator = Arc::new(FlakyOnceModelCoordinator::new());
    let gateway = Arc::new(FakeConsultationGateway::new(Vec::<String>::new()));
    let judge = Arc::new(FakeJudgeRunner);
    let termination = Arc::new(SequentialTerminationOracle::new());
    let analyzer = Arc::new(FakeSuspensionAnalyzer);

    let handle = Orchestrator::start(
        "wire up a new endpoint".to_string(),
        StartOptions::default(),
        coordinator,
        gateway,
        judge,
        termination,
        analyzer,
    )
    .await
    .expect("start should succeed");

    let report = match handle.step().await.expect("suspension is not a step error") {
        StepOutcome::Suspended { report } => report,
        other => panic!("expected a suspension on the first step, got {other:?}"),
    };
    assert_eq!(report.code, "E016");
    assert!(report.flow_code.is_suspended());
    assert!(!report.analysis.factors.is_empty(), "the suspension analyzer should have run for an uncanned code");

    // Stepping while suspended is illegal until a verdict is recorded
    // (spec §4.1: "Step ... legal only when not suspended").
    match handle.step().await {
        Err(EngineError::AlreadySuspended) => {}
        other => panic!("expected AlreadySuspended, got {other:?}"),
    }

    handle
        .resolve_suspension(SuspensionVerdict::Retry)
        .await
        .expect("resolving an active suspension should succeed");

    match handle.step().await.expect("the retried step should not suspend again") {
        StepOutcome::Committed { step } => assert_eq!(step.outcome, Outcome::Ok),
        other => panic!("expected the retried step to commit, got {other:?}"),
    }

    let session = handle.state().await;
    assert!(!session.orchestration.flow_code.is_suspended());
}

/// Seed scenario 5 (spec §8): start a run, take a few steps, cancel it
/// (simulating a process exit), then hand the persisted `Session` to a
/// fresh `Orchestrator::resume` call the way a second host would after
/// loading it from the Session Store -- stepping should continue from
/// the recovered `(schedule, process)` with the same invariants.
#[tokio::test]
async fn resumed_session_continues_from_its_recovered_position() {
    let coordinator = Arc::new(FakeModelCoordinator::new("ok"));
    let gateway = Arc::new(FakeConsultationGateway::new(["looks good, proceed".to_string()]));
    let judge = Arc::new(FakeJudgeRunner);
    let termination = Arc::new(SequentialTerminationOracle::new());
    let analyzer = Arc::new(FakeSuspensionAnalyzer);

    let handle = Orchestrator::start(
        "add a helper function to the util module".to_string(),
        StartOptions { platform_origin: flowdeck_types::PlatformOrigin::Cli, allow_ai_substitute: true },
        coordinator.clone(),
        gateway.clone(),
        judge.clone(),
        termination.clone(),
        analyzer.clone(),
    )
    .await
    .expect("start should succeed");

    for _ in 0..3 {
        match handle.step().await.expect("none of the first three steps should error") {
            StepOutcome::Committed { .. } => {}
            other => panic!("expected the first three steps to commit, got {other:?}"),
        }
    }

    // Simulate the process exiting: take the in-memory session as if it
    // had just been loaded fresh from a Session Store on another host.
    let persisted = handle.state().await;
    assert_eq!(persisted.steps.len(), 3);
    let recovered_position = persisted.orchestration.position;
    assert!(!persisted.orchestration.flow_code.is_suspended());

    let resumed = Orchestrator::resume(persisted.clone(), coordinator, gateway, judge, termination, analyzer);

    let resumed_state = resumed.state().await;
    assert_eq!(resumed_state.orchestration.position, recovered_position);
    assert_eq!(resumed_state.orchestration.flow_code, persisted.orchestration.flow_code);
    assert_eq!(resumed_state.steps.len(), 3);

    loop {
        match resumed.step().await.expect("the resumed run should continue without error") {
            StepOutcome::Committed { .. } => continue,
            StepOutcome::Terminated { goal_met } => {
                assert!(goal_met);
                break;
            }
            StepOutcome::Suspended { report } => panic!("unexpected suspension: {}", report.message),
        }
    }

    let finished = resumed.state().await;
    assert!(finished.steps.len() > 3);
    let positions = finished.orchestration.flow_code.positions().expect("a well-formed flow code");
    assert_eq!(positions.len(), finished.steps.len());
}

#[tokio::test]
async fn start_fails_and_creates_no_session_when_the_model_probe_fails() {
    let coordinator = Arc::new(FailingValidateCoordinator);
    let gateway = Arc::new(FakeConsultationGateway::new(Vec::<String>::new()));
    let judge = Arc::new(FakeJudgeRunner);
    let termination = Arc::new(SequentialTerminationOracle::new());
    let analyzer = Arc::new(FakeSuspensionAnalyzer);

    let result = Orchestrator::start(
        "anything at all".to_string(),
        StartOptions::default(),
        coordinator,
        gateway,
        judge,
        termination,
        analyzer,
    )
    .await;

    let err = result.expect_err("a failing model probe must prevent Start from succeeding");
    assert_eq!(err.code(), "E010");
}

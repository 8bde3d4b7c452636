use std::collections::HashMap;
use std::sync::Arc;

use flowdeck_types::{
    ConsultationRecord, ModelRole, Outcome, PlatformOrigin, Position, Process, Schedule, Session,
    StepRecord, StepSeq, TerminationReason, ToolCallAttempt,
};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::collaborators::{
    ConsultationGateway, ConsultationKind, ConsultationRequest, ConsultationSource as GatewaySource,
    JudgeInput, JudgeRunner, ModelCoordinator, SuspensionAnalyzer, TerminationDecision,
    TerminationOracle,
};
use crate::error::Error;
use crate::events::{EventBus, OrchestratorEvent};
use crate::navigation::legal_transition;
use crate::process_body::ExecutionContext;
use crate::schedule_factory::ScheduleFactory;
use crate::suspension::{ResumeStrategy, SuspensionHandler, SuspensionReport, SuspensionVerdict};
use crate::Result;

const MAX_RECOVERABLE_ATTEMPTS: u8 = 3;

/// Options accepted by `Orchestrator::start` (spec §4.1).
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub platform_origin: PlatformOrigin,
    pub allow_ai_substitute: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            platform_origin: PlatformOrigin::Cli,
            allow_ai_substitute: true,
        }
    }
}

/// Outcome of advancing one step (spec §4.1).
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Committed { step: StepRecord },
    Suspended { report: Box<SuspensionReport> },
    Terminated { goal_met: bool },
}

struct Inner {
    session: Session,
    factory: ScheduleFactory,
    coordinator: Arc<dyn ModelCoordinator>,
    consultation: Arc<dyn ConsultationGateway>,
    judge: Arc<dyn JudgeRunner>,
    termination: Arc<dyn TerminationOracle>,
    suspension_analyzer: Arc<dyn SuspensionAnalyzer>,
    suspension_handler: SuspensionHandler,
    suspended: Option<SuspensionReport>,
    allow_ai_substitute: bool,
    /// Set by `run_termination_policy` when the orchestrator-role LM
    /// nominates a schedule to revisit (spec §4.1 "Termination policy");
    /// consumed by the next `step()` call to compute the schedule-to-
    /// schedule transition, since that move is not a plain in-schedule
    /// advance.
    pending_schedule: Option<Schedule>,
    /// Set by `resolve_suspension` from the user's verdict (spec §4.7
    /// point 4); consumed by the next `step()` call to decide whether it
    /// re-executes the frozen position or advances past it.
    pending_resume: Option<ResumeStrategy>,
}

/// Drives the five-Schedule / three-Process state machine for one run
/// (spec §4.1). Owned exclusively by its `RunHandle`; readers get clones
/// of `Session` through `State()`, never a live reference (spec §5).
pub struct Orchestrator {
    inner: Mutex<Inner>,
    events: Arc<EventBus>,
    cancel: CancellationToken,
}

/// The caller-facing surface for a started run (spec §4.1: "`Start(task,
/// options) -> RunHandle`").
pub struct RunHandle {
    orchestrator: Arc<Orchestrator>,
}

impl RunHandle {
    #[instrument(skip(self))]
    pub async fn step(&self) -> Result<StepOutcome> {
        self.orchestrator.step().await
    }

    pub fn cancel(&self) {
        self.orchestrator.cancel.cancel();
    }

    /// Runs steps until the run terminates or suspends (spec §4.1:
    /// `Wait()`).
    pub async fn wait(&self) -> Result<StepOutcome> {
        loop {
            match self.step().await? {
                StepOutcome::Committed { .. } => continue,
                terminal => return Ok(terminal),
            }
        }
    }

    pub fn events(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.orchestrator.events.subscribe()
    }

    pub async fn state(&self) -> Session {
        self.orchestrator.inner.lock().await.session.clone()
    }

    /// Apply a user's verdict to a suspended run (spec §4.7 point 4).
    pub async fn resolve_suspension(&self, verdict: SuspensionVerdict) -> Result<()> {
        self.orchestrator.resolve_suspension(verdict).await
    }
}

impl Orchestrator {
    /// `Start(task, options) -> RunHandle` (spec §4.1).
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip(coordinator, consultation, judge, termination, suspension_analyzer))]
    pub async fn start(
        task_description: String,
        options: StartOptions,
        coordinator: Arc<dyn ModelCoordinator>,
        consultation: Arc<dyn ConsultationGateway>,
        judge: Arc<dyn JudgeRunner>,
        termination: Arc<dyn TerminationOracle>,
        suspension_analyzer: Arc<dyn SuspensionAnalyzer>,
    ) -> Result<RunHandle> {
        if task_description.trim().is_empty() {
            return Err(Error::Types(flowdeck_types::Error::operational(
                flowdeck_types::OperationalCode::EmptyTask,
                "task description must not be empty",
            )));
        }

        // Seed scenario 4 (spec §8): model probe fails on Start -> E010,
        // and no Session is ever created.
        coordinator.validate().await?;

        let intent = flowdeck_core::classify_intent(&task_description);
        let session = Session::new(task_description, options.platform_origin, intent);

        let inner = Inner {
            session,
            factory: ScheduleFactory::new(),
            coordinator,
            consultation,
            judge,
            termination,
            suspension_analyzer,
            suspension_handler: SuspensionHandler::new(),
            suspended: None,
            allow_ai_substitute: options.allow_ai_substitute,
            pending_schedule: None,
            pending_resume: None,
        };

        let orchestrator = Arc::new(Orchestrator {
            inner: Mutex::new(inner),
            events: Arc::new(EventBus::new()),
            cancel: CancellationToken::new(),
        });

        Ok(RunHandle { orchestrator })
    }

    /// Re-attaches a live `RunHandle` to a `Session` recovered from
    /// storage (spec §8 seed scenario 5: "load the serialised session on
    /// another host; `Resume` proceeds from `(schedule, process)`
    /// recovered from `orchestration.flow_code`"). `position`/`flow_code`/
    /// `steps[]` come straight from the loaded session; a run that was
    /// frozen mid-suspension resumes suspended, so the caller must still
    /// resolve it before stepping further.
    #[allow(clippy::too_many_arguments)]
    pub fn resume(
        session: Session,
        coordinator: Arc<dyn ModelCoordinator>,
        consultation: Arc<dyn ConsultationGateway>,
        judge: Arc<dyn JudgeRunner>,
        termination: Arc<dyn TerminationOracle>,
        suspension_analyzer: Arc<dyn SuspensionAnalyzer>,
    ) -> RunHandle {
        let suspension_handler = SuspensionHandler::new();
        let suspended = if session.orchestration.flow_code.is_suspended() {
            Some(reconstruct_suspension_report(&session))
        } else {
            None
        };
        let allow_ai_substitute = session.task_status != flowdeck_types::TaskStatus::Aborted;

        let inner = Inner {
            session,
            factory: ScheduleFactory::new(),
            coordinator,
            consultation,
            judge,
            termination,
            suspension_analyzer,
            suspension_handler,
            suspended,
            allow_ai_substitute,
            pending_schedule: None,
            pending_resume: None,
        };

        let orchestrator = Arc::new(Orchestrator {
            inner: Mutex::new(inner),
            events: Arc::new(EventBus::new()),
            cancel: CancellationToken::new(),
        });

        RunHandle { orchestrator }
    }

    async fn step(&self) -> Result<StepOutcome> {
        if self.cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut inner = self.inner.lock().await;
        if inner.suspended.is_some() {
            return Err(Error::AlreadySuspended);
        }

        let current = inner.session.orchestration.position;
        let intent = inner.session.intent;
        let revisit_schedule = inner.pending_schedule.take();
        let pending_resume = inner.pending_resume.take();
        // A recoverable-error retry (`retry_same_position`) or a
        // suspension resolved with `Retry`/`Investigate` both mean the
        // next step re-executes the position already recorded at
        // `current`, rather than advancing past it (spec §8 seed
        // scenario 3: "user picks Retry; Orchestrator re-runs P1").
        let retry_in_place = match pending_resume {
            Some(ResumeStrategy::ReExecute) | Some(ResumeStrategy::Investigate) => true,
            Some(ResumeStrategy::SkipForward) | Some(ResumeStrategy::FinalizeWithoutTldr) | None => inner
                .session
                .steps
                .last()
                .map(|step| step.position == current && step.outcome == Outcome::Failed)
                .unwrap_or(false),
        };
        let target = match revisit_schedule {
            Some(schedule) => Position::new(schedule, Process::P1),
            None if retry_in_place => current,
            None => next_position(current),
        };

        let terminated: Vec<Schedule> = inner.session.orchestration.terminated_schedules.clone();
        legal_transition(current, target, &terminated, revisit_schedule.is_some())?;

        let schedule = target.schedule().expect("advance yields a real schedule");
        let process = target.process().expect("advance yields a real process");
        let role = inner.coordinator.select(schedule, process, intent);

        let attempt = last_attempt_for(&inner.session, target);
        let ctx = ExecutionContext {
            task_description: inner.session.task_description.clone(),
            intent,
            flow_code: inner.session.orchestration.flow_code.as_str().to_string(),
            prior_notes: collect_notes(&inner.session),
            attempt,
        };

        let emitter = match inner.coordinator.emitter_for(role).await {
            Ok(emitter) => emitter,
            Err(err) => return Ok(self.suspend(&mut inner, target, role, &ctx.flow_code, err).await),
        };

        let body = inner.factory.body_for(schedule, process);
        let consultation_kind = body.consultation();
        let execution = body.execute(&ctx, emitter.as_ref(), &self.cancel).await;

        let outcome = match execution {
            Ok(outcome) => outcome,
            Err(err) if err_recoverable(&err) && attempt < MAX_RECOVERABLE_ATTEMPTS => {
                return self.retry_same_position(&mut inner, target, attempt).await;
            }
            Err(err) => return Ok(self.suspend(&mut inner, target, role, &ctx.flow_code, err).await),
        };

        let registry = flowdeck_core::ToolRegistry::new();
        let mut validated_calls = Vec::with_capacity(outcome.tool_calls.len());
        for raw in &outcome.tool_calls {
            match registry.validate(&raw.tool_id) {
                Ok(spec) => validated_calls.push(ToolCallAttempt {
                    tool_id: spec.id.to_string(),
                    accepted: true,
                    arguments: raw.arguments.clone(),
                }),
                Err(_) => {
                    let err = Error::Types(flowdeck_types::Error::operational(
                        flowdeck_types::OperationalCode::InvalidToolCall,
                        format!("unknown tool id: {}", raw.tool_id),
                    ));
                    return Ok(self.suspend(&mut inner, target, role, &ctx.flow_code, err).await);
                }
            }
        }

        let mut consultation_record = None;
        let needs_consultation = matches!(consultation_kind, flowdeck_types::Consultation::Mandatory)
            || (matches!(consultation_kind, flowdeck_types::Consultation::Optional)
                && outcome.requests_consultation);

        if needs_consultation {
            let kind = if matches!(process, Process::P3) {
                ConsultationKind::Feedback
            } else {
                ConsultationKind::Clarify
            };
            self.events.publish(OrchestratorEvent::ConsultationRequested { position: target });
            let request = ConsultationRequest {
                kind,
                question: "Does this step's output look correct?".to_string(),
                context: outcome.response.clone(),
                options: Vec::new(),
                allow_ai_sub: inner.allow_ai_substitute,
            };
            let response = inner.consultation.request(request, &self.cancel).await;
            match response {
                Ok(response) => {
                    self.events.publish(OrchestratorEvent::ConsultationAnswered { position: target });
                    consultation_record = Some(ConsultationRecord {
                        source: match response.source {
                            GatewaySource::Human => flowdeck_types::ConsultationSource::Human,
                            GatewaySource::AiSubstitute => flowdeck_types::ConsultationSource::AiSubstitute,
                        },
                        approved: Some(!response.content.trim().is_empty()),
                    });
                }
                Err(err) => return Ok(self.suspend(&mut inner, target, role, &ctx.flow_code, err).await),
            }
        }

        let seq = next_seq(&inner.session);
        let mut record = StepRecord::new(seq, target, role, ctx.flow_code.clone(), outcome.response.clone());
        record.tool_calls = validated_calls;
        record.notes = outcome.notes.clone();
        record.attempt = attempt;
        record.outcome = Outcome::Ok;
        record.consultation = consultation_record;
        record.tokens = flowdeck_types::TokenCounts {
            prompt: outcome.prompt_tokens,
            completion: outcome.completion_tokens,
        };

        inner.session.orchestration.position = target;
        inner
            .session
            .orchestration
            .flow_code
            .push(current, target);
        inner.session.stats.steps_committed += 1;
        inner.session.stats.total_tokens += record.tokens.total();
        if record.consultation.is_some() {
            inner.session.stats.consultations += 1;
        }
        inner.session.steps.push(record.clone());

        self.events.publish(OrchestratorEvent::PositionChanged { from: current, to: target });
        self.events.publish(OrchestratorEvent::StepCompleted { step: Box::new(record.clone()) });

        if process == Process::P3 && outcome.schedule_complete {
            if !inner.session.orchestration.terminated_schedules.contains(&schedule) {
                inner.session.orchestration.terminated_schedules.push(schedule);
            }
            return self.run_termination_policy(&mut inner).await;
        }

        Ok(StepOutcome::Committed { step: record })
    }

    async fn retry_same_position(
        &self,
        inner: &mut Inner,
        target: Position,
        attempt: u8,
    ) -> Result<StepOutcome> {
        inner.session.stats.retries += 1;
        let previous = inner.session.orchestration.position;
        inner.session.orchestration.flow_code.push(previous, target);
        inner.session.orchestration.position = target;
        let seq = next_seq(&inner.session);
        let mut record = StepRecord::new(
            seq,
            target,
            inner.session.intent.default_role(),
            "retry",
            "transient failure, retrying",
        );
        record.attempt = attempt + 1;
        record.outcome = Outcome::Failed;
        inner.session.steps.push(record.clone());
        Ok(StepOutcome::Committed { step: record })
    }

    async fn suspend(
        &self,
        inner: &mut Inner,
        position: Position,
        role: ModelRole,
        prompt_excerpt: &str,
        error: Error,
    ) -> StepOutcome {
        inner.session.stats.suspensions += 1;
        let previous = inner.session.orchestration.position;
        inner.session.orchestration.flow_code.push(previous, position);
        inner.session.orchestration.position = position;

        let seq = next_seq(&inner.session);
        let mut record = StepRecord::new(
            seq,
            position,
            role,
            prompt_excerpt.to_string(),
            error.to_string(),
        );
        record.outcome = Outcome::Suspended;
        inner.session.steps.push(record);

        let mut code = inner
            .session
            .orchestration
            .flow_code
            .clone();
        code.mark_suspended();
        inner.session.orchestration.flow_code = code.clone();
        let mut report = inner.suspension_handler.freeze(&error, position, code);

        // Only codes with no canned entry need the extra LM round-trip
        // (spec §4.7 point 3); an analyzer failure just keeps the
        // handler's own "unclassified" fallback rather than losing the
        // suspension altogether.
        if !inner.suspension_handler.is_canned(report.code) {
            if let Ok(analysis) = inner
                .suspension_analyzer
                .analyze(&report.message, report.flow_code.as_str())
                .await
            {
                report = inner.suspension_handler.with_lm_analysis(report, analysis);
            }
        }

        self.events.publish(OrchestratorEvent::Suspended { position, code: report.code });
        inner.suspended = Some(report.clone());
        StepOutcome::Suspended { report: Box::new(report) }
    }

    async fn resolve_suspension(&self, verdict: SuspensionVerdict) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let report = inner.suspended.take().ok_or_else(|| {
            Error::Types(flowdeck_types::Error::operational(
                flowdeck_types::OperationalCode::SessionCorrupt,
                "no suspension is active",
            ))
        })?;

        if verdict.advances_state() {
            inner.session.orchestration.flow_code.clear_suspension();
        } else {
            inner.session.task_status = flowdeck_types::TaskStatus::Aborted;
            inner.session.orchestration.termination_reason = Some(TerminationReason::Aborted);
        }
        inner.pending_resume = Some(verdict.resume_strategy());
        self.events.publish(OrchestratorEvent::Resumed { position: report.frozen_position });
        Ok(())
    }

    async fn run_termination_policy(&self, inner: &mut Inner) -> Result<StepOutcome> {
        let all_terminated = flowdeck_types::Schedule::ALL
            .iter()
            .all(|s| inner.session.orchestration.terminated_schedules.contains(s));
        let production_last = inner
            .session
            .orchestration
            .terminated_schedules
            .last()
            .copied()
            == Some(flowdeck_types::Schedule::Production);

        // The "may the run end?" check (spec §4.1 "Termination policy")
        // is the engine's own call; the orchestrator-role LM is consulted
        // either way, but its `Terminate` verdict is only honoured when
        // this check is satisfied.
        let may_end = all_terminated && production_last;

        let decision = inner
            .termination
            .decide(inner.session.orchestration.flow_code.as_str())
            .await?;

        match decision {
            TerminationDecision::Terminate { .. } if may_end => {
                let (actions, errors, file_changes) = collect_judge_evidence(&inner.session);
                let input = JudgeInput {
                    original_prompt: inner.session.task_description.clone(),
                    flow_code: inner.session.orchestration.flow_code.as_str().to_string(),
                    actions,
                    errors,
                    file_changes,
                    test_results: None,
                    lint_results: None,
                };
                let tldr = inner.judge.analyze(input).await?;
                inner.session.tldr = Some(tldr);
                inner.session.task_status = flowdeck_types::TaskStatus::Completed;
                inner.session.orchestration.termination_reason = Some(TerminationReason::GoalMet);
                self.events.publish(OrchestratorEvent::Terminated { goal_met: true });
                Ok(StepOutcome::Terminated { goal_met: true })
            }
            TerminationDecision::Terminate { .. } => Err(Error::Types(flowdeck_types::Error::structural(
                flowdeck_types::StructuralCode::PrematureTermination,
                "orchestrator role nominated termination before every schedule had a terminated visit ending in Production",
            ))),
            TerminationDecision::Revisit { schedule, .. } => {
                inner.pending_schedule = Some(schedule);
                Ok(StepOutcome::Committed {
                    step: inner.session.steps.last().cloned().expect("at least one step committed"),
                })
            }
        }
    }
}

/// Default forward advance within the current schedule, or the sentinel
/// advance from `START` into `S1P1` (spec §4.6). Schedule-to-schedule
/// moves are decided separately by `run_termination_policy`, not here.
fn next_position(current: Position) -> Position {
    if current.is_start() {
        return Position::new(Schedule::Knowledge, Process::P1);
    }
    let schedule = current.schedule().expect("non-start position has a schedule");
    match current.process() {
        Some(Process::P1) => Position::new(schedule, Process::P2),
        Some(Process::P2) => Position::new(schedule, Process::P3),
        Some(Process::P3) | None => Position::new(schedule, Process::P3),
    }
}

fn next_seq(session: &Session) -> StepSeq {
    session
        .steps
        .last()
        .map(|s| s.seq.next())
        .unwrap_or(StepSeq::FIRST)
}

fn last_attempt_for(session: &Session, position: Position) -> u8 {
    session
        .steps
        .iter()
        .rev()
        .find(|s| s.position == position)
        .map(|s| s.attempt)
        .unwrap_or(0)
}

/// Builds the Judge's evidence trail from what the run actually did (spec
/// line 127): accepted tool calls become `actions`, failed/suspended
/// steps become `errors`, and any tool call touching a `path` argument
/// tallies into `file_changes`, counted by lines when the call carries a
/// `content` payload and by call count otherwise.
fn collect_judge_evidence(session: &Session) -> (Vec<String>, Vec<String>, HashMap<String, u32>) {
    let mut actions = Vec::new();
    let mut errors = Vec::new();
    let mut file_changes: HashMap<String, u32> = HashMap::new();

    for step in &session.steps {
        match step.outcome {
            Outcome::Failed | Outcome::Suspended => errors.push(step.response_excerpt.clone()),
            Outcome::Ok => {}
        }
        for call in &step.tool_calls {
            if !call.accepted {
                continue;
            }
            actions.push(call.tool_id.clone());
            let Some(path) = call.arguments.get("path").and_then(|v| v.as_str()) else {
                continue;
            };
            let lines = call
                .arguments
                .get("content")
                .and_then(|v| v.as_str())
                .map(|content| content.lines().count() as u32)
                .unwrap_or(1);
            *file_changes.entry(path.to_string()).or_insert(0) += lines;
        }
    }

    (actions, errors, file_changes)
}

fn collect_notes(session: &Session) -> Vec<String> {
    session
        .steps
        .iter()
        .rev()
        .take(3)
        .flat_map(|s| s.notes.iter().cloned())
        .collect()
}

fn err_recoverable(error: &Error) -> bool {
    error.recoverable()
}

/// Rebuilds a best-effort `SuspensionReport` from a session whose
/// `flow_code` still carries the trailing `X` (spec §8 seed scenario 5):
/// the last committed step's outcome, if `Suspended`, carries the message
/// the original suspension froze on; lacking that, the report falls back
/// to a generic "suspended before this host loaded the session" message.
/// Either way the frozen position and flow code come straight from the
/// session, so `step()` still refuses to advance until the caller
/// resolves it.
fn reconstruct_suspension_report(session: &Session) -> SuspensionReport {
    let position = session.orchestration.position;
    let flow_code = session.orchestration.flow_code.clone();
    let last_suspended = session.steps.iter().rev().find(|s| s.outcome == Outcome::Suspended);
    let message = last_suspended
        .map(|s| s.response_excerpt.clone())
        .unwrap_or_else(|| "run was suspended before being persisted to this host".to_string());

    let code = flowdeck_types::OperationalCode::SessionCorrupt.code();
    let analysis = crate::suspension::SuspensionAnalysis {
        what_happened: message.clone(),
        root_cause: "reconstructed from a persisted session; the original in-memory analysis was not serialized"
            .to_string(),
        factors: Vec::new(),
        proposed_solutions: Vec::new(),
    };
    SuspensionReport { code, message, frozen_position: position, flow_code, analysis }
}

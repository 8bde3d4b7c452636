use async_trait::async_trait;
use flowdeck_types::{Consultation, Process, Schedule};
use tokio_util::sync::CancellationToken;

use crate::process_body::{EmitRequest, Emitter, ExecutionContext, ProcessBody, ProcessOutcome};
use crate::Result;

/// Renders the standard prompt preamble every body shares: task, flow
/// code so far, and notes carried from earlier attempts.
fn base_prompt(ctx: &ExecutionContext, instruction: &str) -> String {
    let mut prompt = format!(
        "Task: {}\nFlow so far: {}\n",
        ctx.task_description, ctx.flow_code
    );
    if !ctx.prior_notes.is_empty() {
        prompt.push_str("Notes:\n");
        for note in &ctx.prior_notes {
            prompt.push_str("- ");
            prompt.push_str(note);
            prompt.push('\n');
        }
    }
    prompt.push_str(instruction);
    prompt
}

macro_rules! simple_body {
    ($name:ident, $schedule:expr, $process:expr, $consultation:expr, $system:expr, $instruction:expr, $complete:expr) => {
        pub struct $name;

        #[async_trait]
        impl ProcessBody for $name {
            fn schedule(&self) -> Schedule {
                $schedule
            }

            fn process(&self) -> Process {
                $process
            }

            fn consultation(&self) -> Consultation {
                $consultation
            }

            fn system_prompt(&self, _ctx: &ExecutionContext) -> String {
                $system.to_string()
            }

            async fn execute(
                &self,
                ctx: &ExecutionContext,
                emitter: &dyn Emitter,
                cancel: &CancellationToken,
            ) -> Result<ProcessOutcome> {
                let request = EmitRequest {
                    system_prompt: self.system_prompt(ctx),
                    user_prompt: base_prompt(ctx, $instruction),
                };
                let response = emitter.emit(request, cancel).await?;
                let mut outcome = ProcessOutcome::new(response.text.clone()).with_tokens(&response);
                outcome.tool_calls = response.tool_calls;
                outcome.schedule_complete = $complete;
                Ok(outcome)
            }
        }
    };
}

// Knowledge: Research, Crawl, Retrieve (spec §4.2, consultation: none).
simple_body!(
    ResearchBody,
    Schedule::Knowledge,
    Process::P1,
    Consultation::None,
    "You are a research specialist gathering context before any code is written.",
    "\nIdentify what prior art, APIs, or project conventions are relevant.",
    false
);
simple_body!(
    CrawlBody,
    Schedule::Knowledge,
    Process::P2,
    Consultation::None,
    "You are surveying the existing codebase for structures relevant to the task.",
    "\nList the files and symbols a change would need to touch.",
    false
);
simple_body!(
    RetrieveBody,
    Schedule::Knowledge,
    Process::P3,
    Consultation::None,
    "You are summarising gathered research into a usable brief.",
    "\nProduce a concise knowledge brief for the planning phase.",
    true
);

// Plan: Brainstorm, Clarify (optional consultation), Plan.
simple_body!(
    BrainstormBody,
    Schedule::Plan,
    Process::P1,
    Consultation::None,
    "You are brainstorming candidate approaches to the task.",
    "\nPropose two or three distinct approaches with trade-offs.",
    false
);

pub struct ClarifyBody;

#[async_trait]
impl ProcessBody for ClarifyBody {
    fn schedule(&self) -> Schedule {
        Schedule::Plan
    }

    fn process(&self) -> Process {
        Process::P2
    }

    fn consultation(&self) -> Consultation {
        Consultation::Optional
    }

    fn system_prompt(&self, _ctx: &ExecutionContext) -> String {
        "You are checking the task for ambiguity before committing to a plan.".to_string()
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let request = EmitRequest {
            system_prompt: self.system_prompt(ctx),
            user_prompt: base_prompt(
                ctx,
                "\nState ANY_AMBIGUITY: yes or no, then explain your reasoning.",
            ),
        };
        let response = emitter.emit(request, cancel).await?;
        let ambiguous = response.text.to_ascii_uppercase().contains("ANY_AMBIGUITY: YES");
        let mut outcome = ProcessOutcome::new(response.text.clone()).with_tokens(&response);
        outcome.tool_calls = response.tool_calls;
        outcome.requests_consultation = ambiguous;
        Ok(outcome)
    }
}

simple_body!(
    PlanBody,
    Schedule::Plan,
    Process::P3,
    Consultation::None,
    "You are finalising an implementation plan.",
    "\nProduce an ordered list of concrete implementation steps.",
    true
);

// Implement: Implement, Verify, Feedback (mandatory consultation).
simple_body!(
    ImplementBody,
    Schedule::Implement,
    Process::P1,
    Consultation::None,
    "You are implementing the plan directly in the project's source tree.",
    "\nMake the change, calling tools as needed, and report what changed.",
    false
);
simple_body!(
    VerifyBody,
    Schedule::Implement,
    Process::P2,
    Consultation::None,
    "You are verifying the implementation builds and behaves as intended.",
    "\nRun or describe the checks that confirm correctness.",
    false
);

pub struct FeedbackBody;

#[async_trait]
impl ProcessBody for FeedbackBody {
    fn schedule(&self) -> Schedule {
        Schedule::Implement
    }

    fn process(&self) -> Process {
        Process::P3
    }

    fn consultation(&self) -> Consultation {
        Consultation::Mandatory
    }

    fn system_prompt(&self, _ctx: &ExecutionContext) -> String {
        "You are summarising the implementation for human feedback.".to_string()
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let request = EmitRequest {
            system_prompt: self.system_prompt(ctx),
            user_prompt: base_prompt(
                ctx,
                "\nSummarise changes, verification performed, and open questions.",
            ),
        };
        let response = emitter.emit(request, cancel).await?;
        let mut outcome = ProcessOutcome::new(response.text.clone()).with_tokens(&response);
        outcome.tool_calls = response.tool_calls;
        outcome.schedule_complete = true;
        Ok(outcome)
    }
}

// Scale: Scale, Benchmark, Optimize.
simple_body!(
    ScaleBody,
    Schedule::Scale,
    Process::P1,
    Consultation::None,
    "You are assessing how the implementation behaves under realistic load.",
    "\nDescribe scaling concerns and any changes needed.",
    false
);
simple_body!(
    BenchmarkBody,
    Schedule::Scale,
    Process::P2,
    Consultation::None,
    "You are benchmarking the implementation against its prior state.",
    "\nReport measured or estimated performance deltas.",
    false
);

pub struct OptimizeBody;

#[async_trait]
impl ProcessBody for OptimizeBody {
    fn schedule(&self) -> Schedule {
        Schedule::Scale
    }

    fn process(&self) -> Process {
        Process::P3
    }

    fn consultation(&self) -> Consultation {
        Consultation::None
    }

    fn system_prompt(&self, _ctx: &ExecutionContext) -> String {
        "You are applying final optimisations identified during benchmarking.".to_string()
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let request = EmitRequest {
            system_prompt: self.system_prompt(ctx),
            user_prompt: base_prompt(ctx, "\nApply optimisations and report what changed."),
        };
        let response = emitter.emit(request, cancel).await?;
        let mut outcome = ProcessOutcome::new(response.text.clone()).with_tokens(&response);
        outcome.tool_calls = response.tool_calls;
        outcome.schedule_complete = true;
        Ok(outcome)
    }
}

// Production: Analyze, Systemize, Harmonize (P3 -> vision role).
simple_body!(
    AnalyzeBody,
    Schedule::Production,
    Process::P1,
    Consultation::None,
    "You are analysing the change for production readiness.",
    "\nIdentify anything standing between this change and production use.",
    false
);
simple_body!(
    SystemizeBody,
    Schedule::Production,
    Process::P2,
    Consultation::None,
    "You are folding the change into the project's broader conventions.",
    "\nEnsure naming, structure and docs are consistent with the rest of the project.",
    false
);

pub struct HarmonizeBody;

#[async_trait]
impl ProcessBody for HarmonizeBody {
    fn schedule(&self) -> Schedule {
        Schedule::Production
    }

    fn process(&self) -> Process {
        Process::P3
    }

    fn consultation(&self) -> Consultation {
        Consultation::None
    }

    fn system_prompt(&self, _ctx: &ExecutionContext) -> String {
        "You are doing a final visual/holistic pass before this run concludes.".to_string()
    }

    async fn execute(
        &self,
        ctx: &ExecutionContext,
        emitter: &dyn Emitter,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutcome> {
        let request = EmitRequest {
            system_prompt: self.system_prompt(ctx),
            user_prompt: base_prompt(ctx, "\nConfirm the change is ready to ship."),
        };
        let response = emitter.emit(request, cancel).await?;
        let mut outcome = ProcessOutcome::new(response.text.clone()).with_tokens(&response);
        outcome.tool_calls = response.tool_calls;
        outcome.schedule_complete = true;
        Ok(outcome)
    }
}

/// Builds and looks up the fifteen process bodies by `(schedule,
/// process)` (spec §4.2: "Schedule Factory builds the 15 Processes").
/// Adding a schedule means adding a row here and a prompt template, not
/// touching the orchestrator.
pub struct ScheduleFactory {
    bodies: Vec<Box<dyn ProcessBody>>,
}

impl ScheduleFactory {
    pub fn new() -> Self {
        let bodies: Vec<Box<dyn ProcessBody>> = vec![
            Box::new(ResearchBody),
            Box::new(CrawlBody),
            Box::new(RetrieveBody),
            Box::new(BrainstormBody),
            Box::new(ClarifyBody),
            Box::new(PlanBody),
            Box::new(ImplementBody),
            Box::new(VerifyBody),
            Box::new(FeedbackBody),
            Box::new(ScaleBody),
            Box::new(BenchmarkBody),
            Box::new(OptimizeBody),
            Box::new(AnalyzeBody),
            Box::new(SystemizeBody),
            Box::new(HarmonizeBody),
        ];
        Self { bodies }
    }

    pub fn body_for(&self, schedule: Schedule, process: Process) -> &dyn ProcessBody {
        self.bodies
            .iter()
            .find(|b| b.schedule() == schedule && b.process() == process)
            .map(|b| b.as_ref())
            .expect("every (schedule, process) pair has a registered body")
    }
}

impl Default for ScheduleFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_covers_all_fifteen_processes() {
        let factory = ScheduleFactory::new();
        for schedule in Schedule::ALL {
            for process in Process::ALL {
                let body = factory.body_for(schedule, process);
                assert_eq!(body.schedule(), schedule);
                assert_eq!(body.process(), process);
            }
        }
    }

    #[test]
    fn implement_p3_requires_mandatory_consultation() {
        let factory = ScheduleFactory::new();
        let body = factory.body_for(Schedule::Implement, Process::P3);
        assert_eq!(body.consultation(), Consultation::Mandatory);
    }

    #[test]
    fn plan_p2_has_optional_consultation() {
        let factory = ScheduleFactory::new();
        let body = factory.body_for(Schedule::Plan, Process::P2);
        assert_eq!(body.consultation(), Consultation::Optional);
    }

    #[test]
    fn production_p3_signals_schedule_complete_and_needs_no_consultation() {
        let factory = ScheduleFactory::new();
        let body = factory.body_for(Schedule::Production, Process::P3);
        assert_eq!(body.schedule(), Schedule::Production);
        assert_eq!(body.process(), Process::P3);
        assert_eq!(body.consultation(), Consultation::None);
    }
}

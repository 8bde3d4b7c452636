//! Plain, informative printing -- no TUI, no tables, color only when
//! stdout is a terminal (spec §1: the CLI "only prints the events the
//! core already emits").

use flowdeck_engine::{OrchestratorEvent, StepOutcome, SuspensionReport};
use flowdeck_types::{ConsultationSource, Outcome, Session, StepRecord};
use is_terminal::IsTerminal;
use owo_colors::OwoColorize;

fn colored() -> bool {
    std::io::stdout().is_terminal()
}

pub fn print_event(event: &OrchestratorEvent) {
    match event {
        OrchestratorEvent::PositionChanged { from, to } => {
            println!("  {from} -> {to}");
        }
        OrchestratorEvent::StepCompleted { step } => print_step(step),
        OrchestratorEvent::ConsultationRequested { position } => {
            println!("  [{position}] waiting on a consultation");
        }
        OrchestratorEvent::ConsultationAnswered { position } => {
            println!("  [{position}] consultation answered");
        }
        OrchestratorEvent::Suspended { position, code } => {
            if colored() {
                println!("  [{position}] {} {code}", "suspended".red().bold());
            } else {
                println!("  [{position}] suspended {code}");
            }
        }
        OrchestratorEvent::Resumed { position } => {
            println!("  [{position}] resumed");
        }
        OrchestratorEvent::Terminated { goal_met } => {
            let label = if *goal_met { "terminated (goal met)" } else { "terminated (goal not met)" };
            if colored() && *goal_met {
                println!("  {}", label.green().bold());
            } else {
                println!("  {label}");
            }
        }
    }
}

fn print_step(step: &StepRecord) {
    let outcome = match step.outcome {
        Outcome::Ok => "ok",
        Outcome::Failed => "failed",
        Outcome::Suspended => "suspended",
    };
    let consult = step
        .consultation
        .as_ref()
        .map(|record| match record.source {
            ConsultationSource::Human => " (consulted human)",
            ConsultationSource::AiSubstitute => " (consulted AI substitute)",
        })
        .unwrap_or("");
    println!(
        "  step {}: {} [{outcome}] +{}tok{consult}",
        step.seq.value(),
        step.model_role,
        step.tokens.total(),
    );
    for call in &step.tool_calls {
        println!("    tool: {}", call.tool_id);
    }
}

pub fn print_suspension(report: &SuspensionReport) {
    println!();
    if colored() {
        println!("{} {}", "SUSPENDED".red().bold(), report.code);
    } else {
        println!("SUSPENDED {}", report.code);
    }
    println!("  at:      {}", report.frozen_position);
    println!("  flow:    {}", report.flow_code);
    println!("  message: {}", report.message);
    println!("  cause:   {}", report.analysis.root_cause);
    if !report.analysis.proposed_solutions.is_empty() {
        println!("  try:");
        for solution in &report.analysis.proposed_solutions {
            println!("    - {solution}");
        }
    }
}

pub fn print_termination(session: &Session) {
    println!();
    println!("flow code: {}", session.orchestration.flow_code);
    println!(
        "steps: {}  consultations: {}  retries: {}  tokens: {}",
        session.stats.steps_committed, session.stats.consultations, session.stats.retries, session.stats.total_tokens,
    );
    if let Some(tldr) = &session.tldr {
        println!();
        println!("TLDR [{}]", tldr.quality);
        println!("  {}", tldr.implementation);
        if !tldr.recommendations.is_empty() {
            println!("  recommendations:");
            for rec in &tldr.recommendations {
                println!("    - {rec}");
            }
        }
    }
}

/// The informative summary for a run that ended without terminating
/// (`wait` returning `Suspended`) vs one that did (`Terminated`).
pub fn print_step_outcome(outcome: &StepOutcome, session: &Session) {
    match outcome {
        StepOutcome::Committed { .. } => {}
        StepOutcome::Suspended { report } => print_suspension(report),
        StepOutcome::Terminated { .. } => print_termination(session),
    }
}

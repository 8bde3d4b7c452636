//! Judge Coordinator (spec §2, §4.5): parallel per-expert-role LM calls,
//! consensus arithmetic, and a TLDR synthesis call. Doubles as the
//! `TerminationOracle` (spec §4.1 "Termination policy"), since both are
//! one-shot orchestrator/expert-role LM calls with a small parsed
//! response, grounded on the same tolerant-parsing discipline.

pub mod parse;

use std::sync::Arc;

use async_trait::async_trait;
use flowdeck_engine::collaborators::{
    JudgeInput, JudgeRunner, SuspensionAnalyzer, TerminationDecision, TerminationOracle,
};
use flowdeck_engine::suspension::SuspensionAnalysis;
use flowdeck_providers::{Chunk, GenerateRequest, LmClient};
use flowdeck_types::{Consensus, ExpertFailure, ExpertReport, ModelRole, Quality, Schedule, Tldr};
use futures::StreamExt;

use crate::config::Config;
use crate::error::engine_operational;
use parse::{parse_expert_report, parse_suspension_analysis, parse_tldr};

/// Expert roles the Judge consults (spec §4.5: "coder, researcher,
/// vision"). The orchestrator role synthesises the TLDR, not a voting
/// member.
const EXPERT_ROLES: [ModelRole; 3] = [ModelRole::Coder, ModelRole::Researcher, ModelRole::Vision];

/// The richer result `analyze_detailed` returns internally; the
/// `JudgeRunner` trait only has room for the `Tldr` (spec §4.5 boundary
/// case: "judge called with zero experts configured ... no TLDR
/// synthesis call").
#[derive(Debug, Clone)]
pub struct Analysis {
    pub consensus: Consensus,
    pub tldr: Option<Tldr>,
}

pub struct JudgeCoordinator {
    client: Arc<dyn LmClient>,
    config: Arc<Config>,
    tier: flowdeck_types::Tier,
    expert_roles: Vec<ModelRole>,
}

impl JudgeCoordinator {
    pub fn new(client: Arc<dyn LmClient>, config: Arc<Config>, tier: flowdeck_types::Tier) -> Self {
        Self { client, config, tier, expert_roles: EXPERT_ROLES.to_vec() }
    }

    /// Same as [`Self::new`] but with an explicit expert roster, for
    /// configurations that disable an expert (or, per spec §8 boundary
    /// case, run with zero experts configured).
    pub fn with_expert_roles(
        client: Arc<dyn LmClient>,
        config: Arc<Config>,
        tier: flowdeck_types::Tier,
        expert_roles: Vec<ModelRole>,
    ) -> Self {
        Self { client, config, tier, expert_roles }
    }

    /// Exercises the full algorithm (spec §4.5 points 1-4) and returns
    /// both the consensus and, unless there were zero experts
    /// configured, the synthesized TLDR.
    pub async fn analyze_detailed(&self, input: &JudgeInput) -> Analysis {
        if self.expert_roles.is_empty() {
            // Boundary case (spec §4.5): zero experts configured still
            // produces an Analysis, with every normally-consulted role
            // recorded as a failure and no TLDR synthesis call.
            let failures = EXPERT_ROLES
                .iter()
                .map(|role| ExpertFailure { role: *role, reason: "no expert roles configured".to_string() })
                .collect();
            return Analysis { consensus: Consensus::compute(Vec::new(), failures), tldr: None };
        }

        let futures = self.expert_roles.iter().map(|role| self.run_expert(*role, input));
        let results = futures::future::join_all(futures).await;

        let mut reports = Vec::new();
        let mut failures = Vec::new();
        for (role, result) in self.expert_roles.iter().zip(results) {
            match result {
                Ok(report) => reports.push(report),
                Err(reason) => failures.push(ExpertFailure { role: *role, reason }),
            }
        }

        let consensus = Consensus::compute(reports, failures);
        let tldr = self.synthesize_tldr(input, &consensus).await.ok();
        Analysis { consensus, tldr }
    }

    async fn run_expert(&self, role: ModelRole, input: &JudgeInput) -> Result<ExpertReport, String> {
        let model = self.config.model_for(role, self.tier).to_string();
        let prompt = expert_prompt(role, input);
        let generate = GenerateRequest { model, system_prompt: Some(expert_system_prompt(role)), prompt };

        let text = collect_text(&self.client, generate)
            .await
            .map_err(|err| err.to_string())?;

        let raw = parse_expert_report(&text)?;
        Ok(ExpertReport {
            role,
            prompt_adherence: raw.prompt_adherence.unwrap_or(0),
            project_quality: raw.project_quality.unwrap_or(0),
            actions: raw.actions.unwrap_or(0),
            errors: raw.errors.unwrap_or(0),
            observations: raw.observations,
            recommendations: raw.recommendations,
        })
    }

    async fn synthesize_tldr(
        &self,
        input: &JudgeInput,
        consensus: &Consensus,
    ) -> flowdeck_providers::Result<Tldr> {
        let model = self.config.model_for(ModelRole::Orchestrator, self.tier).to_string();
        let prompt = tldr_prompt(input, consensus);
        let generate = GenerateRequest {
            model,
            system_prompt: Some(
                "Synthesize a final TLDR for this run in the fixed grammar you were given."
                    .to_string(),
            ),
            prompt,
        };

        let text = collect_text(&self.client, generate).await?;
        let raw = parse_tldr(&text);
        let quality = raw.quality.unwrap_or_else(|| Quality::from_average(consensus.overall_average()));

        Ok(Tldr {
            prompt_goal: non_empty(raw.prompt_goal, || input.original_prompt.clone()),
            implementation: raw.implementation,
            expert_consensus: raw.expert_consensus,
            discoveries: raw.discoveries,
            issues: raw.issues,
            quality,
            justification: raw.justification,
            recommendations: raw.recommendations,
        })
    }
}

fn non_empty(value: String, fallback: impl FnOnce() -> String) -> String {
    if value.trim().is_empty() {
        fallback()
    } else {
        value
    }
}

#[async_trait]
impl JudgeRunner for JudgeCoordinator {
    async fn analyze(&self, input: JudgeInput) -> flowdeck_engine::Result<Tldr> {
        let analysis = self.analyze_detailed(&input).await;
        Ok(analysis.tldr.unwrap_or_else(|| placeholder_tldr(&input, &analysis.consensus)))
    }
}

/// Used only when `analyze_detailed` produced no TLDR (zero experts
/// configured, or the synthesis call itself failed) -- the trait
/// signature has no channel for `None`.
fn placeholder_tldr(input: &JudgeInput, consensus: &Consensus) -> Tldr {
    let quality = if consensus.reports.is_empty() {
        Quality::NeedsImprovement
    } else {
        Quality::from_average(consensus.overall_average())
    };

    Tldr {
        prompt_goal: input.original_prompt.clone(),
        implementation: String::new(),
        expert_consensus: "no experts were available to form a consensus".to_string(),
        discoveries: Vec::new(),
        issues: String::new(),
        quality,
        justification: "TLDR synthesis did not run; no expert reports were available".to_string(),
        recommendations: Vec::new(),
    }
}

#[async_trait]
impl TerminationOracle for JudgeCoordinator {
    async fn decide(&self, flow_code: &str) -> flowdeck_engine::Result<TerminationDecision> {
        let model = self.config.model_for(ModelRole::Orchestrator, self.tier).to_string();
        let prompt = format!(
            "The run's flow code so far is: {flow_code}\n\n\
             Every schedule has now completed at least one pass, with Production most recent. \
             Reply with either:\n\
             TERMINATE: <justification>\n\
             or\n\
             REVISIT: <schedule number 1-5> <justification>"
        );
        let generate = GenerateRequest {
            model,
            system_prompt: Some("You decide whether an autonomous coding run is complete.".to_string()),
            prompt,
        };

        let text = collect_text(&self.client, generate).await.map_err(|err| {
            engine_operational(flowdeck_types::OperationalCode::OllamaUnavailable, err.to_string())
        })?;

        Ok(parse_termination_decision(&text))
    }
}

#[async_trait]
impl SuspensionAnalyzer for JudgeCoordinator {
    async fn analyze(&self, error_message: &str, flow_code: &str) -> flowdeck_engine::Result<SuspensionAnalysis> {
        let model = self.config.model_for(ModelRole::Orchestrator, self.tier).to_string();
        let prompt = format!(
            "A run suspended with this error: {error_message}\n\
             Flow code at suspension: {flow_code}\n\n\
             Respond in the fixed grammar:\n\
             WHAT_HAPPENED: <one paragraph>\n\
             ROOT_CAUSE: <one paragraph>\n\
             FACTORS:\n- <contributing factor>\n\
             PROPOSED_SOLUTIONS:\n1. <concrete next step>"
        );
        let generate = GenerateRequest {
            model,
            system_prompt: Some(
                "You analyze why an autonomous coding run suspended and propose next steps."
                    .to_string(),
            ),
            prompt,
        };

        let text = collect_text(&self.client, generate).await.map_err(|err| {
            engine_operational(flowdeck_types::OperationalCode::OllamaUnavailable, err.to_string())
        })?;

        let raw = parse_suspension_analysis(&text);
        Ok(SuspensionAnalysis {
            what_happened: non_empty(raw.what_happened, || error_message.to_string()),
            root_cause: non_empty(raw.root_cause, || "undetermined".to_string()),
            factors: raw.factors,
            proposed_solutions: raw.proposed_solutions,
        })
    }
}

fn parse_termination_decision(text: &str) -> TerminationDecision {
    for line in text.lines() {
        let line = line.trim();
        if let Some(rest) = strip_ci(line, "TERMINATE:") {
            return TerminationDecision::Terminate { justification: rest.trim().to_string() };
        }
        if let Some(rest) = strip_ci(line, "REVISIT:") {
            let mut parts = rest.trim().splitn(2, char::is_whitespace);
            let schedule = parts
                .next()
                .and_then(|n| n.parse::<u8>().ok())
                .and_then(Schedule::from_id)
                .unwrap_or(Schedule::Implement);
            let justification = parts.next().unwrap_or("").trim().to_string();
            return TerminationDecision::Revisit { schedule, justification };
        }
    }
    TerminationDecision::Terminate {
        justification: "no parseable directive in the termination response; defaulting to terminate".to_string(),
    }
}

fn strip_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    if line.len() < prefix.len() {
        return None;
    }
    let (candidate, rest) = line.split_at(prefix.len());
    candidate.eq_ignore_ascii_case(prefix).then_some(rest)
}

fn expert_system_prompt(role: ModelRole) -> String {
    format!(
        "You are the {role} expert reviewing a finished agentic coding run. Respond only in the \
         fixed grammar: PROMPT_ADHERENCE, PROJECT_QUALITY, ACTIONS, ERRORS, OBSERVATIONS, \
         RECOMMENDATIONS."
    )
}

fn expert_prompt(role: ModelRole, input: &JudgeInput) -> String {
    let actions = if input.actions.is_empty() {
        "(none recorded)".to_string()
    } else {
        input.actions.join("\n")
    };
    let errors = if input.errors.is_empty() {
        "(none recorded)".to_string()
    } else {
        input.errors.join("\n")
    };
    let file_changes = if input.file_changes.is_empty() {
        "(none recorded)".to_string()
    } else {
        let mut paths: Vec<_> = input.file_changes.iter().collect();
        paths.sort_by(|a, b| a.0.cmp(b.0));
        paths
            .into_iter()
            .map(|(path, lines)| format!("{path}: {lines} lines"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    let test_results = input.test_results.as_deref().unwrap_or("(not run)");
    let lint_results = input.lint_results.as_deref().unwrap_or("(not run)");

    format!(
        "Review this run as the {role} expert.\n\n\
         Original prompt: {}\n\
         Flow code: {}\n\n\
         Actions taken:\n{actions}\n\n\
         Errors encountered:\n{errors}\n\n\
         File changes:\n{file_changes}\n\n\
         Test results: {test_results}\n\
         Lint results: {lint_results}\n\n\
         Respond with PROMPT_ADHERENCE: n, PROJECT_QUALITY: n, ACTIONS: n, ERRORS: n, \
         OBSERVATIONS: bullet list, RECOMMENDATIONS: bullet list.",
        input.original_prompt, input.flow_code,
    )
}

fn tldr_prompt(input: &JudgeInput, consensus: &Consensus) -> String {
    let mut prompt = format!(
        "Original prompt: {}\nFlow code: {}\n\nExpert consensus:\n",
        input.original_prompt, input.flow_code
    );
    for report in &consensus.reports {
        prompt.push_str(&format!(
            "- {}: prompt_adherence={} project_quality={}\n",
            report.role, report.prompt_adherence, report.project_quality
        ));
    }
    for failure in &consensus.failures {
        prompt.push_str(&format!("- {} failed to report: {}\n", failure.role, failure.reason));
    }
    prompt.push_str(&format!(
        "\nAverages: prompt_adherence={:.1} project_quality={:.1}\n\n\
         Synthesize the TLDR in the fixed grammar.",
        consensus.avg_prompt_adherence, consensus.avg_project_quality
    ));
    prompt
}

async fn collect_text(
    client: &Arc<dyn LmClient>,
    request: GenerateRequest,
) -> flowdeck_providers::Result<String> {
    let mut stream = client.stream_generate(request).await?;
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        if let Chunk::Token(token) = chunk? {
            text.push_str(&token);
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdeck_providers::{Chunk, ChunkStream, Message};
    use std::pin::Pin;

    /// An `LmClient` that fails the vision expert's call (matched by its
    /// system prompt, since the default config maps both the researcher
    /// and orchestrator roles to the same model string) and answers every
    /// other call in whichever grammar its system prompt asks for.
    struct OneExpertFailsLmClient;

    #[async_trait]
    impl LmClient for OneExpertFailsLmClient {
        async fn probe(&self, _model: &str) -> flowdeck_providers::Result<bool> {
            Ok(true)
        }

        async fn stream_generate(&self, request: GenerateRequest) -> flowdeck_providers::Result<ChunkStream> {
            let system_prompt = request.system_prompt.unwrap_or_default();
            if system_prompt.to_ascii_lowercase().contains("vision expert") {
                return Err(flowdeck_providers::Error::ModelNotFound("llava:7b".to_string()));
            }
            let text = if system_prompt.contains("Synthesize a final TLDR") {
                "PROMPT GOAL: add a widget\n\
                 IMPLEMENTATION: added the widget and wired it up\n\
                 EXPERT CONSENSUS: coder and researcher agreed it was solid\n\
                 ISSUES: none\n\
                 QUALITY ASSESSMENT: ACCEPTABLE\n\
                 JUSTIFICATION: two of three experts reported cleanly, the third was unreachable"
                    .to_string()
            } else {
                "PROMPT_ADHERENCE: 85\n\
                 PROJECT_QUALITY: 80\n\
                 ACTIONS: 3\n\
                 ERRORS: 0\n\
                 OBSERVATIONS:\n- looks consistent with the plan\n\
                 RECOMMENDATIONS:\n- none"
                    .to_string()
            };
            Ok(canned_stream(&text))
        }

        async fn stream_chat(&self, _model: &str, _messages: &[Message]) -> flowdeck_providers::Result<ChunkStream> {
            unreachable!("JudgeCoordinator only drives stream_generate")
        }

        async fn embeddings(&self, _model: &str, _input: &str) -> flowdeck_providers::Result<Vec<f32>> {
            unreachable!("JudgeCoordinator never requests embeddings")
        }
    }

    fn canned_stream(text: &str) -> ChunkStream {
        let chunks = vec![
            Ok(Chunk::Token(text.to_string())),
            Ok(Chunk::Done { prompt_tokens: 10, completion_tokens: 5 }),
        ];
        Box::pin(futures::stream::iter(chunks)) as Pin<Box<_>>
    }

    fn sample_input() -> JudgeInput {
        JudgeInput {
            original_prompt: "add a widget".to_string(),
            flow_code: "S1P123S2P123S3P123S4P123S5P123".to_string(),
            ..Default::default()
        }
    }

    /// Boundary case (spec §4.5, §8): the judge is configured with zero
    /// experts. Every normally-consulted role should show up as a
    /// failure and no TLDR synthesis call should happen.
    #[tokio::test]
    async fn zero_experts_configured_yields_all_failures_and_no_tldr() {
        let client: Arc<dyn LmClient> = Arc::new(OneExpertFailsLmClient);
        let config = Arc::new(Config::default());
        let judge =
            JudgeCoordinator::with_expert_roles(client, config, flowdeck_types::Tier::Balanced, Vec::new());

        let analysis = judge.analyze_detailed(&sample_input()).await;

        assert!(analysis.tldr.is_none());
        assert!(analysis.consensus.reports.is_empty());
        let failed_roles: Vec<ModelRole> = analysis.consensus.failures.iter().map(|f| f.role).collect();
        assert_eq!(failed_roles.len(), EXPERT_ROLES.len());
        for role in EXPERT_ROLES {
            assert!(failed_roles.contains(&role));
        }
    }

    /// Seed scenario 6 (spec §8): one of three experts fails to report.
    /// The consensus should still average over the two that succeeded,
    /// record the failure, and the TLDR should still synthesize.
    #[tokio::test]
    async fn one_failing_expert_still_yields_a_consensus_and_a_tldr() {
        let client: Arc<dyn LmClient> = Arc::new(OneExpertFailsLmClient);
        let config = Arc::new(Config::default());
        let judge = JudgeCoordinator::new(client, config, flowdeck_types::Tier::Balanced);

        let analysis = judge.analyze_detailed(&sample_input()).await;

        assert_eq!(analysis.consensus.reports.len(), 2);
        assert_eq!(analysis.consensus.failures.len(), 1);
        assert_eq!(analysis.consensus.failures[0].role, ModelRole::Vision);
        assert_eq!(analysis.consensus.avg_prompt_adherence, 85.0);
        assert_eq!(analysis.consensus.avg_project_quality, 80.0);

        let tldr = analysis.tldr.expect("two successful experts should still produce a synthesized TLDR");
        assert_eq!(tldr.quality, Quality::Acceptable);
    }

    #[test]
    fn parses_a_terminate_directive() {
        let decision = parse_termination_decision("TERMINATE: all schedules complete, goal met");
        assert!(matches!(decision, TerminationDecision::Terminate { .. }));
    }

    #[test]
    fn parses_a_revisit_directive_with_schedule_number() {
        let decision = parse_termination_decision("REVISIT: 3 implementation had an open issue");
        match decision {
            TerminationDecision::Revisit { schedule, justification } => {
                assert_eq!(schedule, Schedule::Implement);
                assert_eq!(justification, "implementation had an open issue");
            }
            _ => panic!("expected Revisit"),
        }
    }

    #[test]
    fn unparseable_response_defaults_to_terminate() {
        let decision = parse_termination_decision("I am not sure what to do here");
        assert!(matches!(decision, TerminationDecision::Terminate { .. }));
    }
}

//! Model Coordinator (spec §2, §4.3): role selection plus an `Emitter`
//! that drives an `LmClient` through the fallback chain and extracts
//! tool calls from its streamed text. Grounded on the teacher's
//! `agtrace-providers::claude`/`codex` stream-to-text stitching, wired
//! to the trait boundary `flowdeck-engine::collaborators` defines.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use flowdeck_engine::collaborators::ModelCoordinator as ModelCoordinatorTrait;
use flowdeck_engine::process_body::{Emitter, EmitRequest, EmitResponse};
use flowdeck_providers::{Chunk, GenerateRequest, LmClient};
use flowdeck_types::{Intent, ModelRole, Process, Schedule, Tier, ToolCallAttempt};
use futures::StreamExt;
use regex::Regex;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::engine_operational;

/// Degradation chain when a role's configured model is unavailable (spec
/// §4.3: "vision -> coder -> researcher -> coder -> orchestrator").
const FALLBACK_CHAIN: [ModelRole; 5] = [
    ModelRole::Vision,
    ModelRole::Coder,
    ModelRole::Researcher,
    ModelRole::Coder,
    ModelRole::Orchestrator,
];

/// The ordered degradation path starting from `start`, with immediate
/// repeats collapsed (so starting from `Coder` does not visit `Coder`
/// twice in a row).
fn fallback_order(start: ModelRole) -> Vec<ModelRole> {
    let from = FALLBACK_CHAIN
        .iter()
        .position(|role| *role == start)
        .unwrap_or(0);

    let mut order = vec![start];
    for role in &FALLBACK_CHAIN[from + 1..] {
        if order.last() != Some(role) {
            order.push(*role);
        }
    }
    order
}

/// Line grammar a process body's LM response may use to request a tool
/// (spec §4.1 point 5): `TOOL_CALL: <tool_id> <json arguments>`. Tolerant
/// of leading whitespace and a missing argument object (treated as
/// `null`), the way the Judge Coordinator's report parser tolerates
/// ragged bullet formatting.
fn tool_call_pattern() -> &'static Regex {
    static PATTERN: once_cell::sync::OnceCell<Regex> = once_cell::sync::OnceCell::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^\s*TOOL_CALL:\s*(?P<id>[A-Za-z0-9_.\-]+)\s*(?P<args>\{.*\})?\s*$")
            .expect("tool call pattern is a valid regex")
    })
}

/// Scan `text` for `TOOL_CALL:` lines and turn each into an unvalidated
/// attempt (validation against the Tool Registry happens in the
/// orchestrator, not here).
pub fn extract_tool_calls(text: &str) -> Vec<ToolCallAttempt> {
    tool_call_pattern()
        .captures_iter(text)
        .map(|caps| {
            let tool_id = caps["id"].to_string();
            let arguments = caps
                .name("args")
                .and_then(|m| serde_json::from_str(m.as_str()).ok())
                .unwrap_or(serde_json::Value::Null);
            ToolCallAttempt { tool_id, accepted: false, arguments }
        })
        .collect()
}

/// Per-role emitter: picks a model for `role` at the coordinator's
/// detected tier, streams a single-turn generation through the
/// configured `LmClient`, and falls back to the next role in the chain
/// on backend unavailability (spec §4.3: "On backend failure the
/// Coordinator retries the same role once, then falls back").
struct RoleEmitter {
    role: ModelRole,
    client: Arc<dyn LmClient>,
    config: Arc<Config>,
    tier: Tier,
    token_totals: Arc<TokenTotals>,
}

#[async_trait]
impl Emitter for RoleEmitter {
    async fn emit(
        &self,
        request: EmitRequest,
        cancel: &CancellationToken,
    ) -> flowdeck_engine::Result<EmitResponse> {
        for (attempt, role) in fallback_order(self.role).into_iter().enumerate() {
            let model = self.config.model_for(role, self.tier).to_string();
            match self.stream_once(&model, &request, cancel).await {
                Ok(response) => {
                    self.token_totals.record(response.prompt_tokens, response.completion_tokens);
                    return Ok(response);
                }
                Err(err) if attempt + 1 == fallback_order(self.role).len() => return Err(err),
                Err(_) => continue,
            }
        }

        Err(engine_operational(
            flowdeck_types::OperationalCode::OllamaUnavailable,
            format!("no model in the fallback chain starting at {} produced a response", self.role),
        ))
    }
}

impl RoleEmitter {
    async fn stream_once(
        &self,
        model: &str,
        request: &EmitRequest,
        cancel: &CancellationToken,
    ) -> flowdeck_engine::Result<EmitResponse> {
        let generate_request = GenerateRequest {
            model: model.to_string(),
            system_prompt: Some(request.system_prompt.clone()),
            prompt: request.user_prompt.clone(),
        };

        let mut stream = self.client.stream_generate(generate_request).await.map_err(|err| {
            engine_operational(flowdeck_types::OperationalCode::OllamaUnavailable, err.to_string())
        })?;

        let mut text = String::new();
        let mut prompt_tokens = 0u64;
        let mut completion_tokens = 0u64;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(flowdeck_engine::Error::Cancelled),
                next = stream.next() => {
                    match next {
                        Some(Ok(Chunk::Token(token))) => text.push_str(&token),
                        Some(Ok(Chunk::Done { prompt_tokens: p, completion_tokens: c })) => {
                            prompt_tokens = p;
                            completion_tokens = c;
                        }
                        Some(Err(err)) => {
                            return Err(engine_operational(
                                flowdeck_types::OperationalCode::StreamInterrupted,
                                err.to_string(),
                            ));
                        }
                        None => break,
                    }
                }
            }
        }

        Ok(EmitResponse {
            tool_calls: extract_tool_calls(&text),
            text,
            prompt_tokens,
            completion_tokens,
        })
    }
}

#[derive(Default)]
struct TokenTotals {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenTotals {
    fn record(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    fn snapshot(&self) -> (u64, u64) {
        (self.prompt.load(Ordering::Relaxed), self.completion.load(Ordering::Relaxed))
    }
}

/// The coordinator the runtime hands to `Orchestrator::start` (spec
/// §2: "Model Coordinator"). Owns the configured tier, the LM client,
/// and one `TokenTotals` counter per role for telemetry.
pub struct RuntimeModelCoordinator {
    client: Arc<dyn LmClient>,
    config: Arc<Config>,
    tier: Tier,
    totals: HashMap<ModelRole, Arc<TokenTotals>>,
}

impl RuntimeModelCoordinator {
    pub fn new(client: Arc<dyn LmClient>, config: Arc<Config>) -> Self {
        let tier = config.detect_tier();
        let totals = ModelRole::ALL
            .iter()
            .map(|role| (*role, Arc::new(TokenTotals::default())))
            .collect();
        Self { client, config, tier, totals }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    /// Cumulative (prompt, completion) tokens spent under `role` so far,
    /// for the Telemetry Sink (spec §4.7).
    pub fn token_totals(&self, role: ModelRole) -> (u64, u64) {
        self.totals
            .get(&role)
            .map(|totals| totals.snapshot())
            .unwrap_or((0, 0))
    }
}

/// Tier-based role demotion (spec §4.3: "In reduced-memory tiers, the
/// coder role falls back to orchestrator (smaller model) and vision
/// falls back to coder"). A one-level substitution applied after the
/// nominal role is picked from `(schedule, process, intent)`, distinct
/// from `Config::model_for`'s per-role model-name tier mapping.
fn demote_for_tier(role: ModelRole, tier: Tier) -> ModelRole {
    if !matches!(tier, Tier::Minimal | Tier::Compact) {
        return role;
    }
    match role {
        ModelRole::Vision => ModelRole::Coder,
        ModelRole::Coder => ModelRole::Orchestrator,
        other => other,
    }
}

#[async_trait]
impl ModelCoordinatorTrait for RuntimeModelCoordinator {
    fn select(&self, schedule: Schedule, process: Process, intent: Intent) -> ModelRole {
        let role = match (schedule, process) {
            (Schedule::Knowledge, _) => ModelRole::Researcher,
            (Schedule::Production, Process::P3) => ModelRole::Vision,
            _ => intent.default_role(),
        };
        demote_for_tier(role, self.tier)
    }

    async fn emitter_for(&self, role: ModelRole) -> flowdeck_engine::Result<Arc<dyn Emitter>> {
        let totals = self.totals.get(&role).cloned().unwrap_or_default();
        Ok(Arc::new(RoleEmitter {
            role,
            client: self.client.clone(),
            config: self.config.clone(),
            tier: self.tier,
            token_totals: totals,
        }))
    }

    async fn validate(&self) -> flowdeck_engine::Result<()> {
        for role in ModelRole::ALL {
            let model = self.config.model_for(role, self.tier).to_string();
            let available = self.client.probe(&model).await.map_err(|err| {
                engine_operational(flowdeck_types::OperationalCode::ModelNotFound, err.to_string())
            })?;
            if !available {
                return Err(engine_operational(
                    flowdeck_types::OperationalCode::ModelNotFound,
                    format!("model '{model}' configured for role {role} is not available"),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_order_from_vision_matches_the_documented_chain() {
        assert_eq!(
            fallback_order(ModelRole::Vision),
            vec![ModelRole::Vision, ModelRole::Coder, ModelRole::Researcher, ModelRole::Coder, ModelRole::Orchestrator]
        );
    }

    #[test]
    fn fallback_order_from_orchestrator_is_just_itself() {
        assert_eq!(fallback_order(ModelRole::Orchestrator), vec![ModelRole::Orchestrator]);
    }

    #[test]
    fn fallback_order_from_coder_skips_the_leading_vision_hop() {
        assert_eq!(
            fallback_order(ModelRole::Coder),
            vec![ModelRole::Coder, ModelRole::Researcher, ModelRole::Coder, ModelRole::Orchestrator]
        );
    }

    #[test]
    fn production_p3_always_selects_vision_regardless_of_intent() {
        std::env::set_var("FLOWDECK_FORCE_TIER", "balanced");
        let client: Arc<dyn LmClient> =
            Arc::new(flowdeck_providers::OllamaClient::new(flowdeck_providers::OllamaConfig::default()).unwrap());
        let config = Arc::new(Config::default());
        let coordinator = RuntimeModelCoordinator::new(client, config);
        let role = coordinator.select(Schedule::Production, Process::P3, Intent::Coding);
        assert_eq!(role, ModelRole::Vision);
        std::env::remove_var("FLOWDECK_FORCE_TIER");
    }

    #[test]
    fn reduced_memory_tiers_demote_vision_and_coder() {
        assert_eq!(demote_for_tier(ModelRole::Vision, Tier::Minimal), ModelRole::Coder);
        assert_eq!(demote_for_tier(ModelRole::Coder, Tier::Minimal), ModelRole::Orchestrator);
        assert_eq!(demote_for_tier(ModelRole::Vision, Tier::Compact), ModelRole::Coder);
        assert_eq!(demote_for_tier(ModelRole::Coder, Tier::Compact), ModelRole::Orchestrator);
        assert_eq!(demote_for_tier(ModelRole::Researcher, Tier::Minimal), ModelRole::Researcher);
    }

    #[test]
    fn balanced_and_above_tiers_never_demote() {
        for tier in [Tier::Balanced, Tier::Performance, Tier::Advanced] {
            assert_eq!(demote_for_tier(ModelRole::Vision, tier), ModelRole::Vision);
            assert_eq!(demote_for_tier(ModelRole::Coder, tier), ModelRole::Coder);
        }
    }

    #[test]
    fn select_applies_tier_demotion_on_top_of_the_nominal_role() {
        std::env::set_var("FLOWDECK_FORCE_TIER", "minimal");
        let client: Arc<dyn LmClient> =
            Arc::new(flowdeck_providers::OllamaClient::new(flowdeck_providers::OllamaConfig::default()).unwrap());
        let config = Arc::new(Config::default());
        let coordinator = RuntimeModelCoordinator::new(client, config);
        let role = coordinator.select(Schedule::Production, Process::P3, Intent::Coding);
        assert_eq!(role, ModelRole::Coder);
        std::env::remove_var("FLOWDECK_FORCE_TIER");
    }

    #[test]
    fn extracts_a_single_tool_call_with_arguments() {
        let text = "here is my plan\nTOOL_CALL: read_file {\"path\": \"src/lib.rs\"}\ndone";
        let calls = extract_tool_calls(text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_id, "read_file");
        assert_eq!(calls[0].arguments["path"], "src/lib.rs");
    }

    #[test]
    fn extracts_a_tool_call_with_no_arguments_as_null() {
        let calls = extract_tool_calls("TOOL_CALL: list_files");
        assert_eq!(calls.len(), 1);
        assert!(calls[0].arguments.is_null());
    }

    #[test]
    fn text_with_no_tool_call_lines_extracts_nothing() {
        assert!(extract_tool_calls("just some prose, no directives here").is_empty());
    }
}

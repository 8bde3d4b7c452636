//! Consultation Handler (spec §2, §4.4): a request/response channel pair
//! rather than a callback, so timeout plus AI-substitution is one
//! `tokio::select!` over {answer, countdown tick, cancel} (spec §9
//! design note, quoted in SPEC_FULL.md §4.4). `flowdeck-runtime` has no
//! terminal of its own -- the CLI/SDK own presenting the question -- so
//! the gateway only produces `PendingConsultation` values onto an mpsc
//! channel; whatever owns the receiving end answers them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flowdeck_engine::collaborators::{
    ConsultationGateway, ConsultationKind, ConsultationRequest, ConsultationResponse,
    ConsultationSource,
};
use flowdeck_providers::{GenerateRequest, LmClient};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::engine_operational;

const CLARIFY_TIMEOUT: Duration = Duration::from_secs(60);
const FEEDBACK_TIMEOUT: Duration = Duration::from_secs(300);
const COUNTDOWN_WINDOW: Duration = Duration::from_secs(15);

/// One outstanding request, handed to whatever consumer owns the
/// receiving end of the gateway's channel. Answering it resolves the
/// `oneshot` the gateway is waiting on.
pub struct PendingConsultation {
    pub request: ConsultationRequest,
    reply: oneshot::Sender<String>,
}

impl PendingConsultation {
    pub fn answer(self, content: impl Into<String>) {
        let _ = self.reply.send(content.into());
    }
}

/// The gateway the runtime hands to `Orchestrator::start`. Enforces "one
/// active request at a time" (spec §5) with a `try_lock` guard, and
/// degrades to an AI-substitute answer from the orchestrator-role LM
/// once the timeout elapses, if the caller allowed it.
pub struct RuntimeConsultationGateway {
    pending: mpsc::Sender<PendingConsultation>,
    busy: Mutex<()>,
    client: Arc<dyn LmClient>,
    orchestrator_model: String,
    allow_ai_sub: bool,
}

impl RuntimeConsultationGateway {
    /// Returns the gateway plus the consumer end of its pending-request
    /// channel. Capacity 1 matches the "one active request at a time"
    /// invariant -- a second `request()` call observes a full channel
    /// only transiently; the real enforcement is the `busy` mutex below.
    pub fn new(
        client: Arc<dyn LmClient>,
        orchestrator_model: impl Into<String>,
        allow_ai_sub: bool,
    ) -> (Self, mpsc::Receiver<PendingConsultation>) {
        let (tx, rx) = mpsc::channel(1);
        let gateway = Self {
            pending: tx,
            busy: Mutex::new(()),
            client,
            orchestrator_model: orchestrator_model.into(),
            allow_ai_sub,
        };
        (gateway, rx)
    }

    fn timeout_for(kind: ConsultationKind) -> Duration {
        match kind {
            ConsultationKind::Clarify => CLARIFY_TIMEOUT,
            ConsultationKind::Feedback => FEEDBACK_TIMEOUT,
        }
    }

    async fn ai_substitute(&self, request: &ConsultationRequest) -> String {
        let prompt = render_ai_substitute_prompt(request);
        let generate = GenerateRequest {
            model: self.orchestrator_model.clone(),
            system_prompt: Some(
                "Impersonate a reasonable human responding to this request. Answer plainly, \
                 no preamble."
                    .to_string(),
            ),
            prompt,
        };

        match collect_text(&self.client, generate).await {
            Ok(text) if !text.trim().is_empty() => text,
            _ => canned_fallback(request.kind),
        }
    }
}

#[async_trait]
impl ConsultationGateway for RuntimeConsultationGateway {
    #[instrument(skip(self, cancel))]
    async fn request(
        &self,
        request: ConsultationRequest,
        cancel: &CancellationToken,
    ) -> flowdeck_engine::Result<ConsultationResponse> {
        let _guard = self.busy.try_lock().map_err(|_| {
            engine_operational(
                flowdeck_types::OperationalCode::ConsultationBusy,
                "a consultation request is already in flight",
            )
        })?;

        let (reply_tx, mut reply_rx) = oneshot::channel();
        let pending = PendingConsultation { request: request.clone(), reply: reply_tx };

        if self.pending.send(pending).await.is_err() {
            return Err(engine_operational(
                flowdeck_types::OperationalCode::ConsultationBusy,
                "no consumer is listening for consultation requests",
            ));
        }

        let timeout = Self::timeout_for(request.kind);
        let countdown_start = timeout.saturating_sub(COUNTDOWN_WINDOW);
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        let mut elapsed = Duration::ZERO;
        let mut announced = false;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(flowdeck_engine::Error::Cancelled);
                }
                answer = &mut reply_rx => {
                    if let Ok(content) = answer {
                        return Ok(ConsultationResponse { content, source: ConsultationSource::Human });
                    }
                    break;
                }
                _ = ticker.tick() => {
                    elapsed += Duration::from_secs(1);
                    if !announced && elapsed >= countdown_start {
                        announced = true;
                        info!(remaining_secs = (timeout - elapsed).as_secs(), "consultation countdown started");
                    }
                    if elapsed >= timeout {
                        break;
                    }
                }
            }
        }

        if self.allow_ai_sub && request.allow_ai_sub {
            let content = self.ai_substitute(&request).await;
            return Ok(ConsultationResponse { content, source: ConsultationSource::AiSubstitute });
        }

        Err(engine_operational(
            flowdeck_types::OperationalCode::ConsultationTimeout,
            "no response within the consultation window and AI substitution was not allowed",
        ))
    }
}

fn render_ai_substitute_prompt(request: &ConsultationRequest) -> String {
    let mut prompt = format!("{}\n\n{}", request.question, request.context);
    if !request.options.is_empty() {
        prompt.push_str("\n\nOptions:\n");
        for (index, option) in request.options.iter().enumerate() {
            let label = (b'A' + index as u8) as char;
            prompt.push_str(&format!("{label}. {option}\n"));
        }
    }
    prompt
}

fn canned_fallback(kind: ConsultationKind) -> String {
    match kind {
        ConsultationKind::Clarify => {
            "No clarification was available; proceed with the most reasonable interpretation.".to_string()
        }
        ConsultationKind::Feedback => {
            "No feedback was available; the changes are approved as presented.".to_string()
        }
    }
}

async fn collect_text(
    client: &Arc<dyn LmClient>,
    request: GenerateRequest,
) -> flowdeck_providers::Result<String> {
    use flowdeck_providers::Chunk;
    use futures::StreamExt;

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

    #[test]
    fn clarify_prompt_labels_options_alphabetically() {
        let request = ConsultationRequest {
            kind: ConsultationKind::Clarify,
            question: "which approach?".to_string(),
            context: "two viable refactors".to_string(),
            options: vec!["inline".to_string(), "extract".to_string()],
            allow_ai_sub: true,
        };
        let prompt = render_ai_substitute_prompt(&request);
        assert!(prompt.contains("A. inline"));
        assert!(prompt.contains("B. extract"));
    }

    #[test]
    fn canned_fallback_differs_by_kind() {
        assert!(canned_fallback(ConsultationKind::Clarify).contains("clarification"));
        assert!(canned_fallback(ConsultationKind::Feedback).contains("feedback"));
    }
}

use std::time::Instant;

use flowdeck_engine::{RunHandle, StepOutcome, SuspensionVerdict};
use flowdeck_runtime::{PendingConsultation, RunSummary, SessionStore, TelemetrySink};
use flowdeck_types::{PlatformOrigin, Session, SessionId};
use tokio::sync::{broadcast, mpsc};

use crate::error::Result;

/// Options accepted by [`crate::Client::submit`].
#[derive(Debug, Clone)]
pub struct SubmitOptions {
    pub platform_origin: PlatformOrigin,
    /// Whether a consultation may be answered by an LM impersonating the
    /// user once its countdown elapses with nobody listening.
    pub allow_ai_substitute: bool,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self { platform_origin: PlatformOrigin::Cli, allow_ai_substitute: true }
    }
}

/// A submitted run, wrapping the bare engine [`RunHandle`] with the
/// persistence and telemetry bookkeeping the engine itself does not do
/// (the engine only ever touches its in-memory `Session`; writing it
/// anywhere is the runtime's and, by composition, this facade's job).
pub struct RunSession {
    handle: RunHandle,
    id: SessionId,
    platform_origin: PlatformOrigin,
    session_store: SessionStore,
    telemetry: TelemetrySink,
    /// Questions the Consultation Handler raised that nothing has
    /// answered yet. The CLI (or any other front-end) drains this to
    /// present prompts to a human; this crate never reads from it
    /// itself, since presenting a prompt is a front-end's job (§1).
    pending_consultations: mpsc::Receiver<PendingConsultation>,
    started_at: Instant,
    peak_memory_gb: f64,
}

impl RunSession {
    pub(crate) fn new(
        handle: RunHandle,
        id: SessionId,
        platform_origin: PlatformOrigin,
        session_store: SessionStore,
        telemetry: TelemetrySink,
        pending_consultations: mpsc::Receiver<PendingConsultation>,
    ) -> Self {
        Self {
            handle,
            id,
            platform_origin,
            session_store,
            telemetry,
            pending_consultations,
            started_at: Instant::now(),
            peak_memory_gb: 0.0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Advances the run by one step, persisting the resulting session
    /// state before returning. A caller that only inspects `events()`
    /// after awaiting this future never observes a `StepCompleted`
    /// event whose step the Session Store has not yet acknowledged.
    pub async fn step(&mut self) -> Result<StepOutcome> {
        let outcome = self.handle.step().await?;
        self.persist_and_maybe_record(&outcome).await?;
        Ok(outcome)
    }

    /// Runs steps until the run terminates or suspends.
    pub async fn wait(&mut self) -> Result<StepOutcome> {
        loop {
            match self.step().await? {
                StepOutcome::Committed { .. } => continue,
                terminal => return Ok(terminal),
            }
        }
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    pub fn events(&self) -> broadcast::Receiver<flowdeck_engine::OrchestratorEvent> {
        self.handle.events()
    }

    pub async fn state(&self) -> Session {
        self.handle.state().await
    }

    pub async fn resolve_suspension(&self, verdict: SuspensionVerdict) -> Result<()> {
        self.handle.resolve_suspension(verdict).await.map_err(Into::into)
    }

    /// The next outstanding consultation request, if one is waiting for
    /// an answer. Returns `None` once the channel is closed (the run has
    /// ended and dropped its `ConsultationGateway`).
    pub async fn next_consultation(&mut self) -> Option<PendingConsultation> {
        self.pending_consultations.recv().await
    }

    /// Non-blocking variant of [`Self::next_consultation`], for a caller
    /// that interleaves answering consultations with driving `step()` in
    /// the same loop rather than awaiting both concurrently.
    pub fn try_next_consultation(&mut self) -> Option<PendingConsultation> {
        self.pending_consultations.try_recv().ok()
    }

    async fn persist_and_maybe_record(&mut self, outcome: &StepOutcome) -> Result<()> {
        let session = self.handle.state().await;
        self.session_store.save(&session).await?;

        if let StepOutcome::Terminated { goal_met } = outcome {
            let prompt_tokens = session.steps.iter().map(|step| step.tokens.prompt).sum();
            let completion_tokens = session.steps.iter().map(|step| step.tokens.completion).sum();
            let summary = RunSummary {
                session_id: self.id,
                platform_origin: self.platform_origin,
                success: *goal_met,
                peak_memory_gb: self.sample_peak_memory(),
                prompt_tokens,
                completion_tokens,
                disk_written_mb: 0.0,
                duration_seconds: self.started_at.elapsed().as_secs_f64(),
            };
            self.telemetry.record(summary)?;
        }

        Ok(())
    }

    fn sample_peak_memory(&mut self) -> f64 {
        let mut system = sysinfo::System::new();
        system.refresh_memory();
        let used_gb = system.used_memory() as f64 / (1024.0 * 1024.0 * 1024.0);
        if used_gb > self.peak_memory_gb {
            self.peak_memory_gb = used_gb;
        }
        self.peak_memory_gb
    }
}

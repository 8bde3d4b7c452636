use std::path::PathBuf;
use std::sync::Arc;

use flowdeck_engine::collaborators::{
    ConsultationGateway, JudgeRunner, ModelCoordinator, SuspensionAnalyzer, TerminationOracle,
};
use flowdeck_engine::{Orchestrator, StartOptions};
use flowdeck_providers::{LmClient, OllamaClient, OllamaConfig};
use flowdeck_runtime::{Config, JudgeCoordinator, RuntimeConsultationGateway, RuntimeModelCoordinator, SessionStore, TelemetrySink};
use flowdeck_types::{ModelRole, PlatformOrigin, SessionId};

use crate::error::{Error, Result};
use crate::run::{RunSession, SubmitOptions};
use crate::sessions::SessionsClient;

/// The embedding facade: one `Client` owns the configured LM backend, the
/// tier-detected Model Coordinator, the Judge Coordinator, the Session
/// Store, and the Telemetry Sink, the way `agtrace_runtime::AgTrace` is
/// the one handle `agtrace-sdk::Client` wraps.
pub struct Client {
    config: Arc<Config>,
    lm_client: Arc<dyn LmClient>,
    coordinator: Arc<RuntimeModelCoordinator>,
    judge: Arc<JudgeCoordinator>,
    session_store: SessionStore,
    telemetry: TelemetrySink,
}

impl Client {
    /// Opens the default workspace (`FLOWDECK_PATH`, then the XDG data
    /// directory, then `~/.flowdeck`), loading (and migrating, if needed)
    /// whatever config is already on disk there.
    pub fn connect_default() -> Result<Self> {
        let config = Config::load().map_err(Error::from)?;
        Self::connect_with_config(Config::default_path().map_err(Error::from)?, config)
    }

    /// Opens a specific workspace root.
    pub fn connect(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let config_path = root.join("config.yaml");
        let config = Config::load_from(&config_path).map_err(Error::from)?;
        Self::connect_with_config(config_path, config)
    }

    fn connect_with_config(config_path: PathBuf, config: Config) -> Result<Self> {
        let workspace_root = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let ollama_config = OllamaConfig {
            base_url: config.ollama.url.clone(),
            timeout_seconds: config.ollama.timeout_seconds,
            bearer_token: std::env::var("OLLAMA_BEARER_TOKEN").ok(),
        };
        let lm_client: Arc<dyn LmClient> =
            Arc::new(OllamaClient::new(ollama_config).map_err(|err| {
                Error::InvalidInput(format!("could not build the Ollama client: {err}"))
            })?);

        let config = Arc::new(config);
        let coordinator = Arc::new(RuntimeModelCoordinator::new(lm_client.clone(), config.clone()));
        let judge = Arc::new(JudgeCoordinator::new(lm_client.clone(), config.clone(), coordinator.tier()));
        let session_store = SessionStore::spawn(workspace_root.clone());
        let telemetry = TelemetrySink::new(&workspace_root);

        Ok(Self { config, lm_client, coordinator, judge, session_store, telemetry })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn telemetry(&self) -> &TelemetrySink {
        &self.telemetry
    }

    pub fn sessions(&self) -> SessionsClient<'_> {
        SessionsClient::new(&self.session_store)
    }

    /// `submit(task) -> RunHandle` (§4.1), wrapped with the write-behind
    /// persistence and telemetry recording the bare `Orchestrator` leaves
    /// to its caller.
    pub async fn submit(&self, task: impl Into<String>, options: SubmitOptions) -> Result<RunSession> {
        let task = task.into();
        if task.trim().is_empty() {
            return Err(Error::InvalidInput("task description must not be empty".to_string()));
        }

        let coordinator: Arc<dyn ModelCoordinator> = self.coordinator.clone();
        let orchestrator_model = self
            .config
            .model_for(ModelRole::Orchestrator, self.coordinator.tier())
            .to_string();
        let (gateway, pending) =
            RuntimeConsultationGateway::new(self.lm_client.clone(), orchestrator_model, options.allow_ai_substitute);
        let gateway: Arc<dyn ConsultationGateway> = Arc::new(gateway);
        let judge_runner: Arc<dyn JudgeRunner> = self.judge.clone();
        let termination: Arc<dyn TerminationOracle> = self.judge.clone();
        let suspension_analyzer: Arc<dyn SuspensionAnalyzer> = self.judge.clone();

        let start_options = StartOptions {
            platform_origin: options.platform_origin,
            allow_ai_substitute: options.allow_ai_substitute,
        };

        let handle = Orchestrator::start(
            task,
            start_options,
            coordinator,
            gateway,
            judge_runner,
            termination,
            suspension_analyzer,
        )
        .await
        .map_err(Error::from)?;

        let session = handle.state().await;
        let id = session.id;
        self.session_store.save(&session).await.map_err(Error::from)?;

        Ok(RunSession::new(
            handle,
            id,
            options.platform_origin,
            self.session_store.clone(),
            self.telemetry.clone(),
            pending,
        ))
    }

    /// Re-attaches telemetry/session-store access for a session id that
    /// was already persisted (e.g. by a previous process), without
    /// starting a new run. Useful for `session show`/`export` tooling.
    pub fn session(&self, id: SessionId) -> Result<flowdeck_types::Session> {
        self.session_store
            .load(id)
            .map_err(|err| match err {
                flowdeck_runtime::Error::NotFound(msg) => Error::NotFound(msg),
                other => Error::Runtime(other),
            })
    }

    /// Re-attaches a live `RunSession` to a persisted session, possibly
    /// loaded on a different host than the one that started it (spec §8
    /// seed scenario 5). Stepping the returned handle continues from the
    /// `(schedule, process)` recovered from the session's `flow_code`; a
    /// session whose `flow_code` ends in `X` comes back suspended and
    /// must be resolved before it steps further.
    pub fn resume(&self, id: SessionId) -> Result<RunSession> {
        let session = self.session(id)?;
        let platform_origin = session.platform_origin;

        let coordinator: Arc<dyn ModelCoordinator> = self.coordinator.clone();
        let orchestrator_model = self
            .config
            .model_for(ModelRole::Orchestrator, self.coordinator.tier())
            .to_string();
        let allow_ai_substitute = session.task_status != flowdeck_types::TaskStatus::Aborted;
        let (gateway, pending) =
            RuntimeConsultationGateway::new(self.lm_client.clone(), orchestrator_model, allow_ai_substitute);
        let gateway: Arc<dyn ConsultationGateway> = Arc::new(gateway);
        let judge_runner: Arc<dyn JudgeRunner> = self.judge.clone();
        let termination: Arc<dyn TerminationOracle> = self.judge.clone();
        let suspension_analyzer: Arc<dyn SuspensionAnalyzer> = self.judge.clone();

        let handle = Orchestrator::resume(
            session,
            coordinator,
            gateway,
            judge_runner,
            termination,
            suspension_analyzer,
        );

        Ok(RunSession::new(
            handle,
            id,
            platform_origin,
            self.session_store.clone(),
            self.telemetry.clone(),
            pending,
        ))
    }
}

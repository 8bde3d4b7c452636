//! Model Coordinator, Consultation Handler, Judge Coordinator, Session
//! Store, Telemetry Sink and Config for the flowdeck orchestration core
//! (spec §2). Implements the collaborator traits `flowdeck-engine`
//! defines, the way `agtrace-runtime` assembles `agtrace-providers`
//! traits into a concrete, storage-backed client behind one facade.

pub(crate) mod config;
pub(crate) mod consultation;
pub(crate) mod error;
pub(crate) mod judge;
pub(crate) mod model_coordinator;
pub(crate) mod session_store;
pub(crate) mod telemetry;

pub use config::{Config, ModelsConfig, OrchestrationConfig, RoleModelConfig};
pub use consultation::{PendingConsultation, RuntimeConsultationGateway};
pub use error::{Error, Result};
pub use judge::{Analysis, JudgeCoordinator};
pub use model_coordinator::{extract_tool_calls, RuntimeModelCoordinator};
pub use session_store::SessionStore;
pub use telemetry::{estimated_cost_saved, RunSummary, TelemetryRecord, TelemetrySink};

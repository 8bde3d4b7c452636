//! Public SDK for embedding flowdeck: connect to a workspace, submit a
//! task, drive the resulting run, and consult its events, sessions, and
//! telemetry. `flowdeck-cli` is one consumer of this crate; anything a
//! CLI or an IDE integration needs to drive the orchestrator belongs
//! here rather than duplicated between front ends.

mod client;
mod error;
mod run;
mod sessions;

pub use client::Client;
pub use error::{Error, Result};
pub use run::{RunSession, SubmitOptions};
pub use sessions::SessionsClient;

pub use flowdeck_engine::{OrchestratorEvent, StepOutcome, SuspensionReport, SuspensionVerdict};
pub use flowdeck_runtime::{Config, RunSummary, TelemetryRecord};
pub use flowdeck_types::{PlatformOrigin, Session, SessionId};

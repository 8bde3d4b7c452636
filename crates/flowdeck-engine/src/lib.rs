//! State machine, schedule factory and suspension handling for the
//! flowdeck orchestration core (spec §4.1-§4.2). Depends on
//! `flowdeck-types` and `flowdeck-core` for vocabulary and tool
//! validation, and defines the collaborator traits that
//! `flowdeck-runtime` implements (spec §2, §4.3-§4.7) -- the dependency
//! points from runtime to engine at the crate level and from engine to
//! runtime at the trait level, the way `agtrace-providers::traits` lets
//! `agtrace-runtime` plug in concrete providers without the leaf crate
//! knowing about them.

pub mod collaborators;
pub mod error;
pub mod events;
pub mod navigation;
pub mod orchestrator;
pub mod process_body;
pub mod schedule_factory;
pub mod suspension;

pub use error::{Error, Result};
pub use events::{EventBus, OrchestratorEvent, EVENT_CHANNEL_CAPACITY};
pub use navigation::{is_schedule_terminating, legal_transition, NavigationError};
pub use orchestrator::{Orchestrator, RunHandle, StartOptions, StepOutcome};
pub use schedule_factory::ScheduleFactory;
pub use suspension::{
    ResumeStrategy, SuspensionAnalysis, SuspensionHandler, SuspensionReport, SuspensionVerdict,
};

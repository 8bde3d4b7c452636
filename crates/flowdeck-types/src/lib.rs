//! Shared data model for the flowdeck orchestration core.
//!
//! This crate has no behavior of its own: it is the vocabulary every other
//! `flowdeck-*` crate speaks. Keeping it dependency-light (no tokio, no
//! reqwest) means the types can be serialized into a session file, passed
//! across a process boundary, or asserted against in a test without pulling
//! in the runtime.

mod error;
mod flow_code;
mod ids;
mod judge;
mod role;
mod schedule;
mod session;
mod step;
mod tool;

pub use error::{Error, OperationalCode, Result, StructuralCode};
pub use flow_code::FlowCode;
pub use ids::{CheckpointId, SessionId, StepSeq};
pub use judge::{Consensus, ExpertFailure, ExpertReport, Quality, Tldr};
pub use role::{Intent, ModelRole, Tier};
pub use schedule::{Consultation, Position, Process, Schedule, PROCESSES_PER_SCHEDULE, SCHEDULE_COUNT};
pub use session::{
    Checkpoint, OrchestrationState, PlatformOrigin, Session, SessionStats, TaskStatus,
    TerminationReason,
};
pub use step::{ConsultationRecord, ConsultationSource, Outcome, StepRecord, ToolCallAttempt};
pub use tool::{ToolCategory, ToolSpec, ToolTier};

use std::fmt;

/// Result type for flowdeck-types operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Structural errors (E001-E009): navigation and role violations.
///
/// Each carries `recoverable = false` by construction — a structural error
/// always means the orchestrator itself tried an illegal move, which can
/// never be retried away. See spec §4.6 and §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralCode {
    /// P1->P3, or any jump that skips a mandatory intermediate process.
    InvalidTransition,
    /// P2 completed but schedule was marked terminated without a P3 pass.
    SkippedProcess,
    /// A schedule already terminated was re-entered with no justification.
    ReopenWithoutJustification,
    /// A terminated schedule was re-entered at a stale flow-code position.
    StaleReentry,
    /// The orchestrator role attempted to perform an executor action
    /// (emitting a tool call) rather than navigating.
    OrchestratorActedAsExecutor,
    /// An executor role attempted to perform orchestration (choosing the
    /// next schedule/position) rather than executing its step body.
    ExecutorActedAsOrchestrator,
    /// The run was asked to terminate before every schedule had a
    /// terminated visit, or before Production was the most recent one.
    PrematureTermination,
    /// A step record's position was not a legal successor of the previous
    /// step's position (invariant 3).
    NonMonotonicStep,
    /// The flow code failed to parse back into the exact step sequence
    /// (invariant 1).
    FlowCodeMismatch,
}

impl StructuralCode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidTransition => "E001",
            Self::SkippedProcess => "E002",
            Self::ReopenWithoutJustification => "E003",
            Self::StaleReentry => "E004",
            Self::OrchestratorActedAsExecutor => "E005",
            Self::ExecutorActedAsOrchestrator => "E006",
            Self::PrematureTermination => "E007",
            Self::NonMonotonicStep => "E008",
            Self::FlowCodeMismatch => "E009",
        }
    }
}

/// Operational errors (E010-E025): infrastructure failures reachable at
/// runtime regardless of navigation correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationalCode {
    OllamaUnavailable,
    ModelNotFound,
    ResourceExhausted,
    FileSystemAccess,
    NetworkTimeout,
    AuthFailure,
    InvalidToolCall,
    ConsultationTimeout,
    ConsultationBusy,
    EmptyTask,
    SessionNotFound,
    SessionCorrupt,
    CheckpointNotFound,
    ClientUnavailable,
    StreamInterrupted,
    ConfigInvalid,
}

impl OperationalCode {
    pub const fn code(self) -> &'static str {
        match self {
            Self::OllamaUnavailable => "E010",
            Self::ModelNotFound => "E011",
            Self::ResourceExhausted => "E012",
            Self::FileSystemAccess => "E013",
            Self::NetworkTimeout => "E014",
            Self::AuthFailure => "E015",
            Self::InvalidToolCall => "E016",
            Self::ConsultationTimeout => "E017",
            Self::ConsultationBusy => "E018",
            Self::EmptyTask => "E019",
            Self::SessionNotFound => "E020",
            Self::SessionCorrupt => "E021",
            Self::CheckpointNotFound => "E022",
            Self::ClientUnavailable => "E023",
            Self::StreamInterrupted => "E024",
            Self::ConfigInvalid => "E025",
        }
    }

    /// Whether the step body should retry this error with backoff (§4.1)
    /// rather than bubble straight to the Suspension Handler.
    pub const fn recoverable(self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout | Self::StreamInterrupted | Self::ConsultationBusy
        )
    }
}

/// Error type shared by every layer built on top of `flowdeck-types`.
#[derive(Debug)]
pub enum Error {
    Structural {
        code: StructuralCode,
        message: String,
    },
    Operational {
        code: OperationalCode,
        message: String,
    },
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error {
    pub fn structural(code: StructuralCode, message: impl Into<String>) -> Self {
        Self::Structural {
            code,
            message: message.into(),
        }
    }

    pub fn operational(code: OperationalCode, message: impl Into<String>) -> Self {
        Self::Operational {
            code,
            message: message.into(),
        }
    }

    /// The stable four-character code (`E001`..`E025`) surfaced to users.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Structural { code, .. } => code.code(),
            Self::Operational { code, .. } => code.code(),
            Self::Io(_) => "E013",
            Self::Serde(_) => "E021",
        }
    }

    pub fn recoverable(&self) -> bool {
        match self {
            Self::Operational { code, .. } => code.recoverable(),
            _ => false,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structural { code, message } => write!(f, "[{}] {}", code.code(), message),
            Self::Operational { code, message } => write!(f, "[{}] {}", code.code(), message),
            Self::Io(err) => write!(f, "IO error: {}", err),
            Self::Serde(err) => write!(f, "serialization error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Serde(err) => Some(err),
            Self::Structural { .. } | Self::Operational { .. } => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err)
    }
}

use std::fmt;

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the SDK facade. Lower crates keep their own typed
/// errors; this one exists only at the embedding boundary, the way
/// the teacher's SDK wraps `agtrace_runtime::Error` behind its own
/// `Error` rather than leaking the runtime type to callers.
#[derive(Debug)]
pub enum Error {
    /// A session, checkpoint, or other named resource was requested but
    /// does not exist.
    NotFound(String),
    /// The caller passed something the SDK cannot act on (empty task,
    /// bad path, ...).
    InvalidInput(String),
    /// Propagated from the orchestration engine.
    Engine(flowdeck_engine::Error),
    /// Propagated from config/session-store/telemetry/model-coordination.
    Runtime(flowdeck_runtime::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::Engine(err) => write!(f, "{err}"),
            Self::Runtime(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Engine(err) => Some(err),
            Self::Runtime(err) => Some(err),
            Self::NotFound(_) | Self::InvalidInput(_) => None,
        }
    }
}

impl From<flowdeck_engine::Error> for Error {
    fn from(err: flowdeck_engine::Error) -> Self {
        Self::Engine(err)
    }
}

impl From<flowdeck_runtime::Error> for Error {
    fn from(err: flowdeck_runtime::Error) -> Self {
        Self::Runtime(err)
    }
}

impl Error {
    /// The stable error code to surface at the CLI boundary, when one is
    /// available from the wrapped error.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Engine(err) => Some(err.code()),
            Self::Runtime(err) => Some(err.code()),
            Self::NotFound(_) | Self::InvalidInput(_) => None,
        }
    }
}

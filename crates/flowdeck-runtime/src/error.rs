use std::fmt;

/// Result type for flowdeck-runtime operations that are not themselves
/// implementations of an `flowdeck-engine` collaborator trait (config,
/// session store, telemetry). Trait implementations (`ModelCoordinator`,
/// `ConsultationGateway`, `JudgeRunner`, `TerminationOracle`) return
/// `flowdeck_engine::Result` directly, since that is the type the trait
/// signatures in `collaborators.rs` fix.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the config/session-store/telemetry surface of
/// flowdeck-runtime. Mirrors the teacher's `agtrace-runtime::Error`
/// shape: a handful of domain variants plus the unavoidable `Io`/`Serde`
/// wrappers, manual `Display`/`From`, no `thiserror`.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
    Json(serde_json::Error),
    Types(flowdeck_types::Error),
    Provider(flowdeck_providers::Error),
    /// Config file present but failed schema validation or referenced an
    /// unresolvable path (spec E025).
    Config(String),
    /// A session or checkpoint id was requested but nothing on disk
    /// matches it (spec E020/E022).
    NotFound(String),
    /// An operation was asked of a store or sink before it was set up
    /// (e.g. no workspace path could be resolved).
    NotInitialized(String),
    /// A write could not be completed after the retry budget was spent
    /// (spec §7: "a persistent failure suspends the run with
    /// ErrFileSystemAccess").
    PersistentWriteFailure(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::Yaml(err) => write!(f, "YAML error: {err}"),
            Self::Json(err) => write!(f, "JSON error: {err}"),
            Self::Types(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "LM provider error: {err}"),
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::NotInitialized(msg) => write!(f, "not initialized: {msg}"),
            Self::PersistentWriteFailure(msg) => write!(f, "persistent write failure: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Yaml(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::Types(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Config(_)
            | Self::NotFound(_)
            | Self::NotInitialized(_)
            | Self::PersistentWriteFailure(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Yaml(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

impl From<flowdeck_types::Error> for Error {
    fn from(err: flowdeck_types::Error) -> Self {
        Self::Types(err)
    }
}

impl From<flowdeck_providers::Error> for Error {
    fn from(err: flowdeck_providers::Error) -> Self {
        Self::Provider(err)
    }
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Types(err) => err.code(),
            Self::Provider(_) => "E010",
            Self::Io(_) | Self::PersistentWriteFailure(_) => "E013",
            Self::Yaml(_) | Self::Json(_) | Self::Config(_) => "E025",
            Self::NotFound(_) => "E020",
            Self::NotInitialized(_) => "E025",
        }
    }
}

/// Build a `flowdeck_engine::Error` carrying an operational code, for use
/// inside the collaborator trait implementations in this crate, whose
/// methods are fixed by `flowdeck-engine` to return `flowdeck_engine::Result`.
pub(crate) fn engine_operational(
    code: flowdeck_types::OperationalCode,
    message: impl Into<String>,
) -> flowdeck_engine::Error {
    flowdeck_engine::Error::Types(flowdeck_types::Error::operational(code, message))
}

use std::fmt;

use crate::navigation::NavigationError;

/// Result type for flowdeck-engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the orchestration engine: navigation/type errors from
/// `flowdeck-types`, provider errors from the LM client, and navigation
/// table rejections specific to this crate.
#[derive(Debug)]
pub enum Error {
    Types(flowdeck_types::Error),
    Provider(flowdeck_providers::Error),
    Navigation(NavigationError),
    /// The run was cancelled via its `CancellationToken`.
    Cancelled,
    /// `Step` was called while the run is suspended; only
    /// `resolve_suspension` is legal until a verdict is given (spec
    /// §4.1: "`Step(ctx)` ... legal only when not suspended").
    AlreadySuspended,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Types(err) => write!(f, "{err}"),
            Self::Provider(err) => write!(f, "LM provider error: {err}"),
            Self::Navigation(err) => write!(f, "navigation error: {err}"),
            Self::Cancelled => write!(f, "run cancelled"),
            Self::AlreadySuspended => write!(f, "run is suspended; resolve the suspension before stepping"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Types(err) => Some(err),
            Self::Provider(err) => Some(err),
            Self::Navigation(err) => Some(err),
            Self::Cancelled | Self::AlreadySuspended => None,
        }
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

impl From<NavigationError> for Error {
    fn from(err: NavigationError) -> Self {
        Self::Navigation(err)
    }
}

impl Error {
    /// The stable four-character code surfaced to users (spec §7: "Every
    /// surfaced error carries {code, human_message, action_hint}").
    pub fn code(&self) -> &'static str {
        match self {
            Self::Types(err) => err.code(),
            Self::Provider(_) => "E010",
            Self::Navigation(nav) => nav.structural_code().code(),
            Self::Cancelled => "E014",
            Self::AlreadySuspended => "E021",
        }
    }

    pub fn recoverable(&self) -> bool {
        match self {
            Self::Types(err) => err.recoverable(),
            Self::Provider(_) | Self::Cancelled => true,
            Self::Navigation(_) | Self::AlreadySuspended => false,
        }
    }
}

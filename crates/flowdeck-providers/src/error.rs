use std::fmt;

/// Result type for flowdeck-providers operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur talking to the LM backend.
#[derive(Debug)]
pub enum Error {
    /// The backend could not be reached at all (spec E010).
    Unavailable(String),
    /// A named model does not exist on the backend (spec E011).
    ModelNotFound(String),
    /// The backend rejected the request or returned malformed JSON.
    Protocol(String),
    /// The request exceeded its configured timeout (spec E014).
    Timeout,
    /// The stream ended before a `done: true` terminator arrived.
    StreamInterrupted,
    Http(reqwest::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "LM backend unavailable: {msg}"),
            Self::ModelNotFound(name) => write!(f, "model not found: {name}"),
            Self::Protocol(msg) => write!(f, "LM backend protocol error: {msg}"),
            Self::Timeout => write!(f, "LM backend request timed out"),
            Self::StreamInterrupted => write!(f, "LM backend stream ended without a done marker"),
            Self::Http(err) => write!(f, "HTTP error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Http(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(err.to_string())
    }
}

use crate::session::SessionPhase;

/// Result type for gincana operations
pub type Result<T> = std::result::Result<T, GincanaError>;

/// Everything that can go wrong in a session. None of these are fatal:
/// each one blocks the current transition or is recovered locally.
#[derive(Debug, thiserror::Error)]
pub enum GincanaError {
    #[error("configuration unavailable: {0}")]
    ConfigurationUnavailable(String),

    #[error("{0}")]
    Validation(String),

    #[error("cannot {action} while in {phase} phase")]
    WrongPhase {
        phase: SessionPhase,
        action: &'static str,
    },

    #[error("could not save result: {0}")]
    Persistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<csv::Error> for GincanaError {
    fn from(e: csv::Error) -> Self {
        GincanaError::Persistence(e.to_string())
    }
}

impl From<rusqlite::Error> for GincanaError {
    fn from(e: rusqlite::Error) -> Self {
        GincanaError::Persistence(e.to_string())
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    /// The native resource rejected a call in its current state, e.g. stopping
    /// a player that is already stopped.
    #[error("Illegal state for native resource: {0}")]
    InvalidState(String),

    #[error("Media index query failed: {0}")]
    QueryFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` for state errors the core tolerates silently.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, BridgeError::InvalidState(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

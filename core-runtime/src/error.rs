use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Returns `true` when the host forgot to inject a required bridge.
    pub fn is_capability_missing(&self) -> bool {
        matches!(self, Error::CapabilityMissing { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

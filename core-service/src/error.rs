use bridge_traits::permission::Permission;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(#[from] core_runtime::Error),

    #[error("Permission denied: {0:?}")]
    PermissionDenied(Permission),

    #[error("Bridge error: {0}")]
    Bridge(#[from] bridge_traits::BridgeError),

    #[error("Playback error: {0}")]
    Playback(#[from] core_playback::PlaybackError),

    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

impl CoreError {
    /// Returns `true` when the user can fix the failure by granting a
    /// permission or loading the library first.
    pub fn is_user_actionable(&self) -> bool {
        match self {
            CoreError::PermissionDenied(_) => true,
            CoreError::Playback(e) => e.is_precondition(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

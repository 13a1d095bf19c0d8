//! Runtime permission bridge.

use async_trait::async_trait;

use crate::error::Result;

/// Permissions the core may need before touching a platform capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    /// Start a foreground service that plays audio.
    ForegroundService,
    /// Read the device media library.
    ReadMediaLibrary,
}

/// Outcome of a permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

/// Host permission prompt.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Whether the running platform version needs an explicit grant.
    fn is_required(&self, permission: Permission) -> bool;

    /// Prompt for (or re-check) the permission. Resolves once the user has
    /// answered.
    async fn request(&self, permission: Permission) -> Result<PermissionStatus>;
}

/// Resolve `permission`, prompting only when the platform requires it.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::permission::{ensure_granted, Permission};
///
/// if ensure_granted(gate.as_ref(), Permission::ForegroundService).await?.is_granted() {
///     start_playback().await?;
/// }
/// ```
pub async fn ensure_granted(
    gate: &dyn PermissionGate,
    permission: Permission,
) -> Result<PermissionStatus> {
    if !gate.is_required(permission) {
        return Ok(PermissionStatus::Granted);
    }
    gate.request(permission).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Gate {}

        #[async_trait]
        impl PermissionGate for Gate {
            fn is_required(&self, permission: Permission) -> bool;
            async fn request(&self, permission: Permission) -> Result<PermissionStatus>;
        }
    }

    #[core_async::test]
    async fn test_not_required_skips_prompt() {
        let mut gate = MockGate::new();
        gate.expect_is_required().return_const(false);
        gate.expect_request().never();

        let status = ensure_granted(&gate, Permission::ForegroundService)
            .await
            .unwrap();
        assert!(status.is_granted());
    }

    #[core_async::test]
    async fn test_required_prompts_once() {
        let mut gate = MockGate::new();
        gate.expect_is_required().return_const(true);
        gate.expect_request()
            .with(eq(Permission::ForegroundService))
            .times(1)
            .returning(|_| Ok(PermissionStatus::Denied));

        let status = ensure_granted(&gate, Permission::ForegroundService)
            .await
            .unwrap();
        assert_eq!(status, PermissionStatus::Denied);
    }
}

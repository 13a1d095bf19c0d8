//! Desktop permission gate.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    permission::{Permission, PermissionGate, PermissionStatus},
};

/// Desktop platforms have no runtime prompts: nothing is required and every
/// request is granted.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrantedPermissionGate;

impl GrantedPermissionGate {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PermissionGate for GrantedPermissionGate {
    fn is_required(&self, _permission: Permission) -> bool {
        false
    }

    async fn request(&self, _permission: Permission) -> Result<PermissionStatus> {
        Ok(PermissionStatus::Granted)
    }
}

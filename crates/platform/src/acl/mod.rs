//! Folder permission remediation capability

use async_trait::async_trait;
use appxtract_errors::PlatformError;
use std::path::PathBuf;

#[async_trait]
pub trait AclApplier: Send + Sync {
    /// Apply ACLs to every folder in one call
    async fn apply_acls(&self, folders: &[PathBuf]) -> Result<(), PlatformError>;
}

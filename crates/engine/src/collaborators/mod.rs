//! Narrow async interfaces to the services a discovery pipeline consults.
//!
//! Each trait mirrors one remote call. Non-2xx answers are not errors: they
//! come back as an [`ApiResponse`] with `metadata.success == false` and the
//! pipeline records them as failed stages. A [`CollaboratorError`] means the
//! call could not be made at all.

mod fixture;
mod http;

pub use fixture::{FixtureCollaborators, FixtureDocument};
pub use http::ArmCollaborators;

use async_trait::async_trait;
use fieldscout_api::ApiError;
use fieldscout_types::{AccountKeys, ApiResponse, BindingEnvelope, FunctionList, StorageCredential, StorageItem, StorageMode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{operation} was rejected: {detail}")]
    Rejected { operation: &'static str, detail: String },
    #[error("fixture: {message}")]
    Fixture { message: String },
}

#[async_trait]
pub trait CredentialLookup: Send + Sync {
    async fn list_keys(&self, account_id: &str) -> Result<ApiResponse<AccountKeys>, CollaboratorError>;
}

#[async_trait]
pub trait CapabilityFetch: Send + Sync {
    /// One call per capability type: containers for blob mode, shares for files.
    async fn fetch(
        &self,
        mode: StorageMode,
        account_name: &str,
        credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, CollaboratorError>;
}

#[async_trait]
pub trait BindingLookup: Send + Sync {
    async fn binding(&self, resource_id: &str, binding_id: &str) -> Result<ApiResponse<BindingEnvelope>, CollaboratorError>;
}

#[async_trait]
pub trait FunctionInventoryLookup: Send + Sync {
    async fn functions(&self, resource_id: &str) -> Result<ApiResponse<FunctionList>, CollaboratorError>;
}

#[async_trait]
pub trait PermissionCheck: Send + Sync {
    async fn has_permission(&self, scope: &str, required_actions: &[String]) -> Result<bool, CollaboratorError>;
}

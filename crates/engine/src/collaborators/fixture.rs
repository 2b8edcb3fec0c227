//! Offline collaborators that answer from a JSON document.
//!
//! ```json
//! {
//!   "keys": { "acct": { "data": { "keys": [{ "value": "k1" }] } } },
//!   "containers": { "acct": { "data": [{ "name": "c1" }] } },
//!   "file_shares": { "acct": { "error": { "message": "403" }, "status": 403 } },
//!   "delays_ms": { "acct": 250 }
//! }
//! ```
//!
//! Anything the document does not mention answers with a 404 failure.

use std::{path::Path, sync::Mutex, time::Duration};

use async_trait::async_trait;
use fieldscout_types::{AccountKeys, ApiResponse, BindingEnvelope, FunctionList, StorageCredential, StorageItem, StorageMode};
use fieldscout_util::resource_id::resource_name;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use super::{BindingLookup, CapabilityFetch, CollaboratorError, CredentialLookup, FunctionInventoryLookup, PermissionCheck};

/// A scripted answer: either `{"data": ...}` or `{"error": ..., "status": ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FixtureReply<T> {
    Failure {
        error: Value,
        #[serde(default)]
        status: Option<u16>,
    },
    Success {
        data: T,
    },
}

impl<T: Clone> FixtureReply<T> {
    fn to_response(&self) -> ApiResponse<T> {
        match self {
            FixtureReply::Success { data } => ApiResponse::success(data.clone()),
            FixtureReply::Failure { error, status } => ApiResponse::failure(*status, Some(error.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixtureDocument {
    /// Keyed by account name (the last segment of the account id).
    pub keys: IndexMap<String, FixtureReply<AccountKeys>>,
    pub containers: IndexMap<String, FixtureReply<Vec<StorageItem>>>,
    pub file_shares: IndexMap<String, FixtureReply<Vec<StorageItem>>>,
    /// Keyed by binding id (`{type}-{direction}`).
    pub bindings: IndexMap<String, FixtureReply<BindingEnvelope>>,
    pub functions: Option<FixtureReply<FunctionList>>,
    /// Keyed by scope id.
    pub permissions: IndexMap<String, bool>,
    /// Delay applied to every call.
    pub delay_ms: u64,
    /// Extra delay keyed by the call's main argument (account name, binding id or scope).
    pub delays_ms: IndexMap<String, u64>,
}

/// Collaborators answering from a [`FixtureDocument`].
#[derive(Debug, Default)]
pub struct FixtureCollaborators {
    document: FixtureDocument,
    calls: Mutex<Vec<String>>,
}

impl FixtureCollaborators {
    pub fn new(document: FixtureDocument) -> Self {
        Self {
            document,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn from_json(content: &str) -> Result<Self, CollaboratorError> {
        let document = serde_json::from_str(content).map_err(|error| CollaboratorError::Fixture {
            message: format!("invalid fixture document: {error}"),
        })?;
        Ok(Self::new(document))
    }

    pub fn load(path: &Path) -> Result<Self, CollaboratorError> {
        let content = std::fs::read_to_string(path).map_err(|error| CollaboratorError::Fixture {
            message: format!("failed to read {}: {error}", path.display()),
        })?;
        Self::from_json(&content)
    }

    /// Calls made so far, as `operation:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    async fn record(&self, operation: &str, argument: &str) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(format!("{operation}:{argument}"));
        }
        let delay = self.document.delay_ms + self.document.delays_ms.get(argument).copied().unwrap_or(0);
        debug!(operation, argument, delay_ms = delay, "fixture call");
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

fn reply<T: Clone>(entries: &IndexMap<String, FixtureReply<T>>, key: &str, what: &str) -> ApiResponse<T> {
    entries.get(key).map(FixtureReply::to_response).unwrap_or_else(|| not_found(what, key))
}

fn not_found<T>(what: &str, key: &str) -> ApiResponse<T> {
    ApiResponse::failure(Some(404), Some(json!({ "message": format!("{what} '{key}' not found") })))
}

#[async_trait]
impl CredentialLookup for FixtureCollaborators {
    async fn list_keys(&self, account_id: &str) -> Result<ApiResponse<AccountKeys>, CollaboratorError> {
        let account_name = resource_name(account_id);
        self.record("listKeys", account_name).await;
        Ok(reply(&self.document.keys, account_name, "storage account"))
    }
}

#[async_trait]
impl CapabilityFetch for FixtureCollaborators {
    async fn fetch(
        &self,
        mode: StorageMode,
        account_name: &str,
        _credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, CollaboratorError> {
        match mode {
            StorageMode::AzureBlob => {
                self.record("getStorageContainers", account_name).await;
                Ok(reply(&self.document.containers, account_name, "containers for"))
            }
            StorageMode::AzureFiles => {
                self.record("getStorageFileShares", account_name).await;
                Ok(reply(&self.document.file_shares, account_name, "file shares for"))
            }
        }
    }
}

#[async_trait]
impl BindingLookup for FixtureCollaborators {
    async fn binding(&self, _resource_id: &str, binding_id: &str) -> Result<ApiResponse<BindingEnvelope>, CollaboratorError> {
        self.record("getBinding", binding_id).await;
        Ok(reply(&self.document.bindings, binding_id, "binding"))
    }
}

#[async_trait]
impl FunctionInventoryLookup for FixtureCollaborators {
    async fn functions(&self, resource_id: &str) -> Result<ApiResponse<FunctionList>, CollaboratorError> {
        self.record("getFunctions", resource_id).await;
        Ok(self
            .document
            .functions
            .as_ref()
            .map(FixtureReply::to_response)
            .unwrap_or_else(|| ApiResponse::success(FunctionList::default())))
    }
}

#[async_trait]
impl PermissionCheck for FixtureCollaborators {
    async fn has_permission(&self, scope: &str, _required_actions: &[String]) -> Result<bool, CollaboratorError> {
        self.record("hasPermission", scope).await;
        self.document
            .permissions
            .get(scope)
            .copied()
            .ok_or_else(|| CollaboratorError::Fixture {
                message: format!("no permission entry for scope '{scope}'"),
            })
    }
}

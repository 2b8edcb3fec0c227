use async_trait::async_trait;
use fieldscout_api::{ArmClient, PermissionGrant};
use fieldscout_types::{AccountKeys, ApiResponse, BindingEnvelope, FunctionList, StorageCredential, StorageItem, StorageMode};
use fieldscout_util::error_message_or_stringify;
use regex::{Regex, RegexBuilder};
use tracing::debug;

use super::{BindingLookup, CapabilityFetch, CollaboratorError, CredentialLookup, FunctionInventoryLookup, PermissionCheck};

const RESOURCE_GROUP_TYPE: &str = "Microsoft.Resources/subscriptions/resourceGroups";
const SUBSCRIPTION_TYPE: &str = "Microsoft.Resources/subscriptions";

/// Collaborators backed by the resource-management API.
#[derive(Debug, Clone)]
pub struct ArmCollaborators {
    client: ArmClient,
}

impl ArmCollaborators {
    pub fn new(client: ArmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialLookup for ArmCollaborators {
    async fn list_keys(&self, account_id: &str) -> Result<ApiResponse<AccountKeys>, CollaboratorError> {
        Ok(self.client.list_storage_keys(account_id).await?)
    }
}

#[async_trait]
impl CapabilityFetch for ArmCollaborators {
    async fn fetch(
        &self,
        mode: StorageMode,
        account_name: &str,
        credential: &StorageCredential,
    ) -> Result<ApiResponse<Vec<StorageItem>>, CollaboratorError> {
        let response = match mode {
            StorageMode::AzureBlob => self.client.storage_containers(account_name, credential).await?,
            StorageMode::AzureFiles => self.client.storage_file_shares(account_name, credential).await?,
        };
        Ok(response)
    }
}

#[async_trait]
impl BindingLookup for ArmCollaborators {
    async fn binding(&self, resource_id: &str, binding_id: &str) -> Result<ApiResponse<BindingEnvelope>, CollaboratorError> {
        Ok(self.client.binding(resource_id, binding_id).await?)
    }
}

#[async_trait]
impl FunctionInventoryLookup for ArmCollaborators {
    async fn functions(&self, resource_id: &str) -> Result<ApiResponse<FunctionList>, CollaboratorError> {
        Ok(self.client.functions(resource_id).await?)
    }
}

#[async_trait]
impl PermissionCheck for ArmCollaborators {
    async fn has_permission(&self, scope: &str, required_actions: &[String]) -> Result<bool, CollaboratorError> {
        let response = self.client.permissions(scope).await?;
        let Some(list) = response.data.filter(|_| response.metadata.success) else {
            let detail = response
                .metadata
                .error
                .as_ref()
                .map(error_message_or_stringify)
                .unwrap_or_else(|| "permission listing failed".to_string());
            return Err(CollaboratorError::Rejected {
                operation: "getPermissions",
                detail,
            });
        };

        let granted = required_actions
            .iter()
            .map(|action| qualify_action(scope, action))
            .all(|action| is_granted(&list.value, &action));
        debug!(scope, granted, "evaluated permissions");
        Ok(granted)
    }
}

/// Expand a relative action such as `./write` against the resource type of `scope`.
fn qualify_action(scope: &str, action: &str) -> String {
    let Some(relative) = action.strip_prefix("./") else {
        return action.to_string();
    };
    let resource_type = if scope.to_ascii_lowercase().contains("/resourcegroups/") {
        RESOURCE_GROUP_TYPE
    } else {
        SUBSCRIPTION_TYPE
    };
    format!("{resource_type}/{relative}")
}

/// An action is granted when some grant allows it and that same grant does not exclude it.
fn is_granted(grants: &[PermissionGrant], action: &str) -> bool {
    grants.iter().any(|grant| {
        grant.actions.iter().any(|pattern| matches_action(pattern, action))
            && !grant.not_actions.iter().any(|pattern| matches_action(pattern, action))
    })
}

fn matches_action(pattern: &str, action: &str) -> bool {
    wildcard_regex(pattern).is_some_and(|regex| regex.is_match(action))
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let escaped = regex::escape(pattern).replace(r"\*", ".*");
    RegexBuilder::new(&format!("^{escaped}$")).case_insensitive(true).build().ok()
}

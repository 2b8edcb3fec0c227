//! Display strings used by the classifier and the form profiles.
//!
//! Every string can be overridden from the configuration file; positional
//! placeholders (`{0}`, `{1}`) are filled by [`MessageCatalog::format`].

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageCatalog {
    pub no_write_access_storage_account: String,
    pub blobs_failure_with_error: String,
    pub blobs_failure: String,
    pub no_blobs: String,
    pub file_shares_failure_with_error: String,
    pub file_shares_failure: String,
    pub no_file_shares: String,
    pub storage_failure_with_error: String,
    pub storage_failure: String,
    pub no_blobs_or_file_shares: String,
    pub bindings_failure_with_error: String,
    pub bindings_failure: String,
    pub functions_failure_with_error: String,
    pub functions_failure: String,
    pub template_not_found: String,
    pub readonly_blob_storage_warning: String,
    pub no_create_permission: String,
    pub validation_required_error: String,
    pub validation_pending_error: String,
    pub validation_integer_error: String,
    pub validation_mount_path_error: String,
    pub function_name_invalid: String,
    pub function_name_exists: String,
    pub loading: String,
    pub select_an_option: String,
    pub azure_blob: String,
    pub azure_files: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            no_write_access_storage_account: "You do not have write access to this storage account.".into(),
            blobs_failure_with_error: "Failed to load blob containers: {0}".into(),
            blobs_failure: "Failed to load blob containers.".into(),
            no_blobs: "No blob containers were found in this storage account.".into(),
            file_shares_failure_with_error: "Failed to load file shares: {0}".into(),
            file_shares_failure: "Failed to load file shares.".into(),
            no_file_shares: "No file shares were found in this storage account.".into(),
            storage_failure_with_error: "Failed to load blob containers and file shares: {0}".into(),
            storage_failure: "Failed to load blob containers and file shares.".into(),
            no_blobs_or_file_shares: "Neither blob containers nor file shares are available in this storage account.".into(),
            bindings_failure_with_error: "Failed to load bindings {0}: {1}".into(),
            bindings_failure: "Failed to load bindings {0}.".into(),
            functions_failure_with_error: "Failed to load existing functions: {0}".into(),
            functions_failure: "Failed to load existing functions.".into(),
            template_not_found: "Template '{0}' is not available.".into(),
            readonly_blob_storage_warning: "Azure Blob storage mounts are read-only.".into(),
            no_create_permission: "You do not have permission to create new resources in this resource group.".into(),
            validation_required_error: "This field is required.".into(),
            validation_pending_error: "Options are still loading.".into(),
            validation_integer_error: "Enter a whole number.".into(),
            validation_mount_path_error: "The mount path must start with '/'.".into(),
            function_name_invalid: "The name must start with a letter and contain only letters, digits, '-' and '_'.".into(),
            function_name_exists: "A function named '{0}' already exists.".into(),
            loading: "Loading...".into(),
            select_an_option: "Select an option".into(),
            azure_blob: "Azure Blob".into(),
            azure_files: "Azure Files".into(),
        }
    }
}

impl MessageCatalog {
    /// Fill `{0}`, `{1}`, ... in `template` with `args`.
    pub fn format(template: &str, args: &[&str]) -> String {
        args.iter()
            .enumerate()
            .fold(template.to_string(), |text, (index, arg)| text.replace(&format!("{{{index}}}"), arg))
    }
}

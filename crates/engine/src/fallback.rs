//! Defaults derived from lopsided discovery output.

use fieldscout_types::{BindingDefinition, StorageCapabilities, StorageMode};

/// Force a storage mode when exactly one capability list has entries.
///
/// Both lists populated leaves the choice to the user; both empty forces
/// nothing and the banner explains why.
pub fn resolve_default(capabilities: &StorageCapabilities) -> Option<StorageMode> {
    match (capabilities.blob_containers.is_empty(), capabilities.file_shares.is_empty()) {
        (false, true) => Some(StorageMode::AzureBlob),
        (true, false) => Some(StorageMode::AzureFiles),
        _ => None,
    }
}

/// Keep only the settings named in `user_prompt`, preserving binding and setting order.
pub fn filter_binding_settings(bindings: &[BindingDefinition], user_prompt: &[String]) -> Vec<BindingDefinition> {
    bindings
        .iter()
        .map(|binding| BindingDefinition {
            settings: binding
                .settings
                .iter()
                .filter(|setting| user_prompt.contains(&setting.name))
                .cloned()
                .collect(),
            ..binding.clone()
        })
        .collect()
}

//! Discovery run outcomes.
//!
//! A discovery run is tagged with the selection it was started for and the
//! session generation at that time. Its stages are recorded in execution order
//! and never mutated once the [`DiscoveryResult`] is built; the user-relevant
//! [`CapabilitySet`] is always derived from the stages on demand.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{StorageCredential, StorageItem};
use crate::template::{BindingDefinition, FunctionRecord};

/// Identifier of the resource the user picked (account name, template id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionKey(String);

impl SelectionKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SelectionKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SelectionKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Selection captured when a run started plus the session generation number.
///
/// Two tags are equal only if both parts match, so reselecting an earlier key
/// after a different one never revives a run started for the first selection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenerationTag {
    pub key: SelectionKey,
    pub generation: u64,
}

impl GenerationTag {
    pub fn new(key: SelectionKey, generation: u64) -> Self {
        Self { key, generation }
    }
}

impl fmt::Display for GenerationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.generation)
    }
}

/// Scope level at which write permission is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    ResourceGroup,
    Subscription,
}

/// Identity of a single lookup in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageKind {
    Credentials,
    BlobContainers,
    FileShares,
    RequiredBindings,
    Binding { binding_id: String },
    FunctionInventory,
    Permission { scope: PermissionScope },
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Credentials => f.write_str("credentials"),
            StageKind::BlobContainers => f.write_str("blob_containers"),
            StageKind::FileShares => f.write_str("file_shares"),
            StageKind::RequiredBindings => f.write_str("required_bindings"),
            StageKind::Binding { binding_id } => write!(f, "binding:{binding_id}"),
            StageKind::FunctionInventory => f.write_str("function_inventory"),
            StageKind::Permission { scope } => match scope {
                PermissionScope::ResourceGroup => f.write_str("permission:resource_group"),
                PermissionScope::Subscription => f.write_str("permission:subscription"),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Success,
    Failed,
}

/// Payload produced by a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StageData {
    Empty,
    Credential(StorageCredential),
    Items(Vec<StorageItem>),
    BindingIds(Vec<String>),
    Binding(BindingDefinition),
    Functions(Vec<FunctionRecord>),
    Permission(bool),
}

/// One asynchronous call in a pipeline and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupStage {
    pub kind: StageKind,
    pub status: StageStatus,
    pub data: StageData,
    pub error_detail: Option<String>,
    /// Set when the stage was not issued and counts as an empty success.
    #[serde(default)]
    pub skipped: bool,
}

impl LookupStage {
    pub fn pending(kind: StageKind) -> Self {
        Self {
            kind,
            status: StageStatus::Pending,
            data: StageData::Empty,
            error_detail: None,
            skipped: false,
        }
    }

    pub fn succeeded(kind: StageKind, data: StageData) -> Self {
        Self {
            kind,
            status: StageStatus::Success,
            data,
            error_detail: None,
            skipped: false,
        }
    }

    pub fn failed(kind: StageKind, error_detail: Option<String>) -> Self {
        Self {
            kind,
            status: StageStatus::Failed,
            data: StageData::Empty,
            error_detail,
            skipped: false,
        }
    }

    pub fn skipped(kind: StageKind) -> Self {
        Self {
            kind,
            status: StageStatus::Success,
            data: StageData::Items(Vec::new()),
            error_detail: None,
            skipped: true,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }

    /// Items carried by a successful stage; empty for anything else.
    pub fn items(&self) -> &[StorageItem] {
        match (&self.status, &self.data) {
            (StageStatus::Success, StageData::Items(items)) => items,
            _ => &[],
        }
    }
}

/// Which pipeline produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineKind {
    Storage,
    Bindings,
}

/// Completed stages of one discovery run, tagged with the run's generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub kind: PipelineKind,
    pub tag: GenerationTag,
    pub stages: Vec<LookupStage>,
    pub completed_at: DateTime<Utc>,
}

impl DiscoveryResult {
    pub fn new(kind: PipelineKind, tag: GenerationTag, stages: Vec<LookupStage>) -> Self {
        Self {
            kind,
            tag,
            stages,
            completed_at: Utc::now(),
        }
    }

    pub fn key(&self) -> &SelectionKey {
        &self.tag.key
    }

    pub fn stage(&self, kind: &StageKind) -> Option<&LookupStage> {
        self.stages.iter().find(|stage| &stage.kind == kind)
    }

    /// Credential issued by the first storage stage, when it succeeded.
    pub fn credential(&self) -> Option<&StorageCredential> {
        match self.stage(&StageKind::Credentials).map(|stage| &stage.data) {
            Some(StageData::Credential(credential)) => Some(credential),
            _ => None,
        }
    }

    /// Derive the capability set for this run.
    pub fn capabilities(&self) -> CapabilitySet {
        match self.kind {
            PipelineKind::Storage => CapabilitySet::Storage(StorageCapabilities {
                blob_containers: self.items_of(&StageKind::BlobContainers),
                file_shares: self.items_of(&StageKind::FileShares),
            }),
            PipelineKind::Bindings => {
                let bindings = self
                    .stages
                    .iter()
                    .filter_map(|stage| match (&stage.kind, stage.status, &stage.data) {
                        (StageKind::Binding { .. }, StageStatus::Success, StageData::Binding(definition)) => Some(definition.clone()),
                        _ => None,
                    })
                    .collect();
                let functions = match self.stage(&StageKind::FunctionInventory).map(|stage| (stage.status, &stage.data)) {
                    Some((StageStatus::Success, StageData::Functions(functions))) => Some(functions.clone()),
                    _ => None,
                };
                CapabilitySet::Bindings(BindingCapabilities {
                    bindings,
                    functions,
                    resource_group_write: self.permission(PermissionScope::ResourceGroup),
                    subscription_write: self.permission(PermissionScope::Subscription),
                })
            }
        }
    }

    fn items_of(&self, kind: &StageKind) -> Vec<StorageItem> {
        self.stage(kind).map(|stage| stage.items().to_vec()).unwrap_or_default()
    }

    fn permission(&self, scope: PermissionScope) -> bool {
        matches!(
            self.stage(&StageKind::Permission { scope }).map(|stage| (stage.status, &stage.data)),
            Some((StageStatus::Success, StageData::Permission(true)))
        )
    }
}

/// The two mutually exclusive storage mount modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    AzureBlob,
    AzureFiles,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::AzureBlob => "AzureBlob",
            StorageMode::AzureFiles => "AzureFiles",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AzureBlob" => Some(StorageMode::AzureBlob),
            "AzureFiles" => Some(StorageMode::AzureFiles),
            _ => None,
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageCapabilities {
    pub blob_containers: Vec<StorageItem>,
    pub file_shares: Vec<StorageItem>,
}

impl StorageCapabilities {
    pub fn items_for(&self, mode: StorageMode) -> &[StorageItem] {
        match mode {
            StorageMode::AzureBlob => &self.blob_containers,
            StorageMode::AzureFiles => &self.file_shares,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BindingCapabilities {
    /// Successfully fetched binding definitions, in discovery order.
    pub bindings: Vec<BindingDefinition>,
    /// Existing functions, `None` when the inventory could not be loaded.
    pub functions: Option<Vec<FunctionRecord>>,
    pub resource_group_write: bool,
    pub subscription_write: bool,
}

/// User-relevant output of a discovery run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CapabilitySet {
    Storage(StorageCapabilities),
    Bindings(BindingCapabilities),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag() -> GenerationTag {
        GenerationTag::new(SelectionKey::from("acct"), 1)
    }

    #[test]
    fn storage_capabilities_ignore_failed_stages() {
        let result = DiscoveryResult::new(
            PipelineKind::Storage,
            tag(),
            vec![
                LookupStage::succeeded(
                    StageKind::Credentials,
                    StageData::Credential(StorageCredential {
                        account_name: "acct".into(),
                        access_key: "k".into(),
                    }),
                ),
                LookupStage::succeeded(StageKind::BlobContainers, StageData::Items(vec![StorageItem::named("c1")])),
                LookupStage::failed(StageKind::FileShares, Some("403".into())),
            ],
        );
        let CapabilitySet::Storage(capabilities) = result.capabilities() else {
            panic!("expected storage capabilities");
        };
        assert_eq!(capabilities.blob_containers, vec![StorageItem::named("c1")]);
        assert!(capabilities.file_shares.is_empty());
        assert_eq!(result.credential().map(|c| c.access_key.as_str()), Some("k"));
    }

    #[test]
    fn tags_compare_key_and_generation() {
        let first = GenerationTag::new("a".into(), 1);
        assert_eq!(first, GenerationTag::new("a".into(), 1));
        assert_ne!(first, GenerationTag::new("a".into(), 3));
        assert_ne!(first, GenerationTag::new("b".into(), 1));
        assert_eq!(first.to_string(), "a#1");
    }

    #[test]
    fn binding_capabilities_collect_permissions() {
        let result = DiscoveryResult::new(
            PipelineKind::Bindings,
            tag(),
            vec![
                LookupStage::succeeded(StageKind::RequiredBindings, StageData::BindingIds(Vec::new())),
                LookupStage::succeeded(
                    StageKind::Permission {
                        scope: PermissionScope::ResourceGroup,
                    },
                    StageData::Permission(true),
                ),
                LookupStage::failed(
                    StageKind::Permission {
                        scope: PermissionScope::Subscription,
                    },
                    None,
                ),
            ],
        );
        let CapabilitySet::Bindings(capabilities) = result.capabilities() else {
            panic!("expected binding capabilities");
        };
        assert!(capabilities.resource_group_write);
        assert!(!capabilities.subscription_write);
        assert!(capabilities.functions.is_none());
    }
}

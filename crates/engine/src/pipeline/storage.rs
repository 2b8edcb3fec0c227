use std::sync::Arc;

use async_trait::async_trait;
use fieldscout_types::{
    DiscoveryResult, GenerationTag, LookupStage, PipelineKind, StageData, StageKind, StageStatus, StorageAccount, StorageCredential,
    StorageMode,
};
use tracing::debug;

use super::{DiscoveryPipeline, failed_stage, stage_from_response};
use crate::collaborators::{CapabilityFetch, CredentialLookup};
use crate::scenario::ScenarioFlags;

/// Credential lookup followed by the container and share listings.
pub struct StorageDiscovery {
    accounts: Vec<StorageAccount>,
    flags: ScenarioFlags,
    credentials: Arc<dyn CredentialLookup>,
    capabilities: Arc<dyn CapabilityFetch>,
}

impl StorageDiscovery {
    pub fn new(
        accounts: Vec<StorageAccount>,
        flags: ScenarioFlags,
        credentials: Arc<dyn CredentialLookup>,
        capabilities: Arc<dyn CapabilityFetch>,
    ) -> Self {
        Self {
            accounts,
            flags,
            credentials,
            capabilities,
        }
    }

    pub fn account(&self, name: &str) -> Option<&StorageAccount> {
        self.accounts.iter().find(|account| account.name == name)
    }

    async fn credential_stage(&self, tag: &GenerationTag, account: &StorageAccount) -> LookupStage {
        let outcome = self.credentials.list_keys(&account.id).await;
        stage_from_response(tag, StageKind::Credentials, outcome, |keys| {
            keys.primary_value().map(|value| {
                StageData::Credential(StorageCredential {
                    account_name: account.name.clone(),
                    access_key: value.to_string(),
                })
            })
        })
    }

    async fn capability_stage(
        &self,
        tag: &GenerationTag,
        mode: StorageMode,
        skip: bool,
        credential: &StorageCredential,
    ) -> LookupStage {
        let kind = match mode {
            StorageMode::AzureBlob => StageKind::BlobContainers,
            StorageMode::AzureFiles => StageKind::FileShares,
        };
        if skip {
            debug!(selection = %tag.key, generation = tag.generation, stage = %kind, "stage skipped");
            return LookupStage::skipped(kind);
        }
        let outcome = self.capabilities.fetch(mode, &credential.account_name, credential).await;
        let stage = stage_from_response(tag, kind, outcome, |items| Some(StageData::Items(items)));
        debug!(selection = %tag.key, stage = %stage.kind, item_count = stage.items().len(), "capability listed");
        stage
    }
}

#[async_trait]
impl DiscoveryPipeline for StorageDiscovery {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Storage
    }

    async fn run(&self, tag: GenerationTag) -> DiscoveryResult {
        debug!(selection = %tag.key, generation = tag.generation, "storage discovery started");
        let Some(account) = self.account(tag.key.as_str()) else {
            let stage = failed_stage(&tag, StageKind::Credentials, Some(format!("storage account '{}' is not known", tag.key)));
            return DiscoveryResult::new(PipelineKind::Storage, tag, vec![stage]);
        };

        let credential_stage = self.credential_stage(&tag, account).await;
        let credential = match (&credential_stage.status, &credential_stage.data) {
            (StageStatus::Success, StageData::Credential(credential)) => credential.clone(),
            _ => return DiscoveryResult::new(PipelineKind::Storage, tag, vec![credential_stage]),
        };

        let skip_blob = !self.flags.alternate_storage_mode || !account.kind.supports_blob();
        let skip_files = !account.kind.supports_files();
        let (blob_stage, files_stage) = tokio::join!(
            self.capability_stage(&tag, StorageMode::AzureBlob, skip_blob, &credential),
            self.capability_stage(&tag, StorageMode::AzureFiles, skip_files, &credential),
        );

        DiscoveryResult::new(PipelineKind::Storage, tag, vec![credential_stage, blob_stage, files_stage])
    }
}

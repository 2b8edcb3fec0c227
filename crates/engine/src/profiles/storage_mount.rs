use fieldscout_types::{
    BannerKind, CapabilitySet, DiscoveryResult, FieldOption, Notice, NoticeLevel, StorageAccount, StorageCapabilities, StorageMode,
};
use indexmap::IndexMap;

use crate::classify::{ClassifierConfig, ClassifierContext, ErrorClassifier, relevant_modes};
use crate::fallback::resolve_default;
use crate::messages::MessageCatalog;
use crate::projector::{FieldProjection, FormProfile, Projection, ProjectionInput, Reconciliation};
use crate::scenario::ScenarioFlags;

pub const ACCOUNT_NAME: &str = "account_name";
pub const STORAGE_TYPE: &str = "storage_type";
pub const SHARE_NAME: &str = "share_name";
pub const ACCESS_KEY: &str = "access_key";
pub const NAME: &str = "name";
pub const MOUNT_PATH: &str = "mount_path";

const READONLY_BLOB_NOTICE: &str = "readonly-blob-storage";
const READONLY_BLOB_LEARN_MORE: &str = "https://go.microsoft.com/fwlink/?linkid=2110146";

/// Path-mapping form that mounts a blob container or file share into a site.
pub struct StorageMountProfile {
    accounts: Vec<StorageAccount>,
    flags: ScenarioFlags,
    messages: MessageCatalog,
    classifier: ErrorClassifier,
}

impl StorageMountProfile {
    pub fn new(accounts: Vec<StorageAccount>, flags: ScenarioFlags, messages: MessageCatalog, classifier: ClassifierConfig) -> Self {
        Self {
            accounts,
            flags,
            classifier: ErrorClassifier::new(messages.clone(), classifier),
            messages,
        }
    }

    fn account(&self, name: &str) -> Option<&StorageAccount> {
        self.accounts.iter().find(|account| account.name == name)
    }

    fn context(&self, account_name: Option<&str>) -> ClassifierContext {
        ClassifierContext {
            supports_alternate_mode: self.flags.alternate_storage_mode,
            account_kind: account_name.and_then(|name| self.account(name)).map(|account| account.kind),
        }
    }

    fn default_mode(&self) -> StorageMode {
        if self.flags.alternate_storage_mode {
            StorageMode::AzureBlob
        } else {
            StorageMode::AzureFiles
        }
    }

    fn account_options(&self) -> Vec<FieldOption> {
        self.accounts
            .iter()
            .filter(|account| self.flags.alternate_storage_mode || !account.kind.is_blob_only())
            .map(|account| FieldOption::new(account.name.clone()))
            .collect()
    }
}

impl FormProfile for StorageMountProfile {
    fn selection_field(&self) -> &str {
        ACCOUNT_NAME
    }

    fn field_order(&self) -> Vec<String> {
        [NAME, ACCOUNT_NAME, STORAGE_TYPE, SHARE_NAME, ACCESS_KEY, MOUNT_PATH]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn is_dependent(&self, field: &str) -> bool {
        matches!(field, SHARE_NAME | ACCESS_KEY)
    }

    fn initial_values(&self) -> IndexMap<String, String> {
        IndexMap::from([(STORAGE_TYPE.to_string(), self.default_mode().to_string())])
    }

    fn reconcile(&self, result: &DiscoveryResult) -> Reconciliation {
        let context = self.context(Some(result.key().as_str()));
        let mut reconciliation = Reconciliation {
            banner: self.classifier.classify(result, context),
            ..Reconciliation::default()
        };
        reconciliation.values.insert(
            ACCESS_KEY.to_string(),
            result.credential().map(|credential| credential.access_key.clone()),
        );

        let forced = match (relevant_modes(context).as_slice(), result.capabilities()) {
            ([only], _) => Some(*only),
            (_, CapabilitySet::Storage(capabilities)) => resolve_default(&capabilities),
            _ => None,
        };
        if let Some(mode) = forced
            && reconciliation.banner.kind != BannerKind::AccessDenied
        {
            reconciliation.values.insert(STORAGE_TYPE.to_string(), Some(mode.to_string()));
        }
        reconciliation
    }

    fn project(&self, input: &ProjectionInput<'_>) -> Projection {
        let capabilities = match input.capabilities {
            Some(CapabilitySet::Storage(capabilities)) => Some(capabilities),
            _ => None,
        };
        let account = input.value(ACCOUNT_NAME).and_then(|name| self.account(name));
        let mode = input.value(STORAGE_TYPE).and_then(StorageMode::parse).unwrap_or(self.default_mode());
        let empty = StorageCapabilities::default();
        let lists = capabilities.unwrap_or(&empty);

        let mut fields = IndexMap::new();
        fields.insert(NAME.to_string(), FieldProjection::free_form(true));
        fields.insert(ACCOUNT_NAME.to_string(), FieldProjection::choice(self.account_options(), true));

        let type_options = vec![
            FieldOption::with_text(StorageMode::AzureBlob.as_str(), &self.messages.azure_blob)
                .disabled(lists.blob_containers.is_empty()),
            FieldOption::with_text(StorageMode::AzureFiles.as_str(), &self.messages.azure_files)
                .disabled(lists.file_shares.is_empty()),
        ];
        let type_visible = self.flags.alternate_storage_mode && !account.is_some_and(|account| account.kind.is_blob_only());
        fields.insert(
            STORAGE_TYPE.to_string(),
            FieldProjection::choice(type_options, true)
                .discovered()
                .advisory()
                .visible(type_visible),
        );

        let share_options = lists.items_for(mode).iter().map(|item| FieldOption::new(item.name.clone())).collect();
        let placeholder = if input.pending {
            &self.messages.loading
        } else {
            &self.messages.select_an_option
        };
        fields.insert(
            SHARE_NAME.to_string(),
            FieldProjection::choice(share_options, true).discovered().with_placeholder(placeholder),
        );
        fields.insert(ACCESS_KEY.to_string(), FieldProjection::hidden());
        fields.insert(MOUNT_PATH.to_string(), FieldProjection::free_form(true));

        let mut notices = Vec::new();
        if self.flags.show_warning_banner && mode == StorageMode::AzureBlob {
            notices.push(Notice {
                id: READONLY_BLOB_NOTICE.to_string(),
                level: NoticeLevel::Warning,
                message: self.messages.readonly_blob_storage_warning.clone(),
                learn_more: Some(READONLY_BLOB_LEARN_MORE.to_string()),
            });
        }
        Projection { fields, notices }
    }

    fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    fn validate(&self, field: &str, value: &str, input: &ProjectionInput<'_>) -> Option<String> {
        match field {
            ACCOUNT_NAME if input.banner.is_active() => input.banner.message.clone(),
            MOUNT_PATH if !value.starts_with('/') => Some(self.messages.validation_mount_path_error.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projector::FormStateProjector;
    use fieldscout_types::{GenerationTag, LookupStage, PipelineKind, StageData, StageKind, StorageCredential, StorageItem, StorageKind};

    fn accounts() -> Vec<StorageAccount> {
        [("v2", StorageKind::StorageV2), ("blobonly", StorageKind::BlobStorage)]
            .into_iter()
            .map(|(name, kind)| StorageAccount {
                id: format!("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/{name}"),
                name: name.into(),
                kind,
                location: None,
            })
            .collect()
    }

    fn profile(flags: ScenarioFlags) -> StorageMountProfile {
        StorageMountProfile::new(accounts(), flags, MessageCatalog::default(), ClassifierConfig::default())
    }

    fn blob_result(tag: &GenerationTag) -> DiscoveryResult {
        DiscoveryResult::new(
            PipelineKind::Storage,
            tag.clone(),
            vec![
                LookupStage::succeeded(
                    StageKind::Credentials,
                    StageData::Credential(StorageCredential {
                        account_name: "blobonly".into(),
                        access_key: "secret".into(),
                    }),
                ),
                LookupStage::succeeded(StageKind::BlobContainers, StageData::Items(vec![StorageItem::named("c1")])),
                LookupStage::skipped(StageKind::FileShares),
            ],
        )
    }

    #[test]
    fn blob_only_account_forces_blob_mode() {
        let flags = ScenarioFlags {
            alternate_storage_mode: true,
            show_warning_banner: true,
        };
        let mut projector = FormStateProjector::new(profile(flags));
        let tag = GenerationTag::new("blobonly".into(), 1);
        projector.begin_selection(&tag);
        projector.accept(&blob_result(&tag));

        let snapshot = projector.snapshot();
        assert!(!snapshot.banner.is_active());
        assert_eq!(snapshot.field_values.get(STORAGE_TYPE).map(String::as_str), Some("AzureBlob"));
        assert_eq!(snapshot.field_values.get(ACCESS_KEY).map(String::as_str), Some("secret"));
        let type_options = &snapshot.field_options[STORAGE_TYPE];
        assert!(type_options.iter().any(|option| option.key == "AzureFiles" && option.disabled));
        assert!(snapshot.hidden_fields.contains(&STORAGE_TYPE.to_string()));
        assert!(snapshot.hidden_fields.contains(&ACCESS_KEY.to_string()));
        assert_eq!(snapshot.field_options[SHARE_NAME], vec![FieldOption::new("c1")]);
        assert_eq!(snapshot.notices.len(), 1);
        assert_eq!(projector.validate(SHARE_NAME, Some("c1")), None);
    }

    #[test]
    fn blob_accounts_hidden_without_blob_support() {
        let flags = ScenarioFlags {
            alternate_storage_mode: false,
            show_warning_banner: false,
        };
        let projector = FormStateProjector::new(profile(flags));
        let snapshot = projector.snapshot();
        assert_eq!(snapshot.field_options[ACCOUNT_NAME], vec![FieldOption::new("v2")]);
        assert_eq!(snapshot.field_values.get(STORAGE_TYPE).map(String::as_str), Some("AzureFiles"));
        assert!(snapshot.notices.is_empty());
    }

    #[test]
    fn share_placeholder_tracks_pending() {
        let mut projector = FormStateProjector::new(profile(ScenarioFlags::default()));
        let tag = GenerationTag::new("blobonly".into(), 1);
        projector.begin_selection(&tag);
        assert_eq!(projector.field(SHARE_NAME).and_then(|f| f.placeholder.as_deref()), Some("Loading..."));
        projector.accept(&blob_result(&tag));
        assert_eq!(
            projector.field(SHARE_NAME).and_then(|f| f.placeholder.as_deref()),
            Some("Select an option")
        );
    }

    #[test]
    fn storage_type_is_not_checked_against_its_options() {
        let files_only = ScenarioFlags {
            alternate_storage_mode: false,
            show_warning_banner: false,
        };
        for flags in [ScenarioFlags::default(), files_only] {
            let projector = FormStateProjector::new(profile(flags));
            let snapshot = projector.snapshot();
            assert!(snapshot.field_errors.is_empty(), "unexpected errors: {:?}", snapshot.field_errors);
            assert_eq!(projector.validate(STORAGE_TYPE, Some("AzureFiles")), None);
        }

        let mut projector = FormStateProjector::new(profile(ScenarioFlags::default()));
        let tag = GenerationTag::new("blobonly".into(), 1);
        projector.begin_selection(&tag);
        assert_eq!(projector.validate(STORAGE_TYPE, Some("AzureBlob")), None);
    }

    #[test]
    fn mount_path_must_be_absolute() {
        let mut projector = FormStateProjector::new(profile(ScenarioFlags::default()));
        projector.set_value(MOUNT_PATH, Some("data".into())).expect("mount path");
        assert_eq!(
            projector.snapshot().field_errors.get(MOUNT_PATH),
            Some(&MessageCatalog::default().validation_mount_path_error)
        );
        projector.set_value(MOUNT_PATH, Some("/data".into())).expect("mount path");
        assert!(!projector.snapshot().field_errors.contains_key(MOUNT_PATH));
    }
}

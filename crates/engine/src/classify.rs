//! Maps the stage outcomes of a discovery run to the form's single error banner.

use fieldscout_types::{
    BannerKind, DiscoveryResult, ErrorBanner, LookupStage, PipelineKind, StageKind, StageStatus, StorageKind, StorageMode,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::messages::MessageCatalog;

/// Which banner wins when one relevant list failed and the other came back empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MixedCausePrecedence {
    /// Report the failure of the list that failed.
    #[default]
    FailureDetail,
    /// Report that neither option is available.
    CatchAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub mixed_cause_precedence: MixedCausePrecedence,
}

/// Facts about the selection that decide which lists are relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierContext {
    pub supports_alternate_mode: bool,
    pub account_kind: Option<StorageKind>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ListOutcome {
    Items,
    Empty,
    Failed(Option<String>),
}

impl ListOutcome {
    fn of(stage: Option<&LookupStage>) -> Self {
        match stage {
            Some(stage) if stage.is_failed() => ListOutcome::Failed(stage.error_detail.clone()),
            Some(stage) if !stage.items().is_empty() => ListOutcome::Items,
            _ => ListOutcome::Empty,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorClassifier {
    messages: MessageCatalog,
    config: ClassifierConfig,
}

impl ErrorClassifier {
    pub fn new(messages: MessageCatalog, config: ClassifierConfig) -> Self {
        Self { messages, config }
    }

    pub fn classify(&self, result: &DiscoveryResult, context: ClassifierContext) -> ErrorBanner {
        let banner = match result.kind {
            PipelineKind::Storage => self.classify_storage(result, context),
            PipelineKind::Bindings => self.classify_bindings(result),
        };
        debug!(selection = %result.tag.key, generation = result.tag.generation, banner = ?banner.kind, "classified result");
        banner
    }

    fn classify_storage(&self, result: &DiscoveryResult, context: ClassifierContext) -> ErrorBanner {
        let credential_ok = result
            .stage(&StageKind::Credentials)
            .is_some_and(|stage| stage.status == StageStatus::Success);
        if !credential_ok {
            return ErrorBanner::new(BannerKind::AccessDenied, &self.messages.no_write_access_storage_account);
        }

        let relevant = relevant_modes(context);
        let outcomes: Vec<(StorageMode, ListOutcome)> = relevant
            .iter()
            .map(|mode| (*mode, ListOutcome::of(result.stage(&stage_kind(*mode)))))
            .collect();

        if outcomes.iter().any(|(_, outcome)| *outcome == ListOutcome::Items) {
            return ErrorBanner::none();
        }

        match outcomes.as_slice() {
            [(mode, outcome)] => self.single_list(*mode, outcome),
            [(_, ListOutcome::Failed(first)), (_, ListOutcome::Failed(second))] => {
                let mut details: Vec<&str> = Vec::new();
                for detail in [first, second].into_iter().flatten() {
                    if !details.contains(&detail.as_str()) {
                        details.push(detail);
                    }
                }
                if details.is_empty() {
                    ErrorBanner::new(BannerKind::EmptyResult, &self.messages.storage_failure)
                } else {
                    let message = MessageCatalog::format(&self.messages.storage_failure_with_error, &[details.join("; ").as_str()]);
                    ErrorBanner::new(BannerKind::PartialFailure, message)
                }
            }
            [(mode, failed @ ListOutcome::Failed(_)), _] | [_, (mode, failed @ ListOutcome::Failed(_))]
                if self.config.mixed_cause_precedence == MixedCausePrecedence::FailureDetail =>
            {
                self.single_list(*mode, failed)
            }
            _ => ErrorBanner::new(BannerKind::AccessDenied, &self.messages.no_blobs_or_file_shares),
        }
    }

    fn single_list(&self, mode: StorageMode, outcome: &ListOutcome) -> ErrorBanner {
        let messages = &self.messages;
        let (with_error, failure, empty) = match mode {
            StorageMode::AzureBlob => (&messages.blobs_failure_with_error, &messages.blobs_failure, &messages.no_blobs),
            StorageMode::AzureFiles => (
                &messages.file_shares_failure_with_error,
                &messages.file_shares_failure,
                &messages.no_file_shares,
            ),
        };
        match outcome {
            ListOutcome::Items => ErrorBanner::none(),
            ListOutcome::Failed(Some(detail)) => ErrorBanner::new(BannerKind::PartialFailure, MessageCatalog::format(with_error, &[detail.as_str()])),
            ListOutcome::Failed(None) => ErrorBanner::new(BannerKind::EmptyResult, failure),
            ListOutcome::Empty => ErrorBanner::new(BannerKind::EmptyResult, empty),
        }
    }

    fn classify_bindings(&self, result: &DiscoveryResult) -> ErrorBanner {
        if result.stage(&StageKind::RequiredBindings).is_none_or(LookupStage::is_failed) {
            let message = MessageCatalog::format(&self.messages.template_not_found, &[result.tag.key.as_str()]);
            return ErrorBanner::new(BannerKind::EmptyResult, message);
        }

        let mut failed_ids: Vec<&str> = Vec::new();
        let mut details: Vec<&str> = Vec::new();
        for stage in result.stages.iter().filter(|stage| stage.is_failed()) {
            if let StageKind::Binding { binding_id } = &stage.kind {
                failed_ids.push(binding_id);
                if let Some(detail) = stage.error_detail.as_deref()
                    && !details.contains(&detail)
                {
                    details.push(detail);
                }
            }
        }
        if !failed_ids.is_empty() {
            let ids = failed_ids.join(", ");
            return if details.is_empty() {
                ErrorBanner::new(BannerKind::EmptyResult, MessageCatalog::format(&self.messages.bindings_failure, &[ids.as_str()]))
            } else {
                let message = MessageCatalog::format(&self.messages.bindings_failure_with_error, &[ids.as_str(), details.join("; ").as_str()]);
                ErrorBanner::new(BannerKind::PartialFailure, message)
            };
        }

        match result.stage(&StageKind::FunctionInventory) {
            Some(stage) if stage.is_failed() => match stage.error_detail.as_deref() {
                Some(detail) => ErrorBanner::new(
                    BannerKind::PartialFailure,
                    MessageCatalog::format(&self.messages.functions_failure_with_error, &[detail]),
                ),
                None => ErrorBanner::new(BannerKind::EmptyResult, &self.messages.functions_failure),
            },
            _ => ErrorBanner::none(),
        }
    }
}

/// Lists that count for the banner, in blob-then-files order.
pub fn relevant_modes(context: ClassifierContext) -> Vec<StorageMode> {
    if !context.supports_alternate_mode {
        return vec![StorageMode::AzureFiles];
    }
    match context.account_kind {
        Some(kind) if kind.is_blob_only() => vec![StorageMode::AzureBlob],
        Some(kind) if !kind.supports_blob() => vec![StorageMode::AzureFiles],
        _ => vec![StorageMode::AzureBlob, StorageMode::AzureFiles],
    }
}

fn stage_kind(mode: StorageMode) -> StageKind {
    match mode {
        StorageMode::AzureBlob => StageKind::BlobContainers,
        StorageMode::AzureFiles => StageKind::FileShares,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscout_types::{GenerationTag, StageData, StorageCredential, StorageItem};

    fn credential_stage() -> LookupStage {
        LookupStage::succeeded(
            StageKind::Credentials,
            StageData::Credential(StorageCredential {
                account_name: "acct".into(),
                access_key: "k".into(),
            }),
        )
    }

    fn items(kind: StageKind, names: &[&str]) -> LookupStage {
        LookupStage::succeeded(kind, StageData::Items(names.iter().map(|name| StorageItem::named(*name)).collect()))
    }

    fn storage(stages: Vec<LookupStage>) -> DiscoveryResult {
        let mut all = vec![credential_stage()];
        all.extend(stages);
        DiscoveryResult::new(PipelineKind::Storage, GenerationTag::new("acct".into(), 1), all)
    }

    fn context(kind: StorageKind) -> ClassifierContext {
        ClassifierContext {
            supports_alternate_mode: true,
            account_kind: Some(kind),
        }
    }

    #[test]
    fn any_items_means_no_banner() {
        let result = storage(vec![
            items(StageKind::BlobContainers, &["c1"]),
            LookupStage::skipped(StageKind::FileShares),
        ]);
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::BlobStorage));
        assert_eq!(banner, ErrorBanner::none());
    }

    #[test]
    fn both_failures_with_detail_are_partial() {
        let result = storage(vec![
            LookupStage::failed(StageKind::BlobContainers, Some("403".into())),
            LookupStage::failed(StageKind::FileShares, Some("403".into())),
        ]);
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::StorageV2));
        assert_eq!(banner.kind, BannerKind::PartialFailure);
        let message = banner.message.expect("message");
        assert!(message.contains("403"));
        assert_eq!(message.matches("403").count(), 1);
    }

    #[test]
    fn both_empty_is_the_catch_all() {
        let result = storage(vec![items(StageKind::BlobContainers, &[]), items(StageKind::FileShares, &[])]);
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::StorageV2));
        assert_eq!(banner.kind, BannerKind::AccessDenied);
        assert_eq!(banner.message, Some(MessageCatalog::default().no_blobs_or_file_shares));
    }

    #[test]
    fn files_only_relevance_ignores_blob_stage() {
        let result = storage(vec![LookupStage::skipped(StageKind::BlobContainers), items(StageKind::FileShares, &[])]);
        let context = ClassifierContext {
            supports_alternate_mode: false,
            account_kind: Some(StorageKind::StorageV2),
        };
        let banner = ErrorClassifier::default().classify(&result, context);
        assert_eq!(banner.kind, BannerKind::EmptyResult);
        assert_eq!(banner.message, Some(MessageCatalog::default().no_file_shares));
    }

    #[test]
    fn blob_failure_uses_blob_detail() {
        let result = storage(vec![
            LookupStage::failed(StageKind::BlobContainers, Some("blob denied".into())),
            LookupStage::failed(StageKind::FileShares, Some("files denied".into())),
        ]);
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::BlockBlobStorage));
        let message = banner.message.expect("message");
        assert!(message.contains("blob denied"));
        assert!(!message.contains("files denied"));
    }

    #[test]
    fn mixed_causes_follow_precedence() {
        let result = storage(vec![
            LookupStage::failed(StageKind::BlobContainers, None),
            items(StageKind::FileShares, &[]),
        ]);
        let detail_first = ErrorClassifier::default().classify(&result, context(StorageKind::StorageV2));
        assert_eq!(detail_first.kind, BannerKind::EmptyResult);
        assert_eq!(detail_first.message, Some(MessageCatalog::default().blobs_failure));

        let catch_all = ErrorClassifier::new(
            MessageCatalog::default(),
            ClassifierConfig {
                mixed_cause_precedence: MixedCausePrecedence::CatchAll,
            },
        )
        .classify(&result, context(StorageKind::StorageV2));
        assert_eq!(catch_all.kind, BannerKind::AccessDenied);
    }

    #[test]
    fn credential_failure_is_access_denied() {
        let result = DiscoveryResult::new(
            PipelineKind::Storage,
            GenerationTag::new("acct".into(), 1),
            vec![LookupStage::failed(StageKind::Credentials, Some("forbidden".into()))],
        );
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::StorageV2));
        assert_eq!(banner.kind, BannerKind::AccessDenied);
    }

    #[test]
    fn binding_failures_name_the_ids() {
        let result = DiscoveryResult::new(
            PipelineKind::Bindings,
            GenerationTag::new("tpl".into(), 1),
            vec![
                LookupStage::succeeded(StageKind::RequiredBindings, StageData::BindingIds(vec!["blob-out".into()])),
                LookupStage::failed(
                    StageKind::Binding {
                        binding_id: "blob-out".into(),
                    },
                    Some("500".into()),
                ),
            ],
        );
        let banner = ErrorClassifier::default().classify(&result, context(StorageKind::StorageV2));
        assert_eq!(banner.kind, BannerKind::PartialFailure);
        assert_eq!(banner.message.as_deref(), Some("Failed to load bindings blob-out: 500"));
    }

    #[test]
    fn inventory_failure_and_missing_template() {
        let result = DiscoveryResult::new(
            PipelineKind::Bindings,
            GenerationTag::new("tpl".into(), 1),
            vec![
                LookupStage::succeeded(StageKind::RequiredBindings, StageData::BindingIds(Vec::new())),
                LookupStage::failed(StageKind::FunctionInventory, Some("404".into())),
            ],
        );
        let classifier = ErrorClassifier::default();
        let banner = classifier.classify(&result, context(StorageKind::StorageV2));
        assert_eq!(banner.kind, BannerKind::PartialFailure);

        let missing = DiscoveryResult::new(
            PipelineKind::Bindings,
            GenerationTag::new("tpl".into(), 1),
            vec![LookupStage::failed(StageKind::RequiredBindings, None)],
        );
        assert_eq!(classifier.classify(&missing, context(StorageKind::StorageV2)).kind, BannerKind::EmptyResult);
    }
}

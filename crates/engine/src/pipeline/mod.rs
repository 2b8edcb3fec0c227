//! Discovery pipelines.
//!
//! A pipeline turns a [`GenerationTag`] into a [`DiscoveryResult`]: a fixed,
//! ordered set of lookup stages. Collaborator failures are folded into
//! failed stages here and never escape as errors.

mod bindings;
mod storage;

pub use bindings::{BindingDiscovery, required_binding_ids};
pub use storage::StorageDiscovery;

use async_trait::async_trait;
use fieldscout_types::{ApiResponse, DiscoveryResult, GenerationTag, LookupStage, PipelineKind, StageData, StageKind};
use fieldscout_util::{error_message_or_stringify, redact_sensitive};
use tracing::{debug, warn};

use crate::collaborators::CollaboratorError;

#[async_trait]
pub trait DiscoveryPipeline: Send + Sync {
    fn kind(&self) -> PipelineKind;

    /// Run every stage for `tag`. The returned result always carries `tag`.
    async fn run(&self, tag: GenerationTag) -> DiscoveryResult;
}

/// Fold a collaborator answer into a stage. `extract` returns `None` when a
/// successful payload is still unusable.
pub(crate) fn stage_from_response<T>(
    tag: &GenerationTag,
    kind: StageKind,
    outcome: Result<ApiResponse<T>, CollaboratorError>,
    extract: impl FnOnce(T) -> Option<StageData>,
) -> LookupStage {
    match outcome {
        Ok(response) if response.metadata.success => match response.data.and_then(extract) {
            Some(data) => {
                debug!(selection = %tag.key, generation = tag.generation, stage = %kind, "stage succeeded");
                LookupStage::succeeded(kind, data)
            }
            None => failed_stage(tag, kind, None),
        },
        Ok(response) => {
            let detail = response.metadata.error.as_ref().map(error_message_or_stringify);
            failed_stage(tag, kind, detail)
        }
        Err(error) => failed_stage(tag, kind, Some(error.to_string())),
    }
}

pub(crate) fn failed_stage(tag: &GenerationTag, kind: StageKind, detail: Option<String>) -> LookupStage {
    warn!(
        selection = %tag.key,
        generation = tag.generation,
        stage = %kind,
        detail = %redact_sensitive(detail.as_deref().unwrap_or("<none>")),
        "stage failed"
    );
    LookupStage::failed(kind, detail.filter(|detail| !detail.trim().is_empty()))
}

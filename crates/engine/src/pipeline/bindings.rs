use std::sync::Arc;

use async_trait::async_trait;
use fieldscout_types::{
    DiscoveryResult, FunctionTemplate, GenerationTag, LookupStage, PermissionScope, PipelineKind, StageData, StageKind,
};
use fieldscout_util::resource_id::{resource_group_scope, subscription_scope};
use tracing::debug;

use super::{DiscoveryPipeline, failed_stage, stage_from_response};
use crate::collaborators::{BindingLookup, FunctionInventoryLookup, PermissionCheck};

const WRITE_ACTION: &str = "./write";

/// Required binding definitions, the existing function inventory and write
/// permissions for a template picked against a function app.
pub struct BindingDiscovery {
    resource_id: String,
    templates: Vec<FunctionTemplate>,
    bindings: Arc<dyn BindingLookup>,
    inventory: Arc<dyn FunctionInventoryLookup>,
    permissions: Arc<dyn PermissionCheck>,
}

impl BindingDiscovery {
    pub fn new(
        resource_id: impl Into<String>,
        templates: Vec<FunctionTemplate>,
        bindings: Arc<dyn BindingLookup>,
        inventory: Arc<dyn FunctionInventoryLookup>,
        permissions: Arc<dyn PermissionCheck>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            templates,
            bindings,
            inventory,
            permissions,
        }
    }

    pub fn template(&self, id: &str) -> Option<&FunctionTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    async fn binding_stages(&self, tag: &GenerationTag, binding_ids: &[String]) -> Vec<LookupStage> {
        let mut stages = Vec::with_capacity(binding_ids.len());
        for binding_id in binding_ids {
            let outcome = self.bindings.binding(&self.resource_id, binding_id).await;
            let kind = StageKind::Binding {
                binding_id: binding_id.clone(),
            };
            stages.push(stage_from_response(tag, kind, outcome, |envelope| {
                envelope.properties.into_iter().next().map(StageData::Binding)
            }));
        }
        stages
    }

    async fn inventory_stage(&self, tag: &GenerationTag) -> LookupStage {
        let outcome = self.inventory.functions(&self.resource_id).await;
        stage_from_response(tag, StageKind::FunctionInventory, outcome, |list| Some(StageData::Functions(list.value)))
    }

    async fn permission_stage(&self, tag: &GenerationTag, scope: PermissionScope) -> LookupStage {
        let scope_id = match scope {
            PermissionScope::ResourceGroup => resource_group_scope(&self.resource_id),
            PermissionScope::Subscription => subscription_scope(&self.resource_id),
        };
        let kind = StageKind::Permission { scope };
        match self.permissions.has_permission(scope_id, &[WRITE_ACTION.to_string()]).await {
            Ok(granted) => {
                debug!(selection = %tag.key, scope = scope_id, granted, "permission checked");
                LookupStage::succeeded(kind, StageData::Permission(granted))
            }
            Err(error) => failed_stage(tag, kind, Some(error.to_string())),
        }
    }
}

/// Binding ids a template needs, in user-prompt order.
///
/// For each prompt key every binding declaring it contributes its id; the
/// first appearance of an id wins.
pub fn required_binding_ids(template: &FunctionTemplate) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for prompt in &template.user_prompt {
        for binding in template.bindings.iter().filter(|binding| binding.declares(prompt)) {
            let id = binding.binding_id();
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }
    ids
}

#[async_trait]
impl DiscoveryPipeline for BindingDiscovery {
    fn kind(&self) -> PipelineKind {
        PipelineKind::Bindings
    }

    async fn run(&self, tag: GenerationTag) -> DiscoveryResult {
        debug!(selection = %tag.key, generation = tag.generation, "binding discovery started");
        let Some(template) = self.template(tag.key.as_str()) else {
            let stage = failed_stage(&tag, StageKind::RequiredBindings, Some(format!("template '{}' is not known", tag.key)));
            return DiscoveryResult::new(PipelineKind::Bindings, tag, vec![stage]);
        };

        let binding_ids = required_binding_ids(template);
        debug!(selection = %tag.key, item_count = binding_ids.len(), "required bindings computed");

        let (binding_stages, inventory_stage, resource_group_stage, subscription_stage) = tokio::join!(
            self.binding_stages(&tag, &binding_ids),
            self.inventory_stage(&tag),
            self.permission_stage(&tag, PermissionScope::ResourceGroup),
            self.permission_stage(&tag, PermissionScope::Subscription),
        );

        let mut stages = Vec::with_capacity(binding_stages.len() + 4);
        stages.push(LookupStage::succeeded(StageKind::RequiredBindings, StageData::BindingIds(binding_ids)));
        stages.extend(binding_stages);
        stages.extend([inventory_stage, resource_group_stage, subscription_stage]);
        DiscoveryResult::new(PipelineKind::Bindings, tag, stages)
    }
}

use fieldscout_types::{
    BindingCapabilities, CapabilitySet, DiscoveryResult, FieldOption, FunctionRecord, FunctionTemplate, Notice, NoticeLevel,
};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::classify::{ClassifierConfig, ClassifierContext, ErrorClassifier};
use crate::form_builder::{FieldDescriptor, FieldKind, FunctionFormBuilder};
use crate::messages::MessageCatalog;
use crate::projector::{FieldProjection, FormProfile, Projection, ProjectionInput, Reconciliation};

pub const TEMPLATE: &str = "template";
pub const FUNCTION_NAME: &str = "function_name";

const DEFAULT_FUNCTION_NAME: &str = "NewFunction";
const NO_CREATE_PERMISSION_NOTICE: &str = "no-create-permission";

static FUNCTION_NAME_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_\-]{0,127}$").ok());

/// Function creation form: a template picker, the new function's name and
/// one field per binding setting the template prompts for.
pub struct FunctionCreateProfile {
    templates: Vec<FunctionTemplate>,
    messages: MessageCatalog,
    classifier: ErrorClassifier,
}

impl FunctionCreateProfile {
    pub fn new(templates: Vec<FunctionTemplate>, messages: MessageCatalog, classifier: ClassifierConfig) -> Self {
        Self {
            templates,
            classifier: ErrorClassifier::new(messages.clone(), classifier),
            messages,
        }
    }

    fn template(&self, id: &str) -> Option<&FunctionTemplate> {
        self.templates.iter().find(|template| template.id == id)
    }

    fn descriptors(&self, template: &FunctionTemplate, capabilities: &BindingCapabilities) -> Vec<FieldDescriptor> {
        FunctionFormBuilder::new(template, &capabilities.bindings)
            .allow_create(capabilities.resource_group_write)
            .build()
    }

    fn active<'a>(&'a self, input: &'a ProjectionInput<'_>) -> Option<(&'a FunctionTemplate, &'a BindingCapabilities)> {
        let template = input.value(TEMPLATE).and_then(|id| self.template(id))?;
        match input.capabilities {
            Some(CapabilitySet::Bindings(capabilities)) => Some((template, capabilities)),
            _ => None,
        }
    }
}

/// First free name derived from `base`: `base`, then `base` with its trailing
/// number incremented (or `1` appended) until no existing function matches.
pub fn unique_function_name(base: &str, existing: &[FunctionRecord]) -> String {
    let taken = |candidate: &str| existing.iter().any(|function| function.function_name().eq_ignore_ascii_case(candidate));
    if !taken(base) {
        return base.to_string();
    }
    let mut stem = base.trim_end_matches(|c: char| c.is_ascii_digit());
    let mut counter: u64 = match base[stem.len()..].parse() {
        Ok(number) => number,
        Err(_) => {
            stem = base;
            0
        }
    };
    loop {
        match counter.checked_add(1) {
            Some(next) => counter = next,
            // Trailing number is at its limit; count after the whole base.
            None => {
                stem = base;
                counter = 1;
            }
        }
        let candidate = format!("{stem}{counter}");
        if !taken(&candidate) {
            return candidate;
        }
    }
}

impl FormProfile for FunctionCreateProfile {
    fn selection_field(&self) -> &str {
        TEMPLATE
    }

    fn field_order(&self) -> Vec<String> {
        vec![TEMPLATE.to_string(), FUNCTION_NAME.to_string()]
    }

    fn is_dependent(&self, field: &str) -> bool {
        field != TEMPLATE
    }

    fn reconcile(&self, result: &DiscoveryResult) -> Reconciliation {
        let context = ClassifierContext {
            supports_alternate_mode: false,
            account_kind: None,
        };
        let mut reconciliation = Reconciliation {
            banner: self.classifier.classify(result, context),
            ..Reconciliation::default()
        };
        let Some(template) = self.template(result.key().as_str()) else {
            return reconciliation;
        };
        let CapabilitySet::Bindings(capabilities) = result.capabilities() else {
            return reconciliation;
        };

        let base = template.default_function_name.as_deref().unwrap_or(DEFAULT_FUNCTION_NAME);
        let existing = capabilities.functions.as_deref().unwrap_or_default();
        reconciliation
            .defaults
            .insert(FUNCTION_NAME.to_string(), unique_function_name(base, existing));
        for descriptor in self.descriptors(template, &capabilities) {
            if let Some(value) = descriptor.default_value {
                reconciliation.defaults.insert(descriptor.id, value);
            }
        }
        reconciliation
    }

    fn project(&self, input: &ProjectionInput<'_>) -> Projection {
        let mut fields = IndexMap::new();
        let template_options = self
            .templates
            .iter()
            .map(|template| FieldOption::with_text(template.id.clone(), template.name.clone()))
            .collect();
        fields.insert(TEMPLATE.to_string(), FieldProjection::choice(template_options, true));
        fields.insert(FUNCTION_NAME.to_string(), FieldProjection::free_form(true));

        let mut notices = Vec::new();
        if let Some((template, capabilities)) = self.active(input) {
            let descriptors = self.descriptors(template, capabilities);
            for descriptor in &descriptors {
                let projection = match &descriptor.kind {
                    FieldKind::Choice(options) => FieldProjection::choice(options.clone(), descriptor.required),
                    FieldKind::Boolean => FieldProjection::choice(
                        vec![FieldOption::new("true"), FieldOption::new("false")],
                        descriptor.required,
                    ),
                    FieldKind::Text | FieldKind::Integer | FieldKind::ResourcePicker { .. } => {
                        FieldProjection::free_form(descriptor.required)
                    }
                };
                fields.insert(descriptor.id.clone(), projection);
            }
            let has_pickers = descriptors
                .iter()
                .any(|descriptor| matches!(descriptor.kind, FieldKind::ResourcePicker { .. }));
            if has_pickers && !capabilities.resource_group_write {
                notices.push(Notice {
                    id: NO_CREATE_PERMISSION_NOTICE.to_string(),
                    level: NoticeLevel::Info,
                    message: self.messages.no_create_permission.clone(),
                    learn_more: None,
                });
            }
        }
        Projection { fields, notices }
    }

    fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    fn validate(&self, field: &str, value: &str, input: &ProjectionInput<'_>) -> Option<String> {
        if field == FUNCTION_NAME {
            if !FUNCTION_NAME_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(value)) {
                return Some(self.messages.function_name_invalid.clone());
            }
            let existing = self
                .active(input)
                .and_then(|(_, capabilities)| capabilities.functions.as_deref())
                .unwrap_or_default();
            if existing.iter().any(|function| function.function_name().eq_ignore_ascii_case(value)) {
                return Some(MessageCatalog::format(&self.messages.function_name_exists, &[value]));
            }
            return None;
        }

        let (template, capabilities) = self.active(input)?;
        let descriptor = self
            .descriptors(template, capabilities)
            .into_iter()
            .find(|descriptor| descriptor.id == field)?;
        match descriptor.kind {
            FieldKind::Integer if value.trim().parse::<i64>().is_err() => Some(self.messages.validation_integer_error.clone()),
            _ => None,
        }
    }
}

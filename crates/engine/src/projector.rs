//! Field state owned by an open form.
//!
//! The projector is the only writer of [`FieldState`]. It merges three
//! inputs: the active discovery result (through the profile's
//! [`FormProfile::reconcile`]), defaults derived from it, and user edits.
//! Option lists and visibility are recomputed from scratch on every change
//! via [`FormProfile::project`], so they can never outlive the result they
//! were derived from.

use fieldscout_types::{
    CapabilitySet, DiscoveryResult, ErrorBanner, FieldOption, FieldState, FormSnapshot, GenerationTag, Notice, SelectionKey,
};
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, info};

use crate::messages::MessageCatalog;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProjectorError {
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("field '{0}' changes only through a new selection")]
    SelectionField(String),
}

/// Presentation of one field for the current inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldProjection {
    /// `None` for free-form fields.
    pub options: Option<Vec<FieldOption>>,
    /// Options come from discovery and are unknown while a run is pending.
    pub discovery_backed: bool,
    /// Options guide the choice but the value is not checked against them.
    pub advisory: bool,
    pub visible: bool,
    pub placeholder: Option<String>,
    pub required: bool,
}

impl FieldProjection {
    pub fn free_form(required: bool) -> Self {
        Self {
            visible: true,
            required,
            ..Self::default()
        }
    }

    pub fn choice(options: Vec<FieldOption>, required: bool) -> Self {
        Self {
            options: Some(options),
            visible: true,
            required,
            ..Self::default()
        }
    }

    pub fn hidden() -> Self {
        Self::default()
    }

    pub fn discovered(mut self) -> Self {
        self.discovery_backed = true;
        self
    }

    pub fn advisory(mut self) -> Self {
        self.advisory = true;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    fn offers(&self, candidate: &str) -> bool {
        self.options
            .as_ref()
            .is_some_and(|options| options.iter().any(|option| option.key == candidate && !option.disabled))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub fields: IndexMap<String, FieldProjection>,
    pub notices: Vec<Notice>,
}

/// What an accepted result changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    pub banner: ErrorBanner,
    /// Values of fields the result governs; overwritten unconditionally.
    pub values: IndexMap<String, Option<String>>,
    /// Values applied only where the field is still empty.
    pub defaults: IndexMap<String, String>,
}

/// Inputs a profile projects from.
pub struct ProjectionInput<'a> {
    pub selection: Option<&'a SelectionKey>,
    pub capabilities: Option<&'a CapabilitySet>,
    pub fields: &'a IndexMap<String, FieldState>,
    pub banner: &'a ErrorBanner,
    pub pending: bool,
}

impl ProjectionInput<'_> {
    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|state| state.value.as_deref())
    }
}

/// Field layout and discovery semantics of one form.
pub trait FormProfile: Send {
    /// Field whose value is the selection key.
    fn selection_field(&self) -> &str;

    /// Fields that always exist, in display order.
    fn field_order(&self) -> Vec<String>;

    /// Whether `field` depends on the selection and is cleared when it changes.
    fn is_dependent(&self, field: &str) -> bool;

    fn reconcile(&self, result: &DiscoveryResult) -> Reconciliation;

    fn project(&self, input: &ProjectionInput<'_>) -> Projection;

    fn messages(&self) -> &MessageCatalog;

    fn initial_values(&self) -> IndexMap<String, String> {
        IndexMap::new()
    }

    /// Profile-specific checks run after option membership passed.
    fn validate(&self, _field: &str, _value: &str, _input: &ProjectionInput<'_>) -> Option<String> {
        None
    }
}

pub struct FormStateProjector<P: FormProfile> {
    profile: P,
    fields: IndexMap<String, FieldState>,
    meta: IndexMap<String, FieldProjection>,
    banner: ErrorBanner,
    notices: Vec<Notice>,
    capabilities: Option<CapabilitySet>,
    selection: Option<SelectionKey>,
    generation: u64,
    pending: bool,
}

impl<P: FormProfile> FormStateProjector<P> {
    pub fn new(profile: P) -> Self {
        let mut projector = Self {
            profile,
            fields: IndexMap::new(),
            meta: IndexMap::new(),
            banner: ErrorBanner::none(),
            notices: Vec::new(),
            capabilities: None,
            selection: None,
            generation: 0,
            pending: false,
        };
        projector.reset_fields();
        projector.refresh();
        projector
    }

    pub fn profile(&self) -> &P {
        &self.profile
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn banner(&self) -> &ErrorBanner {
        &self.banner
    }

    pub fn value(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|state| state.value.as_deref())
    }

    pub fn field(&self, field: &str) -> Option<&FieldState> {
        self.fields.get(field)
    }

    /// Start showing `tag`'s selection: clear the banner and every dependent
    /// value, drop the previous capabilities and mark discovery pending.
    pub fn begin_selection(&mut self, tag: &GenerationTag) {
        let selection_field = self.profile.selection_field().to_string();
        for (id, state) in self.fields.iter_mut() {
            if *id == selection_field {
                state.value = Some(tag.key.to_string());
            } else if self.profile.is_dependent(id) {
                state.value = None;
                state.error = None;
            }
        }
        self.banner = ErrorBanner::none();
        self.capabilities = None;
        self.selection = Some(tag.key.clone());
        self.generation = tag.generation;
        self.pending = true;
        debug!(selection = %tag.key, generation = tag.generation, "selection applied to form");
        self.refresh();
    }

    /// Merge an accepted result. Staleness must already have been checked.
    pub fn accept(&mut self, result: &DiscoveryResult) {
        let reconciliation = self.profile.reconcile(result);
        self.banner = reconciliation.banner;
        for (field, value) in reconciliation.values {
            self.fields.entry(field).or_default().value = value;
        }
        for (field, value) in reconciliation.defaults {
            let state = self.fields.entry(field).or_default();
            if state.value.as_deref().is_none_or(str::is_empty) {
                state.value = Some(value);
            }
        }
        self.capabilities = Some(result.capabilities());
        self.pending = false;
        info!(
            selection = %result.tag.key,
            generation = result.tag.generation,
            banner = ?self.banner.kind,
            "discovery result applied"
        );
        self.refresh();
    }

    /// Leave the pending state without a result, keeping dependent fields empty.
    pub fn abandon_pending(&mut self) {
        self.pending = false;
        self.refresh();
    }

    pub fn set_value(&mut self, field: &str, value: Option<String>) -> Result<(), ProjectorError> {
        if field == self.profile.selection_field() {
            return Err(ProjectorError::SelectionField(field.to_string()));
        }
        let Some(state) = self.fields.get_mut(field) else {
            return Err(ProjectorError::UnknownField(field.to_string()));
        };
        state.value = value;
        self.refresh();
        Ok(())
    }

    pub fn options_for(&self, field: &str) -> Option<&[FieldOption]> {
        self.meta.get(field).and_then(|meta| meta.options.as_deref())
    }

    /// Validate `candidate` for `field` against the active option list.
    pub fn validate(&self, field: &str, candidate: Option<&str>) -> Option<String> {
        let meta = self.meta.get(field)?;
        let messages = self.profile.messages();
        let Some(value) = candidate.filter(|value| !value.is_empty()) else {
            return meta.required.then(|| messages.validation_required_error.clone());
        };
        if meta.options.is_some() && !meta.advisory {
            if meta.discovery_backed && self.pending {
                return Some(messages.validation_pending_error.clone());
            }
            if !meta.offers(value) {
                return Some(messages.validation_required_error.clone());
            }
        }
        self.profile.validate(field, value, &self.input())
    }

    pub fn snapshot(&self) -> FormSnapshot {
        let mut snapshot = FormSnapshot {
            selection: self.selection.clone(),
            generation: self.generation,
            pending: self.pending,
            banner: self.banner.clone(),
            notices: self.notices.clone(),
            ..FormSnapshot::default()
        };
        for (id, state) in &self.fields {
            if let Some(value) = &state.value {
                snapshot.field_values.insert(id.clone(), value.clone());
            }
            if let Some(error) = &state.error {
                snapshot.field_errors.insert(id.clone(), error.clone());
            }
            if let Some(options) = &state.options {
                snapshot.field_options.insert(id.clone(), options.clone());
            }
            if !state.visible {
                snapshot.hidden_fields.push(id.clone());
            }
        }
        snapshot
    }

    pub fn teardown(&mut self) {
        self.selection = None;
        self.banner = ErrorBanner::none();
        self.capabilities = None;
        self.pending = false;
        self.reset_fields();
        self.refresh();
    }

    fn reset_fields(&mut self) {
        let initial = self.profile.initial_values();
        self.fields = self
            .profile
            .field_order()
            .into_iter()
            .map(|id| {
                let value = initial.get(&id).cloned();
                (id, FieldState { value, ..FieldState::default() })
            })
            .collect();
    }

    fn input(&self) -> ProjectionInput<'_> {
        ProjectionInput {
            selection: self.selection.as_ref(),
            capabilities: self.capabilities.as_ref(),
            fields: &self.fields,
            banner: &self.banner,
            pending: self.pending,
        }
    }

    fn refresh(&mut self) {
        let projection = self.profile.project(&self.input());
        let order = self.profile.field_order();
        self.fields
            .retain(|id, _| order.contains(id) || projection.fields.contains_key(id));
        for (id, meta) in &projection.fields {
            let state = self.fields.entry(id.clone()).or_default();
            state.options = meta.options.clone();
            state.visible = meta.visible;
            state.placeholder = meta.placeholder.clone();
        }
        self.meta = projection.fields;
        self.notices = projection.notices;

        let errors: Vec<(String, Option<String>)> = self
            .fields
            .iter()
            .map(|(id, state)| {
                let error = state
                    .value
                    .as_deref()
                    .filter(|value| !value.is_empty())
                    .and_then(|value| self.validate(id, Some(value)));
                (id.clone(), error)
            })
            .collect();
        for (id, error) in errors {
            if let Some(state) = self.fields.get_mut(&id) {
                state.error = error;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldscout_types::{BannerKind, LookupStage, PipelineKind, StageData, StageKind, StorageItem};

    /// Minimal profile: `source` selects, `item` is discovery-backed, `note` is free-form.
    struct ItemsProfile {
        messages: MessageCatalog,
    }

    impl FormProfile for ItemsProfile {
        fn selection_field(&self) -> &str {
            "source"
        }

        fn field_order(&self) -> Vec<String> {
            vec!["source".into(), "item".into(), "note".into()]
        }

        fn is_dependent(&self, field: &str) -> bool {
            field == "item"
        }

        fn reconcile(&self, result: &DiscoveryResult) -> Reconciliation {
            let mut reconciliation = Reconciliation::default();
            if result.stage(&StageKind::BlobContainers).is_none_or(|stage| stage.items().is_empty()) {
                reconciliation.banner = ErrorBanner::new(BannerKind::EmptyResult, "nothing");
            }
            reconciliation
        }

        fn project(&self, input: &ProjectionInput<'_>) -> Projection {
            let items = match input.capabilities {
                Some(CapabilitySet::Storage(capabilities)) => {
                    capabilities.blob_containers.iter().map(|item| FieldOption::new(item.name.clone())).collect()
                }
                _ => Vec::new(),
            };
            let mut fields = IndexMap::new();
            fields.insert("source".into(), FieldProjection::choice(vec![FieldOption::new("a"), FieldOption::new("b")], true));
            fields.insert("item".into(), FieldProjection::choice(items, true).discovered());
            fields.insert("note".into(), FieldProjection::free_form(false));
            Projection {
                fields,
                notices: Vec::new(),
            }
        }

        fn messages(&self) -> &MessageCatalog {
            &self.messages
        }
    }

    fn projector() -> FormStateProjector<ItemsProfile> {
        FormStateProjector::new(ItemsProfile {
            messages: MessageCatalog::default(),
        })
    }

    fn result(tag: &GenerationTag, names: &[&str]) -> DiscoveryResult {
        DiscoveryResult::new(
            PipelineKind::Storage,
            tag.clone(),
            vec![LookupStage::succeeded(
                StageKind::BlobContainers,
                StageData::Items(names.iter().map(|name| StorageItem::named(*name)).collect()),
            )],
        )
    }

    #[test]
    fn pending_discovery_invalidates_backed_fields() {
        let mut projector = projector();
        let tag = GenerationTag::new("a".into(), 1);
        projector.begin_selection(&tag);
        assert_eq!(projector.validate("item", Some("c1")), Some(MessageCatalog::default().validation_pending_error));

        projector.accept(&result(&tag, &["c1"]));
        assert_eq!(projector.validate("item", Some("c1")), None);
        assert_eq!(projector.validate("item", Some("zz")), Some(MessageCatalog::default().validation_required_error));
    }

    #[test]
    fn new_selection_clears_dependents_but_keeps_user_fields() {
        let mut projector = projector();
        let first = GenerationTag::new("a".into(), 1);
        projector.begin_selection(&first);
        projector.accept(&result(&first, &[]));
        assert!(projector.banner().is_active());
        projector.set_value("note", Some("mine".into())).expect("note");
        projector.set_value("item", Some("c1".into())).expect("item");
        assert!(projector.snapshot().field_errors.contains_key("item"));

        projector.begin_selection(&GenerationTag::new("b".into(), 2));
        let snapshot = projector.snapshot();
        assert!(!snapshot.banner.is_active());
        assert_eq!(snapshot.field_values.get("note").map(String::as_str), Some("mine"));
        assert_eq!(snapshot.field_values.get("source").map(String::as_str), Some("b"));
        assert!(!snapshot.field_values.contains_key("item"));
        assert!(snapshot.pending);
    }

    #[test]
    fn edits_are_checked() {
        let mut projector = projector();
        assert_eq!(
            projector.set_value("source", Some("b".into())),
            Err(ProjectorError::SelectionField("source".into()))
        );
        assert_eq!(projector.set_value("other", None), Err(ProjectorError::UnknownField("other".into())));
    }

    #[test]
    fn teardown_restores_initial_state() {
        let mut projector = projector();
        let tag = GenerationTag::new("a".into(), 1);
        projector.begin_selection(&tag);
        projector.accept(&result(&tag, &["c1"]));
        projector.teardown();
        let snapshot = projector.snapshot();
        assert!(snapshot.selection.is_none());
        assert!(snapshot.field_values.is_empty());
        assert_eq!(snapshot.field_options.get("item").map(Vec::len), Some(0));
    }
}

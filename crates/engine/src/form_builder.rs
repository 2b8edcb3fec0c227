//! Typed field descriptors for the settings a function template prompts for.

use fieldscout_types::{BindingDefinition, FieldOption, FunctionTemplate, SettingValue};
use heck::ToTitleCase;
use serde_json::Value;

use crate::fallback::filter_binding_settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    Choice(Vec<FieldOption>),
    ResourcePicker { resource_type: String, allow_create: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// `{binding_id}.{setting}`.
    pub id: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default_value: Option<String>,
    pub help: Option<String>,
}

/// Builds one descriptor per prompted setting of the discovered bindings.
pub struct FunctionFormBuilder<'a> {
    template: &'a FunctionTemplate,
    bindings: &'a [BindingDefinition],
    allow_create: bool,
}

impl<'a> FunctionFormBuilder<'a> {
    pub fn new(template: &'a FunctionTemplate, bindings: &'a [BindingDefinition]) -> Self {
        Self {
            template,
            bindings,
            allow_create: false,
        }
    }

    /// Resource pickers offer "create new" only with write access to the resource group.
    pub fn allow_create(mut self, allow_create: bool) -> Self {
        self.allow_create = allow_create;
        self
    }

    pub fn build(&self) -> Vec<FieldDescriptor> {
        filter_binding_settings(self.bindings, &self.template.user_prompt)
            .iter()
            .flat_map(|binding| {
                let binding_id = binding.binding_id();
                binding
                    .settings
                    .iter()
                    .map(|setting| {
                        let kind = match &setting.value {
                            SettingValue::String => FieldKind::Text,
                            SettingValue::Int => FieldKind::Integer,
                            SettingValue::Boolean => FieldKind::Boolean,
                            SettingValue::Enum { options } => FieldKind::Choice(
                                options
                                    .iter()
                                    .map(|option| {
                                        FieldOption::with_text(&option.value, option.display.as_deref().unwrap_or(&option.value))
                                    })
                                    .collect(),
                            ),
                            SettingValue::Resource { resource_type } => FieldKind::ResourcePicker {
                                resource_type: resource_type.clone(),
                                allow_create: self.allow_create,
                            },
                        };
                        FieldDescriptor {
                            id: format!("{binding_id}.{}", setting.name),
                            label: setting.label.clone().unwrap_or_else(|| setting.name.to_title_case()),
                            kind,
                            required: setting.required,
                            default_value: self
                                .template_default(&binding_id, &setting.name)
                                .or_else(|| setting.default_value.as_ref().and_then(render_value)),
                            help: setting.help.clone(),
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Value the template itself carries for a setting, if any.
    fn template_default(&self, binding_id: &str, setting: &str) -> Option<String> {
        self.template
            .bindings
            .iter()
            .filter(|binding| binding.binding_id() == binding_id && binding.declares(setting))
            .find_map(|binding| binding.properties.get(setting).and_then(render_value))
    }
}

fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) if text.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> FunctionTemplate {
        serde_json::from_str(
            r#"{
                "id": "BlobTrigger",
                "name": "Blob trigger",
                "bindings": [{"type": "blobTrigger", "direction": "in", "name": "blob", "path": "samples/{name}", "connection": ""}],
                "userPrompt": ["connection", "path", "useMonitor"]
            }"#,
        )
        .expect("template")
    }

    fn binding() -> BindingDefinition {
        serde_json::from_str(
            r#"{
                "type": "blobTrigger",
                "direction": "trigger",
                "settings": [
                    {"name": "path", "value": "string", "required": true, "defaultValue": "container/{name}"},
                    {"name": "connection", "value": "resource", "resourceType": "Storage", "required": true},
                    {"name": "accessRights", "value": "enum", "enum": [{"value": "Read", "display": "Read only"}]},
                    {"name": "useMonitor", "value": "boolean", "label": "Monitor", "defaultValue": true}
                ]
            }"#,
        )
        .expect("binding")
    }

    #[test]
    fn builds_prompted_settings_in_order() {
        let template = template();
        let bindings = [binding()];
        let fields = FunctionFormBuilder::new(&template, &bindings).allow_create(true).build();
        let ids: Vec<&str> = fields.iter().map(|field| field.id.as_str()).collect();
        assert_eq!(ids, vec!["blobTrigger-trigger.path", "blobTrigger-trigger.connection", "blobTrigger-trigger.useMonitor"]);

        assert_eq!(fields[0].default_value.as_deref(), Some("samples/{name}"));
        assert_eq!(fields[0].label, "Path");
        assert_eq!(
            fields[1].kind,
            FieldKind::ResourcePicker {
                resource_type: "Storage".into(),
                allow_create: true,
            }
        );
        assert_eq!(fields[1].default_value, None);
        assert_eq!(fields[2].kind, FieldKind::Boolean);
        assert_eq!(fields[2].label, "Monitor");
        assert_eq!(fields[2].default_value.as_deref(), Some("true"));
    }

    #[test]
    fn enum_settings_become_choices() {
        let mut template = template();
        template.user_prompt.push("accessRights".into());
        let bindings = [binding()];
        let fields = FunctionFormBuilder::new(&template, &bindings).build();
        let access = fields.iter().find(|field| field.id.ends_with("accessRights")).expect("access rights");
        assert_eq!(access.kind, FieldKind::Choice(vec![FieldOption::with_text("Read", "Read only")]));
    }
}

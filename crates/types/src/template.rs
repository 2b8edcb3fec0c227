//! Function creation templates and binding schemas.
//!
//! Templates declare their bindings loosely (arbitrary keys per binding), while
//! binding definitions fetched from the host describe every configurable setting
//! with a typed value kind.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function creation template from the template catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionTemplate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub default_function_name: Option<String>,
    #[serde(default)]
    pub bindings: Vec<TemplateBinding>,
    /// Setting names the user must be prompted for at creation time.
    #[serde(default)]
    pub user_prompt: Vec<String>,
}

/// One binding entry inside a template's `function.json`-style binding list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateBinding {
    pub r#type: String,
    #[serde(default = "default_declared_direction")]
    pub direction: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub properties: IndexMap<String, Value>,
}

fn default_declared_direction() -> String {
    "in".into()
}

impl TemplateBinding {
    /// Direction used to address the binding definition.
    ///
    /// Inbound bindings whose type ends in `Trigger` are triggers; anything
    /// not declared inbound is an output.
    pub fn direction(&self) -> BindingDirection {
        if self.direction.eq_ignore_ascii_case("in") {
            if self.r#type.to_ascii_lowercase().ends_with("trigger") {
                BindingDirection::Trigger
            } else {
                BindingDirection::In
            }
        } else {
            BindingDirection::Out
        }
    }

    /// Identifier of the binding definition (`<type>-<direction>`).
    pub fn binding_id(&self) -> String {
        format!("{}-{}", self.r#type, self.direction())
    }

    /// Whether this binding carries a truthy value for `key`.
    pub fn declares(&self, key: &str) -> bool {
        match key {
            "type" => !self.r#type.is_empty(),
            "direction" => !self.direction.is_empty(),
            "name" => !self.name.is_empty(),
            other => self.properties.get(other).is_some_and(is_truthy),
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingDirection {
    In,
    Out,
    Trigger,
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BindingDirection::In => "in",
            BindingDirection::Out => "out",
            BindingDirection::Trigger => "trigger",
        })
    }
}

/// Full definition of a binding as served by the function host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingDefinition {
    pub r#type: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub direction: BindingDirection,
    #[serde(default)]
    pub settings: Vec<BindingSetting>,
}

impl BindingDefinition {
    pub fn binding_id(&self) -> String {
        format!("{}-{}", self.r#type, self.direction)
    }
}

/// A configurable setting of a binding definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingSetting {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: Option<Value>,
    #[serde(flatten)]
    pub value: SettingValue,
}

/// Value kind of a binding setting, tagged by the `value` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "value", rename_all = "camelCase")]
pub enum SettingValue {
    String,
    Int,
    Boolean,
    Enum {
        #[serde(rename = "enum", default)]
        options: Vec<EnumOption>,
    },
    #[serde(rename_all = "camelCase")]
    Resource { resource_type: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub value: String,
    #[serde(default)]
    pub display: Option<String>,
}

/// An existing function on the target resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub properties: FunctionProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionProperties {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
}

impl FunctionRecord {
    /// Short function name; resource names come back as `<site>/<function>`.
    pub fn function_name(&self) -> &str {
        if let Some(name) = self.properties.name.as_deref() {
            return name;
        }
        self.name.rsplit('/').next().unwrap_or(self.name.as_str())
    }
}

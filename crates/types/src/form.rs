//! Form state published to the rendering layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::discovery::SelectionKey;

/// One choice in a field's option list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub key: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl FieldOption {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            text: key.clone(),
            key,
            disabled: false,
        }
    }

    pub fn with_text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: text.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Value, error, options and visibility of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldState {
    pub value: Option<String>,
    pub error: Option<String>,
    /// `None` for free-form fields that are not backed by discovery.
    pub options: Option<Vec<FieldOption>>,
    pub visible: bool,
    pub placeholder: Option<String>,
}

impl Default for FieldState {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            options: None,
            visible: true,
            placeholder: None,
        }
    }
}

impl FieldState {
    /// Whether `candidate` is an enabled entry of the option list.
    pub fn offers(&self, candidate: &str) -> bool {
        self.options
            .as_ref()
            .is_some_and(|options| options.iter().any(|option| option.key == candidate && !option.disabled))
    }
}

/// Classification of the single error area of a form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BannerKind {
    #[default]
    None,
    PartialFailure,
    EmptyResult,
    AccessDenied,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBanner {
    pub kind: BannerKind,
    pub message: Option<String>,
}

impl ErrorBanner {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(kind: BannerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: Some(message.into()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.kind != BannerKind::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// Non-blocking message shown alongside the form (for example a read-only warning).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub level: NoticeLevel,
    pub message: String,
    #[serde(default)]
    pub learn_more: Option<String>,
}

/// Read-only view of a form, re-evaluated on every selection and accepted result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot {
    pub selection: Option<SelectionKey>,
    pub generation: u64,
    pub pending: bool,
    pub field_values: IndexMap<String, String>,
    pub field_errors: IndexMap<String, String>,
    pub field_options: IndexMap<String, Vec<FieldOption>>,
    pub hidden_fields: Vec<String>,
    pub banner: ErrorBanner,
    pub notices: Vec<Notice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_options_are_not_offered() {
        let field = FieldState {
            options: Some(vec![FieldOption::new("a"), FieldOption::new("b").disabled(true)]),
            ..FieldState::default()
        };
        assert!(field.offers("a"));
        assert!(!field.offers("b"));
        assert!(!FieldState::default().offers("a"));
    }

    #[test]
    fn banner_serializes_camel_case() {
        let banner = ErrorBanner::new(BannerKind::PartialFailure, "boom");
        let json = serde_json::to_value(&banner).expect("json");
        assert_eq!(json["kind"], "partialFailure");
        assert!(banner.is_active());
        assert!(!ErrorBanner::none().is_active());
    }
}

//! Helpers shared by the fieldscout crates: secret redaction, error payload
//! rendering, resource-id scope handling and path utilities.

mod error_message;
mod http_path_resolution;
mod path_processing;
pub mod resource_id;

pub use error_message::error_message_or_stringify;
pub use http_path_resolution::build_path;
pub use path_processing::expand_tilde;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SENSITIVE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)(authorization: )([\w\-\.=:/+]+)",
        r"(?i)([A-Z0-9_]*?(KEY|TOKEN|SECRET|PASSWORD)=)([^\s;]+)",
        r#"(?i)("(?:accessKey|value|key)"\s*:\s*")([^"]+)"#,
        r"(?i)(AccountKey=)([^;\s]+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Redacts values that look like secrets in a string.
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in SENSITIVE_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |caps: &Captures| {
                let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}<redacted>")
            })
            .to_string();
    }
    redacted
}

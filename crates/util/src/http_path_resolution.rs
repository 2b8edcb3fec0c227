use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

/// Replace `{name}` placeholders in a path template with percent-encoded values.
///
/// Placeholders without a matching variable are left untouched.
pub fn build_path(template: &str, variables: &[(&str, &str)]) -> String {
    let mut path = template.to_string();
    for (name, value) in variables {
        let encoded = utf8_percent_encode(value, NON_ALPHANUMERIC).to_string();
        path = path.replace(&format!("{{{name}}}"), &encoded);
    }
    path
}

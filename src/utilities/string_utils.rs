//! String utility functions.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_\-]*)\}").unwrap());

/// Number of whitespace-separated words in `text`.
///
/// The speaking-rate estimate is word-based, so punctuation attached to a
/// word does not count separately.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Interpolate `{variable}` placeholders in a template.
///
/// Only placeholders matching `{variable_name}` (letter/underscore start,
/// alphanumeric/underscore/hyphen body) are touched, so JSON braces inside a
/// template survive untouched.
///
/// # Errors
/// Returns an error naming the first placeholder with no matching input.
pub fn interpolate_only(
    template: &str,
    inputs: &HashMap<String, String>,
) -> Result<String, String> {
    if !template.contains('{') {
        return Ok(template.to_string());
    }

    let variables: Vec<String> = VARIABLE_PATTERN
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect();

    if let Some(missing) = variables.iter().find(|v| !inputs.contains_key(*v)) {
        return Err(format!(
            "Template variable '{missing}' not found in inputs dictionary"
        ));
    }

    let mut result = template.to_string();
    for variable in &variables {
        if let Some(value) = inputs.get(variable) {
            result = result.replace(&format!("{{{variable}}}"), value);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("Take a deep breath in."), 5);
        assert_eq!(word_count("  "), 0);
    }

    #[test]
    fn test_interpolate_basic() {
        let mut inputs = HashMap::new();
        inputs.insert("theme".to_string(), "clarity".to_string());
        inputs.insert("duration".to_string(), "10".to_string());
        let result =
            interpolate_only("A {duration}-minute meditation on {theme}.", &inputs).unwrap();
        assert_eq!(result, "A 10-minute meditation on clarity.");
    }

    #[test]
    fn test_interpolate_missing_variable() {
        let inputs = HashMap::new();
        let result = interpolate_only("Focus on {theme}.", &inputs);
        assert!(result.unwrap_err().contains("theme"));
    }

    #[test]
    fn test_interpolate_leaves_json_braces() {
        let mut inputs = HashMap::new();
        inputs.insert("theme".to_string(), "calm".to_string());
        let template = r#"Return {"theme": "{theme}", "segments": []}"#;
        let result = interpolate_only(template, &inputs).unwrap();
        assert_eq!(result, r#"Return {"theme": "calm", "segments": []}"#);
    }
}

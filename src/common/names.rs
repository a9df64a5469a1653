use once_cell::sync::Lazy;
use regex::Regex;

use crate::avro::Field;

static INVALID_NAME_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_]").unwrap());
static INVALID_NAMESPACE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_\.]").unwrap());
static UPPER_WORDS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][a-z0-9_]*\.?").unwrap());
static MIXED_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-z0-9]+\.?|[A-Z][a-z0-9_]*\.?").unwrap());

/// Convert a raw string into a valid Avro name.
///
/// Ensures the identifier starts with a letter or underscore,
/// replaces invalid characters with `_`, and prefixes leading digits.
pub fn avro_name(name: &str) -> String {
    let mut val = INVALID_NAME_CHARS.replace_all(name, "_").to_string();
    if val.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        val = format!("_{}", val);
    }
    if val.is_empty() || !val.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        val = format!("_{}", val);
    }
    val
}

/// Convert a name and return both normalized + altname if they differ.
pub fn avro_name_with_altname(name: &str) -> (String, Option<String>) {
    let normalized = avro_name(name);
    if normalized != name {
        (normalized, Some(name.to_string()))
    } else {
        (normalized, None)
    }
}

/// Convert an input string into a valid Avro namespace.
///
/// Replaces invalid chars with `_` but preserves dots as separators.
/// Prefixes with `_` if starting with a digit.
pub fn avro_namespace(name: &str) -> String {
    let mut val = INVALID_NAMESPACE_CHARS.replace_all(name, "_").to_string();
    if val.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
        val = format!("_{}", val);
    }
    val
}

/// Convert string to PascalCase.
pub fn pascal(input: &str) -> String {
    if input.contains('.') {
        return input.split('.').map(pascal).collect::<Vec<_>>().join(".");
    }
    if input.is_empty() {
        return input.to_string();
    }

    let startswith_under = input.starts_with('_');
    let words: Vec<String> = if input.contains('_') {
        input.split('_').map(|w| w.to_string()).collect()
    } else if input.starts_with(|c: char| c.is_uppercase()) {
        UPPER_WORDS
            .find_iter(input)
            .map(|m| m.as_str().to_string())
            .collect()
    } else {
        MIXED_WORDS
            .find_iter(input)
            .map(|m| m.as_str().to_string())
            .collect()
    };

    let mut result = words.into_iter().map(|w| capitalize(&w)).collect::<String>();
    if startswith_under {
        result = format!("_{}", result);
    }
    result
}

/// Capitalize first letter
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

/// Avro type name for a JSON key: sanitized, then PascalCased.
pub fn type_name_for(key: &str) -> String {
    let name = pascal(&avro_name(key));
    if name.is_empty() || name == "_" {
        "_".to_string()
    } else {
        avro_name(&name)
    }
}

/// Get an alternate name for a field, falling back to its Avro name.
pub fn altname<'a>(field: &'a Field, purpose: &str) -> &'a str {
    field
        .altnames
        .get(purpose)
        .map(String::as_str)
        .unwrap_or(&field.name)
}

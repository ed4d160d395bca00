use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{Result, TmxError};

/// Language code utilities
///
/// TMX language codes follow the BCP 47 shape (`en`, `pt-BR`, `zh-Hant-TW`,
/// `x-klingon`). Every dynamic column name in the store is derived here, so
/// the mapping from codes to columns has one place to test.

// @const: primary subtag plus hyphen-separated alphanumeric subtags
static LANGUAGE_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]{1,8}(-[A-Za-z0-9]{1,8})*$").unwrap()
});

/// Check a language code against the tag grammar
pub fn is_valid_language_code(code: &str) -> bool {
    LANGUAGE_TAG_REGEX.is_match(code)
}

/// Validate a language code, returning it trimmed
pub fn validate_language_code(code: &str) -> Result<String> {
    let trimmed = code.trim();
    if is_valid_language_code(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(TmxError::InvalidLanguage(code.to_string()))
    }
}

/// Two codes name the same language when they differ only by case
pub fn language_codes_match(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Column stem for a language code.
///
/// Case-folded, every non-alphanumeric character mapped to `_`, prefixed with
/// `l_` so the result never starts with a digit or clashes with a keyword.
/// `attempt` > 0 appends a suffix for codes whose stem is already taken by a
/// different code.
pub fn column_name(code: &str, attempt: usize) -> String {
    let mut name = String::with_capacity(code.len() + 4);
    name.push_str("l_");
    for c in code.chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else {
            name.push('_');
        }
    }
    if attempt > 0 {
        name.push_str(&format!("_{}", attempt));
    }
    name
}

/// Count whitespace-separated words, used by corpus statistics
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/*!
 * Query parameters and text matching.
 *
 * `UnitQuery` is what callers send; `Selection` is the validated form that
 * backends execute. `TextMatcher` is shared by the SQL predicate, the
 * in-memory filter, highlighting and text replacement so all four agree on
 * what a match is.
 */

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::errors::Result;

/// Parameters of a paginated unit listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UnitQuery {
    /// 0-based offset into the filtered result
    pub start: usize,
    /// Maximum number of rows
    pub count: usize,
    pub filter_text: String,
    pub filter_language: String,
    pub case_sensitive: bool,
    pub filter_untranslated: bool,
    #[serde(rename = "regExp")]
    pub regexp: bool,
    pub filter_src_language: String,
    pub sort_language: String,
    pub ascending: bool,
}

impl Default for UnitQuery {
    fn default() -> Self {
        Self {
            start: 0,
            count: 200,
            filter_text: String::new(),
            filter_language: String::new(),
            case_sensitive: false,
            filter_untranslated: false,
            regexp: false,
            filter_src_language: String::new(),
            sort_language: String::new(),
            ascending: true,
        }
    }
}

impl UnitQuery {
    /// Page of units in document order without filters
    pub fn page(start: usize, count: usize) -> Self {
        Self {
            start,
            count,
            ..Default::default()
        }
    }

    /// Builder: substring or regex filter on one language
    pub fn with_filter(mut self, language: &str, text: &str, case_sensitive: bool, regexp: bool) -> Self {
        self.filter_language = language.to_string();
        self.filter_text = text.to_string();
        self.case_sensitive = case_sensitive;
        self.regexp = regexp;
        self
    }

    /// Builder: keep only units untranslated with respect to `source`
    pub fn untranslated(mut self, source: &str) -> Self {
        self.filter_untranslated = true;
        self.filter_src_language = source.to_string();
        self
    }

    /// Builder: sort by a language's pure text
    pub fn sorted_by(mut self, language: &str, ascending: bool) -> Self {
        self.sort_language = language.to_string();
        self.ascending = ascending;
        self
    }
}

/// How to find text inside pure-text projections
#[derive(Debug, Clone)]
pub enum TextMatcher {
    /// Case-sensitive substring
    Literal(String),
    /// Regular expression, also used for case-insensitive substrings
    Pattern(Regex),
}

impl TextMatcher {
    /// Compile a matcher; malformed regular expressions are rejected here
    pub fn new(text: &str, case_sensitive: bool, regexp: bool) -> Result<Self> {
        if regexp {
            let pattern = if case_sensitive {
                text.to_string()
            } else {
                format!("(?i){}", text)
            };
            return Ok(Self::Pattern(Regex::new(&pattern)?));
        }
        if case_sensitive {
            Ok(Self::Literal(text.to_string()))
        } else {
            Ok(Self::Pattern(Regex::new(&format!(
                "(?i){}",
                regex::escape(text)
            ))?))
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Literal(needle) => text.contains(needle.as_str()),
            Self::Pattern(regex) => regex.is_match(text),
        }
    }

    /// Byte ranges of non-empty matches, in order
    pub fn find_ranges(&self, text: &str) -> Vec<Range<usize>> {
        match self {
            Self::Literal(needle) if needle.is_empty() => Vec::new(),
            Self::Literal(needle) => text
                .match_indices(needle.as_str())
                .map(|(start, m)| start..start + m.len())
                .collect(),
            Self::Pattern(regex) => regex
                .find_iter(text)
                .filter(|m| !m.is_empty())
                .map(|m| m.range())
                .collect(),
        }
    }

    /// Replace every match; regex replacements may use `$1` group references
    pub fn replace_all(&self, text: &str, replacement: &str) -> String {
        match self {
            Self::Literal(needle) if needle.is_empty() => text.to_string(),
            Self::Literal(needle) => text.replace(needle.as_str(), replacement),
            Self::Pattern(regex) => regex.replace_all(text, replacement).into_owned(),
        }
    }

    /// SQL predicate over `column` plus the value to bind for it
    pub fn sql_predicate(&self, column: &str) -> (String, String) {
        match self {
            Self::Literal(needle) => (format!("instr({}, ?) > 0", column), needle.clone()),
            Self::Pattern(regex) => (format!("{} REGEXP ?", column), regex.as_str().to_string()),
        }
    }
}

/// Validated text filter on one language
#[derive(Debug, Clone)]
pub struct TextFilter {
    pub language: String,
    pub matcher: TextMatcher,
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    /// By position
    Document { ascending: bool },
    /// By a language's pure text, ties broken by position
    Language { language: String, ascending: bool },
}

/// What a backend should select, in the order filters apply
#[derive(Debug, Clone)]
pub struct Selection {
    pub untranslated_source: Option<String>,
    pub filter: Option<TextFilter>,
    pub order: Order,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Selection {
    /// Every unit in document order
    pub fn all() -> Self {
        Self {
            untranslated_source: None,
            filter: None,
            order: Order::Document { ascending: true },
            offset: 0,
            limit: None,
        }
    }

    /// Every unit sorted by a language
    pub fn sorted_by(language: &str) -> Self {
        Self {
            order: Order::Language {
                language: language.to_string(),
                ascending: true,
            },
            ..Self::all()
        }
    }

    /// Units untranslated with respect to `source`
    pub fn untranslated(source: &str) -> Self {
        Self {
            untranslated_source: Some(source.to_string()),
            ..Self::all()
        }
    }

    /// Units whose `language` text matches
    pub fn matching(language: &str, matcher: TextMatcher) -> Self {
        Self {
            filter: Some(TextFilter {
                language: language.to_string(),
                matcher,
            }),
            ..Self::all()
        }
    }
}

/*!
 * Error types for the tmxstore library.
 *
 * Every fallible store operation returns `TmxError`, grouped the way callers
 * need to react to them: ingestion problems, query problems, storage failures
 * and consistency errors (no corpus open, corpus closing).
 */

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, TmxError>;

/// Errors raised by the translation unit store and its collaborators
#[derive(Error, Debug)]
pub enum TmxError {
    /// XML could not be tokenized
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML was well-formed but not a usable TMX structure
    #[error("Malformed TMX: {0}")]
    Malformed(String),

    /// A filter or replace pattern is not a valid regular expression
    #[error("Invalid regular expression: {0}")]
    InvalidRegex(#[from] regex::Error),

    /// A language code that the corpus does not contain
    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    /// A language code that does not follow the language tag grammar
    #[error("Invalid language code: {0:?}")]
    InvalidLanguage(String),

    /// A unit id that is not present in the store
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// A placeholder in edited text that the tag table does not know
    #[error("Unknown inline tag reference: {0}")]
    UnknownTag(String),

    /// Failure reported by SQLite
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Dynamic schema could not be changed
    #[error("Schema error: {0}")]
    Schema(String),

    /// File system failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No corpus is open
    #[error("No file is open")]
    NoStore,

    /// The corpus is being closed; writes are refused
    #[error("Store is closing")]
    Closing,

    /// The store is held by a background operation
    #[error("Store is busy with another operation")]
    Busy,
}

impl TmxError {
    /// True for errors caused by the caller's query rather than by storage
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRegex(_) | Self::UnknownLanguage(_) | Self::InvalidLanguage(_)
        )
    }
}

/// Maps attribute, encoding and escape failures from the XML layer
pub(crate) fn malformed<E: std::fmt::Display>(error: E) -> TmxError {
    TmxError::Malformed(error.to_string())
}

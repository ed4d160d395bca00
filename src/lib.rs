/*!
 * # tmxstore - Translation Memory store and editor engine
 *
 * A Rust library for loading, querying, editing and cleaning TMX translation
 * memories too large to keep in memory.
 *
 * ## Features
 *
 * - Streaming TMX ingestion with chunked commits
 * - SQLite-backed store with one pair of columns per language
 * - Filtered, sorted and paginated unit queries with highlighted matches
 * - Editable display text where inline tags become numbered placeholders
 * - Corpus cleaning: duplicates, untranslated units, same-as-source variants,
 *   whitespace, inline tags and unit consolidation
 * - Language rename, addition and removal
 * - TMX save, filtered export, split and merge
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `model`: Segments, units, variants and the header
 * - `xml`: Streaming TMX reader and writer
 * - `store`: The unit store and its backends:
 *   - `store::sqlite`: SQLite backend with the dynamic language schema
 *   - `store::memory`: In-memory backend
 *   - `store::display`: Placeholder rendering and resolution
 *   - `store::batch`: Corpus-wide cleaning operations
 * - `ingest`: Reader thread and chunked loading
 * - `session`: Background tasks over the open store
 * - `tools`: File split and merge
 * - `language_utils`: Language code utilities
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod errors;
pub mod ingest;
pub mod language_utils;
pub mod model;
pub mod session;
pub mod store;
pub mod tools;
pub mod xml;

// Re-export main types for easier usage
pub use app_config::{Config, StoreConfig};
pub use errors::{Result, TmxError};
pub use ingest::{IngestReport, load_file};
pub use model::{Header, Segment, TranslationUnit, TranslationUnitVariant};
pub use session::{Session, TaskKind, TaskStatus};
pub use store::{MemoryBackend, SqliteBackend, Statistics, Store, UnitQuery, UnitView};
pub use tools::{merge_files, split_file};

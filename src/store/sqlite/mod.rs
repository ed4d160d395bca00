/*!
 * SQLite-backed storage with a per-language dynamic schema.
 */

pub mod connection;
pub mod repository;
pub mod schema;

pub use connection::{DatabaseConnection, DatabaseStats};
pub use repository::SqliteBackend;
pub use schema::SchemaRegistry;

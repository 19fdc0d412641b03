//! Storage adapters implementing `LibrarianStore`.

pub mod sqlite;

pub use sqlite::SqliteLibrarianStore;

//! SQLite-backed persistence for the code-knowledge librarian's entity set:
//! files, functions, modules, graph edges, universal knowledge records,
//! context packs and feedback records.

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::{FileReplacement, LibrarianStore};
pub use error::{Result, StorageError};
pub use infrastructure::SqliteLibrarianStore;

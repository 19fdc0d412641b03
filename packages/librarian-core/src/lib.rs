//! Domain model, generation pipeline and driven ports for the code-knowledge
//! librarian: extracting structural and semantic knowledge from a source
//! repository into a queryable record set.

pub mod config;
pub mod defeater;
pub mod error;
pub mod generator;
pub mod governor;
pub mod model;
pub mod ports;

pub use error::{CoreError, Result};

//! Shared data model for persisted Strand string tables.

pub mod defs;
pub mod validate;

pub use defs::*;
pub use validate::{ValidationError, validate_table};

//! Internal failure taxonomy for string operations.
//!
//! Script-facing operations never surface these: a failed string statement
//! must not stop the program that issued it. They exist so the engine can
//! bail out early with `?` and log why a statement did nothing.

use thiserror::Error;

use crate::entry::CapacityError;
use crate::version::FormatVersion;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StringError {
    #[error("malformed offset, size or index suffix")]
    Format,
    #[error("offset or index outside the string")]
    Bounds,
    #[error("not supported by world format {0}")]
    Unsupported(FormatVersion),
    #[error(transparent)]
    Capacity(#[from] CapacityError),
    #[error("operation not allowed: {0}")]
    Restricted(&'static str),
    #[error("{0} is not available")]
    Unavailable(&'static str),
}

pub type StringResult<T> = Result<T, StringError>;

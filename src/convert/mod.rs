// src/convert/mod.rs

//! Conversions between [`Value`](crate::types::Value)s and what a process
//! consumes or produces.
//!
//! - [`cmdline`] turns values into command-line tokens.
//! - [`bytes`] turns values into file/stdin content and stream or file
//!   content back into values.

pub mod bytes;
pub mod cmdline;

use thiserror::Error;

use crate::types::ValueKind;

pub use bytes::{value_from_bytes, value_from_exit_code, value_to_bytes};
pub use cmdline::{CommandLineArgument, path_tokens};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("expected a {expected} value, got {actual}")]
    WrongKind {
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("{0} values have no byte representation")]
    NoByteForm(ValueKind),

    #[error("{0}")]
    Invalid(String),

    #[error("content is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// src/cache/recreator.rs

use crate::convert::{ConversionError, value_from_bytes, value_from_exit_code};
use crate::types::{Value, ValueKind};

/// Rebuilds a previously produced output from what was stored.
///
/// Recreating is a pure function of the stored data, so calling
/// [`Recreator::recreate`] twice yields equal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Recreator {
    /// Raw bytes read from a stream or file, plus the kind they decode to.
    FromBytes { kind: ValueKind, bytes: Vec<u8> },
    FromExitCode(i32),
}

impl Recreator {
    pub fn produced_kind(&self) -> ValueKind {
        match self {
            Recreator::FromBytes { kind, .. } => *kind,
            Recreator::FromExitCode(_) => ValueKind::Integer,
        }
    }

    pub fn recreate(&self) -> Result<Value, ConversionError> {
        match self {
            Recreator::FromBytes { kind, bytes } => value_from_bytes(*kind, bytes),
            Recreator::FromExitCode(code) => Ok(value_from_exit_code(*code)),
        }
    }

    /// Approximate memory held by this recreator.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Recreator::FromBytes { bytes, .. } => bytes.len(),
            Recreator::FromExitCode(_) => std::mem::size_of::<i32>(),
        }
    }
}

// src/errors.rs

//! Crate-wide error types.
//!
//! [`JobError`] is what an invocation returns; every failure maps to exactly
//! one [`ErrorKind`]. [`DescriptorError`] and [`ConfigError`] are raised
//! while jobs are being registered, never during an invocation.

use thiserror::Error;

use crate::types::ValueKind;

/// External classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingParameter,
    InvalidParameterType,
    InvalidParameterValue,
    SandboxIo,
    NonEmptyStderr,
    NonZeroExitCode,
    InvalidOutputValue,
    ExecutionInterrupted,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("invalid type for parameter '{name}': expected {expected}, got {actual}")]
    InvalidParameterType {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("invalid value for parameter '{name}': {message}")]
    InvalidParameterValue { name: String, message: String },

    #[error("no cached result for key '{0}'")]
    CacheMiss(String),

    #[error("sandbox I/O failed while {action}: {reason}")]
    SandboxIo { action: String, reason: String },

    #[error("process reported an error on stderr: {0}")]
    NonEmptyStderr(String),

    #[error("process exited with code {0}")]
    NonZeroExitCode(i32),

    #[error("invalid value for output '{name}': {message}")]
    InvalidOutputValue { name: String, message: String },

    #[error("execution interrupted: {0}")]
    ExecutionInterrupted(String),
}

impl JobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JobError::MissingParameter(_) => ErrorKind::MissingParameter,
            JobError::InvalidParameterType { .. } => ErrorKind::InvalidParameterType,
            JobError::InvalidParameterValue { .. } | JobError::CacheMiss(_) => {
                ErrorKind::InvalidParameterValue
            }
            JobError::SandboxIo { .. } => ErrorKind::SandboxIo,
            JobError::NonEmptyStderr(_) => ErrorKind::NonEmptyStderr,
            JobError::NonZeroExitCode(_) => ErrorKind::NonZeroExitCode,
            JobError::InvalidOutputValue { .. } => ErrorKind::InvalidOutputValue,
            JobError::ExecutionInterrupted(_) => ErrorKind::ExecutionInterrupted,
        }
    }

    pub(crate) fn sandbox_io(action: impl Into<String>, reason: impl ToString) -> Self {
        JobError::SandboxIo {
            action: action.into(),
            reason: reason.to_string(),
        }
    }
}

/// Illegal descriptor detected while a job is being constructed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DescriptorError {
    #[error("duplicate {direction} name '{name}'")]
    DuplicateName {
        direction: &'static str,
        name: String,
    },

    #[error("input '{name}': {reason}")]
    IllegalInput { name: String, reason: String },

    #[error("output '{name}': {reason}")]
    IllegalOutput { name: String, reason: String },

    #[error("job '{name}': {reason}")]
    IllegalJob { name: String, reason: String },
}

impl DescriptorError {
    pub(crate) fn input(name: &str, reason: impl Into<String>) -> Self {
        DescriptorError::IllegalInput {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn output(name: &str, reason: impl Into<String>) -> Self {
        DescriptorError::IllegalOutput {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors while loading a job file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

pub type Result<T> = std::result::Result<T, JobError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_miss_is_classified_as_invalid_value() {
        let err = JobError::CacheMiss("abc".into());
        assert_eq!(err.kind(), ErrorKind::InvalidParameterValue);
        assert_eq!(err.to_string(), "no cached result for key 'abc'");
    }
}

// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::RawJobFile;
use crate::descriptor::JobDescriptor;
use crate::errors::ConfigResult;

/// Load a job file and return the raw `RawJobFile`.
///
/// This only performs TOML deserialization; descriptor rules are checked by
/// [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<RawJobFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    load_from_str(&contents)
}

pub fn load_from_str(contents: &str) -> ConfigResult<RawJobFile> {
    let job: RawJobFile = toml::from_str(contents)?;
    Ok(job)
}

/// Load a job file and turn it into a `JobDescriptor`.
///
/// - Reads TOML.
/// - Resolves value types, handlers and schemas.
/// - Builds every input and output through the descriptor factory, so the
///   same construction rules apply as for code-built jobs.
pub fn load_and_validate(path: impl AsRef<Path>) -> ConfigResult<JobDescriptor> {
    let raw = load_from_path(path)?;
    JobDescriptor::try_from(raw)
}

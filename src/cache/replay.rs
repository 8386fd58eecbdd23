// src/cache/replay.rs

//! Cache replay: serve stored outputs without running the job again.
//!
//! Stored values are trusted; validators are not applied a second time.

use tracing::info;

use crate::cache::{CacheStore, Recreator};
use crate::errors::{JobError, Result};
use crate::types::{OutputMap, Value, ValueKind};

pub const CACHE_KEY_PARAMETER: &str = "cache-key";
pub const OUTPUT_NAME_PARAMETER: &str = "output-name";

fn recreate(name: &str, recreator: &Recreator) -> Result<Value> {
    recreator.recreate().map_err(|e| JobError::InvalidOutputValue {
        name: name.to_string(),
        message: format!("stored value cannot be recreated: {e}"),
    })
}

/// Recreate every output stored under `key`, under its original name.
pub fn replay_all(cache: &dyn CacheStore, key: &str) -> Result<OutputMap> {
    let entry = cache
        .get_cached_result(key)
        .ok_or_else(|| JobError::CacheMiss(key.to_string()))?;

    info!(cache_key = %key, outputs = entry.len(), "replaying cached outputs");

    entry
        .iter()
        .map(|(name, recreator)| Ok((name.clone(), recreate(name, recreator)?)))
        .collect()
}

/// Recreate a single output of the given kind.
///
/// When exactly one stored output has `kind` it is returned directly.
/// Otherwise `output_name` selects among the outputs of that kind.
pub fn replay_one(
    cache: &dyn CacheStore,
    key: &str,
    kind: ValueKind,
    output_name: Option<&str>,
) -> Result<Value> {
    let entry = cache
        .get_cached_result(key)
        .ok_or_else(|| JobError::CacheMiss(key.to_string()))?;

    let matching: Vec<(&String, &Recreator)> = entry
        .iter()
        .filter(|(_, recreator)| recreator.produced_kind() == kind)
        .collect();

    let (name, recreator) = match (matching.as_slice(), output_name) {
        ([], _) => {
            return Err(JobError::InvalidParameterValue {
                name: CACHE_KEY_PARAMETER.to_string(),
                message: format!("no cached output of type {kind} under key '{key}'"),
            });
        }
        ([single], _) => *single,
        (_, None) => {
            return Err(JobError::MissingParameter(OUTPUT_NAME_PARAMETER.to_string()));
        }
        (candidates, Some(wanted)) => candidates
            .iter()
            .find(|(name, _)| name.as_str() == wanted)
            .copied()
            .ok_or_else(|| JobError::InvalidParameterValue {
                name: OUTPUT_NAME_PARAMETER.to_string(),
                message: format!("no cached output '{wanted}' of type {kind}"),
            })?,
    };

    info!(cache_key = %key, output = %name, "replaying cached output");
    recreate(name, recreator)
}

// src/service.rs

//! Job invocation surface.
//!
//! This is what a calling layer (CLI, protocol adapter) talks to: job
//! introspection, cached execution and the two replay variants.

use tracing::{debug, info};

use crate::cache::{self, CacheEntry, CacheStore, InMemoryCache, compute_cache_key};
use crate::descriptor::JobDescriptor;
use crate::errors::{JobError, Result};
use crate::exec::context::ExecutionContextProvider;
use crate::exec::orchestrator::{Executor, realize_inputs};
use crate::types::{InputMap, OutputMap, Value, ValueKind};

pub fn list_input_names(job: &JobDescriptor) -> Vec<String> {
    job.input_names().into_iter().map(str::to_string).collect()
}

pub fn list_output_names(job: &JobDescriptor) -> Vec<String> {
    job.output_names().into_iter().map(str::to_string).collect()
}

pub fn input_value_type(job: &JobDescriptor, name: &str) -> Option<ValueKind> {
    job.input_kind(name)
}

pub fn output_value_type(job: &JobDescriptor, name: &str) -> Option<ValueKind> {
    job.output_kind(name)
}

/// Result of a cached execution.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    /// Key under which the outputs are stored; usable for replay.
    pub cache_key: String,
    pub outputs: OutputMap,
    pub from_cache: bool,
}

/// Executes jobs through a result cache.
pub struct JobService<P, C = InMemoryCache> {
    executor: Executor<P>,
    cache: C,
}

impl<P, C> JobService<P, C>
where
    P: ExecutionContextProvider,
    C: CacheStore,
{
    pub fn new(executor: Executor<P>, cache: C) -> Self {
        Self { executor, cache }
    }

    pub fn executor(&self) -> &Executor<P> {
        &self.executor
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Run the job unless the same job and inputs were computed before.
    ///
    /// Input checks always run first, so a request that cannot succeed is
    /// rejected even when the cache could have served it.
    pub async fn execute(&self, job: &JobDescriptor, inputs: &InputMap) -> Result<JobOutcome> {
        let realized = realize_inputs(job, inputs)?;
        let image_id = self
            .executor
            .provider()
            .resolve_image_id(job.image())
            .await
            .map_err(|e| JobError::sandbox_io("resolving image id", e))?;
        debug!(job = %job.name(), image = %job.image(), image_id = %image_id, "image resolved");
        let cache_key = compute_cache_key(job, &image_id, &realized);

        match cache::replay_all(&self.cache, &cache_key) {
            Ok(outputs) => {
                info!(job = %job.name(), cache_key = %cache_key, "read results from cache");
                return Ok(JobOutcome {
                    cache_key,
                    outputs,
                    from_cache: true,
                });
            }
            Err(JobError::CacheMiss(_)) => {
                debug!(job = %job.name(), cache_key = %cache_key, "cache miss");
            }
            Err(err) => return Err(err),
        }

        let produced = self.executor.execute_realized(job, &realized).await?;

        let entry: CacheEntry = produced
            .iter()
            .map(|(name, output)| (name.clone(), output.recreator.clone()))
            .collect();
        self.cache.insert_result(cache_key.clone(), entry);

        Ok(JobOutcome {
            cache_key,
            outputs: produced
                .into_iter()
                .map(|(name, output)| (name, output.value))
                .collect(),
            from_cache: false,
        })
    }

    /// Run the job without consulting or filling the cache.
    pub async fn execute_uncached(&self, job: &JobDescriptor, inputs: &InputMap) -> Result<OutputMap> {
        self.executor.execute(job, inputs).await
    }

    pub fn replay_all(&self, cache_key: &str) -> Result<OutputMap> {
        cache::replay_all(&self.cache, cache_key)
    }

    pub fn replay_one(
        &self,
        cache_key: &str,
        kind: ValueKind,
        output_name: Option<&str>,
    ) -> Result<Value> {
        cache::replay_one(&self.cache, cache_key, kind, output_name)
    }
}

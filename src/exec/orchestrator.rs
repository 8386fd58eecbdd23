// src/exec/orchestrator.rs

//! Execution orchestrator.
//!
//! One call to [`Executor::execute`] is one invocation of a job:
//!
//! 1. realize and check inputs (no sandbox exists yet),
//! 2. assemble the command line in input declaration order,
//! 3. create a context and, inside it, copy files in, start the process,
//!    feed stdin, wait, classify stderr / exit code / stdout and copy
//!    output files out,
//! 4. tear the context down on every path out of step 3.
//!
//! Any failure is returned as a single [`JobError`]; partial output maps are
//! never returned.

use std::collections::BTreeMap;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::cache::Recreator;
use crate::convert::{value_from_bytes, value_from_exit_code, value_to_bytes};
use crate::descriptor::{InputDelivery, InputDescriptor, JobDescriptor, OutputDescriptor, OutputSource};
use crate::errors::{JobError, Result};
use crate::exec::context::{
    ContextError, ContextSpec, ExecutionContext, ExecutionContextProvider, ExecutionRun, RunResult,
};
use crate::types::{InputMap, OutputMap, Value};

/// One input value bound for this invocation.
#[derive(Debug, Clone)]
pub struct RealizedInput<'j> {
    pub descriptor: &'j InputDescriptor,
    pub value: Value,
}

/// Checked inputs of one invocation, in declaration order.
///
/// Optional inputs that were not supplied and have no default are absent.
#[derive(Debug, Clone, Default)]
pub struct RealizedInputs<'j> {
    entries: Vec<RealizedInput<'j>>,
}

impl<'j> RealizedInputs<'j> {
    pub fn iter(&self) -> impl Iterator<Item = &RealizedInput<'j>> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name() == name)
            .map(|e| &e.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An output value together with what is needed to rebuild it later.
#[derive(Debug, Clone)]
pub struct ProducedOutput {
    pub value: Value,
    pub recreator: Recreator,
}

pub type ProducedOutputs = BTreeMap<String, ProducedOutput>;

#[derive(Debug, Clone, Default)]
pub struct ExecutorOptions {
    /// Give up waiting after this long. `None` waits forever.
    pub wait_timeout: Option<Duration>,
}

/// Check supplied inputs against the job's input descriptors.
///
/// The first violation wins. Absent inputs fall back to their default;
/// absent optional inputs without default are skipped.
pub fn realize_inputs<'j>(job: &'j JobDescriptor, inputs: &InputMap) -> Result<RealizedInputs<'j>> {
    for name in inputs.keys() {
        if job.input(name).is_none() {
            debug!(job = %job.name(), input = %name, "ignoring unknown input");
        }
    }

    let mut entries = Vec::with_capacity(job.inputs().len());

    for descriptor in job.inputs() {
        let name = descriptor.name();
        let value = match inputs.get(name) {
            Some(values) => match values.first() {
                Some(value) => value.clone(),
                None => return Err(JobError::MissingParameter(name.to_string())),
            },
            None => match descriptor.default_value() {
                Some(default) => default.clone(),
                None if descriptor.is_optional() => {
                    debug!(job = %job.name(), input = %name, "optional input not supplied");
                    continue;
                }
                None => return Err(JobError::MissingParameter(name.to_string())),
            },
        };

        if !descriptor.kind().accepts(&value) {
            return Err(JobError::InvalidParameterType {
                name: name.to_string(),
                expected: descriptor.kind(),
                actual: value.kind(),
            });
        }

        if let Some(message) = descriptor.validate(&value) {
            return Err(JobError::InvalidParameterValue {
                name: name.to_string(),
                message,
            });
        }

        if let Value::BoundingBox(bbox) = &value
            && !descriptor.supported_crs().is_empty()
            && !descriptor.supported_crs().iter().any(|crs| crs == &bbox.crs)
        {
            return Err(JobError::InvalidParameterValue {
                name: name.to_string(),
                message: format!("CRS '{}' is not supported", bbox.crs),
            });
        }

        entries.push(RealizedInput { descriptor, value });
    }

    Ok(RealizedInputs { entries })
}

/// Base command, then default flags, then each input's tokens in
/// declaration order.
pub fn assemble_command(job: &JobDescriptor, inputs: &RealizedInputs<'_>) -> Result<Vec<String>> {
    let mut command: Vec<String> = job.command().to_vec();
    command.extend(job.default_flags().iter().cloned());

    for input in inputs.iter() {
        let tokens = input
            .descriptor
            .delivery()
            .command_line_tokens(&input.value)
            .map_err(|e| JobError::InvalidParameterValue {
                name: input.descriptor.name().to_string(),
                message: e.to_string(),
            })?;
        if let Some(tokens) = tokens {
            command.extend(tokens);
        }
    }

    Ok(command)
}

/// Drives job invocations against an execution context provider.
pub struct Executor<P> {
    provider: P,
    options: ExecutorOptions,
}

impl<P: ExecutionContextProvider> Executor<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, ExecutorOptions::default())
    }

    pub fn with_options(provider: P, options: ExecutorOptions) -> Self {
        Self { provider, options }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Run the job with the given raw inputs.
    pub async fn execute(&self, job: &JobDescriptor, inputs: &InputMap) -> Result<OutputMap> {
        let realized = realize_inputs(job, inputs)?;
        let produced = self.execute_realized(job, &realized).await?;
        Ok(produced
            .into_iter()
            .map(|(name, output)| (name, output.value))
            .collect())
    }

    /// Run the job with already realized inputs, keeping recreators.
    pub async fn execute_realized(
        &self,
        job: &JobDescriptor,
        inputs: &RealizedInputs<'_>,
    ) -> Result<ProducedOutputs> {
        let spec = ContextSpec {
            image: job.image().to_string(),
            working_directory: job.working_directory().to_string(),
            command: assemble_command(job, inputs)?,
        };

        info!(
            job = %job.name(),
            image = %spec.image,
            command = ?spec.command,
            "creating execution context"
        );

        let mut context = self
            .provider
            .create_context(&spec)
            .await
            .map_err(|e| JobError::sandbox_io("creating the execution context", e))?;

        let outcome = self.run_in_context(job, inputs, context.as_mut()).await;

        // Teardown runs on every path; its failure never replaces the outcome.
        if let Err(err) = context.teardown().await {
            warn!(job = %job.name(), error = %err, "failed to tear down execution context");
        }

        match &outcome {
            Ok(outputs) => info!(job = %job.name(), outputs = outputs.len(), "job finished"),
            Err(err) => warn!(job = %job.name(), error = %err, "job failed"),
        }

        outcome
    }

    async fn run_in_context(
        &self,
        job: &JobDescriptor,
        inputs: &RealizedInputs<'_>,
        context: &mut dyn ExecutionContext,
    ) -> Result<ProducedOutputs> {
        copy_inputs_in(job, inputs, context).await?;

        let mut run = context
            .run()
            .await
            .map_err(|e| JobError::sandbox_io("starting the process", e))?;

        write_stdin(inputs, run.as_mut()).await?;

        let result = self.wait(run).await?;
        debug!(
            job = %job.name(),
            exit_code = result.exit_code,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "process completed"
        );

        let mut outputs = ProducedOutputs::new();
        classify_streams(job, &result, &mut outputs)?;
        copy_outputs_out(job, context, &mut outputs).await?;
        Ok(outputs)
    }

    async fn wait(&self, run: Box<dyn ExecutionRun>) -> Result<RunResult> {
        let waited = match self.options.wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, run.wait_for_completion()).await {
                Ok(waited) => waited,
                Err(_) => {
                    return Err(JobError::ExecutionInterrupted(format!(
                        "process did not exit within {limit:?}"
                    )));
                }
            },
            None => run.wait_for_completion().await,
        };

        waited.map_err(|err| match err {
            ContextError::Interrupted(reason) => JobError::ExecutionInterrupted(reason),
            other => JobError::sandbox_io("waiting for the process", other),
        })
    }
}

async fn copy_inputs_in(
    job: &JobDescriptor,
    inputs: &RealizedInputs<'_>,
    context: &mut dyn ExecutionContext,
) -> Result<()> {
    for input in inputs.iter() {
        let Some(path) = input.descriptor.delivery().file_path() else {
            continue;
        };
        let name = input.descriptor.name();
        let bytes = value_to_bytes(&input.value)
            .map_err(|e| JobError::sandbox_io(format!("converting input '{name}'"), e))?;

        debug!(job = %job.name(), input = %name, path = %path, bytes = bytes.len(), "copying input file");
        context
            .write_file(&bytes, job.working_directory(), path)
            .await
            .map_err(|e| JobError::sandbox_io(format!("writing input '{name}' to {path}"), e))?;
    }
    Ok(())
}

/// Stdin inputs are concatenated in declaration order; stdin is closed
/// afterwards even when nothing was written.
async fn write_stdin(inputs: &RealizedInputs<'_>, run: &mut dyn ExecutionRun) -> Result<()> {
    let mut stdin_inputs = inputs
        .iter()
        .filter(|i| matches!(i.descriptor.delivery(), InputDelivery::Stdin))
        .peekable();

    let Some(mut stdin) = run.take_stdin() else {
        if let Some(input) = stdin_inputs.peek() {
            return Err(JobError::sandbox_io(
                format!("writing input '{}' to stdin", input.descriptor.name()),
                "process stdin is not available",
            ));
        }
        return Ok(());
    };

    for input in stdin_inputs {
        let name = input.descriptor.name();
        let bytes = value_to_bytes(&input.value)
            .map_err(|e| JobError::sandbox_io(format!("converting input '{name}'"), e))?;
        stdin
            .write_all(&bytes)
            .await
            .map_err(|e| JobError::sandbox_io(format!("writing input '{name}' to stdin"), e))?;
    }

    stdin
        .shutdown()
        .await
        .map_err(|e| JobError::sandbox_io("closing stdin", e))?;
    Ok(())
}

/// stderr, then exit code, then stdout.
fn classify_streams(
    job: &JobDescriptor,
    result: &RunResult,
    outputs: &mut ProducedOutputs,
) -> Result<()> {
    if let Some(handler) = job.stderr_handler() {
        handler.handle(job.name(), &String::from_utf8_lossy(&result.stderr))?;
    }
    for output in outputs_from(job, OutputSource::Stderr) {
        collect_bytes(output, &result.stderr, outputs)?;
    }

    if let Some(handler) = job.exit_code_handler() {
        handler.handle(job.name(), result.exit_code)?;
    }
    for output in outputs_from(job, OutputSource::ExitCode) {
        let value = value_from_exit_code(result.exit_code);
        insert_checked(output, value, Recreator::FromExitCode(result.exit_code), outputs)?;
    }

    if let Some(handler) = job.stdout_handler() {
        handler.handle(job.name(), &String::from_utf8_lossy(&result.stdout));
    }
    for output in outputs_from(job, OutputSource::Stdout) {
        collect_bytes(output, &result.stdout, outputs)?;
    }

    Ok(())
}

async fn copy_outputs_out(
    job: &JobDescriptor,
    context: &mut dyn ExecutionContext,
    outputs: &mut ProducedOutputs,
) -> Result<()> {
    for output in job.outputs() {
        let OutputSource::File { path } = output.source() else {
            continue;
        };
        let name = output.name();
        debug!(job = %job.name(), output = %name, path = %path, "copying output file");

        let bytes = context
            .read_file(path)
            .await
            .map_err(|e| JobError::sandbox_io(format!("reading output '{name}' from {path}"), e))?;
        collect_bytes(output, &bytes, outputs)?;
    }
    Ok(())
}

fn outputs_from(job: &JobDescriptor, source: OutputSource) -> impl Iterator<Item = &OutputDescriptor> {
    job.outputs().iter().filter(move |o| *o.source() == source)
}

fn collect_bytes(output: &OutputDescriptor, bytes: &[u8], outputs: &mut ProducedOutputs) -> Result<()> {
    let value = value_from_bytes(output.kind(), bytes).map_err(|e| JobError::InvalidOutputValue {
        name: output.name().to_string(),
        message: e.to_string(),
    })?;
    let recreator = Recreator::FromBytes {
        kind: output.kind(),
        bytes: bytes.to_vec(),
    };
    insert_checked(output, value, recreator, outputs)
}

fn insert_checked(
    output: &OutputDescriptor,
    value: Value,
    recreator: Recreator,
    outputs: &mut ProducedOutputs,
) -> Result<()> {
    if let Some(message) = output.validate(&value) {
        return Err(JobError::InvalidOutputValue {
            name: output.name().to_string(),
            message,
        });
    }
    outputs.insert(output.name().to_string(), ProducedOutput { value, recreator });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::factory::{command_line_input, stdin_input};
    use crate::errors::ErrorKind;
    use crate::types::ValueKind;

    fn job() -> JobDescriptor {
        JobDescriptor::builder("sum", "alpine", "/work")
            .command(["python3", "sum.py"])
            .default_flags(["--quiet"])
            .input(
                command_line_input("count", ValueKind::Integer, Some("-n"))
                    .unwrap()
                    .build()
                    .unwrap(),
            )
            .input(
                command_line_input("label", ValueKind::String, None)
                    .unwrap()
                    .optional(true)
                    .build()
                    .unwrap(),
            )
            .input(stdin_input("data", ValueKind::String).build().unwrap())
            .build()
            .unwrap()
    }

    fn inputs(pairs: &[(&str, Value)]) -> InputMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.clone()]))
            .collect()
    }

    #[test]
    fn optional_input_without_default_is_skipped() {
        let job = job();
        let raw = inputs(&[
            ("count", Value::Integer(3)),
            ("data", Value::String("1 2 3".into())),
        ]);
        let realized = realize_inputs(&job, &raw).unwrap();
        assert_eq!(realized.len(), 2);
        assert!(realized.get("label").is_none());
        assert_eq!(
            assemble_command(&job, &realized).unwrap(),
            vec!["python3", "sum.py", "--quiet", "-n", "3"]
        );
    }

    #[test]
    fn empty_value_list_is_missing() {
        let job = job();
        let mut raw = inputs(&[("data", Value::String(String::new()))]);
        raw.insert("count".into(), Vec::new());
        let err = realize_inputs(&job, &raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingParameter);
    }

    #[test]
    fn wrong_kind_is_reported() {
        let job = job();
        let raw = inputs(&[
            ("count", Value::String("three".into())),
            ("data", Value::String(String::new())),
        ]);
        match realize_inputs(&job, &raw).unwrap_err() {
            JobError::InvalidParameterType {
                name,
                expected,
                actual,
            } => {
                assert_eq!(name, "count");
                assert_eq!(expected, ValueKind::Integer);
                assert_eq!(actual, ValueKind::String);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}

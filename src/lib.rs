// src/lib.rs

pub mod cache;
pub mod cli;
pub mod config;
pub mod convert;
pub mod descriptor;
pub mod errors;
pub mod exec;
pub mod handlers;
pub mod logging;
pub mod service;
pub mod types;
pub mod validate;

use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{debug, info};

use crate::cli::{CliArgs, CliCommand, InvocationArgs, ProviderKind, parse_inputs, value_to_json};
use crate::config::loader::load_and_validate;
use crate::descriptor::{InputDelivery, JobDescriptor};
use crate::exec::{
    DockerProvider, ExecutionContextProvider, Executor, ExecutorOptions, LocalProvider,
    assemble_command, realize_inputs,
};
use crate::types::OutputMap;

/// High-level entry point used by `main.rs`.
///
/// Loads the job file, then either describes it, checks a dry run, or runs
/// the job once and prints the outputs as JSON.
pub async fn run(args: CliArgs) -> Result<()> {
    match args.command {
        CliCommand::Describe { job } => {
            let job = load_and_validate(&job)
                .with_context(|| format!("loading job file {}", job.display()))?;
            print_description(&job);
            Ok(())
        }
        CliCommand::DryRun { invocation } => {
            let job = load_job(&invocation)?;
            let inputs = parse_inputs(&job, &invocation.inputs)?;
            let realized = realize_inputs(&job, &inputs)?;
            let command = assemble_command(&job, &realized)?;
            print_dry_run(&job, &command);
            Ok(())
        }
        CliCommand::Run {
            invocation,
            provider,
            timeout,
        } => {
            let options = ExecutorOptions {
                wait_timeout: timeout.map(Duration::from_secs),
            };
            match provider {
                ProviderKind::Docker => run_job(DockerProvider::new(), options, &invocation).await,
                ProviderKind::Local => run_job(LocalProvider::new(), options, &invocation).await,
            }
        }
    }
}

fn load_job(invocation: &InvocationArgs) -> Result<JobDescriptor> {
    load_and_validate(&invocation.job)
        .with_context(|| format!("loading job file {}", invocation.job.display()))
}

async fn run_job<P: ExecutionContextProvider>(
    provider: P,
    options: ExecutorOptions,
    invocation: &InvocationArgs,
) -> Result<()> {
    let job = load_job(invocation)?;
    let inputs = parse_inputs(&job, &invocation.inputs)?;
    info!(job = %job.name(), inputs = inputs.len(), "running job");

    // A CLI process runs one invocation, so a result cache would never hit.
    let executor = Executor::with_options(provider, options);
    let outputs = executor.execute(&job, &inputs).await?;
    println!("{}", serde_json::to_string_pretty(&outcome_report(&outputs))?);
    Ok(())
}

fn outcome_report(outputs: &OutputMap) -> serde_json::Value {
    let outputs: serde_json::Map<String, serde_json::Value> = outputs
        .iter()
        .map(|(name, value)| (name.clone(), value_to_json(value)))
        .collect();
    json!({ "outputs": outputs })
}

fn delivery_label(delivery: &InputDelivery) -> String {
    match delivery {
        InputDelivery::CommandLine(_) => "command line".to_string(),
        InputDelivery::File { path, .. } => format!("file {path}"),
        InputDelivery::Stdin => "stdin".to_string(),
    }
}

fn print_description(job: &JobDescriptor) {
    println!("job {}", job.name());
    if let Some(description) = job.description() {
        println!("  {description}");
    }
    println!("  image: {}", job.image());
    println!("  working_directory: {}", job.working_directory());
    println!("  command: {:?}", job.command());
    if !job.default_flags().is_empty() {
        println!("  default flags: {:?}", job.default_flags());
    }
    println!();

    println!("inputs ({}):", job.inputs().len());
    for input in job.inputs() {
        let optional = if input.is_optional() { ", optional" } else { "" };
        println!(
            "  - {} ({}{optional}) via {}",
            input.name(),
            input.kind(),
            delivery_label(input.delivery())
        );
        if let Some(default) = input.default_value().and_then(|v| v.literal_text()) {
            println!("      default: {default}");
        }
        let allowed: Vec<String> = input
            .allowed_values()
            .iter()
            .filter_map(|v| v.literal_text())
            .collect();
        if !allowed.is_empty() {
            println!("      allowed: {allowed:?}");
        }
        if !input.supported_crs().is_empty() {
            println!("      crs: {:?}", input.supported_crs());
        }
    }

    println!("outputs ({}):", job.outputs().len());
    for output in job.outputs() {
        println!(
            "  - {} ({}) from {}",
            output.name(),
            output.kind(),
            output.source().label()
        );
    }
}

fn print_dry_run(job: &JobDescriptor, command: &[String]) {
    println!("procjob dry-run");
    println!("  job: {}", job.name());
    println!("  image: {}", job.image());
    println!("  working_directory: {}", job.working_directory());
    println!("  command: {command:?}");

    debug!("dry-run complete (no execution)");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;

    #[test]
    fn report_lists_outputs_only() {
        let mut outputs = OutputMap::new();
        outputs.insert("status".to_string(), Value::Integer(0));
        outputs.insert("summary".to_string(), Value::String("3 events".to_string()));

        let report = outcome_report(&outputs);
        let fields = report.as_object().expect("report is an object");

        assert_eq!(fields.len(), 1);
        assert!(!fields.contains_key("cache_key"));
        assert!(!fields.contains_key("from_cache"));
        assert_eq!(report["outputs"]["status"], json!(0));
        assert_eq!(report["outputs"]["summary"], json!("3 events"));
    }
}

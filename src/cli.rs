// src/cli.rs

//! CLI argument parsing using `clap`, plus the text forms of inputs and
//! outputs used on the command line.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::convert::value_from_bytes;
use crate::descriptor::JobDescriptor;
use crate::types::{BoundingBox, InputMap, Value, ValueKind};

/// Command-line arguments for `procjob`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "procjob",
    version,
    about = "Run command-line programs in containers as declaratively described jobs.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PROCJOB_LOG` or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Print the inputs and outputs of a job file.
    Describe {
        /// Path to the job file (TOML).
        #[arg(long, value_name = "PATH")]
        job: PathBuf,
    },

    /// Run a job and print its outputs as JSON.
    Run {
        #[command(flatten)]
        invocation: InvocationArgs,

        /// Where the command runs.
        #[arg(long, value_enum, default_value_t = ProviderKind::Docker)]
        provider: ProviderKind,

        /// Fail if the process has not exited after this many seconds.
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// Check the inputs and print the command that would run, without
    /// creating a container.
    DryRun {
        #[command(flatten)]
        invocation: InvocationArgs,
    },
}

#[derive(Debug, Clone, Args)]
pub struct InvocationArgs {
    /// Path to the job file (TOML).
    #[arg(long, value_name = "PATH")]
    pub job: PathBuf,

    /// Input value as NAME=VALUE. Use NAME=@FILE to read document inputs
    /// from a file; bounding boxes are LAT,LON,LAT,LON[@CRS].
    #[arg(long = "input", short = 'i', value_name = "NAME=VALUE")]
    pub inputs: Vec<String>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum ProviderKind {
    /// One container per run, via the docker CLI.
    Docker,
    /// Host process in a temporary directory (no isolation).
    Local,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

const DEFAULT_CRS: &str = "EPSG:4326";

fn parse_bounding_box(text: &str) -> Result<BoundingBox> {
    let (coords, crs) = match text.split_once('@') {
        Some((coords, crs)) => (coords, crs.trim()),
        None => (text, DEFAULT_CRS),
    };
    let numbers = coords
        .split(',')
        .map(|c| c.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("invalid bounding box \"{text}\""))?;
    let &[lat_min, lon_min, lat_max, lon_max] = numbers.as_slice() else {
        bail!("bounding box needs four coordinates LAT,LON,LAT,LON, got \"{text}\"");
    };
    Ok(BoundingBox {
        lower: vec![lat_min, lon_min],
        upper: vec![lat_max, lon_max],
        crs: crs.to_string(),
    })
}

/// Parse one `NAME=VALUE` argument against the job's declared inputs.
pub fn parse_input_arg(job: &JobDescriptor, arg: &str) -> Result<(String, Value)> {
    let (name, text) = arg
        .split_once('=')
        .ok_or_else(|| anyhow!("input \"{arg}\" is not of the form NAME=VALUE"))?;
    let kind = job
        .input_kind(name)
        .ok_or_else(|| anyhow!("job '{}' has no input '{name}'", job.name()))?;

    let value = match kind {
        ValueKind::BoundingBox => Value::BoundingBox(parse_bounding_box(text)?),
        kind if kind.is_literal() => Value::parse_literal(kind, text).map_err(|e| anyhow!(e))?,
        kind => {
            let bytes = match text.strip_prefix('@') {
                Some(path) => std::fs::read(path)
                    .with_context(|| format!("reading input '{name}' from {path}"))?,
                None => text.as_bytes().to_vec(),
            };
            value_from_bytes(kind, &bytes).with_context(|| format!("input '{name}'"))?
        }
    };

    Ok((name.to_string(), value))
}

pub fn parse_inputs(job: &JobDescriptor, args: &[String]) -> Result<InputMap> {
    let mut inputs = InputMap::new();
    for arg in args {
        let (name, value) = parse_input_arg(job, arg)?;
        inputs.entry(name).or_default().push(value);
    }
    Ok(inputs)
}

/// JSON form of an output value for printing.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::json;

    match value {
        Value::Integer(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Boolean(v) => json!(v),
        Value::String(v) => json!(v),
        Value::BoundingBox(bbox) => json!({
            "lower": bbox.lower,
            "upper": bbox.upper,
            "crs": bbox.crs,
        }),
        Value::GenericFile(bytes) | Value::Geotiff(bytes) => json!({
            "type": value.kind().to_string(),
            "size": bytes.len(),
        }),
        Value::Xml(doc) => json!(doc.text),
        Value::Json(json) | Value::GeoJson(json) => json.clone(),
    }
}

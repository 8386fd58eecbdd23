// src/descriptor/factory.rs

//! Stateless constructors for descriptors.
//!
//! Each function picks the delivery or source that fits a value kind and
//! hands back a builder; `build()` then checks the remaining cross-field
//! rules. Job files and code-built jobs both go through here.

use uuid::Uuid;

use crate::convert::CommandLineArgument;
use crate::descriptor::input::{FileArgument, InputDelivery, InputDescriptor, InputDescriptorBuilder};
use crate::descriptor::job::JobDescriptor;
use crate::descriptor::output::{OutputDescriptor, OutputDescriptorBuilder, OutputSource};
use crate::errors::DescriptorError;
use crate::handlers::{ExitCodeHandler, StderrHandler};
use crate::types::{Value, ValueKind, XmlSchema};

/// Fresh file name for a document handed to a command by path.
pub fn generated_file_name(kind: ValueKind) -> String {
    format!("{}.{}", Uuid::new_v4(), kind.file_extension())
}

/// Input passed on the command line.
///
/// Literals become `[flag] value`, booleans a bare flag (required),
/// bounding boxes four coordinates, and documents are written to a
/// generated file whose name becomes the argument.
pub fn command_line_input(
    name: &str,
    kind: ValueKind,
    flag: Option<&str>,
) -> Result<InputDescriptorBuilder, DescriptorError> {
    let flag = flag.map(str::to_string);
    let delivery = match kind {
        ValueKind::Integer | ValueKind::Double | ValueKind::String => {
            InputDelivery::CommandLine(CommandLineArgument::Literal { flag })
        }
        ValueKind::Boolean => {
            let flag = flag.ok_or_else(|| {
                DescriptorError::input(name, "boolean command-line inputs require a flag")
            })?;
            InputDelivery::CommandLine(CommandLineArgument::BooleanFlag { flag })
        }
        ValueKind::BoundingBox => {
            if flag.is_some() {
                return Err(DescriptorError::input(
                    name,
                    "bounding box arguments do not take a flag",
                ));
            }
            InputDelivery::CommandLine(CommandLineArgument::BoundingBox)
        }
        _ => InputDelivery::File {
            path: generated_file_name(kind),
            argument: Some(FileArgument { flag }),
        },
    };
    Ok(InputDescriptor::builder(name, kind, delivery))
}

/// Input written to a fixed path inside the working directory.
pub fn file_input(name: &str, kind: ValueKind, path: &str) -> InputDescriptorBuilder {
    InputDescriptor::builder(
        name,
        kind,
        InputDelivery::File {
            path: path.to_string(),
            argument: None,
        },
    )
}

pub fn stdin_input(name: &str, kind: ValueKind) -> InputDescriptorBuilder {
    InputDescriptor::builder(name, kind, InputDelivery::Stdin)
}

pub fn stdout_output(name: &str, kind: ValueKind) -> OutputDescriptorBuilder {
    OutputDescriptor::builder(name, kind, OutputSource::Stdout)
}

pub fn stderr_output(name: &str, kind: ValueKind) -> OutputDescriptorBuilder {
    OutputDescriptor::builder(name, kind, OutputSource::Stderr)
}

pub fn exit_code_output(name: &str) -> OutputDescriptorBuilder {
    OutputDescriptor::builder(name, ValueKind::Integer, OutputSource::ExitCode)
}

pub fn file_output(name: &str, kind: ValueKind, path: &str) -> OutputDescriptorBuilder {
    OutputDescriptor::builder(
        name,
        kind,
        OutputSource::File {
            path: path.to_string(),
        },
    )
}

/// Earthquake catalogue query shipped as a built-in job.
pub fn quakeledger_job(image: &str) -> Result<JobDescriptor, DescriptorError> {
    let positional_double = |name: &str, default: f64| {
        command_line_input(name, ValueKind::Double, None)?
            .default_value(Value::Double(default))
            .build()
    };

    let etype_allowed = ["observed", "deaggregation", "stochastic", "expert"]
        .into_iter()
        .map(|s| Value::String(s.to_string()))
        .collect();

    JobDescriptor::builder("quakeledger", image, "/usr/share/git/quakeledger")
        .description("Selects earthquake events from a catalogue")
        .command(["python3", "eventquery.py"])
        .input(
            command_line_input("input-boundingbox", ValueKind::BoundingBox, None)?
                .supported_crs(["EPSG:4326", "EPSG:4328"])
                .build()?,
        )
        .input(positional_double("mmin", 6.6)?)
        .input(positional_double("mmax", 8.5)?)
        .input(positional_double("zmin", 5.0)?)
        .input(positional_double("zmax", 140.0)?)
        .input(positional_double("p", 0.1)?)
        .input(
            command_line_input("etype", ValueKind::String, None)?
                .default_value(Value::String("deaggregation".to_string()))
                .allowed_values(etype_allowed)
                .build()?,
        )
        .input(positional_double("tlon", -71.5730623712764)?)
        .input(positional_double("tlat", -33.1299174879672)?)
        .output(
            file_output("selectedRows", ValueKind::Xml(XmlSchema::QuakeMl), "test.xml")
                .description("the resulting quakeml")
                .build()?,
        )
        .stderr_handler(Some(StderrHandler::Log))
        .exit_code_handler(Some(ExitCodeHandler::Log))
        .build()
}

// src/config/validate.rs

use crate::config::model::{RawInput, RawJobFile, RawOutput, ReadFrom, UseAs};
use crate::descriptor::factory::{
    command_line_input, exit_code_output, file_input, file_output, stderr_output, stdin_input,
    stdout_output,
};
use crate::descriptor::{InputDescriptor, JobDescriptor, OutputDescriptor};
use crate::errors::{ConfigError, ConfigResult, DescriptorError};
use crate::handlers::{ExitCodeHandler, HandlerChoice, StderrHandler, StdoutHandler};
use crate::types::{Value, ValueKind, XmlSchema};

impl TryFrom<RawJobFile> for JobDescriptor {
    type Error = ConfigError;

    fn try_from(raw: RawJobFile) -> std::result::Result<Self, Self::Error> {
        let job = &raw.job;

        let stderr: HandlerChoice<StderrHandler> =
            job.stderr_handler.parse().map_err(ConfigError::Invalid)?;
        let exit: HandlerChoice<ExitCodeHandler> =
            job.exit_value_handler.parse().map_err(ConfigError::Invalid)?;
        let stdout: HandlerChoice<StdoutHandler> =
            job.stdout_handler.parse().map_err(ConfigError::Invalid)?;

        let mut builder = JobDescriptor::builder(&job.title, &job.image_id, &job.working_directory)
            .command(job.command_to_execute.iter().cloned())
            .default_flags(job.default_command_line_flags.iter().cloned())
            .stderr_handler(stderr.0)
            .exit_code_handler(exit.0)
            .stdout_handler(stdout.0);
        if let Some(description) = &job.description {
            builder = builder.description(description);
        }

        for input in &raw.input {
            builder = builder.input(build_input(input)?);
        }
        for output in &raw.output {
            builder = builder.output(build_output(output)?);
        }

        Ok(builder.build()?)
    }
}

/// Value kind from `type` plus optional `schema`.
fn resolve_kind(
    kind: &str,
    schema: Option<&str>,
    illegal: impl Fn(String) -> DescriptorError,
) -> Result<ValueKind, DescriptorError> {
    let kind: ValueKind = kind.parse().map_err(&illegal)?;
    match (kind, schema) {
        (kind, None) => Ok(kind),
        (ValueKind::Xml(XmlSchema::Generic), Some(location)) => XmlSchema::from_location(location)
            .map(ValueKind::Xml)
            .ok_or_else(|| illegal(format!("unsupported schema \"{location}\""))),
        (ValueKind::Xml(own), Some(location)) if own.schema_location() == Some(location.trim()) => {
            Ok(kind)
        }
        (kind, Some(_)) => Err(illegal(format!("a schema cannot be set for {kind} values"))),
    }
}

fn input_supported(use_as: UseAs, kind: ValueKind) -> bool {
    match use_as {
        UseAs::CommandLineArgument => true,
        UseAs::Stdin => matches!(kind, ValueKind::String | ValueKind::Json),
        UseAs::File => !kind.is_literal() && kind != ValueKind::BoundingBox,
    }
}

fn output_supported(read_from: ReadFrom, kind: ValueKind) -> bool {
    match read_from {
        ReadFrom::Stdout => matches!(
            kind,
            ValueKind::String
                | ValueKind::Json
                | ValueKind::Xml(XmlSchema::Generic | XmlSchema::QuakeMl | XmlSchema::ShakeMap)
        ),
        ReadFrom::Stderr => matches!(kind, ValueKind::String | ValueKind::Json),
        ReadFrom::ExitValue => kind == ValueKind::Integer,
        ReadFrom::File => !kind.is_literal() && kind != ValueKind::BoundingBox,
    }
}

fn parse_literal(name: &str, kind: ValueKind, text: &str) -> Result<Value, DescriptorError> {
    Value::parse_literal(kind, text).map_err(|e| DescriptorError::input(name, e))
}

fn build_input(raw: &RawInput) -> Result<InputDescriptor, DescriptorError> {
    let name = raw.title.as_str();
    let kind = resolve_kind(&raw.kind, raw.schema.as_deref(), |reason| {
        DescriptorError::input(name, reason)
    })?;

    if !input_supported(raw.use_as, kind) {
        return Err(DescriptorError::input(
            name,
            format!("{kind} inputs cannot be used as {:?}", raw.use_as),
        ));
    }

    let mut builder = match raw.use_as {
        UseAs::CommandLineArgument => command_line_input(name, kind, raw.flag.as_deref())?,
        UseAs::Stdin => stdin_input(name, kind),
        UseAs::File => {
            let path = raw
                .path
                .as_deref()
                .ok_or_else(|| DescriptorError::input(name, "file inputs require a path"))?;
            file_input(name, kind, path)
        }
    };

    if raw.use_as != UseAs::CommandLineArgument && raw.flag.is_some() {
        return Err(DescriptorError::input(
            name,
            "a flag is only meaningful for command-line arguments",
        ));
    }
    if raw.use_as != UseAs::File && raw.path.is_some() {
        return Err(DescriptorError::input(
            name,
            "a path is only meaningful for file inputs",
        ));
    }

    builder = builder.optional(raw.optional);
    if let Some(description) = &raw.description {
        builder = builder.description(description);
    }
    if let Some(default) = &raw.default {
        builder = builder.default_value(parse_literal(name, kind, default)?);
    }
    if let Some(allowed) = &raw.allowed {
        let values = allowed
            .iter()
            .map(|text| parse_literal(name, kind, text))
            .collect::<Result<Vec<_>, _>>()?;
        builder = builder.allowed_values(values);
    }
    if let Some(crs) = &raw.crs {
        builder = builder.supported_crs(crs.iter().cloned());
    }

    builder.build()
}

fn build_output(raw: &RawOutput) -> Result<OutputDescriptor, DescriptorError> {
    let name = raw.title.as_str();
    let kind = resolve_kind(&raw.kind, raw.schema.as_deref(), |reason| {
        DescriptorError::output(name, reason)
    })?;

    if !output_supported(raw.read_from, kind) {
        return Err(DescriptorError::output(
            name,
            format!("{kind} outputs cannot be read from {:?}", raw.read_from),
        ));
    }

    let mut builder = match raw.read_from {
        ReadFrom::Stdout => stdout_output(name, kind),
        ReadFrom::Stderr => stderr_output(name, kind),
        ReadFrom::ExitValue => exit_code_output(name),
        ReadFrom::File => {
            let path = raw
                .path
                .as_deref()
                .ok_or_else(|| DescriptorError::output(name, "file outputs require a path"))?;
            file_output(name, kind, path)
        }
    };

    if raw.read_from != ReadFrom::File && raw.path.is_some() {
        return Err(DescriptorError::output(
            name,
            "a path is only meaningful for file outputs",
        ));
    }

    if let Some(description) = &raw.description {
        builder = builder.description(description);
    }

    builder.build()
}

/// Shorthand used by callers that already hold the file contents.
pub fn job_from_str(contents: &str) -> ConfigResult<JobDescriptor> {
    let raw = crate::config::loader::load_from_str(contents)?;
    JobDescriptor::try_from(raw)
}

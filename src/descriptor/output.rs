// src/descriptor/output.rs

use crate::errors::DescriptorError;
use crate::types::{Value, ValueKind, XmlSchema};
use crate::validate::Validator;

/// Where an output value comes from. Exactly one per output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputSource {
    Stdout,
    Stderr,
    ExitCode,
    /// Read from `path` (relative to the working directory) after the run.
    File { path: String },
}

impl OutputSource {
    pub fn label(&self) -> &'static str {
        match self {
            OutputSource::Stdout => "stdout",
            OutputSource::Stderr => "stderr",
            OutputSource::ExitCode => "exitValue",
            OutputSource::File { .. } => "file",
        }
    }
}

/// Static description of one output slot of a job.
#[derive(Debug, Clone)]
pub struct OutputDescriptor {
    name: String,
    description: Option<String>,
    kind: ValueKind,
    source: OutputSource,
    validators: Vec<Validator>,
}

impl OutputDescriptor {
    pub fn builder(
        name: impl Into<String>,
        kind: ValueKind,
        source: OutputSource,
    ) -> OutputDescriptorBuilder {
        OutputDescriptorBuilder {
            name: name.into(),
            description: None,
            kind,
            source,
            validators: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn source(&self) -> &OutputSource {
        &self.source
    }

    pub fn validate(&self, value: &Value) -> Option<String> {
        self.validators.iter().find_map(|v| v.validate(value))
    }
}

pub struct OutputDescriptorBuilder {
    name: String,
    description: Option<String>,
    kind: ValueKind,
    source: OutputSource,
    validators: Vec<Validator>,
}

impl OutputDescriptorBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn build(self) -> Result<OutputDescriptor, DescriptorError> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(DescriptorError::output(name, "name must not be empty"));
        }

        match &self.source {
            OutputSource::ExitCode if self.kind != ValueKind::Integer => {
                return Err(DescriptorError::output(
                    name,
                    format!("exit codes cannot be read as {} values", self.kind),
                ));
            }
            OutputSource::File { path } if path.trim().is_empty() => {
                return Err(DescriptorError::output(name, "file path must not be empty"));
            }
            OutputSource::Stdout | OutputSource::Stderr | OutputSource::File { .. }
                if !self.kind.has_byte_form() =>
            {
                return Err(DescriptorError::output(
                    name,
                    format!(
                        "{} values cannot be read from {}",
                        self.kind,
                        self.source.label()
                    ),
                ));
            }
            _ => {}
        }

        let mut validators = Vec::new();
        if let ValueKind::Xml(schema) = self.kind
            && schema != XmlSchema::Generic
        {
            validators.push(Validator::Schema(schema));
        }
        validators.extend(self.validators);

        Ok(OutputDescriptor {
            name: self.name,
            description: self.description,
            kind: self.kind,
            source: self.source,
            validators,
        })
    }
}

// src/descriptor/input.rs

use crate::convert::{CommandLineArgument, ConversionError, path_tokens};
use crate::errors::DescriptorError;
use crate::types::{Value, ValueKind, XmlSchema};
use crate::validate::Validator;

/// A file input that is also handed to the command by path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArgument {
    pub flag: Option<String>,
}

/// Where an input value ends up when the job runs. Exactly one per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputDelivery {
    CommandLine(CommandLineArgument),
    /// Written to `path` (relative to the working directory) before start.
    File {
        path: String,
        argument: Option<FileArgument>,
    },
    /// Streamed to the process's standard input.
    Stdin,
}

impl InputDelivery {
    pub fn has_command_line_binding(&self) -> bool {
        matches!(
            self,
            InputDelivery::CommandLine(_)
                | InputDelivery::File {
                    argument: Some(_),
                    ..
                }
        )
    }

    /// Tokens this input contributes to the command, if any.
    pub fn command_line_tokens(
        &self,
        value: &Value,
    ) -> Result<Option<Vec<String>>, ConversionError> {
        match self {
            InputDelivery::CommandLine(argument) => argument.tokens(value).map(Some),
            InputDelivery::File {
                path,
                argument: Some(FileArgument { flag }),
            } => Ok(Some(path_tokens(flag.as_deref(), path))),
            InputDelivery::File { argument: None, .. } | InputDelivery::Stdin => Ok(None),
        }
    }

    pub fn file_path(&self) -> Option<&str> {
        match self {
            InputDelivery::File { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Static description of one input slot of a job.
#[derive(Debug, Clone)]
pub struct InputDescriptor {
    name: String,
    description: Option<String>,
    kind: ValueKind,
    optional: bool,
    default: Option<Value>,
    allowed_values: Vec<Value>,
    supported_crs: Vec<String>,
    delivery: InputDelivery,
    validators: Vec<Validator>,
}

impl InputDescriptor {
    pub fn builder(
        name: impl Into<String>,
        kind: ValueKind,
        delivery: InputDelivery,
    ) -> InputDescriptorBuilder {
        InputDescriptorBuilder {
            name: name.into(),
            description: None,
            kind,
            optional: false,
            default: None,
            allowed_values: Vec::new(),
            supported_crs: Vec::new(),
            delivery,
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

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn allowed_values(&self) -> &[Value] {
        &self.allowed_values
    }

    pub fn supported_crs(&self) -> &[String] {
        &self.supported_crs
    }

    pub fn delivery(&self) -> &InputDelivery {
        &self.delivery
    }

    /// First validator message wins.
    pub fn validate(&self, value: &Value) -> Option<String> {
        self.validators.iter().find_map(|v| v.validate(value))
    }
}

pub struct InputDescriptorBuilder {
    name: String,
    description: Option<String>,
    kind: ValueKind,
    optional: bool,
    default: Option<Value>,
    allowed_values: Vec<Value>,
    supported_crs: Vec<String>,
    delivery: InputDelivery,
    validators: Vec<Validator>,
}

impl InputDescriptorBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn allowed_values(mut self, values: Vec<Value>) -> Self {
        self.allowed_values = values;
        self
    }

    pub fn supported_crs<I, S>(mut self, crs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_crs = crs.into_iter().map(Into::into).collect();
        self
    }

    /// Extra validator, run after the ones derived from the descriptor.
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn build(self) -> Result<InputDescriptor, DescriptorError> {
        let name = self.name.as_str();
        if name.trim().is_empty() {
            return Err(DescriptorError::input(name, "name must not be empty"));
        }

        check_delivery(name, self.kind, &self.delivery, &self.supported_crs)?;

        if !self.allowed_values.is_empty() {
            if !self.kind.is_literal() || self.kind == ValueKind::Boolean {
                return Err(DescriptorError::input(
                    name,
                    format!("allowed values are not supported for {} inputs", self.kind),
                ));
            }
            if let Some(bad) = self.allowed_values.iter().find(|v| !self.kind.accepts(v)) {
                return Err(DescriptorError::input(
                    name,
                    format!("allowed value {bad:?} is not a {} value", self.kind),
                ));
            }
        }

        if !self.supported_crs.is_empty() && self.kind != ValueKind::BoundingBox {
            return Err(DescriptorError::input(
                name,
                "supported CRS are only meaningful for bounding boxes",
            ));
        }

        if let Some(default) = &self.default {
            if !self.kind.accepts(default) {
                return Err(DescriptorError::input(
                    name,
                    format!("default value is not a {} value", self.kind),
                ));
            }
            if !self.allowed_values.is_empty() && !self.allowed_values.contains(default) {
                return Err(DescriptorError::input(
                    name,
                    "default value is not one of the allowed values",
                ));
            }
        }

        let mut validators = Vec::new();
        if !self.allowed_values.is_empty() {
            validators.push(Validator::AllowedValues(self.allowed_values.clone()));
        }
        if let ValueKind::Xml(schema) = self.kind
            && schema != XmlSchema::Generic
        {
            validators.push(Validator::Schema(schema));
        }
        validators.extend(self.validators);

        Ok(InputDescriptor {
            name: self.name,
            description: self.description,
            kind: self.kind,
            optional: self.optional,
            default: self.default,
            allowed_values: self.allowed_values,
            supported_crs: self.supported_crs,
            delivery: self.delivery,
            validators,
        })
    }
}

fn check_delivery(
    name: &str,
    kind: ValueKind,
    delivery: &InputDelivery,
    supported_crs: &[String],
) -> Result<(), DescriptorError> {
    match delivery {
        InputDelivery::CommandLine(CommandLineArgument::Literal { flag }) => {
            if !matches!(
                kind,
                ValueKind::Integer | ValueKind::Double | ValueKind::String
            ) {
                return Err(DescriptorError::input(
                    name,
                    format!("{kind} inputs cannot be passed as a literal argument"),
                ));
            }
            check_flag(name, flag.as_deref())
        }
        InputDelivery::CommandLine(CommandLineArgument::BooleanFlag { flag }) => {
            if kind != ValueKind::Boolean {
                return Err(DescriptorError::input(
                    name,
                    format!("{kind} inputs cannot be passed as a boolean flag"),
                ));
            }
            if flag.trim().is_empty() {
                return Err(DescriptorError::input(
                    name,
                    "boolean command-line inputs require a flag",
                ));
            }
            Ok(())
        }
        InputDelivery::CommandLine(CommandLineArgument::BoundingBox) => {
            if kind != ValueKind::BoundingBox {
                return Err(DescriptorError::input(
                    name,
                    format!("{kind} inputs cannot be passed as a bounding box"),
                ));
            }
            if supported_crs.is_empty() {
                return Err(DescriptorError::input(
                    name,
                    "bounding box inputs require at least one supported CRS",
                ));
            }
            Ok(())
        }
        InputDelivery::File { path, argument } => {
            if kind.is_literal() || !kind.has_byte_form() {
                return Err(DescriptorError::input(
                    name,
                    format!("{kind} inputs cannot be written to a file"),
                ));
            }
            if path.trim().is_empty() {
                return Err(DescriptorError::input(name, "file path must not be empty"));
            }
            match argument {
                Some(FileArgument { flag }) => check_flag(name, flag.as_deref()),
                None => Ok(()),
            }
        }
        InputDelivery::Stdin => {
            if !kind.has_byte_form() || kind == ValueKind::Boolean {
                return Err(DescriptorError::input(
                    name,
                    format!("{kind} inputs cannot be written to stdin"),
                ));
            }
            Ok(())
        }
    }
}

fn check_flag(name: &str, flag: Option<&str>) -> Result<(), DescriptorError> {
    match flag {
        Some(flag) if flag.trim().is_empty() => Err(DescriptorError::input(
            name,
            "command-line flag must not be blank",
        )),
        _ => Ok(()),
    }
}

// src/descriptor/job.rs

use std::collections::HashSet;

use crate::descriptor::input::InputDescriptor;
use crate::descriptor::output::OutputDescriptor;
use crate::errors::DescriptorError;
use crate::handlers::{ExitCodeHandler, StderrHandler, StdoutHandler};
use crate::types::ValueKind;

/// Static, read-only description of one executable job.
///
/// Built once at registration time and shared (usually behind an `Arc`)
/// by every invocation of the job.
#[derive(Debug, Clone)]
pub struct JobDescriptor {
    name: String,
    description: Option<String>,
    image: String,
    working_directory: String,
    command: Vec<String>,
    default_flags: Vec<String>,
    inputs: Vec<InputDescriptor>,
    outputs: Vec<OutputDescriptor>,
    stderr_handler: Option<StderrHandler>,
    exit_code_handler: Option<ExitCodeHandler>,
    stdout_handler: Option<StdoutHandler>,
}

impl JobDescriptor {
    pub fn builder(
        name: impl Into<String>,
        image: impl Into<String>,
        working_directory: impl Into<String>,
    ) -> JobDescriptorBuilder {
        JobDescriptorBuilder {
            name: name.into(),
            description: None,
            image: image.into(),
            working_directory: working_directory.into(),
            command: Vec::new(),
            default_flags: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            stderr_handler: None,
            exit_code_handler: None,
            stdout_handler: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn working_directory(&self) -> &str {
        &self.working_directory
    }

    pub fn command(&self) -> &[String] {
        &self.command
    }

    pub fn default_flags(&self) -> &[String] {
        &self.default_flags
    }

    pub fn inputs(&self) -> &[InputDescriptor] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[OutputDescriptor] {
        &self.outputs
    }

    pub fn stderr_handler(&self) -> Option<StderrHandler> {
        self.stderr_handler
    }

    pub fn exit_code_handler(&self) -> Option<ExitCodeHandler> {
        self.exit_code_handler
    }

    pub fn stdout_handler(&self) -> Option<StdoutHandler> {
        self.stdout_handler
    }

    /// Input names in declaration order.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(InputDescriptor::name).collect()
    }

    /// Output names in declaration order.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(OutputDescriptor::name).collect()
    }

    pub fn input(&self, name: &str) -> Option<&InputDescriptor> {
        self.inputs.iter().find(|i| i.name() == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputDescriptor> {
        self.outputs.iter().find(|o| o.name() == name)
    }

    pub fn input_kind(&self, name: &str) -> Option<ValueKind> {
        self.input(name).map(InputDescriptor::kind)
    }

    pub fn output_kind(&self, name: &str) -> Option<ValueKind> {
        self.output(name).map(OutputDescriptor::kind)
    }
}

pub struct JobDescriptorBuilder {
    name: String,
    description: Option<String>,
    image: String,
    working_directory: String,
    command: Vec<String>,
    default_flags: Vec<String>,
    inputs: Vec<InputDescriptor>,
    outputs: Vec<OutputDescriptor>,
    stderr_handler: Option<StderrHandler>,
    exit_code_handler: Option<ExitCodeHandler>,
    stdout_handler: Option<StdoutHandler>,
}

impl JobDescriptorBuilder {
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_flags = flags.into_iter().map(Into::into).collect();
        self
    }

    pub fn input(mut self, input: InputDescriptor) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn output(mut self, output: OutputDescriptor) -> Self {
        self.outputs.push(output);
        self
    }

    pub fn stderr_handler(mut self, handler: Option<StderrHandler>) -> Self {
        self.stderr_handler = handler;
        self
    }

    pub fn exit_code_handler(mut self, handler: Option<ExitCodeHandler>) -> Self {
        self.exit_code_handler = handler;
        self
    }

    pub fn stdout_handler(mut self, handler: Option<StdoutHandler>) -> Self {
        self.stdout_handler = handler;
        self
    }

    pub fn build(self) -> Result<JobDescriptor, DescriptorError> {
        let illegal = |reason: &str| DescriptorError::IllegalJob {
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.trim().is_empty() {
            return Err(illegal("name must not be empty"));
        }
        if self.image.trim().is_empty() {
            return Err(illegal("image must not be empty"));
        }
        if self.working_directory.trim().is_empty() {
            return Err(illegal("working directory must not be empty"));
        }
        if self.command.is_empty() {
            return Err(illegal("command must not be empty"));
        }

        ensure_unique("input", self.inputs.iter().map(InputDescriptor::name))?;
        ensure_unique("output", self.outputs.iter().map(OutputDescriptor::name))?;

        Ok(JobDescriptor {
            name: self.name,
            description: self.description,
            image: self.image,
            working_directory: self.working_directory,
            command: self.command,
            default_flags: self.default_flags,
            inputs: self.inputs,
            outputs: self.outputs,
            stderr_handler: self.stderr_handler,
            exit_code_handler: self.exit_code_handler,
            stdout_handler: self.stdout_handler,
        })
    }
}

fn ensure_unique<'a>(
    direction: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), DescriptorError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(DescriptorError::DuplicateName {
                direction,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::output::OutputSource;

    #[test]
    fn duplicate_output_names_are_rejected() {
        let out = || {
            OutputDescriptor::builder("result", ValueKind::String, OutputSource::Stdout)
                .build()
                .unwrap()
        };
        let err = JobDescriptor::builder("job", "image", "/work")
            .command(["run"])
            .output(out())
            .output(out())
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DescriptorError::DuplicateName {
                direction: "output",
                name: "result".into()
            }
        );
    }

    #[test]
    fn command_is_required() {
        assert!(JobDescriptor::builder("job", "image", "/work").build().is_err());
    }
}

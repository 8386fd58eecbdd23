#![allow(dead_code)]

use procjob::config::{JobSection, RawInput, RawJobFile, RawOutput, ReadFrom, UseAs};
use procjob::descriptor::JobDescriptor;
use procjob::errors::ConfigResult;

/// Builder for `RawJobFile` to simplify test setup.
///
/// Goes through the same `TryFrom` conversion as a job file on disk.
pub struct JobFileBuilder {
    raw: RawJobFile,
}

impl JobFileBuilder {
    pub fn new(title: &str, image: &str, working_directory: &str, command: &[&str]) -> Self {
        Self {
            raw: RawJobFile {
                job: JobSection {
                    title: title.to_string(),
                    description: None,
                    image_id: image.to_string(),
                    working_directory: working_directory.to_string(),
                    command_to_execute: command.iter().map(|s| s.to_string()).collect(),
                    default_command_line_flags: Vec::new(),
                    stderr_handler: "ignore".to_string(),
                    exit_value_handler: "ignore".to_string(),
                    stdout_handler: "ignore".to_string(),
                },
                input: Vec::new(),
                output: Vec::new(),
            },
        }
    }

    pub fn default_flags(mut self, flags: &[&str]) -> Self {
        self.raw.job.default_command_line_flags = flags.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn stderr_handler(mut self, name: &str) -> Self {
        self.raw.job.stderr_handler = name.to_string();
        self
    }

    pub fn exit_value_handler(mut self, name: &str) -> Self {
        self.raw.job.exit_value_handler = name.to_string();
        self
    }

    pub fn stdout_handler(mut self, name: &str) -> Self {
        self.raw.job.stdout_handler = name.to_string();
        self
    }

    pub fn with_input(mut self, input: RawInput) -> Self {
        self.raw.input.push(input);
        self
    }

    pub fn with_output(mut self, output: RawOutput) -> Self {
        self.raw.output.push(output);
        self
    }

    pub fn raw(self) -> RawJobFile {
        self.raw
    }

    pub fn try_build(self) -> ConfigResult<JobDescriptor> {
        JobDescriptor::try_from(self.raw)
    }

    pub fn build(self) -> JobDescriptor {
        self.try_build()
            .expect("Failed to build valid job from builder")
    }
}

/// Builder for one `[[input]]` entry.
pub struct InputBuilder {
    raw: RawInput,
}

impl InputBuilder {
    pub fn new(title: &str, use_as: UseAs, kind: &str) -> Self {
        Self {
            raw: RawInput {
                title: title.to_string(),
                description: None,
                use_as,
                kind: kind.to_string(),
                optional: false,
                flag: None,
                default: None,
                allowed: None,
                crs: None,
                path: None,
                schema: None,
            },
        }
    }

    pub fn argument(title: &str, kind: &str) -> Self {
        Self::new(title, UseAs::CommandLineArgument, kind)
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.raw.flag = Some(flag.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.raw.optional = true;
        self
    }

    pub fn default(mut self, value: &str) -> Self {
        self.raw.default = Some(value.to_string());
        self
    }

    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.raw.allowed = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn crs(mut self, crs: &[&str]) -> Self {
        self.raw.crs = Some(crs.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn path(mut self, path: &str) -> Self {
        self.raw.path = Some(path.to_string());
        self
    }

    pub fn schema(mut self, location: &str) -> Self {
        self.raw.schema = Some(location.to_string());
        self
    }

    pub fn build(self) -> RawInput {
        self.raw
    }
}

/// Builder for one `[[output]]` entry.
pub struct OutputBuilder {
    raw: RawOutput,
}

impl OutputBuilder {
    pub fn new(title: &str, read_from: ReadFrom, kind: &str) -> Self {
        Self {
            raw: RawOutput {
                title: title.to_string(),
                description: None,
                read_from,
                kind: kind.to_string(),
                path: None,
                schema: None,
            },
        }
    }

    pub fn path(mut self, path: &str) -> Self {
        self.raw.path = Some(path.to_string());
        self
    }

    pub fn schema(mut self, location: &str) -> Self {
        self.raw.schema = Some(location.to_string());
        self
    }

    pub fn build(self) -> RawOutput {
        self.raw
    }
}

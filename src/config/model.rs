// src/config/model.rs

use serde::Deserialize;

/// A job file as read from TOML.
///
/// ```toml
/// [job]
/// title = "quakeledger"
/// image_id = "quakeledger:latest"
/// working_directory = "/usr/share/git/quakeledger"
/// command_to_execute = ["python3", "eventquery.py"]
/// stderr_handler = "logging"
///
/// [[input]]
/// title = "mmin"
/// use_as = "commandLineArgument"
/// type = "double"
/// default = "6.6"
///
/// [[output]]
/// title = "selectedRows"
/// read_from = "file"
/// type = "quakeml"
/// path = "test.xml"
/// ```
///
/// Inputs and outputs keep their file order; input order is the order of
/// command-line arguments.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawJobFile {
    pub job: JobSection,

    #[serde(default)]
    pub input: Vec<RawInput>,

    #[serde(default)]
    pub output: Vec<RawOutput>,
}

/// `[job]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSection {
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub description: Option<String>,

    pub image_id: String,

    pub working_directory: String,

    /// Program followed by its fixed arguments.
    pub command_to_execute: Vec<String>,

    #[serde(default)]
    pub default_command_line_flags: Vec<String>,

    /// `ignore`, `logging`, `errorIfNotEmpty`, `pythonTraceback` or `rError`.
    #[serde(default = "default_handler")]
    pub stderr_handler: String,

    /// `ignore`, `logging` or `errorIfNotZero`.
    #[serde(default = "default_handler")]
    pub exit_value_handler: String,

    /// `ignore` or `logging`.
    #[serde(default = "default_handler")]
    pub stdout_handler: String,
}

fn default_handler() -> String {
    "ignore".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UseAs {
    CommandLineArgument,
    File,
    Stdin,
}

/// One `[[input]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawInput {
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub description: Option<String>,

    pub use_as: UseAs,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub optional: bool,

    /// Command-line flag placed before the value.
    #[serde(default)]
    pub flag: Option<String>,

    /// Literal default, in the same textual form as CLI input.
    #[serde(default)]
    pub default: Option<String>,

    #[serde(default)]
    pub allowed: Option<Vec<String>>,

    /// Supported CRS for bounding boxes.
    #[serde(default)]
    pub crs: Option<Vec<String>>,

    /// Target path for `use_as = "file"`.
    #[serde(default)]
    pub path: Option<String>,

    /// Schema location for `type = "xml"`.
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadFrom {
    File,
    Stdout,
    Stderr,
    ExitValue,
}

/// One `[[output]]` entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawOutput {
    pub title: String,

    #[serde(rename = "abstract", default)]
    pub description: Option<String>,

    pub read_from: ReadFrom,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub schema: Option<String>,
}

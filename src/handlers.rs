// src/handlers.rs

//! Process-level handlers for stderr, exit code and stdout.
//!
//! These look at the raw streams of a finished run. The stderr and exit-code
//! handlers may reject the whole invocation; the stdout handler only
//! observes.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::errors::JobError;

const PYTHON_TRACEBACK_MARKER: &str = "Traceback (most recent call";

static R_ERROR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Error").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StderrHandler {
    /// Log every non-empty line.
    Log,
    /// Fail if stderr has any non-whitespace content.
    ErrorIfNotEmpty,
    /// Fail if a Python traceback was printed.
    PythonTraceback,
    /// Fail if an R error message was printed.
    RError,
}

impl StderrHandler {
    pub fn handle(self, job: &str, stderr: &str) -> Result<(), JobError> {
        match self {
            StderrHandler::Log => {
                for line in stderr.lines().filter(|l| !l.trim().is_empty()) {
                    info!(job = %job, "stderr: {}", line);
                }
                Ok(())
            }
            StderrHandler::ErrorIfNotEmpty => {
                let trimmed = stderr.trim();
                if trimmed.is_empty() {
                    Ok(())
                } else {
                    Err(JobError::NonEmptyStderr(trimmed.to_string()))
                }
            }
            StderrHandler::PythonTraceback => match stderr.find(PYTHON_TRACEBACK_MARKER) {
                Some(start) => Err(JobError::NonEmptyStderr(stderr[start..].to_string())),
                None => Ok(()),
            },
            StderrHandler::RError => match R_ERROR_LINE.find(stderr) {
                Some(m) => Err(JobError::NonEmptyStderr(stderr[m.start()..].to_string())),
                None => Ok(()),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCodeHandler {
    Log,
    ErrorIfNotZero,
}

impl ExitCodeHandler {
    pub fn handle(self, job: &str, exit_code: i32) -> Result<(), JobError> {
        match self {
            ExitCodeHandler::Log => {
                info!(job = %job, exit_code, "process exited");
                Ok(())
            }
            ExitCodeHandler::ErrorIfNotZero if exit_code != 0 => {
                warn!(job = %job, exit_code, "process exited with non-zero code");
                Err(JobError::NonZeroExitCode(exit_code))
            }
            ExitCodeHandler::ErrorIfNotZero => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdoutHandler {
    Log,
}

impl StdoutHandler {
    pub fn handle(self, job: &str, stdout: &str) {
        match self {
            StdoutHandler::Log => {
                for line in stdout.lines() {
                    debug!(job = %job, "stdout: {}", line);
                }
            }
        }
    }
}

/// Parses a handler name from a job file. `ignore` means no handler.
fn parse_optional<T>(
    s: &str,
    what: &str,
    options: &[(&str, Option<T>)],
) -> Result<Option<T>, String>
where
    T: Copy,
{
    let wanted = s.trim();
    options
        .iter()
        .find(|(name, _)| *name == wanted)
        .map(|(_, handler)| *handler)
        .ok_or_else(|| {
            let names: Vec<&str> = options.iter().map(|(name, _)| *name).collect();
            format!(
                "invalid {what} \"{wanted}\" (expected one of: {})",
                names.join(", ")
            )
        })
}

/// Handler selection as written in a job file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerChoice<T>(pub Option<T>);

impl FromStr for HandlerChoice<StderrHandler> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_optional(
            s,
            "stderr_handler",
            &[
                ("ignore", None),
                ("logging", Some(StderrHandler::Log)),
                ("errorIfNotEmpty", Some(StderrHandler::ErrorIfNotEmpty)),
                ("pythonTraceback", Some(StderrHandler::PythonTraceback)),
                ("rError", Some(StderrHandler::RError)),
            ],
        )
        .map(HandlerChoice)
    }
}

impl FromStr for HandlerChoice<ExitCodeHandler> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_optional(
            s,
            "exit_value_handler",
            &[
                ("ignore", None),
                ("logging", Some(ExitCodeHandler::Log)),
                ("errorIfNotZero", Some(ExitCodeHandler::ErrorIfNotZero)),
            ],
        )
        .map(HandlerChoice)
    }
}

impl FromStr for HandlerChoice<StdoutHandler> {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_optional(
            s,
            "stdout_handler",
            &[("ignore", None), ("logging", Some(StdoutHandler::Log))],
        )
        .map(HandlerChoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn whitespace_only_stderr_is_not_an_error() {
        assert!(StderrHandler::ErrorIfNotEmpty.handle("job", " \n\t").is_ok());
        let err = StderrHandler::ErrorIfNotEmpty
            .handle("job", "warning: deprecated\n")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonEmptyStderr);
        assert_eq!(err.to_string(), "process reported an error on stderr: warning: deprecated");
    }

    #[test]
    fn python_traceback_is_cut_from_marker() {
        let stderr = "loading...\nTraceback (most recent call last):\n  File \"x.py\"\nValueError: bad\n";
        match StderrHandler::PythonTraceback.handle("job", stderr) {
            Err(JobError::NonEmptyStderr(msg)) => {
                assert!(msg.starts_with("Traceback (most recent call last):"));
                assert!(msg.ends_with("ValueError: bad\n"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(StderrHandler::PythonTraceback.handle("job", "just a warning").is_ok());
    }

    #[test]
    fn r_error_requires_line_start() {
        let stderr = "Loading required package: sp\nError in readOGR(): cannot open file\n";
        match StderrHandler::RError.handle("job", stderr) {
            Err(JobError::NonEmptyStderr(msg)) => {
                assert_eq!(msg, "Error in readOGR(): cannot open file\n");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(StderrHandler::RError.handle("job", "no Error here").is_ok());
    }

    #[test]
    fn exit_code_handler_rejects_non_zero() {
        assert!(ExitCodeHandler::ErrorIfNotZero.handle("job", 0).is_ok());
        assert!(ExitCodeHandler::Log.handle("job", 3).is_ok());
        let err = ExitCodeHandler::ErrorIfNotZero.handle("job", 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NonZeroExitCode);
    }

    #[test]
    fn handler_names_parse() {
        let choice: HandlerChoice<StderrHandler> = "pythonTraceback".parse().unwrap();
        assert_eq!(choice.0, Some(StderrHandler::PythonTraceback));
        let ignore: HandlerChoice<ExitCodeHandler> = "ignore".parse().unwrap();
        assert_eq!(ignore.0, None);
        assert!("loud".parse::<HandlerChoice<StdoutHandler>>().is_err());
    }
}

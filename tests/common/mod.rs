#![allow(dead_code)]

pub use procjob_test_utils::builders;
pub use procjob_test_utils::{FailAt, SpyProvider, init_tracing, with_timeout};

use procjob::descriptor::JobDescriptor;
use procjob::descriptor::factory::{
    command_line_input, exit_code_output, file_input, file_output, stdin_input, stdout_output,
};
use procjob::handlers::StderrHandler;
use procjob::types::{InputMap, Value, ValueKind, XmlSchema};

pub const QUAKEML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<q:quakeml xmlns="http://quakeml.org/xmlns/bed/1.2" xmlns:q="http://quakeml.org/xmlns/quakeml/1.2">
  <eventParameters publicID="quakeml:quakeledger/0"/>
</q:quakeml>
"#;

/// Build an input map from `(name, value)` pairs, one value per name.
pub fn inputs(pairs: &[(&str, Value)]) -> InputMap {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), vec![value.clone()]))
        .collect()
}

/// One double input bound to `--threshold`, default 0.5.
pub fn threshold_job() -> JobDescriptor {
    JobDescriptor::builder("filter", "alpine:3", "/work")
        .command(["python3", "filter.py"])
        .input(
            command_line_input("threshold", ValueKind::Double, Some("--threshold"))
                .expect("double argument")
                .default_value(Value::Double(0.5))
                .build()
                .expect("threshold input"),
        )
        .output(stdout_output("result", ValueKind::String).build().expect("stdout output"))
        .build()
        .expect("threshold job")
}

/// A job touching every delivery and source:
///
/// - `mode` (string, allowed fast/slow) and `count` (integer, `-n`) on the
///   command line,
/// - `config` (json) written to `config.json`,
/// - `payload` (string) on stdin,
/// - outputs `summary` (stdout, string), `status` (exit code) and `events`
///   (file `events.xml`, QuakeML).
pub fn pipeline_job() -> JobDescriptor {
    JobDescriptor::builder("pipeline", "pipeline:1.0", "/work")
        .command(["run.sh"])
        .default_flags(["--verbose"])
        .input(
            command_line_input("mode", ValueKind::String, None)
                .expect("string argument")
                .allowed_values(vec![
                    Value::String("fast".to_string()),
                    Value::String("slow".to_string()),
                ])
                .build()
                .expect("mode input"),
        )
        .input(
            command_line_input("count", ValueKind::Integer, Some("-n"))
                .expect("integer argument")
                .build()
                .expect("count input"),
        )
        .input(
            file_input("config", ValueKind::Json, "config.json")
                .build()
                .expect("config input"),
        )
        .input(stdin_input("payload", ValueKind::String).build().expect("payload input"))
        .output(stdout_output("summary", ValueKind::String).build().expect("summary output"))
        .output(exit_code_output("status").build().expect("status output"))
        .output(
            file_output("events", ValueKind::Xml(XmlSchema::QuakeMl), "events.xml")
                .build()
                .expect("events output"),
        )
        .build()
        .expect("pipeline job")
}

pub fn pipeline_inputs() -> InputMap {
    inputs(&[
        ("mode", Value::String("fast".to_string())),
        ("count", Value::Integer(3)),
        ("config", Value::Json(serde_json::json!({ "depth": 10 }))),
        ("payload", Value::String("1 2 3\n".to_string())),
    ])
}

/// Job whose stderr handler fails on any non-whitespace output.
pub fn strict_stderr_job() -> JobDescriptor {
    JobDescriptor::builder("strict", "alpine:3", "/work")
        .command(["sh", "-c", "echo done"])
        .output(stdout_output("summary", ValueKind::String).build().expect("summary output"))
        .stderr_handler(Some(StderrHandler::ErrorIfNotEmpty))
        .build()
        .expect("strict job")
}

/// Spy scripted with a successful run of `pipeline_job`.
pub fn pipeline_spy() -> SpyProvider {
    SpyProvider::new()
        .with_stdout("3 events")
        .with_exit_code(0)
        .with_output_file("events.xml", QUAKEML)
}

// tests/local_provider.rs
//
// Runs real host processes through `sh`.

mod common;
use crate::common::{init_tracing, inputs, with_timeout};

use std::error::Error;
use std::time::Duration;

use procjob::descriptor::JobDescriptor;
use procjob::descriptor::factory::{
    exit_code_output, file_input, file_output, stderr_output, stdin_input, stdout_output,
};
use procjob::errors::ErrorKind;
use procjob::exec::{Executor, ExecutorOptions, LocalProvider};
use procjob::types::{Value, ValueKind};

type TestResult = Result<(), Box<dyn Error>>;

fn shout_job() -> JobDescriptor {
    JobDescriptor::builder("shout", "host", "/work")
        .command([
            "sh",
            "-c",
            "tr a-z A-Z < in.txt > out.txt; cat; echo oops >&2; exit 3",
        ])
        .input(
            file_input("text", ValueKind::GenericFile, "in.txt")
                .build()
                .expect("text input"),
        )
        .input(stdin_input("payload", ValueKind::String).build().expect("payload input"))
        .output(
            file_output("shouted", ValueKind::GenericFile, "out.txt")
                .build()
                .expect("shouted output"),
        )
        .output(stdout_output("echo", ValueKind::String).build().expect("echo output"))
        .output(stderr_output("warnings", ValueKind::String).build().expect("warnings output"))
        .output(exit_code_output("status").build().expect("status output"))
        .build()
        .expect("shout job")
}

#[tokio::test]
async fn host_process_round_trip() -> TestResult {
    init_tracing();

    let executor = Executor::new(LocalProvider::new());
    let raw = inputs(&[
        ("text", Value::GenericFile(b"hello".to_vec())),
        ("payload", Value::String("from stdin".to_string())),
    ]);

    let outputs = with_timeout(executor.execute(&shout_job(), &raw)).await?;

    assert_eq!(outputs["shouted"], Value::GenericFile(b"HELLO".to_vec()));
    assert_eq!(outputs["echo"], Value::String("from stdin".to_string()));
    assert_eq!(outputs["warnings"], Value::String("oops\n".to_string()));
    assert_eq!(outputs["status"], Value::Integer(3));
    Ok(())
}

#[tokio::test]
async fn large_output_does_not_block_on_pipes() -> TestResult {
    init_tracing();

    let job = JobDescriptor::builder("flood", "host", "/work")
        .command(["sh", "-c", "head -c 1048576 /dev/zero | tr '\\0' x; cat > /dev/null"])
        .input(stdin_input("payload", ValueKind::String).build()?)
        .output(stdout_output("flood", ValueKind::String).build()?)
        .build()?;

    let executor = Executor::new(LocalProvider::new());
    let raw = inputs(&[("payload", Value::String("y".repeat(256 * 1024)))]);

    let outputs = with_timeout(executor.execute(&job, &raw)).await?;
    match &outputs["flood"] {
        Value::String(text) => assert_eq!(text.len(), 1_048_576),
        other => panic!("unexpected value {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn missing_output_file_fails_the_call() -> TestResult {
    init_tracing();

    let job = JobDescriptor::builder("nofile", "host", "/work")
        .command(["true"])
        .output(file_output("result", ValueKind::Json, "result.json").build()?)
        .build()?;

    let executor = Executor::new(LocalProvider::new());
    let err = with_timeout(executor.execute(&job, &inputs(&[])))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SandboxIo);
    Ok(())
}

#[tokio::test]
async fn killed_process_reports_shell_style_exit_code() -> TestResult {
    init_tracing();

    let job = JobDescriptor::builder("killed", "host", "/work")
        .command(["sh", "-c", "kill -9 $$"])
        .output(exit_code_output("status").build()?)
        .build()?;

    let executor = Executor::new(LocalProvider::new());
    let outputs = with_timeout(executor.execute(&job, &inputs(&[]))).await?;

    assert_eq!(outputs["status"], Value::Integer(137));
    assert_eq!(outputs.len(), 1);
    Ok(())
}

#[tokio::test]
async fn slow_process_hits_wait_timeout() -> TestResult {
    init_tracing();

    let job = JobDescriptor::builder("sleepy", "host", "/work")
        .command(["sleep", "5"])
        .build()?;

    let executor = Executor::with_options(
        LocalProvider::new(),
        ExecutorOptions {
            wait_timeout: Some(Duration::from_millis(200)),
        },
    );
    let err = with_timeout(executor.execute(&job, &inputs(&[])))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionInterrupted);
    Ok(())
}

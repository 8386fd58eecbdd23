// tests/teardown_guarantee.rs

mod common;
use crate::common::{
    FailAt, SpyProvider, init_tracing, inputs, pipeline_inputs, pipeline_job, pipeline_spy,
    strict_stderr_job,
};

use std::error::Error;

use procjob::errors::{ErrorKind, JobError};
use procjob::exec::Executor;
use procjob::types::Value;

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn every_failing_step_tears_down_exactly_once() -> TestResult {
    init_tracing();

    let cases = [
        (FailAt::WriteFile, ErrorKind::SandboxIo),
        (FailAt::Run, ErrorKind::SandboxIo),
        (FailAt::StdinWrite, ErrorKind::SandboxIo),
        (FailAt::Wait, ErrorKind::ExecutionInterrupted),
        (FailAt::ReadFile, ErrorKind::SandboxIo),
    ];

    for (step, expected) in cases {
        let spy = pipeline_spy().failing_at(step);
        let executor = Executor::new(spy.clone());

        let err = executor
            .execute(&pipeline_job(), &pipeline_inputs())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), expected, "failure injected at {step:?}");
        assert_eq!(spy.teardowns(), 1, "failure injected at {step:?}");
        assert_eq!(
            spy.events().last().map(String::as_str),
            Some("teardown"),
            "failure injected at {step:?}"
        );
    }
    Ok(())
}

#[tokio::test]
async fn stdin_inputs_need_a_stdin_stream() -> TestResult {
    init_tracing();

    let spy = pipeline_spy().without_stdin();
    let executor = Executor::new(spy.clone());

    let err = executor
        .execute(&pipeline_job(), &pipeline_inputs())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SandboxIo);
    assert!(err.to_string().contains("payload"), "{err}");
    assert!(spy.stdin().is_empty());
    assert_eq!(spy.teardowns(), 1);
    assert!(!spy.events().iter().any(|e| e == "wait"));
    Ok(())
}

#[tokio::test]
async fn missing_stdin_stream_is_fine_without_stdin_inputs() -> TestResult {
    init_tracing();

    let spy = SpyProvider::new().with_stdout("done\n").without_stdin();
    let executor = Executor::new(spy.clone());

    let outputs = executor.execute(&strict_stderr_job(), &inputs(&[])).await?;
    assert_eq!(outputs["summary"], Value::String("done\n".to_string()));
    assert_eq!(spy.teardowns(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_creation_has_nothing_to_tear_down() -> TestResult {
    init_tracing();

    let spy = pipeline_spy().failing_at(FailAt::Create);
    let executor = Executor::new(spy.clone());

    let err = executor
        .execute(&pipeline_job(), &pipeline_inputs())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SandboxIo);
    assert_eq!(spy.created().len(), 1);
    assert_eq!(spy.teardowns(), 0);
    assert_eq!(spy.runs(), 0);
    Ok(())
}

#[tokio::test]
async fn teardown_failure_does_not_replace_the_outcome() -> TestResult {
    init_tracing();

    let spy = pipeline_spy().failing_at(FailAt::Teardown);
    let executor = Executor::new(spy.clone());

    let outputs = executor.execute(&pipeline_job(), &pipeline_inputs()).await?;

    assert_eq!(outputs["summary"], Value::String("3 events".to_string()));
    assert_eq!(spy.teardowns(), 1);
    Ok(())
}

#[tokio::test]
async fn stderr_content_fails_strict_job_and_tears_down() -> TestResult {
    init_tracing();

    let spy = SpyProvider::new()
        .with_stdout("done\n")
        .with_stderr("warning: deprecated");
    let executor = Executor::new(spy.clone());

    match executor.execute(&strict_stderr_job(), &inputs(&[])).await {
        Err(JobError::NonEmptyStderr(text)) => assert_eq!(text, "warning: deprecated"),
        other => panic!("expected NonEmptyStderr, got {other:?}"),
    }
    assert_eq!(spy.teardowns(), 1);
    Ok(())
}

#[tokio::test]
async fn whitespace_only_stderr_passes_strict_job() -> TestResult {
    init_tracing();

    let spy = SpyProvider::new().with_stdout("done\n").with_stderr(" \n\t");
    let executor = Executor::new(spy.clone());

    let outputs = executor.execute(&strict_stderr_job(), &inputs(&[])).await?;
    assert_eq!(outputs["summary"], Value::String("done\n".to_string()));
    assert_eq!(spy.teardowns(), 1);
    Ok(())
}

#[tokio::test]
async fn concurrent_invocations_get_their_own_contexts() -> TestResult {
    init_tracing();

    let spy = pipeline_spy();
    let executor = Executor::new(spy.clone());
    let job = pipeline_job();
    let raw = pipeline_inputs();

    let (a, b) = tokio::join!(executor.execute(&job, &raw), executor.execute(&job, &raw));
    assert_eq!(a?, b?);
    assert_eq!(spy.created().len(), 2);
    assert_eq!(spy.teardowns(), 2);
    Ok(())
}

use std::collections::HashMap;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::AsyncWrite;

use procjob::exec::{
    BoxFuture, ContextError, ContextSpec, ExecutionContext, ExecutionContextProvider,
    ExecutionRun, RunResult, StdinStream,
};

/// Step at which the spy reports a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Create,
    WriteFile,
    Run,
    StdinWrite,
    Wait,
    ReadFile,
    Teardown,
}

/// A file copied into a spy context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub working_directory: String,
    pub path: String,
    pub content: Vec<u8>,
}

/// Everything the spy saw, across all contexts it created.
#[derive(Debug, Default)]
pub struct SpyState {
    pub created: Vec<ContextSpec>,
    pub written: Vec<WrittenFile>,
    pub stdin: Vec<u8>,
    pub stdin_closed: bool,
    pub reads: Vec<String>,
    pub runs: usize,
    pub teardowns: usize,
    /// Call order, e.g. `create`, `write:in.json`, `run`, `wait`,
    /// `read:out.xml`, `teardown`.
    pub events: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Script {
    result: RunResult,
    files: HashMap<String, Vec<u8>>,
    fail_at: Option<FailAt>,
    hang: bool,
    wait_delay: Option<Duration>,
    image_id: Option<String>,
    no_stdin: bool,
}

/// Scripted execution context provider.
///
/// Never runs anything: `run` returns the scripted [`RunResult`] and
/// `read_file` serves the scripted output files. Clones share state, so a
/// test keeps one clone for assertions and hands the other to the executor.
#[derive(Debug, Clone, Default)]
pub struct SpyProvider {
    state: Arc<Mutex<SpyState>>,
    script: Arc<Mutex<Script>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn injected(step: &str) -> ContextError {
    ContextError::Command(format!("injected failure at {step}"))
}

impl SpyProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit_code(self, exit_code: i32) -> Self {
        lock(&self.script).result.exit_code = exit_code;
        self
    }

    pub fn with_stdout(self, stdout: impl AsRef<[u8]>) -> Self {
        lock(&self.script).result.stdout = stdout.as_ref().to_vec();
        self
    }

    pub fn with_stderr(self, stderr: impl AsRef<[u8]>) -> Self {
        lock(&self.script).result.stderr = stderr.as_ref().to_vec();
        self
    }

    /// File served by `read_file(path)` after the run.
    pub fn with_output_file(self, path: &str, content: impl AsRef<[u8]>) -> Self {
        lock(&self.script)
            .files
            .insert(path.to_string(), content.as_ref().to_vec());
        self
    }

    pub fn failing_at(self, step: FailAt) -> Self {
        lock(&self.script).fail_at = Some(step);
        self
    }

    /// `wait_for_completion` never finishes.
    pub fn hanging(self) -> Self {
        lock(&self.script).hang = true;
        self
    }

    pub fn with_wait_delay(self, delay: Duration) -> Self {
        lock(&self.script).wait_delay = Some(delay);
        self
    }

    /// Identity reported by `resolve_image_id`. Without one the image
    /// reference is echoed back.
    pub fn with_image_id(self, image_id: &str) -> Self {
        self.set_image_id(image_id);
        self
    }

    /// Simulates a rebuilt image under an unchanged tag.
    pub fn set_image_id(&self, image_id: &str) {
        lock(&self.script).image_id = Some(image_id.to_string());
    }

    /// Started runs expose no stdin stream.
    pub fn without_stdin(self) -> Self {
        lock(&self.script).no_stdin = true;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, SpyState> {
        lock(&self.state)
    }

    pub fn created(&self) -> Vec<ContextSpec> {
        self.state().created.clone()
    }

    pub fn last_command(&self) -> Option<Vec<String>> {
        self.state().created.last().map(|spec| spec.command.clone())
    }

    pub fn written_files(&self) -> Vec<WrittenFile> {
        self.state().written.clone()
    }

    pub fn stdin(&self) -> Vec<u8> {
        self.state().stdin.clone()
    }

    pub fn teardowns(&self) -> usize {
        self.state().teardowns
    }

    pub fn runs(&self) -> usize {
        self.state().runs
    }

    pub fn events(&self) -> Vec<String> {
        self.state().events.clone()
    }

    fn fails_at(&self, step: FailAt) -> bool {
        lock(&self.script).fail_at == Some(step)
    }
}

impl ExecutionContextProvider for SpyProvider {
    fn resolve_image_id<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String, ContextError>> {
        let image_id = lock(&self.script)
            .image_id
            .clone()
            .unwrap_or_else(|| image.to_string());
        Box::pin(async move { Ok(image_id) })
    }

    fn create_context<'a>(
        &'a self,
        spec: &'a ContextSpec,
    ) -> BoxFuture<'a, Result<Box<dyn ExecutionContext>, ContextError>> {
        Box::pin(async move {
            {
                let mut state = self.state();
                state.created.push(spec.clone());
                state.events.push("create".to_string());
            }
            if self.fails_at(FailAt::Create) {
                return Err(injected("create"));
            }
            Ok(Box::new(SpyContext {
                provider: self.clone(),
            }) as Box<dyn ExecutionContext>)
        })
    }
}

struct SpyContext {
    provider: SpyProvider,
}

impl ExecutionContext for SpyContext {
    fn write_file<'a>(
        &'a mut self,
        content: &'a [u8],
        working_directory: &'a str,
        relative_path: &'a str,
    ) -> BoxFuture<'a, Result<(), ContextError>> {
        Box::pin(async move {
            let mut state = self.provider.state();
            state.events.push(format!("write:{relative_path}"));
            if self.provider.fails_at(FailAt::WriteFile) {
                return Err(injected("write"));
            }
            state.written.push(WrittenFile {
                working_directory: working_directory.to_string(),
                path: relative_path.to_string(),
                content: content.to_vec(),
            });
            Ok(())
        })
    }

    fn read_file<'a>(
        &'a mut self,
        relative_path: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, ContextError>> {
        Box::pin(async move {
            {
                let mut state = self.provider.state();
                state.reads.push(relative_path.to_string());
                state.events.push(format!("read:{relative_path}"));
            }
            if self.provider.fails_at(FailAt::ReadFile) {
                return Err(injected("read"));
            }
            lock(&self.provider.script)
                .files
                .get(relative_path)
                .cloned()
                .ok_or_else(|| ContextError::MissingFile(relative_path.to_string()))
        })
    }

    fn run(&mut self) -> BoxFuture<'_, Result<Box<dyn ExecutionRun>, ContextError>> {
        Box::pin(async move {
            {
                let mut state = self.provider.state();
                state.runs += 1;
                state.events.push("run".to_string());
            }
            if self.provider.fails_at(FailAt::Run) {
                return Err(injected("run"));
            }
            Ok(Box::new(SpyRun {
                provider: self.provider.clone(),
                stdin_taken: false,
            }) as Box<dyn ExecutionRun>)
        })
    }

    fn teardown(&mut self) -> BoxFuture<'_, Result<(), ContextError>> {
        Box::pin(async move {
            {
                let mut state = self.provider.state();
                state.teardowns += 1;
                state.events.push("teardown".to_string());
            }
            if self.provider.fails_at(FailAt::Teardown) {
                return Err(injected("teardown"));
            }
            Ok(())
        })
    }
}

struct SpyRun {
    provider: SpyProvider,
    stdin_taken: bool,
}

impl ExecutionRun for SpyRun {
    fn take_stdin(&mut self) -> Option<StdinStream> {
        if self.stdin_taken || lock(&self.provider.script).no_stdin {
            return None;
        }
        self.stdin_taken = true;
        Some(Box::new(StdinRecorder {
            state: Arc::clone(&self.provider.state),
            fail: self.provider.fails_at(FailAt::StdinWrite),
        }))
    }

    fn wait_for_completion(
        self: Box<Self>,
    ) -> BoxFuture<'static, Result<RunResult, ContextError>> {
        Box::pin(async move {
            self.provider.state().events.push("wait".to_string());
            let script = lock(&self.provider.script).clone();
            if script.hang {
                std::future::pending::<()>().await;
            }
            if let Some(delay) = script.wait_delay {
                tokio::time::sleep(delay).await;
            }
            if script.fail_at == Some(FailAt::Wait) {
                return Err(ContextError::Interrupted("injected failure at wait".to_string()));
            }
            Ok(script.result)
        })
    }
}

/// Captures what the orchestrator writes to stdin.
struct StdinRecorder {
    state: Arc<Mutex<SpyState>>,
    fail: bool,
}

impl AsyncWrite for StdinRecorder {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        if self.fail {
            return Poll::Ready(Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected failure at stdin",
            )));
        }
        lock(&self.state).stdin.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        lock(&self.state).stdin_closed = true;
        Poll::Ready(Ok(()))
    }
}

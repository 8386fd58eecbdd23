// src/exec/context.rs

//! Execution context provider abstraction.
//!
//! The orchestrator never talks to a container runtime directly. It asks an
//! [`ExecutionContextProvider`] for a fresh [`ExecutionContext`] per
//! invocation, copies files in, runs the command once, copies files out and
//! finally tears the context down.
//!
//! - [`DockerProvider`](crate::exec::docker::DockerProvider) is the
//!   production implementation.
//! - [`LocalProvider`](crate::exec::local::LocalProvider) runs on the host in
//!   a scratch directory.
//! - Tests plug in a scripted spy that records every call.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tokio::io::AsyncWrite;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Writable standard input of a running process.
pub type StdinStream = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file not found in sandbox: {0}")]
    MissingFile(String),

    #[error("sandbox command failed: {0}")]
    Command(String),

    #[error("interrupted: {0}")]
    Interrupted(String),
}

/// What to create a sandbox for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSpec {
    pub image: String,
    pub working_directory: String,
    pub command: Vec<String>,
}

/// Captured result of a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunResult {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Creates isolated execution contexts.
///
/// Must support concurrent creation; each invocation gets its own context.
pub trait ExecutionContextProvider: Send + Sync {
    /// Resolve an image reference to the identity of the image it points
    /// at right now. Cache keys hash this value, so a rebuilt image under
    /// the same tag yields new keys.
    fn resolve_image_id<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String, ContextError>>;

    fn create_context<'a>(
        &'a self,
        spec: &'a ContextSpec,
    ) -> BoxFuture<'a, Result<Box<dyn ExecutionContext>, ContextError>>;
}

/// One sandbox, used by exactly one invocation.
pub trait ExecutionContext: Send {
    /// Write `content` to `relative_path` below `working_directory`.
    fn write_file<'a>(
        &'a mut self,
        content: &'a [u8],
        working_directory: &'a str,
        relative_path: &'a str,
    ) -> BoxFuture<'a, Result<(), ContextError>>;

    /// Read a file relative to the working directory. Absent files are an
    /// error.
    fn read_file<'a>(&'a mut self, relative_path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ContextError>>;

    /// Start the command.
    fn run(&mut self) -> BoxFuture<'_, Result<Box<dyn ExecutionRun>, ContextError>>;

    /// Destroy the sandbox. Calling it more than once is a no-op.
    fn teardown(&mut self) -> BoxFuture<'_, Result<(), ContextError>>;
}

/// A started process inside a context.
pub trait ExecutionRun: Send {
    /// Take the process's stdin. Returns `None` once taken.
    fn take_stdin(&mut self) -> Option<StdinStream>;

    /// Wait for exit and collect the captured streams.
    fn wait_for_completion(self: Box<Self>) -> BoxFuture<'static, Result<RunResult, ContextError>>;
}

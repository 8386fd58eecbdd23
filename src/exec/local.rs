// src/exec/local.rs

//! Host-process provider.
//!
//! Runs the command directly on the host with a temporary directory standing
//! in for the container filesystem: the job's working directory is created
//! below it and used as the process's current directory. There is no
//! isolation beyond that, so this is meant for development and tests.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use crate::exec::context::{
    BoxFuture, ContextError, ContextSpec, ExecutionContext, ExecutionContextProvider, ExecutionRun,
};
use crate::exec::process::ProcessRun;

#[derive(Debug, Clone, Default)]
pub struct LocalProvider;

impl LocalProvider {
    pub fn new() -> Self {
        Self
    }
}

fn below(root: &Path, absolute_or_relative: &str) -> PathBuf {
    root.join(absolute_or_relative.trim_start_matches('/'))
}

impl ExecutionContextProvider for LocalProvider {
    /// There is no image on the host, so the reference is its own identity.
    fn resolve_image_id<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String, ContextError>> {
        Box::pin(async move { Ok(image.to_string()) })
    }

    fn create_context<'a>(
        &'a self,
        spec: &'a ContextSpec,
    ) -> BoxFuture<'a, Result<Box<dyn ExecutionContext>, ContextError>> {
        Box::pin(async move {
            if spec.command.is_empty() {
                return Err(ContextError::Command("empty command".to_string()));
            }
            let root = TempDir::new()?;
            let working_directory = below(root.path(), &spec.working_directory);
            tokio::fs::create_dir_all(&working_directory).await?;
            debug!(root = %root.path().display(), "local context created");

            Ok(Box::new(LocalContext {
                root: Some(root),
                working_directory,
                command: spec.command.clone(),
            }) as Box<dyn ExecutionContext>)
        })
    }
}

pub struct LocalContext {
    root: Option<TempDir>,
    working_directory: PathBuf,
    command: Vec<String>,
}

impl LocalContext {
    fn root(&self) -> Result<&Path, ContextError> {
        self.root
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| ContextError::Command("context already torn down".to_string()))
    }
}

impl ExecutionContext for LocalContext {
    fn write_file<'a>(
        &'a mut self,
        content: &'a [u8],
        working_directory: &'a str,
        relative_path: &'a str,
    ) -> BoxFuture<'a, Result<(), ContextError>> {
        Box::pin(async move {
            let path = below(self.root()?, working_directory).join(relative_path);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&path, content).await?;
            Ok(())
        })
    }

    fn read_file<'a>(&'a mut self, relative_path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ContextError>> {
        Box::pin(async move {
            self.root()?;
            let path = self.working_directory.join(relative_path);
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(bytes),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    Err(ContextError::MissingFile(relative_path.to_string()))
                }
                Err(err) => Err(err.into()),
            }
        })
    }

    fn run(&mut self) -> BoxFuture<'_, Result<Box<dyn ExecutionRun>, ContextError>> {
        Box::pin(async move {
            self.root()?;
            let (program, args) = self
                .command
                .split_first()
                .ok_or_else(|| ContextError::Command("empty command".to_string()))?;
            let mut cmd = Command::new(program);
            cmd.args(args).current_dir(&self.working_directory);
            let run = ProcessRun::spawn(program.clone(), cmd)?;
            Ok(Box::new(run) as Box<dyn ExecutionRun>)
        })
    }

    fn teardown(&mut self) -> BoxFuture<'_, Result<(), ContextError>> {
        Box::pin(async move {
            if let Some(root) = self.root.take() {
                root.close()?;
            }
            Ok(())
        })
    }
}

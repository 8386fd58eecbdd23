// src/exec/docker.rs

//! Container provider backed by the `docker` CLI.
//!
//! Each context is one container created with a locked-down capability set.
//! Files move in and out as tar streams through `docker container cp`.

use std::io::Read;
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::exec::context::{
    BoxFuture, ContextError, ContextSpec, ExecutionContext, ExecutionContextProvider, ExecutionRun,
};
use crate::exec::process::ProcessRun;

const DROPPED_CAPABILITIES: [&str; 14] = [
    "chown",
    "dac_override",
    "fowner",
    "fsetid",
    "kill",
    "setgid",
    "setuid",
    "setpcap",
    "net_bind_service",
    "net_raw",
    "sys_chroot",
    "mknod",
    "audit_write",
    "setfcap",
];

#[derive(Debug, Clone)]
pub struct DockerProvider {
    docker: String,
}

impl DockerProvider {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    pub fn with_binary(docker: impl Into<String>) -> Self {
        Self {
            docker: docker.into(),
        }
    }
}

impl Default for DockerProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for `docker container create`.
pub fn create_arguments(spec: &ContextSpec) -> Vec<String> {
    let mut args: Vec<String> = [
        "container",
        "create",
        "--attach",
        "STDOUT",
        "--attach",
        "STDERR",
        "--interactive",
        "--workdir",
        spec.working_directory.as_str(),
        "--restart",
        "no",
        "--security-opt",
        "seccomp=unconfined",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    for capability in DROPPED_CAPABILITIES {
        args.push("--cap-drop".to_string());
        args.push(capability.to_string());
    }

    args.push(spec.image.clone());
    args.extend(spec.command.iter().cloned());
    args
}

/// Arguments for `docker image inspect` printing only the image id.
pub fn inspect_arguments(image: &str) -> Vec<String> {
    ["image", "inspect", image, "--format", "{{.ID}}"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Run one docker CLI command to completion and return its stdout.
async fn docker_output(
    docker: &str,
    args: &[String],
    stdin: Option<Vec<u8>>,
) -> Result<Vec<u8>, ContextError> {
    let mut cmd = Command::new(docker);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;

    let writer = match (stdin, child.stdin.take()) {
        (Some(bytes), Some(mut pipe)) => Some(tokio::spawn(async move {
            pipe.write_all(&bytes).await?;
            pipe.shutdown().await
        })),
        _ => None,
    };

    let output = child.wait_with_output().await?;

    if let Some(writer) = writer {
        writer
            .await
            .map_err(|e| ContextError::Interrupted(format!("stdin writer stopped: {e}")))??;
    }

    if !output.status.success() {
        let subcommand = args.iter().take(2).cloned().collect::<Vec<_>>().join(" ");
        return Err(ContextError::Command(format!(
            "docker {subcommand} exited with {:?}: {}",
            output.status.code(),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(output.stdout)
}

fn tar_single_file(relative_path: &str, content: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);

    let mut builder = tar::Builder::new(Vec::new());
    builder.append_data(&mut header, relative_path, content)?;
    builder.into_inner()
}

fn first_tar_entry(archive: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    let mut archive = tar::Archive::new(archive);
    let Some(entry) = archive.entries()?.next() else {
        return Ok(None);
    };
    let mut entry = entry?;
    let mut content = Vec::new();
    entry.read_to_end(&mut content)?;
    Ok(Some(content))
}

fn resolve_path(working_directory: &str, relative_path: &str) -> String {
    if relative_path.starts_with('/') {
        relative_path.to_string()
    } else {
        format!("{}/{}", working_directory.trim_end_matches('/'), relative_path)
    }
}

impl ExecutionContextProvider for DockerProvider {
    fn resolve_image_id<'a>(&'a self, image: &'a str) -> BoxFuture<'a, Result<String, ContextError>> {
        Box::pin(async move {
            let stdout = docker_output(&self.docker, &inspect_arguments(image), None).await?;
            let image_id = String::from_utf8_lossy(&stdout).trim().to_string();
            if image_id.is_empty() {
                return Err(ContextError::Command(format!(
                    "docker image inspect printed no id for {image}"
                )));
            }
            debug!(image = %image, image_id = %image_id, "image resolved");
            Ok(image_id)
        })
    }

    fn create_context<'a>(
        &'a self,
        spec: &'a ContextSpec,
    ) -> BoxFuture<'a, Result<Box<dyn ExecutionContext>, ContextError>> {
        Box::pin(async move {
            let stdout = docker_output(&self.docker, &create_arguments(spec), None).await?;
            let container_id = String::from_utf8_lossy(&stdout).trim().to_string();
            if container_id.is_empty() {
                return Err(ContextError::Command(
                    "docker container create printed no container id".to_string(),
                ));
            }

            info!(container = %container_id, image = %spec.image, "container created");

            Ok(Box::new(DockerContext {
                docker: self.docker.clone(),
                container_id,
                working_directory: spec.working_directory.clone(),
                torn_down: false,
            }) as Box<dyn ExecutionContext>)
        })
    }
}

pub struct DockerContext {
    docker: String,
    container_id: String,
    working_directory: String,
    torn_down: bool,
}

impl DockerContext {
    pub fn container_id(&self) -> &str {
        &self.container_id
    }
}

impl ExecutionContext for DockerContext {
    fn write_file<'a>(
        &'a mut self,
        content: &'a [u8],
        working_directory: &'a str,
        relative_path: &'a str,
    ) -> BoxFuture<'a, Result<(), ContextError>> {
        Box::pin(async move {
            let archive = tar_single_file(relative_path, content)?;
            let args = vec![
                "container".to_string(),
                "cp".to_string(),
                "-".to_string(),
                format!("{}:{}", self.container_id, working_directory),
            ];
            debug!(container = %self.container_id, path = %relative_path, "copying file into container");
            docker_output(&self.docker, &args, Some(archive)).await?;
            Ok(())
        })
    }

    fn read_file<'a>(&'a mut self, relative_path: &'a str) -> BoxFuture<'a, Result<Vec<u8>, ContextError>> {
        Box::pin(async move {
            let path = resolve_path(&self.working_directory, relative_path);
            let args = vec![
                "container".to_string(),
                "cp".to_string(),
                format!("{}:{}", self.container_id, path),
                "-".to_string(),
            ];
            debug!(container = %self.container_id, path = %path, "copying file out of container");

            let archive = match docker_output(&self.docker, &args, None).await {
                Ok(archive) => archive,
                Err(ContextError::Command(msg))
                    if msg.contains("No such") || msg.contains("Could not find") =>
                {
                    return Err(ContextError::MissingFile(path));
                }
                Err(err) => return Err(err),
            };

            first_tar_entry(&archive)?.ok_or(ContextError::MissingFile(path))
        })
    }

    fn run(&mut self) -> BoxFuture<'_, Result<Box<dyn ExecutionRun>, ContextError>> {
        Box::pin(async move {
            let mut cmd = Command::new(&self.docker);
            cmd.args(["container", "start", "--interactive", "--attach"])
                .arg(&self.container_id);
            let run = ProcessRun::spawn(format!("container {}", self.container_id), cmd)?;
            Ok(Box::new(run) as Box<dyn ExecutionRun>)
        })
    }

    fn teardown(&mut self) -> BoxFuture<'_, Result<(), ContextError>> {
        Box::pin(async move {
            if self.torn_down {
                return Ok(());
            }
            self.torn_down = true;
            let args = vec![
                "container".to_string(),
                "rm".to_string(),
                "--force".to_string(),
                self.container_id.clone(),
            ];
            docker_output(&self.docker, &args, None).await?;
            info!(container = %self.container_id, "container removed");
            Ok(())
        })
    }
}

impl Drop for DockerContext {
    fn drop(&mut self) {
        if self.torn_down {
            return;
        }
        // Dropped mid-invocation (e.g. the caller's future was cancelled).
        warn!(container = %self.container_id, "context dropped without teardown; removing container");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let docker = self.docker.clone();
            let container_id = self.container_id.clone();
            handle.spawn(async move {
                let _ = Command::new(docker)
                    .args(["container", "rm", "--force"])
                    .arg(container_id)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await;
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_arguments_drop_capabilities_before_image() {
        let spec = ContextSpec {
            image: "quakeledger:latest".into(),
            working_directory: "/usr/share/git/quakeledger".into(),
            command: vec!["python3".into(), "eventquery.py".into(), "6.6".into()],
        };
        let args = create_arguments(&spec);

        assert_eq!(&args[..2], ["container", "create"]);
        let workdir = args.iter().position(|a| a == "--workdir").unwrap();
        assert_eq!(args[workdir + 1], "/usr/share/git/quakeledger");
        assert_eq!(args.iter().filter(|a| *a == "--cap-drop").count(), 14);
        assert_eq!(
            &args[args.len() - 4..],
            ["quakeledger:latest", "python3", "eventquery.py", "6.6"]
        );
    }

    #[test]
    fn image_inspect_prints_only_the_id() {
        assert_eq!(
            inspect_arguments("quakeledger:latest"),
            ["image", "inspect", "quakeledger:latest", "--format", "{{.ID}}"]
        );
    }

    #[test]
    fn tar_round_trip_keeps_content() {
        let archive = tar_single_file("input.json", b"{\"a\":1}").unwrap();
        assert_eq!(first_tar_entry(&archive).unwrap().unwrap(), b"{\"a\":1}".to_vec());
    }

    #[test]
    fn relative_paths_resolve_against_working_directory() {
        assert_eq!(resolve_path("/work/", "out.xml"), "/work/out.xml");
        assert_eq!(resolve_path("/work", "/tmp/out.xml"), "/tmp/out.xml");
    }
}

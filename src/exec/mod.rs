// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`context`] defines the provider / context / run traits the
//!   orchestrator drives.
//! - [`orchestrator`] owns one invocation from input checks to output
//!   collection.
//! - [`process`] spawns a child and drains its streams.
//! - [`docker`] is the container provider used in production.
//! - [`local`] runs on the host in a scratch directory.

pub mod context;
pub mod docker;
pub mod local;
pub mod orchestrator;
pub mod process;

pub use context::{
    BoxFuture, ContextError, ContextSpec, ExecutionContext, ExecutionContextProvider, ExecutionRun,
    RunResult, StdinStream,
};
pub use docker::DockerProvider;
pub use local::LocalProvider;
pub use orchestrator::{
    Executor, ExecutorOptions, ProducedOutput, ProducedOutputs, RealizedInput, RealizedInputs,
    assemble_command, realize_inputs,
};

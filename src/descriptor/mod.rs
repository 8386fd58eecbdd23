// src/descriptor/mod.rs

//! Declarative job and parameter descriptors.
//!
//! - [`input`] / [`output`] describe one slot and how it is bound to the
//!   process (delivery for inputs, source for outputs).
//! - [`job`] aggregates slots with the invocation template and handlers.
//! - [`factory`] offers kind-aware constructors for all of the above.

pub mod factory;
pub mod input;
pub mod job;
pub mod output;

pub use input::{FileArgument, InputDelivery, InputDescriptor, InputDescriptorBuilder};
pub use job::{JobDescriptor, JobDescriptorBuilder};
pub use output::{OutputDescriptor, OutputDescriptorBuilder, OutputSource};

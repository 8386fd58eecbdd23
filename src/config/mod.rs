// src/config/mod.rs

//! Declarative job files (TOML).
//!
//! - [`model`]: raw serde structs.
//! - [`loader`]: reading and decoding.
//! - [`validate`]: conversion into a checked `JobDescriptor`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{JobSection, RawInput, RawJobFile, RawOutput, ReadFrom, UseAs};
pub use validate::job_from_str;

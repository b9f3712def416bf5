//! Versioning on top of the remote storage service.

mod version_hash;
mod workflow;

pub use workflow::{Variance, WorkflowError};

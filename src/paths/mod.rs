//! Canonical path strings shared by local and remote path handling.

mod normalized_path;

pub use normalized_path::NormalizedPath;

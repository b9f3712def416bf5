//! Local JSON index of monitored files and their finalized versions.

mod records;
mod version_store;

use std::path::PathBuf;

use snafu::Snafu;

use crate::ext::AbsolutePathExt;

pub use records::{MonitoredFile, VarianceStore, VersionRecord, store_key};
pub use version_store::{STORE_FILE_NAME, VersionStore};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("Failed to read version store {}", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Version store {} is corrupt", path.best_effort_path_display()))]
    CorruptStoreError {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[snafu(display("Failed to serialize version store"))]
    SerializeError { source: serde_json::Error },
    #[snafu(display("Failed to write version store {}", path.best_effort_path_display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("File \"{}\" is already being monitored", path))]
    AlreadyMonitoredError { path: String },
    #[snafu(display(
        "File \"{}\" is not being monitored. Use \"variance monitor\" first",
        path
    ))]
    NotMonitoredError { path: String },
}

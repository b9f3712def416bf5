use std::path::{Path, PathBuf};

use snafu::Snafu;

use crate::ext::AbsolutePathExt;
use crate::remote::{DirectoryEntry, TransferStats};

/// Prefix under which the service keeps every user path.
pub const REMOTE_ROOT: &str = "root";

/// A downloaded object staged on local disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Retrieved {
    pub path: PathBuf,
    pub stats: TransferStats,
}

/// Operations offered by the remote file-storage service.
pub trait RemoteStorage {
    /// Uploads a file, or every file below a directory, under
    /// `root\<remote_path>`.
    async fn upload(&self, local_path: &Path, remote_path: &str)
    -> Result<TransferStats, ClientError>;

    /// Downloads object `id` into the download directory.
    async fn retrieve(&self, id: &str) -> Result<Retrieved, ClientError>;

    async fn delete(&self, id: &str) -> Result<(), ClientError>;

    /// Entries directly below the user's root, with their subtrees.
    async fn user_directory(&self) -> Result<Vec<DirectoryEntry>, ClientError>;
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Invalid request: {}", reason))]
    ValidationError { reason: String },
    #[snafu(display("Local path does not exist: {}", path.best_effort_path_display()))]
    NotFoundError { path: PathBuf },
    #[snafu(display(
        "Provided path is neither a file nor a directory: {}",
        path.best_effort_path_display()
    ))]
    InvalidPathError { path: PathBuf },
    #[snafu(display("Failed to access local path {}", path.best_effort_path_display()))]
    LocalIoError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Remote object '{}' does not exist", id))]
    RemoteNotFoundError { id: String },
    #[snafu(display("Storage service at {} is unreachable", url))]
    UnreachableServiceError { url: String, source: reqwest::Error },
    #[snafu(display("Request to {} failed", url))]
    RequestError { url: String, source: reqwest::Error },
    #[snafu(display("Request to {} returned status {}", url, status))]
    UnexpectedStatusError { url: String, status: u16 },
    #[snafu(display("Response from {} could not be parsed", url))]
    MalformedResponseError {
        url: String,
        source: serde_json::Error,
    },
    #[snafu(display("Failed to encode upload metadata"))]
    EncodeError { source: serde_json::Error },
    #[snafu(display("Failed to build the HTTP client"))]
    ClientBuildError { source: reqwest::Error },
}

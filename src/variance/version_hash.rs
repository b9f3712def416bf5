use std::fmt;
use std::path::{Path, PathBuf};

use compio::fs;
use sha2::{Digest, Sha256};
use snafu::{ResultExt, Snafu};

use crate::ext::{AbsolutePathExt, AsyncTryFrom};

/// Remote directory that holds every finalized version.
pub const VERSIONS_DIRECTORY: &str = "variance";

/// Identifier of one finalized snapshot: 64 lowercase hex characters.
///
/// Derived from the file's content and its absolute path, so the same bytes
/// in two different files still get distinct versions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionHash(String);

impl VersionHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Remote location of this version of `local_path`:
    /// `variance/<hash>/<file name>`.
    pub fn virtual_path(&self, local_path: &Path) -> String {
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        format!("{}/{}/{}", VERSIONS_DIRECTORY, self.0, file_name)
    }
}

impl fmt::Display for VersionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsyncTryFrom<&Path> for VersionHash {
    type Error = HashError;

    async fn async_try_from(path: &Path) -> Result<Self, Self::Error> {
        let metadata = fs::metadata(path).await.context(ReadSnafu { path })?;
        if metadata.is_dir() {
            return DirectorySnafu { path }.fail();
        }

        let bytes = fs::read(path).await.context(ReadSnafu { path })?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.update(path.as_os_str().as_encoded_bytes());

        Ok(VersionHash(hex::encode(hasher.finalize())))
    }
}

#[derive(Debug, Snafu)]
pub enum HashError {
    #[snafu(display("Failed to read {} for hashing", path.best_effort_path_display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Cannot version a directory: {}", path.best_effort_path_display()))]
    DirectoryError { path: PathBuf },
}

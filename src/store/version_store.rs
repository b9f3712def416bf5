use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use compio::fs;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use snafu::ResultExt;
use tracing::{debug, info};

use crate::ext::AbsolutePathExt;
use crate::store::{
    CorruptStoreSnafu, ReadSnafu, SerializeSnafu, StoreError, VarianceStore, WriteSnafu,
};

/// Default file name of the store, relative to the working root.
pub const STORE_FILE_NAME: &str = "variance.json";

/// The JSON document holding every monitored file and its versions.
///
/// Each operation reads the whole document, changes it in memory and writes
/// it back. Nothing locks the file: two invocations running at once can
/// overwrite each other's changes, and the last writer wins.
#[derive(Debug, Clone)]
pub struct VersionStore {
    path: PathBuf,
}

impl VersionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, creating an empty one on disk if none exists yet.
    pub async fn load(&self) -> Result<VarianceStore, StoreError> {
        debug!(
            "Reading version store from {}",
            self.path.best_effort_path_display()
        );
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("No existing version store found, starting fresh");
                let store = VarianceStore::default();
                self.save(&store).await?;
                return Ok(store);
            }
            Err(err) => return Err(err).context(ReadSnafu { path: &self.path }),
        };

        let store: VarianceStore =
            serde_json::from_slice(&bytes).context(CorruptStoreSnafu { path: &self.path })?;
        debug!("Loaded {} monitored files", store.files.len());
        Ok(store)
    }

    /// Replaces the document with `store`.
    ///
    /// The new contents go to a sibling temporary file that is then renamed
    /// over the old one, so readers see either the old or the new document.
    pub async fn save(&self, store: &VarianceStore) -> Result<(), StoreError> {
        let mut bytes = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        store.serialize(&mut serializer).context(SerializeSnafu)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context(WriteSnafu { path: parent })?;
        }

        let staging = self.staging_path();
        fs::write(&staging, bytes)
            .await
            .0
            .context(WriteSnafu { path: &staging })?;
        fs::rename(&staging, &self.path)
            .await
            .context(WriteSnafu { path: &self.path })?;

        debug!(
            "Wrote version store to {}",
            self.path.best_effort_path_display()
        );
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| STORE_FILE_NAME.into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

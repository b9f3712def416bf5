use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::remote::TransferStats;
use crate::store::{AlreadyMonitoredSnafu, NotMonitoredSnafu, StoreError};

/// One finalized snapshot of a monitored file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionRecord {
    pub version_hash: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub local_path: PathBuf,
    pub virtual_path: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TransferStats>,
}

/// Version history of one file, oldest first. Only ever appended to.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitoredFile {
    pub versions: Vec<VersionRecord>,
}

/// The whole persisted document, keyed by absolute local path.
///
/// Files keep the order in which they started being monitored, which is
/// also the order hash lookups scan them in.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VarianceStore {
    pub files: LinkedHashMap<String, MonitoredFile>,
}

pub fn store_key(local_path: &Path) -> String {
    local_path.to_string_lossy().into_owned()
}

impl VarianceStore {
    pub fn begin_monitoring(&mut self, local_path: &Path) -> Result<(), StoreError> {
        let key = store_key(local_path);
        ensure!(
            !self.files.contains_key(&key),
            AlreadyMonitoredSnafu { path: key }
        );
        self.files.insert(key, MonitoredFile::default());
        Ok(())
    }

    pub fn append_version(
        &mut self,
        local_path: &Path,
        record: VersionRecord,
    ) -> Result<(), StoreError> {
        let key = store_key(local_path);
        let monitored = self
            .files
            .get_mut(&key)
            .context(NotMonitoredSnafu { path: key.clone() })?;
        monitored.versions.push(record);
        Ok(())
    }

    pub fn monitored(&self, local_path: &Path) -> Option<&MonitoredFile> {
        self.files.get(&store_key(local_path))
    }

    /// First record carrying `hash`, scanning files in insertion order and
    /// each file's versions oldest first.
    pub fn find_version_by_hash(&self, hash: &str) -> Option<(&str, &VersionRecord)> {
        self.files.iter().find_map(|(path, monitored)| {
            monitored
                .versions
                .iter()
                .find(|record| record.version_hash == hash)
                .map(|record| (path.as_str(), record))
        })
    }
}

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use compio::fs;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::ext::{AbsolutePathExt, AsyncTryFrom};
use crate::paths::NormalizedPath;
use crate::remote::{ClientError, REMOTE_ROOT, RemoteStorage, find_id_by_path};
use crate::store::{
    MonitoredFile, NotMonitoredSnafu, StoreError, VersionRecord, VersionStore, store_key,
};
use crate::variance::version_hash::{HashError, VersionHash};

/// The monitor / finalize / restore / view workflow.
///
/// A file is either unmonitored, monitored without versions, or monitored
/// with one or more finalized versions. Store changes are written only after
/// the remote call they depend on has succeeded.
pub struct Variance<S: RemoteStorage> {
    root: PathBuf,
    store: VersionStore,
    storage: S,
}

impl<S: RemoteStorage> Variance<S> {
    /// `root` must be absolute; user paths are resolved against it.
    pub fn new(root: impl Into<PathBuf>, store: VersionStore, storage: S) -> Self {
        Self {
            root: root.into(),
            store,
            storage,
        }
    }

    /// Starts tracking `path`. Returns the absolute path used as store key.
    pub async fn monitor(&self, path: &str) -> Result<PathBuf, WorkflowError> {
        let local_path = self.resolve(path)?;
        ensure!(
            is_file(&local_path).await,
            LocalFileNotFoundSnafu { path: &local_path }
        );

        let mut store = self
            .store
            .load()
            .await
            .context(MonitorSnafu { path: &local_path })?;
        store
            .begin_monitoring(&local_path)
            .context(MonitorSnafu { path: &local_path })?;
        self.store
            .save(&store)
            .await
            .context(MonitorSnafu { path: &local_path })?;

        info!("Now monitoring {}", local_path.display());
        Ok(local_path)
    }

    /// Uploads the current content of `path` as a new version.
    pub async fn finalize(&self, path: &str, message: &str) -> Result<VersionRecord, WorkflowError> {
        let local_path = self.resolve(path)?;
        ensure!(
            is_file(&local_path).await,
            LocalFileNotFoundSnafu { path: &local_path }
        );

        let mut store = self
            .store
            .load()
            .await
            .context(FinalizeStoreSnafu { path: &local_path })?;
        if store.monitored(&local_path).is_none() {
            return Err(StoreError::NotMonitoredError {
                path: store_key(&local_path),
            })
            .context(FinalizeStoreSnafu { path: &local_path });
        }

        let hash = VersionHash::async_try_from(local_path.as_path())
            .await
            .context(HashingSnafu { path: &local_path })?;
        let virtual_path = hash.virtual_path(&local_path);
        debug!("Finalizing {} as {}", local_path.display(), virtual_path);

        let stats = self
            .storage
            .upload(&local_path, &virtual_path)
            .await
            .context(UploadSnafu {
                path: &local_path,
                virtual_path: &virtual_path,
            })?;

        let record = VersionRecord {
            version_hash: hash.as_str().to_string(),
            message: message.to_string(),
            local_path: local_path.clone(),
            virtual_path,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            stats: Some(stats),
        };
        store
            .append_version(&local_path, record.clone())
            .context(FinalizeStoreSnafu { path: &local_path })?;
        self.store
            .save(&store)
            .await
            .context(FinalizeStoreSnafu { path: &local_path })?;

        info!(
            "Finalized {} with version hash {}",
            local_path.display(),
            record.version_hash
        );
        Ok(record)
    }

    /// Overwrites the owning local file with the content of version `hash`.
    /// Returns the restored path. The store is never written.
    pub async fn restore(&self, hash: &str) -> Result<PathBuf, WorkflowError> {
        ensure!(
            !hash.trim().is_empty(),
            ValidationSnafu {
                reason: "Version hash is required"
            }
        );

        let store = self.store.load().await.context(LoadStoreSnafu { hash })?;
        let (owner, record) = store
            .find_version_by_hash(hash)
            .context(VersionNotFoundSnafu { hash })?;
        let local_path = PathBuf::from(owner);

        if let Some(parent) = local_path.parent() {
            if fs::metadata(parent).await.is_err() {
                info!("Recreating missing directory {}", parent.display());
                fs::create_dir_all(parent)
                    .await
                    .context(RestoreIoSnafu { path: parent })?;
            }
        }

        let entries = self
            .storage
            .user_directory()
            .await
            .context(DirectoryListingSnafu { hash })?;
        let remote_path = NormalizedPath::new(REMOTE_ROOT).join(&record.virtual_path);
        let id = find_id_by_path(&entries, remote_path.as_str()).context(
            RemoteIdUnresolvedSnafu {
                hash,
                remote_path: remote_path.as_str(),
            },
        )?;
        debug!("Resolved {} to remote id {}", remote_path, id);

        let retrieved = self
            .storage
            .retrieve(id)
            .await
            .context(RetrieveSnafu { hash, id })?;
        debug!(
            "Retrieved {} into {}: {}",
            id,
            retrieved.path.display(),
            retrieved.stats
        );
        let content = fs::read(&retrieved.path).await.context(RestoreIoSnafu {
            path: &retrieved.path,
        })?;
        fs::write(&local_path, content)
            .await
            .0
            .context(RestoreIoSnafu { path: &local_path })?;

        info!(
            "Restored {} to version {}",
            local_path.display(),
            record.version_hash
        );
        Ok(local_path)
    }

    /// History of a monitored `path`.
    pub async fn view(&self, path: &str) -> Result<MonitoredFile, WorkflowError> {
        let local_path = self.resolve(path)?;
        let store = self
            .store
            .load()
            .await
            .context(ViewSnafu { path: &local_path })?;
        store
            .monitored(&local_path)
            .cloned()
            .context(NotMonitoredSnafu {
                path: store_key(&local_path),
            })
            .context(ViewSnafu { path: &local_path })
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, WorkflowError> {
        ensure!(
            !path.trim().is_empty(),
            ValidationSnafu {
                reason: "A file path is required"
            }
        );
        Ok(Path::new(path).absolute_from(&self.root))
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_file())
}

#[derive(Debug, Snafu)]
pub enum WorkflowError {
    #[snafu(display("Invalid arguments: {}", reason))]
    ValidationError { reason: String },
    #[snafu(display("File {} does not exist", path.best_effort_path_display()))]
    LocalFileNotFoundError { path: PathBuf },
    #[snafu(display("Failed to monitor {}", path.display()))]
    MonitorError { path: PathBuf, source: StoreError },
    #[snafu(display("Failed to finalize {}", path.display()))]
    FinalizeStoreError { path: PathBuf, source: StoreError },
    #[snafu(display("Failed to compute version hash of {}", path.display()))]
    HashingError { path: PathBuf, source: HashError },
    #[snafu(display("Failed to upload {} to {}", path.display(), virtual_path))]
    UploadError {
        path: PathBuf,
        virtual_path: String,
        source: ClientError,
    },
    #[snafu(display("Failed to read the history of {}", path.display()))]
    ViewError { path: PathBuf, source: StoreError },
    #[snafu(display("Failed to load the version store to restore {}", hash))]
    LoadStoreError { hash: String, source: StoreError },
    #[snafu(display("Version hash \"{}\" not found", hash))]
    VersionNotFoundError { hash: String },
    #[snafu(display("Failed to list the remote directory to restore {}", hash))]
    DirectoryListingError { hash: String, source: ClientError },
    #[snafu(display(
        "Version {} is missing from the remote directory (looked for {})",
        hash,
        remote_path
    ))]
    RemoteIdUnresolvedError { hash: String, remote_path: String },
    #[snafu(display("Failed to retrieve remote object {} for version {}", id, hash))]
    RetrieveError {
        hash: String,
        id: String,
        source: ClientError,
    },
    #[snafu(display("Failed to restore content into {}", path.display()))]
    RestoreIoError {
        path: PathBuf,
        source: std::io::Error,
    },
}

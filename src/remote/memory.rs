//! In-memory storage service used by tests.

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};

use snafu::ResultExt;

use crate::paths::NormalizedPath;
use crate::remote::file_walk::collect_files;
use crate::remote::storage::{
    ClientError, LocalIoSnafu, NotFoundSnafu, REMOTE_ROOT, RemoteNotFoundSnafu, Retrieved,
};
use crate::remote::{DirectoryEntry, EntryType, RemoteStorage, TransferStats};

#[derive(Debug, Clone)]
struct StoredObject {
    id: String,
    name: String,
    path: NormalizedPath,
    content: Vec<u8>,
}

pub struct MemoryStorage {
    download_dir: PathBuf,
    objects: RefCell<Vec<StoredObject>>,
    uploads: RefCell<Vec<(PathBuf, String)>>,
    next_id: Cell<usize>,
    fail_uploads: Cell<bool>,
}

impl MemoryStorage {
    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            objects: RefCell::new(Vec::new()),
            uploads: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
            fail_uploads: Cell::new(false),
        }
    }

    /// Every `upload` call so far, as (local path, remote path) pairs.
    pub fn uploads(&self) -> Vec<(PathBuf, String)> {
        self.uploads.borrow().clone()
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.set(fail);
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }

    fn store_file(&self, file: &Path, destination: NormalizedPath) -> Result<u64, ClientError> {
        let content = std::fs::read(file).context(LocalIoSnafu { path: file })?;
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let size = content.len() as u64;
        self.objects.borrow_mut().push(StoredObject {
            id: format!("object-{id}"),
            name: file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: destination,
            content,
        });
        Ok(size)
    }
}

impl RemoteStorage for MemoryStorage {
    async fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferStats, ClientError> {
        self.uploads
            .borrow_mut()
            .push((local_path.to_path_buf(), remote_path.to_string()));

        if self.fail_uploads.get() {
            return Err(ClientError::UnexpectedStatusError {
                url: "memory://upload".to_string(),
                status: 500,
            });
        }
        if !local_path.exists() {
            return NotFoundSnafu { path: local_path }.fail();
        }

        let destination = NormalizedPath::new(REMOTE_ROOT).join(remote_path);
        let mut size = 0;
        if local_path.is_dir() {
            for file in collect_files(local_path)? {
                let relative = file.strip_prefix(local_path).unwrap_or(&file);
                size += self.store_file(&file, destination.join(relative.to_string_lossy()))?;
            }
        } else {
            size += self.store_file(local_path, destination)?;
        }

        Ok(TransferStats {
            size_in_bytes: size,
            time_in_millis: 1,
        })
    }

    async fn retrieve(&self, id: &str) -> Result<Retrieved, ClientError> {
        let object = self
            .objects
            .borrow()
            .iter()
            .find(|object| object.id == id)
            .cloned();
        let Some(object) = object else {
            return RemoteNotFoundSnafu { id }.fail();
        };

        std::fs::create_dir_all(&self.download_dir).context(LocalIoSnafu {
            path: &self.download_dir,
        })?;
        let path = self.download_dir.join(&object.name);
        std::fs::write(&path, &object.content).context(LocalIoSnafu { path: &path })?;

        Ok(Retrieved {
            path,
            stats: TransferStats {
                size_in_bytes: object.content.len() as u64,
                time_in_millis: 1,
            },
        })
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        let mut objects = self.objects.borrow_mut();
        let before = objects.len();
        objects.retain(|object| object.id != id);
        if objects.len() == before {
            return RemoteNotFoundSnafu { id }.fail();
        }
        Ok(())
    }

    async fn user_directory(&self) -> Result<Vec<DirectoryEntry>, ClientError> {
        let mut top_level = Vec::new();
        for object in self.objects.borrow().iter() {
            let segments: Vec<&str> = object.path.as_str().split('\\').collect();
            let below_root = match segments.split_first() {
                Some((&first, rest)) if first == REMOTE_ROOT => rest,
                _ => &segments[..],
            };
            insert(
                &mut top_level,
                below_root,
                NormalizedPath::new(REMOTE_ROOT),
                object,
            );
        }
        Ok(top_level)
    }
}

fn insert(
    entries: &mut Vec<DirectoryEntry>,
    segments: &[&str],
    parent: NormalizedPath,
    object: &StoredObject,
) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let path = parent.join(first);

    if rest.is_empty() {
        entries.push(DirectoryEntry {
            id: object.id.clone(),
            name: first.to_string(),
            entry_type: EntryType::File,
            path: path.to_string(),
            size: Some(object.content.len() as u64),
            children: None,
        });
        return;
    }

    let position = entries
        .iter()
        .position(|entry| entry.is_directory() && entry.path == path.as_str());
    let index = match position {
        Some(index) => index,
        None => {
            entries.push(DirectoryEntry {
                id: format!("dir:{path}"),
                name: first.to_string(),
                entry_type: EntryType::Directory,
                path: path.to_string(),
                size: None,
                children: Some(Vec::new()),
            });
            entries.len() - 1
        }
    };

    if let Some(children) = entries[index].children.as_mut() {
        insert(children, rest, path, object);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::find_id_by_path;
    use tempfile::TempDir;

    #[compio::test]
    async fn uploaded_files_appear_in_directory_tree() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let local = temp_dir.path().join("a.txt");
        std::fs::write(&local, "hello").unwrap();
        let storage = MemoryStorage::new(temp_dir.path().join("downloads"));

        storage.upload(&local, "variance/abc/a.txt").await.unwrap();
        let tree = storage.user_directory().await.unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].path, "root\\variance");
        let id = find_id_by_path(&tree, "root\\variance\\abc\\a.txt").unwrap();
        let retrieved = storage.retrieve(id).await.unwrap();
        assert_eq!(std::fs::read_to_string(retrieved.path).unwrap(), "hello");
    }

    #[compio::test]
    async fn delete_removes_object() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let local = temp_dir.path().join("a.txt");
        std::fs::write(&local, "hello").unwrap();
        let storage = MemoryStorage::new(temp_dir.path().join("downloads"));
        storage.upload(&local, "a.txt").await.unwrap();

        storage.delete("object-0").await.unwrap();

        assert_eq!(storage.object_count(), 0);
        assert!(matches!(
            storage.delete("object-0").await,
            Err(ClientError::RemoteNotFoundError { .. })
        ));
    }
}

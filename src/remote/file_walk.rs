use std::fs;
use std::path::{Path, PathBuf};

use snafu::ResultExt;
use tracing::debug;

use crate::remote::storage::{ClientError, LocalIoSnafu};

/// Dependency caches that are never worth uploading.
const SKIPPED_DIRECTORIES: &[&str] = &["node_modules"];

/// Lists every regular file below `root`, depth-first with entries in name
/// order, so uploads happen in a reproducible sequence.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, ClientError> {
    let mut files = Vec::new();
    collect_into(root, &mut files)?;
    Ok(files)
}

fn collect_into(directory: &Path, files: &mut Vec<PathBuf>) -> Result<(), ClientError> {
    let mut entries = fs::read_dir(directory)
        .context(LocalIoSnafu { path: directory })?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()
        .context(LocalIoSnafu { path: directory })?;
    entries.sort();

    for path in entries {
        let is_skipped = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name));
        if is_skipped {
            debug!("Skipping {}", path.display());
            continue;
        }

        // Follows symlinks, so a linked file uploads its target.
        let metadata = fs::metadata(&path).context(LocalIoSnafu { path: &path })?;
        if metadata.is_dir() {
            collect_into(&path, files)?;
        } else if metadata.is_file() {
            files.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, relative).unwrap();
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn collects_nested_files_in_name_order() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(temp_dir.path(), "b.txt");
        touch(temp_dir.path(), "a/z.txt");
        touch(temp_dir.path(), "a/deeper/y.txt");

        let files = collect_files(temp_dir.path()).unwrap();

        assert_eq!(
            relative(temp_dir.path(), &files),
            vec!["a/deeper/y.txt", "a/z.txt", "b.txt"]
        );
    }

    #[test]
    fn skips_node_modules_at_any_depth() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        touch(temp_dir.path(), "index.js");
        touch(temp_dir.path(), "node_modules/dep/index.js");
        touch(temp_dir.path(), "pkg/node_modules/other.js");
        touch(temp_dir.path(), "pkg/lib.js");

        let files = collect_files(temp_dir.path()).unwrap();

        assert_eq!(
            relative(temp_dir.path(), &files),
            vec!["index.js", "pkg/lib.js"]
        );
    }

    #[test]
    fn empty_directory_has_no_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("empty")).unwrap();

        let files = collect_files(temp_dir.path()).unwrap();

        assert!(files.is_empty());
    }

    #[test]
    fn missing_directory_is_an_io_error() {
        let result = collect_files(Path::new("/this/path/does/not/exist"));
        assert!(matches!(result, Err(ClientError::LocalIoError { .. })));
    }
}

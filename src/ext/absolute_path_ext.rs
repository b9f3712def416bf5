use std::path::{Component, Path, PathBuf};

/// Resolves `path` against `base` without touching the filesystem.
///
/// `.` components are dropped and `..` pops the previous component, so the
/// result is usable as a stable key even for files that do not exist yet.
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    lexically_normalize(&joined)
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut components: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            _ => components.push(component),
        }
    }

    components.iter().collect()
}

pub trait AbsolutePathExt {
    fn absolute_from(&self, base: &Path) -> PathBuf;

    /// Canonical form when the path exists, otherwise the lexical absolute
    /// form against the current directory. Only meant for messages.
    fn best_effort_path_display(&self) -> String;
}

impl AbsolutePathExt for Path {
    fn absolute_from(&self, base: &Path) -> PathBuf {
        absolutize(self, base)
    }

    fn best_effort_path_display(&self) -> String {
        if let Ok(canonical) = self.canonicalize() {
            return canonical.display().to_string();
        }
        match std::env::current_dir() {
            Ok(current_dir) => absolutize(self, &current_dir).display().to_string(),
            Err(_) => self.display().to_string(),
        }
    }
}

impl AbsolutePathExt for PathBuf {
    fn absolute_from(&self, base: &Path) -> PathBuf {
        self.as_path().absolute_from(base)
    }

    fn best_effort_path_display(&self) -> String {
        self.as_path().best_effort_path_display()
    }
}

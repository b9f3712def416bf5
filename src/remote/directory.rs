use serde::{Deserialize, Serialize};

use crate::paths::NormalizedPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
}

/// One node of the tree reported by the service's directory endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DirectoryEntry>>,
}

impl DirectoryEntry {
    pub fn is_directory(&self) -> bool {
        self.entry_type == EntryType::Directory
    }

    /// Children worth descending into. Files never have any, whatever the
    /// service sent.
    fn searchable_children(&self) -> &[DirectoryEntry] {
        match (&self.children, self.is_directory()) {
            (Some(children), true) => children,
            _ => &[],
        }
    }
}

/// Body of `GET /directory`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DirectoryResponse {
    pub user_directory: UserDirectory,
}

/// The service reports either the root node itself or the list of entries
/// directly under it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum UserDirectory {
    Root(DirectoryEntry),
    Entries(Vec<DirectoryEntry>),
}

impl UserDirectory {
    pub fn into_entries(self) -> Vec<DirectoryEntry> {
        match self {
            UserDirectory::Root(root) => root.children.unwrap_or_default(),
            UserDirectory::Entries(entries) => entries,
        }
    }
}

/// Resolves `target` to the id of the entry with the same normalized path.
///
/// Depth-first pre-order: a directory's subtree is searched before its next
/// sibling, and the first match wins when paths are duplicated.
pub fn find_id_by_path<'a>(entries: &'a [DirectoryEntry], target: &str) -> Option<&'a str> {
    let target = NormalizedPath::new(target);
    let mut stack: Vec<&DirectoryEntry> = entries.iter().rev().collect();

    while let Some(entry) = stack.pop() {
        if NormalizedPath::new(&entry.path) == target {
            return Some(entry.id.as_str());
        }
        stack.extend(entry.searchable_children().iter().rev());
    }

    None
}

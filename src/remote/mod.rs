//! Client side of the remote file-storage service: the storage contract,
//! its HTTP implementation and the directory tree it reports.

mod directory;
mod dspace_client;
mod file_walk;
#[cfg(test)]
pub mod memory;
mod storage;
mod transfer_stats;

pub use directory::{DirectoryEntry, EntryType, find_id_by_path};
pub use dspace_client::DspaceClient;
pub use storage::{ClientError, REMOTE_ROOT, RemoteStorage};
pub use transfer_stats::TransferStats;

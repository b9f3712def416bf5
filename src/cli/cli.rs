use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::application::data::LogLevel;

/// Keeps a version history of local files on a Dspace storage server.
#[derive(Parser, Debug, Clone)]
#[command(name = "variance", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[clap(long, short, default_value = "warn", value_enum, global = true)]
    pub log_level: LogLevel,

    /// Directory holding variance.json and variance.yaml
    #[clap(long, short, default_value = ".", global = true)]
    pub root: PathBuf,

    /// Base URL of the storage server, overrides variance.yaml
    #[clap(long, global = true)]
    pub server: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start tracking versions of a file
    Monitor { path: String },
    /// Upload the current content of a monitored file as a new version
    Finalize { path: String, message: String },
    /// Overwrite a local file with a stored version
    Restore { hash: String },
    /// List the recorded versions of a file
    #[command(alias = "show")]
    View { path: String },
}

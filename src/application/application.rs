use std::path::Path;

use colored::Colorize;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::RuntimeConfig;
use crate::application::resolve_root;
use crate::cli::{Cli, Command};
use crate::config::{ConfigError, VarianceConfig};
use crate::remote::{ClientError, DspaceClient, RemoteStorage};
use crate::store::{MonitoredFile, VersionRecord, VersionStore};
use crate::variance::{Variance, WorkflowError};

pub struct Application;

impl Application {
    pub async fn run(cli: Cli) -> Result<(), ApplicationError> {
        let current_dir = std::env::current_dir().context(CurrentDirSnafu)?;
        let root = resolve_root(&cli, &current_dir);
        let config = VarianceConfig::read(&root).await.context(ConfigSnafu)?;
        debug!("Loaded config: {:?}", config);

        let runtime = RuntimeConfig::new(cli, &root, &config);
        let client = DspaceClient::new(
            &runtime.server,
            runtime.download_dir.clone(),
            runtime.timeout,
        )
        .context(ClientSnafu)?;
        let store = VersionStore::new(runtime.store_path.clone());
        info!(
            "Using storage server {} and version store {}",
            client.base_url(),
            store.path().display()
        );

        let variance = Variance::new(runtime.root.clone(), store, client);

        let output = Self::dispatch(&variance, &runtime.command)
            .await
            .context(WorkflowSnafu)?;
        println!("{output}");

        Ok(())
    }

    /// Runs one command and renders its outcome for the terminal.
    pub async fn dispatch<S: RemoteStorage>(
        variance: &Variance<S>,
        command: &Command,
    ) -> Result<String, WorkflowError> {
        match command {
            Command::Monitor { path } => {
                let local = variance.monitor(path).await?;
                Ok(format!(
                    "File \"{}\" is now being monitored.",
                    local.display()
                ))
            }
            Command::Finalize { path, message } => {
                let record = variance.finalize(path, message).await?;
                Ok(render_finalized(&record))
            }
            Command::Restore { hash } => {
                let local = variance.restore(hash).await?;
                Ok(render_restored(&local, hash))
            }
            Command::View { path } => {
                let history = variance.view(path).await?;
                Ok(render_history(path, &history))
            }
        }
    }
}

fn render_finalized(record: &VersionRecord) -> String {
    let mut output = format!(
        "File \"{}\" finalized with version hash: {}",
        record.local_path.display(),
        record.version_hash.yellow()
    );
    if let Some(stats) = record.stats {
        output.push_str(&format!("\nUploaded {stats}"));
    }
    output
}

fn render_restored(local: &Path, hash: &str) -> String {
    format!(
        "File \"{}\" restored to version \"{}\".",
        local.display(),
        hash.yellow()
    )
}

fn render_history(path: &str, history: &MonitoredFile) -> String {
    if history.versions.is_empty() {
        return format!("File \"{path}\" has no finalized versions yet.");
    }

    let mut output = format!("History for \"{path}\":");
    for (index, version) in history.versions.iter().enumerate() {
        output.push_str(&format!(
            "\n\n{}\n- Version Hash: {}\n- Message: {}\n- Virtual Path: {}\n- Timestamp: {}",
            format!("Version {}:", index + 1).bold(),
            version.version_hash.yellow(),
            version.message,
            version.virtual_path,
            version.timestamp
        ));
    }
    output
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Critical failure encountered during configuration stage"))]
    ConfigError { source: ConfigError },
    #[snafu(display("Could not determine the current directory"))]
    CurrentDirError { source: std::io::Error },
    #[snafu(display("Could not set up the storage client"))]
    ClientError { source: ClientError },
    #[snafu(display("Command failed"))]
    WorkflowError { source: WorkflowError },
}

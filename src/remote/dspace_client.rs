use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use compio::fs;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::CONTENT_DISPOSITION;
use serde::Serialize;
use snafu::{ResultExt, ensure};
use tracing::{debug, info};
use uuid::Uuid;

use crate::ext::AbsolutePathExt;
use crate::paths::NormalizedPath;
use crate::remote::directory::DirectoryResponse;
use crate::remote::file_walk::collect_files;
use crate::remote::storage::{
    ClientBuildSnafu, ClientError, EncodeSnafu, InvalidPathSnafu, LocalIoSnafu,
    MalformedResponseSnafu, NotFoundSnafu, REMOTE_ROOT, RemoteNotFoundSnafu, Retrieved,
    UnexpectedStatusSnafu, ValidationSnafu,
};
use crate::remote::{DirectoryEntry, EntryType, RemoteStorage, TransferStats};

/// Name given to downloads whose response carries no usable file name.
const DEFAULT_DOWNLOAD_NAME: &str = "default";

static FILENAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"filename[^;=\n]*=(?:"([^"]*)"|'([^']*)'|([^;\n]*))"#)
        .expect("content-disposition pattern is valid")
});

/// Metadata sent alongside every uploaded file.
#[derive(Debug, Serialize)]
struct UploadDescriptor {
    id: String,
    name: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    path: String,
    size: u64,
}

/// HTTP client for the Dspace storage service.
///
/// The transport is blocking; each call runs to completion on the calling
/// thread, which matches the one-request-at-a-time model of the CLI.
pub struct DspaceClient {
    base_url: String,
    download_dir: PathBuf,
    http: Client,
}

impl DspaceClient {
    pub fn new(
        server_url: &str,
        download_dir: PathBuf,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = server_url.trim_end_matches('/').to_string();
        ensure!(
            !base_url.is_empty(),
            ValidationSnafu {
                reason: "Server URL is required"
            }
        );

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context(ClientBuildSnafu)?;

        debug!("Created storage client for {}", base_url);
        Ok(Self {
            base_url,
            download_dir,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Sends one file. The body is read up front so the request has a known
    /// length and connection failures surface as such.
    async fn upload_file(
        &self,
        file: &Path,
        destination: &NormalizedPath,
    ) -> Result<TransferStats, ClientError> {
        let content = fs::read(file).await.context(LocalIoSnafu { path: file })?;
        let size = content.len() as u64;
        let name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let descriptor = UploadDescriptor {
            id: Uuid::new_v4().to_string(),
            name: name.clone(),
            entry_type: EntryType::File,
            path: destination.to_string(),
            size,
        };
        let form = Form::new()
            .text(
                "directoryStructure",
                serde_json::to_string(&descriptor).context(EncodeSnafu)?,
            )
            .part("files", Part::bytes(content).file_name(name.clone()));

        let url = self.endpoint("upload");
        let started = Instant::now();
        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|source| transport_error(&url, source))?;
        check_status(&url, response, None)?;

        let stats = TransferStats::new(size, started.elapsed());
        info!("Upload - {} ({}): {}", name, destination, stats);
        Ok(stats)
    }
}

impl RemoteStorage for DspaceClient {
    async fn upload(
        &self,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<TransferStats, ClientError> {
        ensure!(
            !local_path.as_os_str().is_empty() && !NormalizedPath::new(remote_path).is_empty(),
            ValidationSnafu {
                reason: "Both local path and remote path are required"
            }
        );

        let destination = NormalizedPath::new(REMOTE_ROOT).join(remote_path);
        let metadata = match fs::metadata(local_path).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return NotFoundSnafu { path: local_path }.fail();
            }
            Err(err) => return Err(err).context(LocalIoSnafu { path: local_path }),
        };

        let mut total = TransferStats::default();
        if metadata.is_file() {
            total.accumulate(self.upload_file(local_path, &destination).await?);
        } else if metadata.is_dir() {
            for file in collect_files(local_path)? {
                let relative = file.strip_prefix(local_path).unwrap_or(&file);
                let file_destination = destination.join(relative.to_string_lossy());
                total.accumulate(self.upload_file(&file, &file_destination).await?);
            }
        } else {
            return InvalidPathSnafu { path: local_path }.fail();
        }

        info!(
            "Upload of {} finished: {}",
            local_path.best_effort_path_display(),
            total
        );
        Ok(total)
    }

    async fn retrieve(&self, id: &str) -> Result<Retrieved, ClientError> {
        ensure!(
            !id.trim().is_empty(),
            ValidationSnafu {
                reason: "Identifier is required"
            }
        );

        let url = self.endpoint(&format!("retrieve/{id}"));
        let started = Instant::now();
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|source| transport_error(&url, source))?;
        let response = check_status(&url, response, Some(id))?;

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string());
        let body = response
            .bytes()
            .map_err(|source| transport_error(&url, source))?;
        let stats = TransferStats::new(body.len() as u64, started.elapsed());

        fs::create_dir_all(&self.download_dir)
            .await
            .context(LocalIoSnafu {
                path: &self.download_dir,
            })?;
        let path = self.download_dir.join(filename);
        fs::write(&path, body.to_vec())
            .await
            .0
            .context(LocalIoSnafu { path: &path })?;

        info!("Download - {}: {}", path.display(), stats);
        Ok(Retrieved { path, stats })
    }

    async fn delete(&self, id: &str) -> Result<(), ClientError> {
        ensure!(
            !id.trim().is_empty(),
            ValidationSnafu {
                reason: "Identifier is required"
            }
        );

        let url = self.endpoint(&format!("delete/{id}"));
        let response = self
            .http
            .delete(&url)
            .send()
            .map_err(|source| transport_error(&url, source))?;
        check_status(&url, response, Some(id))?;

        info!("Resource '{}' deleted", id);
        Ok(())
    }

    async fn user_directory(&self) -> Result<Vec<DirectoryEntry>, ClientError> {
        let url = self.endpoint("directory");
        let response = self
            .http
            .get(&url)
            .send()
            .map_err(|source| transport_error(&url, source))?;
        let response = check_status(&url, response, None)?;
        let text = response
            .text()
            .map_err(|source| transport_error(&url, source))?;

        let parsed: DirectoryResponse =
            serde_json::from_str(&text).context(MalformedResponseSnafu { url: &url })?;
        let entries = parsed.user_directory.into_entries();
        debug!("Remote directory has {} top-level entries", entries.len());
        Ok(entries)
    }
}

fn transport_error(url: &str, source: reqwest::Error) -> ClientError {
    if is_unreachable(&source) {
        ClientError::UnreachableServiceError {
            url: url.to_string(),
            source,
        }
    } else {
        ClientError::RequestError {
            url: url.to_string(),
            source,
        }
    }
}

/// Connect and timeout failures, including ones reported further down the
/// error chain while a request body was being sent.
fn is_unreachable(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() {
        return true;
    }
    let mut cause = std::error::Error::source(error);
    while let Some(current) = cause {
        if let Some(io_error) = current.downcast_ref::<std::io::Error>() {
            if matches!(
                io_error.kind(),
                ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::TimedOut
            ) {
                return true;
            }
        }
        cause = current.source();
    }
    false
}

/// Maps HTTP failures onto client errors. A 404 on a request about a specific
/// object means the object is unknown to the service.
fn check_status(url: &str, response: Response, id: Option<&str>) -> Result<Response, ClientError> {
    let status = response.status();
    if let Some(id) = id.filter(|_| status == StatusCode::NOT_FOUND) {
        return RemoteNotFoundSnafu { id }.fail();
    }
    ensure!(
        status.is_success(),
        UnexpectedStatusSnafu {
            url,
            status: status.as_u16()
        }
    );
    Ok(response)
}

/// Extracts the file name from a `Content-Disposition` header value.
///
/// Only the final path component is kept, so a hostile header cannot point
/// the download outside the download directory.
fn filename_from_content_disposition(header: &str) -> Option<String> {
    let captures = FILENAME_PATTERN.captures(header)?;
    let raw = captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))?
        .as_str()
        .trim();
    // RFC 5987 form: filename*=UTF-8''name
    let raw = raw.split_once("''").map_or(raw, |(_, name)| name);
    let name = raw
        .replace(['"', '\''], "")
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_string();

    match name.as_str() {
        "" | "." | ".." => None,
        _ => Some(name),
    }
}

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::ext::AbsolutePathExt;
use crate::store::STORE_FILE_NAME;

const CONFIG_FILE_NAME: &str = "variance.yaml";

const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
const DEFAULT_DOWNLOAD_DIR: &str = ".variance/downloads";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

/// Settings read from `variance.yaml` in the working root. Every key is
/// optional; absent keys fall back to the built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VarianceConfig {
    server: Option<String>,
    store: Option<PathBuf>,
    downloads: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

impl VarianceConfig {
    pub async fn read(root: &Path) -> Result<Self, ConfigError> {
        Self::from_path(get_config_file_path(root)).await
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ConfigError> {
        debug!("Opening config file: {}", path.best_effort_path_display());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).context(ReadSnafu {
                    file_path: path.best_effort_path_display(),
                });
            }
        };
        debug!("Successfully read config file: {} bytes", bytes.len());

        let contents = String::from_utf8(bytes).context(EncodingSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        contents.as_str().try_into()
    }

    pub fn server(&self) -> &str {
        self.server.as_deref().unwrap_or(DEFAULT_SERVER_URL)
    }

    pub fn store_path(&self, root: &Path) -> PathBuf {
        self.store
            .as_deref()
            .unwrap_or(Path::new(STORE_FILE_NAME))
            .absolute_from(root)
    }

    pub fn download_dir(&self, root: &Path) -> PathBuf {
        self.downloads
            .as_deref()
            .unwrap_or(Path::new(DEFAULT_DOWNLOAD_DIR))
            .absolute_from(root)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn parse_string(
        top_level: &LinkedHashMap<Yaml, Yaml>,
        key: &'static str,
    ) -> Result<Option<String>, ConfigError> {
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(value) => value
                .as_str()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Some(s.to_string()))
                .context(InvalidValueSnafu {
                    key,
                    expected: "a non-empty string",
                }),
        }
    }

    fn parse_timeout(top_level: &LinkedHashMap<Yaml, Yaml>) -> Result<Option<u64>, ConfigError> {
        let key = "timeout_secs";
        match top_level.get(&Yaml::Value(Scalar::String(Cow::Borrowed(key)))) {
            None | Some(Yaml::Value(Scalar::Null)) => Ok(None),
            Some(Yaml::Value(Scalar::Integer(secs))) if *secs > 0 => Ok(Some(*secs as u64)),
            Some(_) => InvalidValueSnafu {
                key,
                expected: "a positive integer",
            }
            .fail(),
        }
    }
}

impl TryFrom<&str> for VarianceConfig {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents =
            Yaml::load_from_str(contents).map_err(|e| ConfigError::ParseError { source: e })?;
        let Some(document) = documents.first() else {
            // An empty file configures nothing.
            return Ok(Self::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Self::default());
        }

        let top_level = document.as_mapping().ok_or(ConfigError::TopLevelNotMap)?;
        for key in top_level.keys() {
            if !matches!(
                key.as_str(),
                Some("server" | "store" | "downloads" | "timeout_secs")
            ) {
                debug!("Skipping unknown config entry: {:?}", key);
            }
        }

        Ok(VarianceConfig {
            server: Self::parse_string(top_level, "server")?,
            store: Self::parse_string(top_level, "store")?.map(PathBuf::from),
            downloads: Self::parse_string(top_level, "downloads")?.map(PathBuf::from),
            timeout_secs: Self::parse_timeout(top_level)?,
        })
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Config file is not valid UTF-8: {}", file_path))]
    EncodingError {
        file_path: String,
        source: std::string::FromUtf8Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Config entry '{}' should be {}", key, expected))]
    InvalidValue {
        key: &'static str,
        expected: &'static str,
    },
}

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{Cli, Command};
use crate::config::VarianceConfig;
use crate::ext::AbsolutePathExt;

/// Everything one invocation needs, after layering defaults, `variance.yaml`
/// and command line overrides.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub command: Command,
    pub root: PathBuf,
    pub server: String,
    pub store_path: PathBuf,
    pub download_dir: PathBuf,
    pub timeout: Duration,
}

impl RuntimeConfig {
    /// `root` must already be absolute.
    pub fn new(cli: Cli, root: &Path, config: &VarianceConfig) -> Self {
        Self {
            command: cli.command,
            root: root.to_path_buf(),
            server: cli.server.unwrap_or_else(|| config.server().to_string()),
            store_path: config.store_path(root),
            download_dir: config.download_dir(root),
            timeout: config.timeout(),
        }
    }
}

/// Absolute form of the `--root` argument.
pub fn resolve_root(cli: &Cli, current_dir: &Path) -> PathBuf {
    cli.root.absolute_from(current_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn relative_root_resolves_against_current_dir() {
        let cli = cli(&["variance", "-r", "project/../docs", "view", "a.txt"]);

        assert_eq!(
            resolve_root(&cli, Path::new("/home/user")),
            PathBuf::from("/home/user/docs")
        );
    }

    #[cfg(unix)]
    #[test]
    fn defaults_apply_without_config_or_overrides() {
        let cli = cli(&["variance", "view", "a.txt"]);
        let root = Path::new("/work");

        let runtime = RuntimeConfig::new(cli, root, &VarianceConfig::default());

        assert_eq!(runtime.root, root);
        assert_eq!(runtime.server, "http://localhost:5000");
        assert_eq!(runtime.store_path, PathBuf::from("/work/variance.json"));
        assert_eq!(runtime.download_dir, PathBuf::from("/work/.variance/downloads"));
        assert_eq!(runtime.timeout, Duration::from_secs(60));
        assert_eq!(runtime.command, Command::View { path: "a.txt".into() });
    }

    #[test]
    fn server_flag_overrides_config_file() {
        let config: VarianceConfig = "server: http://from-file:1".try_into().unwrap();

        let from_file = RuntimeConfig::new(cli(&["variance", "view", "a"]), Path::new("/w"), &config);
        let overridden = RuntimeConfig::new(
            cli(&["variance", "--server", "http://from-cli:2", "view", "a"]),
            Path::new("/w"),
            &config,
        );

        assert_eq!(from_file.server, "http://from-file:1");
        assert_eq!(overridden.server, "http://from-cli:2");
    }
}

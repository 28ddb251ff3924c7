//! ArgoCD adapter.
//!
//! Bare-binary download. Two quirks: `argocd version` exits non-zero when
//! no server is reachable while still printing the client line, so the
//! version check ignores the exit status; and the activation alias pins
//! `--config` to a file inside the workdir so server credentials stay in
//! the toolbox.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use regex::Regex;
use std::path::PathBuf;

const ARGOCD_ALIAS: Placeholder = Placeholder("ARGOCD_ALIAS");

pub struct Argocd {
    enabled: bool,
    cfg_path: PathBuf,
    binary: VersionedBinary,
}

impl Argocd {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Argocd {
            enabled: config.argocd.enabled,
            cfg_path: config.argocd.cfg_path.clone(),
            binary: VersionedBinary {
                tool: "argocd",
                bin_path: workdir.bin.join("argocd"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.argocd.version.clone(),
                url_template: config.argocd.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "amd64",
                archive: ArchiveKind::None,
                version_args: &["version"],
                ignore_version_exit_status: true,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }
}

impl Installer for Argocd {
    fn name(&self) -> &'static str {
        "argocd"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![(
            ARGOCD_ALIAS,
            format!("argocd='argocd --config {}'", self.cfg_path.display()),
        )]
    }
}

/// First line of `argocd version` is `argocd: vX.Y.Z+<sha>`.
fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let re = Regex::new(r#"v(\d+\.\d+\.\d+)"#).ok()?;
    re.captures(line).map(|c| c[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_client_line() {
        let out = "argocd: v2.7.3+e7891b8\n  BuildDate: 2023-06-01\n";
        assert_eq!(parse_version(out), Some("2.7.3".to_string()));
    }

    #[test]
    fn rejects_output_without_a_version() {
        assert_eq!(parse_version("argocd: unknown"), None);
        assert_eq!(parse_version(""), None);
    }
}

//! kubectl adapter.
//!
//! The release artifact is the bare binary. kubectl is the one tool whose
//! version check speaks JSON: `kubectl version --output=json --client=true`
//! and the version sits at `.clientVersion.gitVersion`. The adapter also
//! keeps a kubeconfig directory inside the workdir, exported as KUBECONFIG
//! by activated sessions so cluster credentials never touch `~/.kube`.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use std::fs;
use std::path::PathBuf;

const KUBE_ENABLED: Placeholder = Placeholder("KUBE_ENABLED");
const KUBE_CONFIG_PATH: Placeholder = Placeholder("KUBE_CONFIG_PATH");

pub struct Kubectl {
    enabled: bool,
    config_dir: PathBuf,
    binary: VersionedBinary,
}

impl Kubectl {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Kubectl {
            enabled: config.kubectl.enabled,
            config_dir: config.kubectl.config_dir.clone(),
            binary: VersionedBinary {
                tool: "kubectl",
                bin_path: workdir.bin.join("kubectl"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.kubectl.version.clone(),
                url_template: config.kubectl.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "amd64",
                archive: ArchiveKind::None,
                version_args: &["version", "--output=json", "--client=true"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }
}

impl Installer for Kubectl {
    fn name(&self) -> &'static str {
        "kubectl"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        fs::create_dir_all(&self.config_dir).map_err(|e| {
            ToolboxError::install(
                "kubectl",
                format!("create {}: {e}", self.config_dir.display()),
            )
        })?;
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![
            (KUBE_ENABLED, enabled_flag(self.enabled)),
            (KUBE_CONFIG_PATH, self.config_dir.display().to_string()),
        ]
    }
}

/// `.clientVersion.gitVersion` out of the JSON version report.
fn parse_version(output: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(output).ok()?;
    let git_version = value.get("clientVersion")?.get("gitVersion")?.as_str()?;
    let version = git_version.strip_prefix('v')?;
    semver::Version::parse(version).ok()?;
    Some(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_json_version_report() {
        let out = r#"{"clientVersion": {"gitVersion": "v1.28.2", "platform": "linux/amd64"}}"#;
        assert_eq!(parse_version(out), Some("1.28.2".to_string()));
    }

    #[test]
    fn rejects_non_json_and_missing_fields() {
        assert_eq!(parse_version("Client Version: v1.28.2"), None);
        assert_eq!(parse_version(r#"{"serverVersion": {}}"#), None);
        assert_eq!(parse_version(r#"{"clientVersion": {"gitVersion": "1.28.2"}}"#), None);
    }
}

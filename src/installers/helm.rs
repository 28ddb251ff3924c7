//! Helm adapter. Tarball with the binary under `<os>-<arch>/helm`; version
//! output is the `version.BuildInfo{Version:"v3.12.0", ...}` line.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use regex::Regex;

pub struct Helm {
    enabled: bool,
    binary: VersionedBinary,
}

impl Helm {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        let os = config.platform.map(|p| p.as_str()).unwrap_or("linux");
        Helm {
            enabled: config.helm.enabled,
            binary: VersionedBinary {
                tool: "helm",
                bin_path: workdir.bin.join("helm"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.helm.version.clone(),
                url_template: config.helm.download_url.clone(),
                os,
                arch: "amd64",
                archive: ArchiveKind::TarGz {
                    inner_path: format!("{os}-amd64/helm"),
                },
                version_args: &["version"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }
}

impl Installer for Helm {
    fn name(&self) -> &'static str {
        "helm"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    // Helm needs no activation wiring: it just sits on the toolbox PATH.
    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        Vec::new()
    }
}

/// `vX.Y.Z` out of the line carrying `Version:`.
fn parse_version(output: &str) -> Option<String> {
    let re = Regex::new(r#"v(\d+\.\d+\.\d+)"#).ok()?;
    for line in output.lines() {
        if !line.contains("Version:") {
            continue;
        }
        return re.captures(line).map(|c| c[1].to_string());
    }
    None
}

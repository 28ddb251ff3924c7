//! k9s adapter. Tarball with the binary at the archive root; note the
//! `x86_64` arch naming in k9s release URLs, unlike the `amd64` most tools
//! use.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use regex::Regex;

pub struct K9s {
    enabled: bool,
    binary: VersionedBinary,
}

impl K9s {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        K9s {
            enabled: config.k9s.enabled,
            binary: VersionedBinary {
                tool: "k9s",
                bin_path: workdir.bin.join("k9s"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.k9s.version.clone(),
                url_template: config.k9s.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "x86_64",
                archive: ArchiveKind::TarGz {
                    inner_path: "k9s".to_string(),
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

impl Installer for K9s {
    fn name(&self) -> &'static str {
        "k9s"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        Vec::new()
    }
}

/// `vX.Y.Z` out of the `Version:` line of the k9s banner.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_version_line() {
        let out = "Version:    v0.27.4\nCommit:     deadbeef\nDate:       2023-05-01\n";
        assert_eq!(parse_version(out), Some("0.27.4".to_string()));
    }

    #[test]
    fn rejects_unexpected_output() {
        assert_eq!(parse_version("k9s 0.27.4"), None);
        assert_eq!(parse_version(""), None);
    }
}

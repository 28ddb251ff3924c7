//! Terragrunt adapter. The release artifact is the bare binary; the
//! activation alias mirrors terraform's proxy handling.

use crate::errors::ToolboxError;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::installers::{Installer, proxied_alias};
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;

const TERRAGRUNT_ALIAS: Placeholder = Placeholder("TERRAGRUNT_ALIAS");

pub struct Terragrunt {
    enabled: bool,
    alias: String,
    binary: VersionedBinary,
}

impl Terragrunt {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Terragrunt {
            enabled: config.terragrunt.enabled,
            alias: proxied_alias("terragrunt", config.terragrunt.use_proxy, &config.proxy),
            binary: VersionedBinary {
                tool: "terragrunt",
                bin_path: workdir.bin.join("terragrunt"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.terragrunt.version.clone(),
                url_template: config.terragrunt.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "amd64",
                archive: ArchiveKind::None,
                version_args: &["-v"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }
}

impl Installer for Terragrunt {
    fn name(&self) -> &'static str {
        "terragrunt"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![(TERRAGRUNT_ALIAS, self.alias.clone())]
    }
}

/// `terragrunt -v` prints `terragrunt version vX.Y.Z`.
fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let mut parts = line.split_whitespace();
    if parts.next()? != "terragrunt" || parts.next()? != "version" {
        return None;
    }
    let version = parts.next()?.strip_prefix('v')?;
    semver::Version::parse(version).ok()?;
    Some(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_version_banner() {
        assert_eq!(
            parse_version("terragrunt version v0.45.0\n"),
            Some("0.45.0".to_string())
        );
    }

    #[test]
    fn rejects_unexpected_output() {
        assert_eq!(parse_version("terragrunt v0.45.0"), None);
        assert_eq!(parse_version("version v0.45.0"), None);
        assert_eq!(parse_version(""), None);
    }
}

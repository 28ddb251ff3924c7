//! Terraform adapter.
//!
//! HashiCorp ships terraform as a zip with the binary at the archive root.
//! The activation contribution is a single alias; when the proxy policy is
//! on for terraform, the alias carries the proxy env var inline so only
//! terraform's own provider downloads are proxied.

use crate::errors::ToolboxError;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::installers::{Installer, proxied_alias};
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;

const TERRAFORM_ALIAS: Placeholder = Placeholder("TERRAFORM_ALIAS");

pub struct Terraform {
    enabled: bool,
    alias: String,
    binary: VersionedBinary,
}

impl Terraform {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Terraform {
            enabled: config.terraform.enabled,
            alias: proxied_alias("terraform", config.terraform.use_proxy, &config.proxy),
            binary: VersionedBinary {
                tool: "terraform",
                bin_path: workdir.bin.join("terraform"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.terraform.version.clone(),
                url_template: config.terraform.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "amd64",
                archive: ArchiveKind::Zip {
                    inner_path: "terraform".to_string(),
                },
                version_args: &["-v"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }
}

impl Installer for Terraform {
    fn name(&self) -> &'static str {
        "terraform"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![(TERRAFORM_ALIAS, self.alias.clone())]
    }
}

/// First line of `terraform -v` is `Terraform vX.Y.Z`.
fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let mut parts = line.split_whitespace();
    if parts.next()? != "Terraform" {
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
        let out = "Terraform v1.5.7\non linux_amd64\n";
        assert_eq!(parse_version(out), Some("1.5.7".to_string()));
    }

    #[test]
    fn rejects_unexpected_output() {
        assert_eq!(parse_version(""), None);
        assert_eq!(parse_version("terraform 1.5.7"), None);
        assert_eq!(parse_version("Terraform vbanana"), None);
    }
}

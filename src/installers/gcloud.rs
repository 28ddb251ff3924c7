//! gcloud adapter.
//!
//! The Google Cloud SDK is not a single binary: the tarball unpacks into a
//! `google-cloud-sdk/` tree that lives under `<root>/gcloud/`, with
//! `bin/gcloud` symlinked into the toolbox bin. On top of the version-gated
//! unpack, every run ensures the `gke-gcloud-auth-plugin` component is
//! present and pushes the configured http proxy into the SDK's own config,
//! kept under `<root>/gcloud/cfg` (exported as CLOUDSDK_CONFIG by activated
//! sessions).

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::Config;
use crate::libs::{archive, fetch, process};
use crate::libs::workdir::WorkDir;
use crate::{log_info, log_warn};
use colored::Colorize;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

const GCLOUD_ENABLED: Placeholder = Placeholder("GCLOUD_ENABLED");
const GCLOUD_CFG_PATH: Placeholder = Placeholder("GCLOUD_CFG_PATH");

const COMPONENTS: &[&str] = &["gke-gcloud-auth-plugin"];

pub struct Gcloud {
    enabled: bool,
    sdk_dir: PathBuf,
    cfg_dir: PathBuf,
    http_proxy: String,
    binary: VersionedBinary,
}

impl Gcloud {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Gcloud {
            enabled: config.gcloud.enabled,
            sdk_dir: workdir.root.join("gcloud"),
            cfg_dir: config.gcloud.cfg_dir.clone(),
            http_proxy: config.proxy.http.clone(),
            binary: VersionedBinary {
                tool: "gcloud",
                bin_path: workdir.bin.join("gcloud"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.gcloud.version.clone(),
                url_template: config.gcloud.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "x86_64",
                archive: ArchiveKind::TarGz {
                    inner_path: String::new(), // unpacked in place, not moved
                },
                version_args: &["-v"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }

    fn fail(message: String) -> ToolboxError {
        ToolboxError::install("gcloud", message)
    }

    /// Download + unpack + relink. The previous SDK tree is removed first;
    /// the symlink is replaced last.
    fn download_sdk(&self) -> Result<(), ToolboxError> {
        let url = self.binary.format_url();
        let tarball = self.binary.tmp_dir.join("gcloud.tar.gz");
        fetch::download_file(&url, &tarball, self.binary.proxy.as_deref())
            .map_err(|e| Self::fail(format!("download {url}: {e}")))?;

        let release_dir = self.sdk_dir.join("google-cloud-sdk");
        if release_dir.exists() {
            fs::remove_dir_all(&release_dir)
                .map_err(|e| Self::fail(format!("remove old SDK {}: {e}", release_dir.display())))?;
        }
        archive::untar_gz(&tarball, &self.sdk_dir).map_err(|e| Self::fail(e.to_string()))?;
        let _ = fs::remove_file(&tarball);

        let target = release_dir.join("bin").join("gcloud");
        if self.binary.bin_path.symlink_metadata().is_ok() {
            fs::remove_file(&self.binary.bin_path)
                .map_err(|e| Self::fail(format!("unlink {}: {e}", self.binary.bin_path.display())))?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(&target, &self.binary.bin_path)
            .map_err(|e| Self::fail(format!("link {}: {e}", target.display())))?;
        Ok(())
    }

    fn install_components(&self) -> Result<(), ToolboxError> {
        for component in COMPONENTS {
            log_info!("Install gcloud component {} ...", component.bold());
            process::run(&[
                self.binary.bin_path.as_os_str(),
                OsStr::new("components"),
                OsStr::new("install"),
                OsStr::new("-q"),
                OsStr::new(component),
            ])
            .map_err(|e| Self::fail(format!("component {component}: {e}")))?;
        }
        Ok(())
    }

    /// Pushes the http proxy triple into the SDK's own config so gcloud's
    /// API calls go through it. CLOUDSDK_CONFIG points at the toolbox's
    /// config dir, the same one activated sessions export.
    fn configure_proxy(&self) -> Result<(), ToolboxError> {
        if self.http_proxy.is_empty() {
            log_warn!("No http proxy configured for gcloud");
            return Ok(());
        }
        let stripped = self.http_proxy.trim_start_matches("http://");
        let (address, port) = match stripped.split_once(':') {
            Some((address, port)) => (address, port),
            None => (stripped, "80"),
        };
        for (key, value) in [
            ("proxy/type", "http"),
            ("proxy/address", address),
            ("proxy/port", port),
        ] {
            process::run_with_env(
                &[
                    self.binary.bin_path.as_os_str(),
                    OsStr::new("config"),
                    OsStr::new("set"),
                    OsStr::new(key),
                    OsStr::new(value),
                ],
                &[("CLOUDSDK_CONFIG", self.cfg_dir.as_os_str())],
            )
            .map_err(|e| Self::fail(format!("config set {key}: {e}")))?;
        }
        Ok(())
    }
}

impl Installer for Gcloud {
    fn name(&self) -> &'static str {
        "gcloud"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} ...", "gcloud".bold());
        fs::create_dir_all(&self.sdk_dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", self.sdk_dir.display())))?;
        fs::create_dir_all(&self.cfg_dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", self.cfg_dir.display())))?;

        match self.binary.current_version()? {
            Some(current) if current == self.binary.desired_version => {
                log_info!("gcloud {} already installed", current);
            }
            _ => {
                self.download_sdk()?;
                log_info!("gcloud installed");
            }
        }
        // Components and proxy config are re-ensured on every run.
        self.install_components()?;
        self.configure_proxy()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![
            (GCLOUD_ENABLED, enabled_flag(self.enabled)),
            (GCLOUD_CFG_PATH, self.cfg_dir.display().to_string()),
        ]
    }
}

/// First line of `gcloud -v` is `Google Cloud SDK 390.0.0`.
fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let mut parts = line.split_whitespace();
    if parts.next()? != "Google" || parts.next()? != "Cloud" || parts.next()? != "SDK" {
        return None;
    }
    let version = parts.next()?;
    semver::Version::parse(version).ok()?;
    Some(version.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_sdk_banner() {
        let out = "Google Cloud SDK 390.0.0\nbq 2.0.75\ncore 2022.06.03\n";
        assert_eq!(parse_version(out), Some("390.0.0".to_string()));
    }

    #[test]
    fn rejects_unexpected_output() {
        assert_eq!(parse_version("gcloud 390.0.0"), None);
        assert_eq!(parse_version("Google Cloud SDK"), None);
        assert_eq!(parse_version(""), None);
    }
}

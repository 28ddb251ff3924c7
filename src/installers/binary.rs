//! Shared install machinery for tools that ship a prebuilt binary.
//!
//! Terraform, terragrunt, vault, kubectl, helm, k9s, argocd and gcloud all
//! follow the same version-gated download shape; what differs per tool is a
//! handful of parameters: the version subcommand and its output parser, the
//! download URL template, the archive format, and where the binary sits
//! inside the archive. This module holds the shape once so each adapter is
//! a small configuration value instead of a reimplementation.
//!
//! The gate itself: an absent binary means "version unknown" and forces an
//! install; a present binary whose version output cannot be parsed is a
//! hard error (never silently reinstall over a binary we cannot identify);
//! a parsed version equal to the desired one skips the download entirely.

use crate::errors::ToolboxError;
use crate::libs::{archive, fetch, process};
use crate::log_info;
use colored::Colorize;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

/// How the downloaded artifact wraps the binary.
#[derive(Debug, Clone)]
pub enum ArchiveKind {
    /// The download *is* the binary (kubectl, terragrunt, argocd).
    None,
    /// Zip with the binary at `inner_path` inside (terraform, vault).
    Zip { inner_path: String },
    /// Gzipped tar with the binary at `inner_path` inside (helm, k9s).
    TarGz { inner_path: String },
}

/// One versioned-binary install, fully parameterized. Adapters build this
/// from the resolved config and delegate `install()` to it.
pub struct VersionedBinary {
    pub tool: &'static str,
    pub bin_path: PathBuf,
    pub tmp_dir: PathBuf,
    pub desired_version: String,
    /// URL template with `{ver}`, `{os}`, `{arch}` tokens.
    pub url_template: String,
    pub os: &'static str,
    pub arch: &'static str,
    pub archive: ArchiveKind,
    /// Argv appended to the binary to make it report its version.
    pub version_args: &'static [&'static str],
    /// Some tools exit non-zero while still printing a version banner.
    pub ignore_version_exit_status: bool,
    /// Extracts the bare semantic version from the tool's output.
    pub parser: fn(&str) -> Option<String>,
    /// Full proxy URL when this tool's downloads go through the proxy.
    pub proxy: Option<String>,
    pub mode: u32,
}

impl VersionedBinary {
    pub fn format_url(&self) -> String {
        self.url_template
            .replace("{ver}", &self.desired_version)
            .replace("{os}", self.os)
            .replace("{arch}", self.arch)
    }

    /// Version the installed binary reports, `None` when not installed.
    /// Unparseable output from an existing binary is a `VersionParse` error.
    pub fn current_version(&self) -> Result<Option<String>, ToolboxError> {
        if !self.bin_path.exists() {
            return Ok(None);
        }
        let mut argv: Vec<&OsStr> = vec![self.bin_path.as_os_str()];
        argv.extend(self.version_args.iter().map(OsStr::new));
        let output = if self.ignore_version_exit_status {
            process::run_unchecked(&argv)
        } else {
            process::run(&argv)
        }
        .map_err(|e| ToolboxError::install(self.tool, format!("version check: {e}")))?;

        match (self.parser)(&output) {
            Some(version) => Ok(Some(version)),
            None => Err(ToolboxError::VersionParse {
                tool: self.tool,
                output,
            }),
        }
    }

    /// The version-gated download. Safe to re-run: a leftover artifact from
    /// a crashed run lives in scratch space, which `prepare()` already
    /// cleared, and the final move into `bin` replaces atomically.
    pub fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} ...", self.tool.bold());
        if let Some(current) = self.current_version()? {
            if current == self.desired_version {
                log_info!("{} {} already installed", self.tool, current);
                return Ok(());
            }
            log_info!(
                "{} {} -> {}",
                self.tool,
                current.yellow(),
                self.desired_version.green()
            );
        }
        self.download_and_place()?;
        log_info!("{} installed", self.tool);
        Ok(())
    }

    fn download_and_place(&self) -> Result<(), ToolboxError> {
        let url = self.format_url();
        let fail = |message: String| ToolboxError::install(self.tool, message);

        match &self.archive {
            ArchiveKind::None => {
                fetch::download_file(&url, &self.bin_path, self.proxy.as_deref())
                    .map_err(|e| fail(format!("download {url}: {e}")))?;
            }
            ArchiveKind::Zip { inner_path } => {
                let archive_path = self.tmp_dir.join(format!("{}.zip", self.tool));
                fetch::download_file(&url, &archive_path, self.proxy.as_deref())
                    .map_err(|e| fail(format!("download {url}: {e}")))?;
                let extract_dir = self.tmp_dir.join(self.tool);
                archive::unzip(&archive_path, &extract_dir)
                    .map_err(|e| fail(e.to_string()))?;
                self.place_from(&extract_dir.join(inner_path))?;
                let _ = fs::remove_file(&archive_path);
                let _ = fs::remove_dir_all(&extract_dir);
            }
            ArchiveKind::TarGz { inner_path } => {
                let archive_path = self.tmp_dir.join(format!("{}.tar.gz", self.tool));
                fetch::download_file(&url, &archive_path, self.proxy.as_deref())
                    .map_err(|e| fail(format!("download {url}: {e}")))?;
                let extract_dir = self.tmp_dir.join(self.tool);
                archive::untar_gz(&archive_path, &extract_dir)
                    .map_err(|e| fail(e.to_string()))?;
                self.place_from(&extract_dir.join(inner_path))?;
                let _ = fs::remove_file(&archive_path);
                let _ = fs::remove_dir_all(&extract_dir);
            }
        }
        self.set_executable()
    }

    fn place_from(&self, extracted: &Path) -> Result<(), ToolboxError> {
        fs::rename(extracted, &self.bin_path).map_err(|e| {
            ToolboxError::install(
                self.tool,
                format!(
                    "move {} -> {}: {e}",
                    extracted.display(),
                    self.bin_path.display()
                ),
            )
        })
    }

    #[cfg(unix)]
    fn set_executable(&self) -> Result<(), ToolboxError> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&self.bin_path, fs::Permissions::from_mode(self.mode)).map_err(|e| {
            ToolboxError::install(self.tool, format!("chmod {}: {e}", self.bin_path.display()))
        })
    }

    #[cfg(not(unix))]
    fn set_executable(&self) -> Result<(), ToolboxError> {
        Ok(())
    }
}

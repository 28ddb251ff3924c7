//! Toolbox python virtualenv.
//!
//! Rebuilt from scratch on every run: the venv under `<root>/python` is
//! removed and recreated with `virtualenv -p python3`, then the configured
//! packages are pip-installed into it. Activated sessions source the venv's
//! own activate script before the toolbox wiring.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::Config;
use crate::libs::process;
use crate::libs::workdir::WorkDir;
use crate::log_info;
use colored::Colorize;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

const PYTHON_VENV_ENABLED: Placeholder = Placeholder("PYTHON_VENV_ENABLED");
const PYTHON_VENV: Placeholder = Placeholder("PYTHON_VENV");

pub struct PythonVenv {
    enabled: bool,
    venv_dir: PathBuf,
    packages: Vec<String>,
}

impl PythonVenv {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        PythonVenv {
            enabled: config.python.enabled,
            venv_dir: workdir.root.join("python"),
            packages: config.python.packages.clone(),
        }
    }

    fn fail(message: String) -> ToolboxError {
        ToolboxError::install("python", message)
    }
}

impl Installer for PythonVenv {
    fn name(&self) -> &'static str {
        "python"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} virtualenv ...", "python".bold());
        if self.venv_dir.exists() {
            fs::remove_dir_all(&self.venv_dir)
                .map_err(|e| Self::fail(format!("remove {}: {e}", self.venv_dir.display())))?;
        }
        process::run(&[
            OsStr::new("virtualenv"),
            OsStr::new("-p"),
            OsStr::new("python3"),
            self.venv_dir.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("virtualenv: {e}")))?;

        if !self.packages.is_empty() {
            let pip = self.venv_dir.join("bin").join("pip");
            let mut argv: Vec<&OsStr> = vec![pip.as_os_str(), OsStr::new("install")];
            argv.extend(self.packages.iter().map(OsStr::new));
            process::run(&argv).map_err(|e| Self::fail(format!("pip install: {e}")))?;
            log_info!("Installed python packages: {}", self.packages.join(", "));
        }
        Ok(())
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![
            (PYTHON_VENV_ENABLED, enabled_flag(self.enabled)),
            (PYTHON_VENV, self.venv_dir.display().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config_loading::PythonConfig;
    use tempfile::TempDir;

    fn adapter(enabled: bool, root: &std::path::Path) -> PythonVenv {
        let workdir = WorkDir::new(root);
        std::fs::create_dir_all(root).unwrap();
        let config_file = root.join("config.json");
        std::fs::write(&config_file, "{}").unwrap();
        let mut config =
            crate::libs::config_loading::load(&config_file, &workdir, "testbox", None).unwrap();
        config.python = PythonConfig {
            enabled,
            packages: vec!["requests".to_string()],
        };
        PythonVenv::new(&config, &workdir)
    }

    #[test]
    fn venv_path_sits_under_the_workdir() {
        let dir = TempDir::new().unwrap();
        let venv = adapter(true, dir.path());
        assert_eq!(venv.venv_dir, dir.path().join("python"));
    }

    #[test]
    fn replacements_carry_the_enabled_sentinel() {
        let dir = TempDir::new().unwrap();
        let on = adapter(true, dir.path()).activation_replacements();
        assert!(on.iter().any(|(p, v)| p.0 == "PYTHON_VENV_ENABLED" && v == "true"));
        let off = adapter(false, dir.path()).activation_replacements();
        assert!(off.iter().any(|(p, v)| p.0 == "PYTHON_VENV_ENABLED" && v.is_empty()));
    }
}

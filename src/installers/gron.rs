//! gron adapter (the in-house inventory query tool, not the JSON one).
//!
//! gron is distributed as a python repo, so the adapter mirrors the ansible
//! layout on a smaller scale: venv + shallow clone under `<root>/gron/`, a
//! rendered `gron.yml` pointing at the ansible checkout, and a wrapper
//! script in the toolbox bin that runs the repo entry point through the
//! venv interpreter.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::{self, Config};
use crate::libs::process;
use crate::libs::workdir::WorkDir;
use crate::{log_debug, log_info};
use colored::Colorize;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;

pub struct Gron {
    enabled: bool,
    repo_url: String,
    gron_dir: PathBuf,
    venv: PathBuf,
    repo: PathBuf,
    cfg_path: PathBuf,
    wrapper_path: PathBuf,
    ansible_repo_path: PathBuf,
    templates_dir: Option<PathBuf>,
}

impl Gron {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        let gron_dir = workdir.root.join("gron");
        Gron {
            enabled: config.gron.enabled,
            repo_url: config.gron.repo_url.clone(),
            venv: gron_dir.join("venv"),
            repo: gron_dir.join("repo"),
            cfg_path: gron_dir.join("gron.yml"),
            gron_dir,
            wrapper_path: workdir.bin.join("gron"),
            ansible_repo_path: config.ansible.repo_path.clone(),
            templates_dir: config.templates_dir.clone(),
        }
    }

    fn fail(message: String) -> ToolboxError {
        ToolboxError::install("gron", message)
    }

    fn create_venv(&self) -> Result<(), ToolboxError> {
        if self.venv.exists() {
            log_debug!("gron venv exists");
            return Ok(());
        }
        process::run(&[
            OsStr::new("virtualenv"),
            OsStr::new("-p"),
            OsStr::new("python3"),
            self.venv.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("virtualenv: {e}")))?;
        Ok(())
    }

    fn clone_repo(&self) -> Result<(), ToolboxError> {
        if self.repo.exists() {
            log_info!(
                "gron repo already exists, skip clone ({}). Do `git pull`",
                self.repo.display()
            );
            return Ok(());
        }
        log_info!("Clone gron repo to {}", self.repo.display().to_string().cyan());
        process::run(&[
            OsStr::new("git"),
            OsStr::new("clone"),
            OsStr::new("--depth=1"),
            OsStr::new(&self.repo_url),
            self.repo.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("clone {}: {e}", self.repo_url)))?;
        Ok(())
    }

    fn install_venv_requirements(&self) -> Result<(), ToolboxError> {
        let pip = self.venv.join("bin").join("pip");
        let requirements = self.repo.join("requirements.txt");
        process::run(&[
            pip.as_os_str(),
            OsStr::new("--disable-pip-version-check"),
            OsStr::new("install"),
            OsStr::new("-r"),
            requirements.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("pip install -r: {e}")))?;
        Ok(())
    }

    fn render_cfg(&self) -> Result<(), ToolboxError> {
        let template = config_loading::template_text(self.templates_dir.as_deref(), "gron.yml")?;
        let rendered =
            template.replace("<ANSIBLE_PATH>", &self.ansible_repo_path.display().to_string());
        fs::write(&self.cfg_path, rendered)
            .map_err(|e| Self::fail(format!("write {}: {e}", self.cfg_path.display())))
    }

    fn write_wrapper(&self) -> Result<(), ToolboxError> {
        let script = format!(
            "#!/bin/sh\nexec \"{}/bin/python3\" \"{}/src/main.py\" -c \"{}\" \"$@\"\n",
            self.venv.display(),
            self.repo.display(),
            self.cfg_path.display(),
        );
        fs::write(&self.wrapper_path, script)
            .map_err(|e| Self::fail(format!("write {}: {e}", self.wrapper_path.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.wrapper_path, fs::Permissions::from_mode(0o770))
                .map_err(|e| Self::fail(format!("chmod {}: {e}", self.wrapper_path.display())))?;
        }
        Ok(())
    }
}

impl Installer for Gron {
    fn name(&self) -> &'static str {
        "gron"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} ...", "gron".bold());
        fs::create_dir_all(&self.gron_dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", self.gron_dir.display())))?;
        self.create_venv()?;
        self.clone_repo()?;
        self.install_venv_requirements()?;
        self.render_cfg()?;
        self.write_wrapper()?;
        log_info!("gron installed");
        Ok(())
    }

    // gron needs no activation wiring beyond being on the toolbox PATH.
    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter(root: &std::path::Path, json: &str) -> Gron {
        let workdir = WorkDir::new(root);
        fs::create_dir_all(root).unwrap();
        let config_file = root.join("config.json");
        fs::write(&config_file, json).unwrap();
        let config = config_loading::load(&config_file, &workdir, "testbox", None).unwrap();
        Gron::new(&config, &workdir)
    }

    #[test]
    fn rendered_cfg_points_at_the_ansible_checkout() {
        let dir = TempDir::new().unwrap();
        let json = r#"{
            "gron": {"enabled": true, "repo_url": "https://git/gron.git"},
            "ansible": {"enabled": true, "repo_path": "/srv/playbooks"}
        }"#;
        let gron = adapter(dir.path(), json);
        fs::create_dir_all(&gron.gron_dir).unwrap();
        gron.render_cfg().unwrap();
        let cfg = fs::read_to_string(&gron.cfg_path).unwrap();
        assert!(cfg.contains("ansible_path: /srv/playbooks"));
        assert!(!cfg.contains("<ANSIBLE_PATH>"));
    }

    #[test]
    fn wrapper_runs_the_repo_through_the_venv() {
        let dir = TempDir::new().unwrap();
        let gron = adapter(dir.path(), r#"{"gron": {"enabled": true}}"#);
        fs::create_dir_all(&gron.gron_dir).unwrap();
        fs::create_dir_all(dir.path().join("bin")).unwrap();
        gron.write_wrapper().unwrap();
        let script = fs::read_to_string(&gron.wrapper_path).unwrap();
        assert!(script.starts_with("#!/bin/sh\n"));
        assert!(script.contains("gron/venv/bin/python3"));
        assert!(script.contains("gron/repo/src/main.py"));
        assert!(script.contains("gron/gron.yml"));
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&gron.wrapper_path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o770);
        }
    }
}

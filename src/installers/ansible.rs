//! Ansible adapter.
//!
//! Ansible lives in its own virtualenv under `<root>/ansible/venv`, fed
//! either from the playbook repo's requirements.txt or from a pinned
//! `ansible==<version>`. The playbook repo itself is shallow-cloned once;
//! an existing checkout is left alone and its resolved location is cached
//! so later runs keep using it even if the config moves.
//!
//! ansible.cfg assembly is the one place the toolbox may touch a file the
//! user edits by hand, so it is diffed first and the overwrite policy
//! decides what happens when the generated config and the on-disk one
//! disagree.

use crate::errors::ToolboxError;
use crate::installers::{Installer, OverwritePolicy};
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::{self, Config};
use crate::libs::path_cache::PathCache;
use crate::libs::process;
use crate::libs::workdir::WorkDir;
use crate::{log_debug, log_info, log_warn};
use colored::Colorize;
use dialoguer::Confirm;
use similar::TextDiff;
use std::ffi::OsStr;
use std::fs;
use std::io::IsTerminal;
use std::path::PathBuf;

const ANSIBLE_ENABLED: Placeholder = Placeholder("ANSIBLE_ENABLED");
const ANSIBLE_CONFIG: Placeholder = Placeholder("ANSIBLE_CONFIG");
const ANSIBLE_REPO_PATH: Placeholder = Placeholder("ANSIBLE_REPO_PATH");

pub struct Ansible {
    enabled: bool,
    version: String,
    venv_packages: Vec<String>,
    repo_url: String,
    repo_path: PathBuf,
    cfg_path: PathBuf,
    repo_cfg_path: Option<PathBuf>,
    ssh_enabled: bool,
    ssh_config_path: PathBuf,
    ansible_dir: PathBuf,
    venv: PathBuf,
    bin_dir: PathBuf,
    root: PathBuf,
    templates_dir: Option<PathBuf>,
    overwrite: OverwritePolicy,
}

impl Ansible {
    pub fn new(config: &Config, workdir: &WorkDir, overwrite: OverwritePolicy) -> Self {
        let ansible_dir = workdir.root.join("ansible");
        Ansible {
            enabled: config.ansible.enabled,
            version: config.ansible.version.clone(),
            venv_packages: config.ansible.venv_packages.clone(),
            repo_url: config.ansible.repo_url.clone(),
            repo_path: config.ansible.repo_path.clone(),
            cfg_path: config.ansible.cfg_path.clone(),
            repo_cfg_path: config.ansible.repo_cfg_path.clone(),
            ssh_enabled: config.ssh.enabled,
            ssh_config_path: config.ssh.config_path.clone(),
            venv: ansible_dir.join("venv"),
            ansible_dir,
            bin_dir: workdir.bin.clone(),
            root: workdir.root.clone(),
            templates_dir: config.templates_dir.clone(),
            overwrite,
        }
    }

    fn fail(message: String) -> ToolboxError {
        ToolboxError::install("ansible", message)
    }

    fn create_venv(&self) -> Result<(), ToolboxError> {
        if self.venv.exists() {
            log_debug!("Ansible venv exists");
            return Ok(());
        }
        process::run(&[
            OsStr::new("virtualenv"),
            OsStr::new("-p"),
            OsStr::new("python3"),
            self.venv.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("virtualenv: {e}")))?;
        log_debug!("Ansible venv created");
        Ok(())
    }

    fn clone_repo(&self) -> Result<(), ToolboxError> {
        if self.repo_url.is_empty() {
            log_info!("No ansible repo configured, skip clone");
            return Ok(());
        }
        if self.repo_path.exists() {
            log_info!(
                "Ansible repo already exists, skip clone ({}). Do `git pull`",
                self.repo_path.display()
            );
            return Ok(());
        }
        log_info!("Clone ansible repo to {}", self.repo_path.display().to_string().cyan());
        process::run(&[
            OsStr::new("git"),
            OsStr::new("clone"),
            OsStr::new("--depth=1"),
            OsStr::new(&self.repo_url),
            self.repo_path.as_os_str(),
        ])
        .map_err(|e| Self::fail(format!("clone {}: {e}", self.repo_url)))?;
        Ok(())
    }

    fn install_venv_requirements(&self) -> Result<(), ToolboxError> {
        let pip = self.venv.join("bin").join("pip");
        let requirements = self.repo_path.join("requirements.txt");
        if requirements.exists() {
            log_debug!("Install ansible requirements");
            process::run(&[
                pip.as_os_str(),
                OsStr::new("--disable-pip-version-check"),
                OsStr::new("install"),
                OsStr::new("-r"),
                requirements.as_os_str(),
            ])
            .map_err(|e| Self::fail(format!("pip install -r: {e}")))?;
        } else if !self.version.is_empty() {
            let pinned = format!("ansible=={}", self.version);
            process::run(&[
                pip.as_os_str(),
                OsStr::new("--disable-pip-version-check"),
                OsStr::new("install"),
                OsStr::new(&pinned),
            ])
            .map_err(|e| Self::fail(format!("pip install {pinned}: {e}")))?;
        } else {
            log_debug!("Skip ansible setup, no version or requirements.txt");
        }

        if !self.venv_packages.is_empty() {
            let mut argv: Vec<&OsStr> = vec![
                pip.as_os_str(),
                OsStr::new("--disable-pip-version-check"),
                OsStr::new("install"),
            ];
            argv.extend(self.venv_packages.iter().map(OsStr::new));
            process::run(&argv).map_err(|e| Self::fail(format!("pip install extras: {e}")))?;
        }
        Ok(())
    }

    /// The candidate ansible.cfg content: repo-shipped config when the
    /// checkout has one, the built-in template otherwise, plus ssh wiring
    /// when the ssh agent is on and the source has no [ssh_connection] yet.
    fn assemble_cfg(&self) -> Result<String, ToolboxError> {
        let repo_cfg = self
            .repo_cfg_path
            .clone()
            .or_else(|| {
                let path = self.repo_path.join("ansible.cfg");
                path.exists().then_some(path)
            });
        let mut cfg = match repo_cfg {
            Some(path) => {
                log_info!("Ansible source cfg: {}", path.display());
                fs::read_to_string(&path)
                    .map_err(|e| Self::fail(format!("read {}: {e}", path.display())))?
            }
            None => config_loading::template_text(self.templates_dir.as_deref(), "ansible.cfg")?,
        };

        if self.ssh_enabled {
            if cfg.contains("[ssh_connection]") {
                log_info!("[ssh_connection] already present, skip ssh setup for ansible");
            } else {
                if !cfg.ends_with('\n') {
                    cfg.push('\n');
                }
                cfg.push_str("[ssh_connection]\n");
                cfg.push_str(&format!("ssh_args = -F {}\n", self.ssh_config_path.display()));
            }
        }
        Ok(cfg)
    }

    /// Applies the overwrite policy: identical content is always fine,
    /// otherwise the diff is shown and the policy (or the user) decides.
    fn write_cfg(&self, candidate: &str) -> Result<(), ToolboxError> {
        if self.cfg_path.exists() {
            let current = fs::read_to_string(&self.cfg_path)
                .map_err(|e| Self::fail(format!("read {}: {e}", self.cfg_path.display())))?;
            if current != candidate {
                let diff = TextDiff::from_lines(current.as_str(), candidate)
                    .unified_diff()
                    .header("on disk", "generated")
                    .to_string();
                let overwrite = match self.overwrite {
                    OverwritePolicy::AlwaysOverwrite => true,
                    OverwritePolicy::NeverOverwrite => false,
                    OverwritePolicy::Ask => {
                        if std::io::stdin().is_terminal() {
                            println!("Ansible config diff ({}):", self.cfg_path.display());
                            println!("{diff}");
                            Confirm::new()
                                .with_prompt("ansible.cfg already exists, overwrite?")
                                .default(false)
                                .interact()
                                .map_err(|e| Self::fail(format!("prompt: {e}")))?
                        } else {
                            false
                        }
                    }
                };
                if !overwrite {
                    log_info!("Keep existing {}", self.cfg_path.display());
                    return Ok(());
                }
            }
        }
        fs::write(&self.cfg_path, candidate)
            .map_err(|e| Self::fail(format!("write {}: {e}", self.cfg_path.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.cfg_path, fs::Permissions::from_mode(0o660))
                .map_err(|e| Self::fail(format!("chmod {}: {e}", self.cfg_path.display())))?;
        }
        Ok(())
    }

    /// Hard-links every `ansible*` entry point out of the venv into
    /// `<bin>/ansible/`, which activated sessions put on PATH.
    fn create_bin_links(&self) -> Result<(), ToolboxError> {
        let venv_bin = self.venv.join("bin");
        let link_dir = self.bin_dir.join("ansible");
        fs::create_dir_all(&link_dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", link_dir.display())))?;

        let entries = fs::read_dir(&venv_bin)
            .map_err(|e| Self::fail(format!("read {}: {e}", venv_bin.display())))?;
        for entry in entries {
            let entry = entry.map_err(|e| Self::fail(e.to_string()))?;
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with("ansible") {
                continue;
            }
            let link = link_dir.join(&name);
            if link.exists() {
                fs::remove_file(&link)
                    .map_err(|e| Self::fail(format!("unlink {}: {e}", link.display())))?;
            }
            fs::hard_link(entry.path(), &link)
                .map_err(|e| Self::fail(format!("link {}: {e}", link.display())))?;
            log_debug!("Link created: {}", link.display());
        }
        Ok(())
    }
}

impl Installer for Ansible {
    fn name(&self) -> &'static str {
        "ansible"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} ...", "ansible".bold());
        fs::create_dir_all(&self.ansible_dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", self.ansible_dir.display())))?;
        self.create_venv()?;
        self.clone_repo()?;
        self.install_venv_requirements()?;
        let candidate = self.assemble_cfg()?;
        self.write_cfg(&candidate)?;
        self.create_bin_links()?;
        PathCache::new(&self.root)
            .save(&self.repo_path)
            .map_err(|e| Self::fail(format!("cache repo path: {e}")))?;
        log_info!("Ansible installed");
        Ok(())
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![
            (ANSIBLE_ENABLED, enabled_flag(self.enabled)),
            (ANSIBLE_CONFIG, self.cfg_path.display().to_string()),
            (ANSIBLE_REPO_PATH, self.repo_path.display().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn adapter(root: &std::path::Path, json: &str, overwrite: OverwritePolicy) -> Ansible {
        let workdir = WorkDir::new(root);
        fs::create_dir_all(root).unwrap();
        let config_file = root.join("config.json");
        fs::write(&config_file, json).unwrap();
        let config = config_loading::load(&config_file, &workdir, "testbox", None).unwrap();
        Ansible::new(&config, &workdir, overwrite)
    }

    #[test]
    fn assembled_cfg_gets_ssh_wiring_when_agent_is_on() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"ansible": {"enabled": true}, "ssh": {"enabled": true}}"#;
        let ansible = adapter(dir.path(), json, OverwritePolicy::NeverOverwrite);
        let cfg = ansible.assemble_cfg().unwrap();
        assert!(cfg.contains("[ssh_connection]"));
        assert!(cfg.contains(&format!("ssh_args = -F {}", dir.path().join("ssh/config").display())));
    }

    #[test]
    fn ssh_wiring_is_not_duplicated() {
        let dir = TempDir::new().unwrap();
        let repo = dir.path().join("ansible").join("repo");
        fs::create_dir_all(&repo).unwrap();
        fs::write(repo.join("ansible.cfg"), "[defaults]\n[ssh_connection]\nssh_args = -C\n").unwrap();
        let json = r#"{"ansible": {"enabled": true}, "ssh": {"enabled": true}}"#;
        let ansible = adapter(dir.path(), json, OverwritePolicy::NeverOverwrite);
        let cfg = ansible.assemble_cfg().unwrap();
        assert_eq!(cfg.matches("[ssh_connection]").count(), 1);
        assert!(cfg.contains("ssh_args = -C"));
    }

    #[test]
    fn never_overwrite_keeps_a_diverged_cfg() {
        let dir = TempDir::new().unwrap();
        let ansible = adapter(
            dir.path(),
            r#"{"ansible": {"enabled": true}}"#,
            OverwritePolicy::NeverOverwrite,
        );
        fs::create_dir_all(dir.path().join("ansible")).unwrap();
        fs::write(&ansible.cfg_path, "[defaults]\nedited_by_hand = yes\n").unwrap();
        ansible.write_cfg("[defaults]\ngenerated = yes\n").unwrap();
        let kept = fs::read_to_string(&ansible.cfg_path).unwrap();
        assert!(kept.contains("edited_by_hand"));
    }

    #[test]
    fn always_overwrite_replaces_a_diverged_cfg() {
        let dir = TempDir::new().unwrap();
        let ansible = adapter(
            dir.path(),
            r#"{"ansible": {"enabled": true}}"#,
            OverwritePolicy::AlwaysOverwrite,
        );
        fs::create_dir_all(dir.path().join("ansible")).unwrap();
        fs::write(&ansible.cfg_path, "[defaults]\nedited_by_hand = yes\n").unwrap();
        ansible.write_cfg("[defaults]\ngenerated = yes\n").unwrap();
        let now = fs::read_to_string(&ansible.cfg_path).unwrap();
        assert!(now.contains("generated"));
    }

    #[test]
    fn fresh_cfg_is_written_without_prompting() {
        let dir = TempDir::new().unwrap();
        let ansible = adapter(
            dir.path(),
            r#"{"ansible": {"enabled": true}}"#,
            OverwritePolicy::Ask,
        );
        fs::create_dir_all(dir.path().join("ansible")).unwrap();
        ansible.write_cfg("[defaults]\n").unwrap();
        assert!(ansible.cfg_path.exists());
    }

    #[test]
    fn replacements_point_at_the_resolved_repo() {
        let dir = TempDir::new().unwrap();
        let ansible = adapter(
            dir.path(),
            r#"{"ansible": {"enabled": true, "repo_path": "/srv/playbooks"}}"#,
            OverwritePolicy::NeverOverwrite,
        );
        let repl = ansible.activation_replacements();
        assert!(repl.iter().any(|(p, v)| p.0 == "ANSIBLE_REPO_PATH" && v == "/srv/playbooks"));
        assert!(repl.iter().any(|(p, v)| p.0 == "ANSIBLE_ENABLED" && v == "true"));
    }
}

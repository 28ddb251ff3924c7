//! ssh agent adapter.
//!
//! Nothing is downloaded here. The adapter writes an ssh client config into
//! `<root>/ssh/` that pins IdentityAgent to a per-toolbox agent socket, and
//! the activation script starts `ssh-agent -a <socket>` on demand. Keys are
//! pulled in lazily: when a `load_keys_from_host` host is configured, the
//! activation script fires one no-op connection at it so AddKeysToAgent
//! populates the agent.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use crate::log_info;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

const SSH_ENABLED: Placeholder = Placeholder("SSH_ENABLED");
const SSH_ALIAS: Placeholder = Placeholder("SSH_ALIAS");
const SSH_AGENT_RUN_CMD: Placeholder = Placeholder("SSH_AGENT_RUN_CMD");
const SSH_AGENT_PID_PATH: Placeholder = Placeholder("SSH_AGENT_PID_PATH");
const SSH_AGENT_SOCK: Placeholder = Placeholder("SSH_AGENT_SOCK");
const SSH_HOST: Placeholder = Placeholder("SSH_HOST");
const SSH_CONFIG_PATH: Placeholder = Placeholder("SSH_CONFIG_PATH");

pub struct SshAgent {
    enabled: bool,
    user: String,
    load_keys_from_host: String,
    dir: PathBuf,
    config_path: PathBuf,
    agent_socket: PathBuf,
    agent_pid_file: PathBuf,
}

impl SshAgent {
    pub fn new(config: &Config, _workdir: &WorkDir) -> Self {
        SshAgent {
            enabled: config.ssh.enabled,
            user: config.ssh.user.clone(),
            load_keys_from_host: config.ssh.load_keys_from_host.clone(),
            dir: config.ssh.dir.clone(),
            config_path: config.ssh.config_path.clone(),
            agent_socket: config.ssh.agent_socket.clone(),
            agent_pid_file: config.ssh.agent_pid_file.clone(),
        }
    }

    fn fail(message: String) -> ToolboxError {
        ToolboxError::install("ssh", message)
    }

    fn render_config(&self) -> String {
        let mut config = String::from("Host *\n");
        config.push_str("\tAddKeysToAgent yes\n");
        config.push_str("\tForwardAgent yes\n");
        config.push_str(&format!("\tIdentityAgent {}", self.agent_socket.display()));
        if !self.user.is_empty() {
            config.push_str(&format!("\n\tUser {}", self.user));
        }
        config.push('\n');
        config
    }
}

impl Installer for SshAgent {
    fn name(&self) -> &'static str {
        "ssh"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        log_info!("Install {} agent config ...", "ssh".bold());
        fs::create_dir_all(&self.dir)
            .map_err(|e| Self::fail(format!("create {}: {e}", self.dir.display())))?;
        fs::write(&self.config_path, self.render_config())
            .map_err(|e| Self::fail(format!("write {}: {e}", self.config_path.display())))?;
        Ok(())
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        vec![
            (SSH_ENABLED, enabled_flag(self.enabled)),
            (
                SSH_ALIAS,
                format!("ssh='ssh -F {}'", self.config_path.display()),
            ),
            (
                SSH_AGENT_RUN_CMD,
                format!("ssh-agent -a {}", self.agent_socket.display()),
            ),
            (
                SSH_AGENT_PID_PATH,
                self.agent_pid_file.display().to_string(),
            ),
            (SSH_AGENT_SOCK, self.agent_socket.display().to_string()),
            (SSH_HOST, self.load_keys_from_host.clone()),
            (SSH_CONFIG_PATH, self.config_path.display().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config_loading;
    use tempfile::TempDir;

    fn adapter(root: &std::path::Path, json: &str) -> SshAgent {
        let workdir = WorkDir::new(root);
        fs::create_dir_all(root).unwrap();
        let config_file = root.join("config.json");
        fs::write(&config_file, json).unwrap();
        let config = config_loading::load(&config_file, &workdir, "testbox", None).unwrap();
        SshAgent::new(&config, &workdir)
    }

    #[test]
    fn config_pins_the_agent_socket() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"ssh": {"enabled": true, "user": "deploy", "load_keys_from_host": "bastion"}}"#;
        let ssh = adapter(dir.path(), json);
        ssh.install().unwrap();
        let written = fs::read_to_string(&ssh.config_path).unwrap();
        assert!(written.starts_with("Host *\n"));
        assert!(written.contains(&format!("IdentityAgent {}", ssh.agent_socket.display())));
        assert!(written.contains("User deploy"));
    }

    #[test]
    fn user_line_is_omitted_when_unset() {
        let dir = TempDir::new().unwrap();
        let ssh = adapter(dir.path(), r#"{"ssh": {"enabled": true}}"#);
        assert!(!ssh.render_config().contains("User"));
    }

    #[test]
    fn alias_and_agent_point_at_the_same_toolbox_paths() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"ssh": {"enabled": true, "load_keys_from_host": "bastion"}}"#;
        let ssh = adapter(dir.path(), json);
        let repl = ssh.activation_replacements();
        let get = |key: &str| {
            repl.iter()
                .find(|(p, _)| p.0 == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("SSH_ALIAS"), format!("ssh='ssh -F {}'", ssh.config_path.display()));
        assert_eq!(
            get("SSH_AGENT_RUN_CMD"),
            format!("ssh-agent -a {}", ssh.agent_socket.display())
        );
        assert_eq!(get("SSH_HOST"), "bastion");
        assert_eq!(get("SSH_CONFIG_PATH"), ssh.config_path.display().to_string());
    }
}

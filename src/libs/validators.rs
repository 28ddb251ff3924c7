//! Pre-install gates: host platform and required external commands.
//!
//! Both run before any installer and before the activation script is
//! written, so an unsupported machine or a missing dependency never leaves
//! a half-touched workdir. Downloads and archive handling are in-process,
//! so only the commands the enabled installers actually exec are required:
//! git for repo checkouts, virtualenv for the python-based tools.

use crate::errors::ToolboxError;
use crate::libs::config_loading::Config;
use std::env;
use std::path::Path;

/// The two supported OS families, x86-64 only.
pub fn validate_platform(config: &Config) -> Result<(), ToolboxError> {
    if config.platform.is_none() {
        return Err(ToolboxError::Platform(format!(
            "OS family '{}' is not supported (need linux or darwin)",
            env::consts::OS
        )));
    }
    if !config.is_x64 {
        return Err(ToolboxError::Platform(format!(
            "architecture '{}' is not supported (need x86_64)",
            env::consts::ARCH
        )));
    }
    Ok(())
}

/// Every command the enabled installers will exec must be resolvable up
/// front.
pub fn check_dependencies(config: &Config) -> Result<(), ToolboxError> {
    for command in required_commands(config) {
        if !command_on_path(command) {
            return Err(ToolboxError::Dependency(command));
        }
    }
    Ok(())
}

fn required_commands(config: &Config) -> Vec<&'static str> {
    let mut commands = Vec::new();
    let clones_a_repo = (config.ansible.enabled && !config.ansible.repo_url.is_empty())
        || config.gron.enabled;
    if clones_a_repo {
        commands.push("git");
    }
    if config.python.enabled || config.ansible.enabled || config.gron.enabled {
        commands.push("virtualenv");
    }
    commands
}

fn command_on_path(name: &str) -> bool {
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| is_executable(&dir.join(name)))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config_loading;
    use crate::libs::workdir::WorkDir;
    use std::fs;
    use tempfile::TempDir;

    fn config_from(json: &str) -> Config {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config_file = dir.path().join("config.json");
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(&config_file, json).unwrap();
        config_loading::load(&config_file, &workdir, "testbox", None).unwrap()
    }

    #[test]
    fn sh_is_always_on_path() {
        assert!(command_on_path("sh"));
    }

    #[test]
    fn nonsense_command_is_not_on_path() {
        assert!(!command_on_path("definitely-not-a-real-binary-7b3c"));
    }

    #[test]
    fn nothing_is_required_when_no_tool_execs_commands() {
        let config = config_from(r#"{"vault": {"enabled": true, "version": "1.10.0"}}"#);
        assert!(required_commands(&config).is_empty());
        check_dependencies(&config).unwrap();
    }

    #[test]
    fn python_tools_require_virtualenv() {
        let config = config_from(r#"{"python": {"enabled": true}}"#);
        assert_eq!(required_commands(&config), vec!["virtualenv"]);
    }

    #[test]
    fn a_configured_repo_requires_git() {
        let config = config_from(
            r#"{"ansible": {"enabled": true, "repo_url": "https://git/playbooks.git"}}"#,
        );
        assert_eq!(required_commands(&config), vec!["git", "virtualenv"]);
    }

    #[test]
    fn ansible_without_a_repo_skips_git() {
        let config = config_from(r#"{"ansible": {"enabled": true}}"#);
        assert_eq!(required_commands(&config), vec!["virtualenv"]);
    }
}

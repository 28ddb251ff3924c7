//! Post-install summary rendering.
//!
//! The same text serves three surfaces: printed at the end of a successful
//! run, printed for `--info`, and saved to `<root>/.info` so the
//! `admin-toolbox-info` alias can replay it inside an activated session.

use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use std::fs;
use std::io;

pub fn render(config: &Config, workdir: &WorkDir) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "To start working with the env:\n\tsource {}",
        config.activate_path.display()
    ));
    lines.push("To end working with the env:\n\tdeactivate".to_string());
    lines.push(format!(
        "Add alias to .<shell>rc:\n\talias {}=\"source {}\"",
        config.toolbox_name,
        config.activate_path.display()
    ));
    lines.push(format!("\nToolbox dir: {}", workdir.root.display()));
    if config.ansible.enabled {
        lines.push(format!("Ansible: {}", config.ansible.repo_path.display()));
    }
    if config.gcloud.enabled {
        lines.push("\nGoogle:".to_string());
        lines.push("\tLogin to gcloud with: gcloud auth login --no-launch-browser".to_string());
        lines.push("\tExample for getting kubectl creds:".to_string());
        lines.push(
            "\t  gcloud container clusters get-credentials <cluster> --region <region> --project <project>"
                .to_string(),
        );
    }
    lines.push("\nCLI:".to_string());
    if config.vault.enabled {
        lines.push("\tVault login:   vault-login <username>".to_string());
        lines.push("\tVault logout:  vault-logout".to_string());
    }
    if config.ansible.enabled {
        lines.push("\tcd to Ansible dir:          ans".to_string());
        lines.push("\tcd to a dir inside Ansible: cd $ans/common_roles".to_string());
    }
    if config.ssh.enabled {
        lines.push(format!(
            "\tssh goes through the toolbox agent ({})",
            config.ssh.agent_socket.display()
        ));
    }
    lines.push("\tShow this text again: admin-toolbox-info".to_string());
    lines.join("\n")
}

/// Saves the rendered summary to `<root>/.info`.
pub fn save(config: &Config, workdir: &WorkDir) -> io::Result<()> {
    fs::write(workdir.root.join(".info"), render(config, workdir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::config_loading;
    use tempfile::TempDir;

    fn config_from(json: &str, workdir: &WorkDir) -> Config {
        let config_file = workdir.root.join("config.json");
        fs::create_dir_all(&workdir.root).unwrap();
        fs::write(&config_file, json).unwrap();
        config_loading::load(&config_file, workdir, "testbox", None).unwrap()
    }

    #[test]
    fn summary_mentions_vault_instructions_when_enabled() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = config_from(r#"{"vault": {"enabled": true, "version": "1.10.0"}}"#, &workdir);
        let text = render(&config, &workdir);
        assert!(text.contains("vault-login"));
        assert!(text.contains("vault-logout"));
        assert!(text.contains("source"));
    }

    #[test]
    fn summary_skips_disabled_tools() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = config_from("{}", &workdir);
        let text = render(&config, &workdir);
        assert!(!text.contains("vault-login"));
        assert!(!text.contains("gcloud auth"));
    }

    #[test]
    fn save_writes_the_info_file() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = config_from("{}", &workdir);
        save(&config, &workdir).unwrap();
        let text = fs::read_to_string(workdir.root.join(".info")).unwrap();
        assert!(text.contains("Toolbox dir"));
    }
}

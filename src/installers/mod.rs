//! The installer contract and the per-tool adapters.
//!
//! Every tool the toolbox manages implements `Installer`, which is exactly
//! two capabilities: bring the tool to the configured state (`install`,
//! idempotent and safe to re-run after a partial failure), and contribute
//! this tool's placeholder substitutions for the activation script
//! (`activation_replacements`, pure — no I/O).
//!
//! Adapters capture everything they need from `Config` and `WorkDir` at
//! construction time; none of them holds state that outlives one run. The
//! registry order below is the install order *and* the activation
//! composition order, and it is fixed.

pub(crate) mod binary;

pub(crate) mod ansible;
pub(crate) mod argocd;
pub(crate) mod gcloud;
pub(crate) mod gron;
pub(crate) mod helm;
pub(crate) mod k9s;
pub(crate) mod kubectl;
pub(crate) mod python_venv;
pub(crate) mod ssh_agent;
pub(crate) mod terraform;
pub(crate) mod terragrunt;
pub(crate) mod vault;

use crate::errors::ToolboxError;
use crate::libs::activation::Placeholder;
use crate::libs::config_loading::{Config, ProxyConfig};
use crate::libs::workdir::WorkDir;
use clap::ValueEnum;

pub trait Installer {
    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool;

    /// Brings the tool to the state implied by the configuration. Must be a
    /// fast no-op when the tool is already at the desired version, and must
    /// tolerate leftovers from a previously failed run.
    fn install(&self) -> Result<(), ToolboxError>;

    /// This tool's complete placeholder set. Disabled adapters return the
    /// same keys with empty-string sentinels so the template still resolves.
    fn activation_replacements(&self) -> Vec<(Placeholder, String)>;
}

/// What to do when a generated config file (ansible.cfg) differs from one
/// already on disk that the user may have edited.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Show the diff and ask, but only on an interactive terminal;
    /// otherwise decline (same as answering "no").
    Ask,
    AlwaysOverwrite,
    NeverOverwrite,
}

/// Builds the full adapter list in registration order. Disabled tools are
/// included: their inert placeholder contributions are what lets the
/// template resolve completely.
pub fn build(
    config: &Config,
    workdir: &WorkDir,
    overwrite: OverwritePolicy,
) -> Vec<Box<dyn Installer>> {
    vec![
        Box::new(python_venv::PythonVenv::new(config, workdir)),
        Box::new(ansible::Ansible::new(config, workdir, overwrite)),
        Box::new(vault::Vault::new(config, workdir)),
        Box::new(terraform::Terraform::new(config, workdir)),
        Box::new(terragrunt::Terragrunt::new(config, workdir)),
        Box::new(gcloud::Gcloud::new(config, workdir)),
        Box::new(kubectl::Kubectl::new(config, workdir)),
        Box::new(k9s::K9s::new(config, workdir)),
        Box::new(gron::Gron::new(config, workdir)),
        Box::new(helm::Helm::new(config, workdir)),
        Box::new(argocd::Argocd::new(config, workdir)),
        Box::new(ssh_agent::SshAgent::new(config, workdir)),
    ]
}

/// Alias line for tools that can be forced through the proxy: the alias
/// carries the proxy env var inline so only that tool is proxied.
pub(crate) fn proxied_alias(binary: &str, use_proxy: bool, proxy: &ProxyConfig) -> String {
    if use_proxy {
        if !proxy.https.is_empty() {
            return format!("{binary}='HTTPS_PROXY={} {binary}'", proxy.https);
        }
        if !proxy.http.is_empty() {
            return format!("{binary}='HTTP_PROXY={} {binary}'", proxy.http);
        }
    }
    format!("{binary}='{binary}'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::activation::ActivationScript;
    use crate::libs::config_loading;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    fn load_config(json: &str, workdir: &WorkDir) -> Config {
        fs::create_dir_all(&workdir.root).unwrap();
        let config_file = workdir.root.join("config.json");
        fs::write(&config_file, json).unwrap();
        config_loading::load(&config_file, workdir, "testbox", None).unwrap()
    }

    #[test]
    fn proxied_alias_prefers_https() {
        let proxy = ProxyConfig {
            http: "http://p:80".into(),
            https: "http://p:443".into(),
        };
        assert_eq!(
            proxied_alias("terraform", true, &proxy),
            "terraform='HTTPS_PROXY=http://p:443 terraform'"
        );
        assert_eq!(proxied_alias("terraform", false, &proxy), "terraform='terraform'");
    }

    #[test]
    fn placeholder_namespaces_are_disjoint_across_adapters() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = load_config("{}", &workdir);
        let installers = build(&config, &workdir, OverwritePolicy::NeverOverwrite);

        let mut seen: HashSet<&'static str> = HashSet::new();
        for installer in &installers {
            for (placeholder, _) in installer.activation_replacements() {
                assert!(
                    seen.insert(placeholder.0),
                    "placeholder <{}> contributed twice",
                    placeholder.0
                );
            }
        }
    }

    // The shipped template and the adapters' contributions must agree: with
    // every adapter registered (all disabled here), composition resolves
    // every token in templates/activate.sh.
    #[test]
    fn default_template_fully_resolves_with_all_adapters_disabled() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = load_config("{}", &workdir);
        let installers = build(&config, &workdir, OverwritePolicy::NeverOverwrite);

        let mut script =
            ActivationScript::from_template(config.template_text("activate.sh").unwrap());
        script
            .apply(
                "toolbox",
                &[
                    (Placeholder("TOOLBOX_NAME"), config.toolbox_name.clone()),
                    (Placeholder("WORKDIR_ROOT"), workdir.root.display().to_string()),
                    (Placeholder("WORKDIR_TMP"), workdir.tmp.display().to_string()),
                    (Placeholder("WORKDIR_BIN"), workdir.bin.display().to_string()),
                ],
            )
            .unwrap();
        for installer in &installers {
            script
                .apply(installer.name(), &installer.activation_replacements())
                .unwrap();
        }
        script.validate().unwrap();
    }

    #[test]
    fn enabled_vault_turns_its_template_block_on() {
        let dir = TempDir::new().unwrap();
        let workdir = WorkDir::new(dir.path());
        let config = load_config(
            r#"{"vault": {"enabled": true, "version": "1.10.0", "addr": "https://v:8200"}}"#,
            &workdir,
        );
        let installers = build(&config, &workdir, OverwritePolicy::NeverOverwrite);

        let mut script =
            ActivationScript::from_template(config.template_text("activate.sh").unwrap());
        script
            .apply(
                "toolbox",
                &[
                    (Placeholder("TOOLBOX_NAME"), config.toolbox_name.clone()),
                    (Placeholder("WORKDIR_ROOT"), workdir.root.display().to_string()),
                    (Placeholder("WORKDIR_TMP"), workdir.tmp.display().to_string()),
                    (Placeholder("WORKDIR_BIN"), workdir.bin.display().to_string()),
                ],
            )
            .unwrap();
        for installer in &installers {
            script
                .apply(installer.name(), &installer.activation_replacements())
                .unwrap();
        }
        script.validate().unwrap();
        let text = script.text();
        assert!(text.contains(r#"VAULT_ADDR="https://v:8200""#));
        assert!(!text.contains("<VAULT_"));
    }
}

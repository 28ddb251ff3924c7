//! Vault adapter.
//!
//! Beyond the zip-wrapped binary, vault owns the largest activation
//! surface: the server address, the login method for the `vault-login`
//! helper, and optional `load_env_vars` — environment variables an
//! activated session fills from vault secrets (`export VAR=$(vault kv get
//! ...)`) and unsets again on `deactivate`.

use crate::errors::ToolboxError;
use crate::installers::Installer;
use crate::installers::binary::{ArchiveKind, VersionedBinary};
use crate::libs::activation::{Placeholder, enabled_flag};
use crate::libs::config_loading::Config;
use crate::libs::workdir::WorkDir;
use crate::log_warn;
use colored::Colorize;
use std::collections::BTreeMap;

const VAULT_ENABLED: Placeholder = Placeholder("VAULT_ENABLED");
const VAULT_ADDR: Placeholder = Placeholder("VAULT_ADDR");
const VAULT_LOGIN_METHOD: Placeholder = Placeholder("VAULT_LOGIN_METHOD");
const VAULT_IS_LOAD_ENV_VARS: Placeholder = Placeholder("VAULT_IS_LOAD_ENV_VARS");
const VAULT_LOAD_ENV_VARS: Placeholder = Placeholder("VAULT_LOAD_ENV_VARS");
const VAULT_UNSET_ENV_VARS: Placeholder = Placeholder("VAULT_UNSET_ENV_VARS");

pub struct Vault {
    enabled: bool,
    addr: String,
    login_method: String,
    load_env_vars: BTreeMap<String, String>,
    binary: VersionedBinary,
}

impl Vault {
    pub fn new(config: &Config, workdir: &WorkDir) -> Self {
        Vault {
            enabled: config.vault.enabled,
            addr: config.vault.addr.clone(),
            login_method: config.vault.login_method.clone(),
            load_env_vars: config.vault.load_env_vars.clone(),
            binary: VersionedBinary {
                tool: "vault",
                bin_path: workdir.bin.join("vault"),
                tmp_dir: workdir.tmp.clone(),
                desired_version: config.vault.version.clone(),
                url_template: config.vault.download_url.clone(),
                os: config.platform.map(|p| p.as_str()).unwrap_or("linux"),
                arch: "amd64",
                archive: ArchiveKind::Zip {
                    inner_path: "vault".to_string(),
                },
                version_args: &["-v"],
                ignore_version_exit_status: false,
                parser: parse_version,
                proxy: config.proxy.preferred().map(str::to_string),
                mode: 0o550,
            },
        }
    }

    /// `export VAR=$(vault kv get ...)` lines for the activation script.
    /// Entries are `VAR -> "secret/path;;item"`; a malformed entry is
    /// skipped with a warning rather than producing a broken script.
    fn env_load_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (env_var, vault_key) in &self.load_env_vars {
            let Some((path, item)) = vault_key.split_once(";;") else {
                log_warn!(
                    "vault load_env_vars entry {} must look like 'secret/path;;item' (got {:?}), skipping",
                    env_var.bold(),
                    vault_key
                );
                continue;
            };
            lines.push(format!(
                "export {}=$(vault kv get -format=json {} | jq -r .data.data.{})",
                env_var,
                path.trim(),
                item.trim()
            ));
        }
        lines
    }

    fn env_unset_lines(&self) -> Vec<String> {
        self.env_load_lines_keys()
            .map(|env_var| format!("unset {env_var}"))
            .collect()
    }

    fn env_load_lines_keys(&self) -> impl Iterator<Item = &String> {
        self.load_env_vars
            .iter()
            .filter(|(_, v)| v.contains(";;"))
            .map(|(k, _)| k)
    }
}

impl Installer for Vault {
    fn name(&self) -> &'static str {
        "vault"
    }

    fn enabled(&self) -> bool {
        self.enabled
    }

    fn install(&self) -> Result<(), ToolboxError> {
        self.binary.install()
    }

    fn activation_replacements(&self) -> Vec<(Placeholder, String)> {
        let load_lines = if self.enabled { self.env_load_lines() } else { Vec::new() };
        let unset_lines = if self.enabled { self.env_unset_lines() } else { Vec::new() };
        vec![
            (VAULT_ENABLED, enabled_flag(self.enabled)),
            (VAULT_ADDR, self.addr.clone()),
            (VAULT_LOGIN_METHOD, self.login_method.clone()),
            (VAULT_IS_LOAD_ENV_VARS, enabled_flag(!load_lines.is_empty())),
            (VAULT_LOAD_ENV_VARS, load_lines.join("\n")),
            (VAULT_UNSET_ENV_VARS, unset_lines.join("\n")),
        ]
    }
}

/// `vault -v` prints `Vault vX.Y.Z (<commit sha>)`.
fn parse_version(output: &str) -> Option<String> {
    let line = output.lines().next()?.trim();
    let mut parts = line.split_whitespace();
    if parts.next()? != "Vault" {
        return None;
    }
    let version = parts.next()?.strip_prefix('v')?;
    semver::Version::parse(version).ok()?;
    Some(version.to_string())
}

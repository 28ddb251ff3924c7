//! Builds the resolved, immutable `Config` value from the raw JSON document.
//!
//! The resolved view is constructed exactly once per run and then only read:
//! every installer borrows the same `Config` and none of them may mutate it.
//! (The single cross-run exception, the ansible repo path cache, lives in
//! its own sidecar file — see `libs::path_cache`.)
//!
//! Per-section resolution follows one rule: a missing section, an empty
//! section, or `enabled: false` leaves the tool disabled with its defaults;
//! only an enabled section copies fields over, filling explicit defaults for
//! anything omitted.

use crate::errors::ToolboxError;
use crate::libs::path_cache::PathCache;
use crate::libs::workdir::WorkDir;
use crate::log_debug;
use crate::schemas::config::RawConfig;
use colored::Colorize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// OS family the toolbox supports. Download URL templates receive the
/// lowercase name via `{os}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Darwin,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
        }
    }

    /// Detects the current OS family, `None` when running anywhere else.
    pub fn detect() -> Option<Platform> {
        match env::consts::OS {
            "linux" => Some(Platform::Linux),
            "macos" => Some(Platform::Darwin),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProxyConfig {
    pub http: String,
    pub https: String,
}

impl ProxyConfig {
    /// The proxy a download should use when a tool's proxy policy is on:
    /// https wins over http, empty means direct.
    pub fn preferred(&self) -> Option<&str> {
        if !self.https.is_empty() {
            Some(&self.https)
        } else if !self.http.is_empty() {
            Some(&self.http)
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct PythonConfig {
    pub enabled: bool,
    pub packages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct VaultConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub addr: String,
    pub login_method: String,
    pub load_env_vars: BTreeMap<String, String>,
}

/// Shared shape for terraform and terragrunt: both honor the proxy policy
/// through a shell alias, not just at download time.
#[derive(Debug, Default)]
pub struct TerraConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub use_proxy: bool,
}

#[derive(Debug, Default)]
pub struct BinaryToolConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default)]
pub struct KubectlConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    /// Directory exported as the KUBECONFIG parent for activated sessions.
    pub config_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct GcloudConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    /// CLOUDSDK_CONFIG for activated sessions, kept inside the workdir so
    /// gcloud state never leaks into the user's real home.
    pub cfg_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct ArgocdConfig {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub cfg_path: PathBuf,
}

#[derive(Debug, Default)]
pub struct GronConfig {
    pub enabled: bool,
    pub repo_url: String,
}

#[derive(Debug, Default)]
pub struct AnsibleConfig {
    pub enabled: bool,
    pub version: String,
    pub venv_packages: Vec<String>,
    pub repo_url: String,
    /// Resolved playbook repo location. A path cached from a previous run
    /// wins over the config-supplied one.
    pub repo_path: PathBuf,
    /// Destination ansible.cfg, always under the workdir.
    pub cfg_path: PathBuf,
    /// ansible.cfg found inside the cloned repo, preferred as the *source*
    /// to assemble from when present.
    pub repo_cfg_path: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct SshConfig {
    pub enabled: bool,
    pub user: String,
    pub load_keys_from_host: String,
    pub dir: PathBuf,
    pub config_path: PathBuf,
    pub agent_socket: PathBuf,
    pub agent_pid_file: PathBuf,
}

/// Read-once settings for the whole run. Constructed by `load()`, immutable
/// afterwards, passed by reference to every installer.
#[derive(Debug)]
pub struct Config {
    pub toolbox_name: String,
    pub activate_path: PathBuf,
    pub templates_dir: Option<PathBuf>,
    pub platform: Option<Platform>,
    pub is_x64: bool,
    pub proxy: ProxyConfig,

    pub python: PythonConfig,
    pub vault: VaultConfig,
    pub terraform: TerraConfig,
    pub terragrunt: TerraConfig,
    pub gcloud: GcloudConfig,
    pub k9s: BinaryToolConfig,
    pub kubectl: KubectlConfig,
    pub gron: GronConfig,
    pub helm: BinaryToolConfig,
    pub argocd: ArgocdConfig,
    pub ansible: AnsibleConfig,
    pub ssh: SshConfig,
}

impl Config {
    /// Returns the text of a shipped template, honoring `--templates`.
    pub fn template_text(&self, name: &str) -> Result<String, ToolboxError> {
        template_text(self.templates_dir.as_deref(), name)
    }
}

/// Text of a shipped template: read from the override directory when one
/// was given, otherwise the compiled-in copy, so a plain install needs no
/// template directory on disk.
pub fn template_text(templates_dir: Option<&Path>, name: &str) -> Result<String, ToolboxError> {
    if let Some(dir) = templates_dir {
        let path = dir.join(name);
        return fs::read_to_string(&path).map_err(|e| {
            ToolboxError::Template(format!("cannot read template {}: {e}", path.display()))
        });
    }
    match name {
        "activate.sh" => Ok(include_str!("../../templates/activate.sh").to_string()),
        "ansible.cfg" => Ok(include_str!("../../templates/ansible.cfg").to_string()),
        "gron.yml" => Ok(include_str!("../../templates/gron.yml").to_string()),
        other => Err(ToolboxError::Template(format!(
            "no built-in template named '{other}'"
        ))),
    }
}

/// Loads and resolves the configuration. Malformed JSON or an unreadable
/// file is fatal before any installer runs.
pub fn load(
    config_path: &Path,
    workdir: &WorkDir,
    toolbox_name: &str,
    templates_dir: Option<PathBuf>,
) -> Result<Config, ToolboxError> {
    let text = fs::read_to_string(config_path).map_err(|e| {
        ToolboxError::Config(format!("cannot read {}: {e}", config_path.display()))
    })?;
    let raw: RawConfig = serde_json::from_str(&text).map_err(|e| {
        ToolboxError::Config(format!("JSON config invalid: {}: {e}", config_path.display()))
    })?;
    resolve(raw, workdir, toolbox_name, templates_dir)
}

fn resolve(
    raw: RawConfig,
    workdir: &WorkDir,
    toolbox_name: &str,
    templates_dir: Option<PathBuf>,
) -> Result<Config, ToolboxError> {
    let root = &workdir.root;

    let mut config = Config {
        toolbox_name: toolbox_name.to_string(),
        activate_path: root.join("activate"),
        templates_dir,
        platform: Platform::detect(),
        is_x64: env::consts::ARCH == "x86_64",
        proxy: ProxyConfig::default(),
        python: PythonConfig::default(),
        vault: VaultConfig {
            login_method: "userpass".to_string(),
            ..VaultConfig::default()
        },
        terraform: TerraConfig::default(),
        terragrunt: TerraConfig::default(),
        gcloud: GcloudConfig {
            cfg_dir: root.join("gcloud").join("cfg"),
            ..GcloudConfig::default()
        },
        k9s: BinaryToolConfig::default(),
        kubectl: KubectlConfig {
            config_dir: root.join("kube"),
            ..KubectlConfig::default()
        },
        gron: GronConfig::default(),
        helm: BinaryToolConfig::default(),
        argocd: ArgocdConfig {
            cfg_path: root.join("argocd.cfg"),
            ..ArgocdConfig::default()
        },
        ansible: AnsibleConfig {
            repo_path: root.join("ansible").join("repo"),
            cfg_path: root.join("ansible").join("ansible.cfg"),
            ..AnsibleConfig::default()
        },
        ssh: SshConfig {
            dir: root.join("ssh"),
            config_path: root.join("ssh").join("config"),
            agent_socket: root.join("ssh").join("agent.socket"),
            agent_pid_file: root.join("ssh").join("agent.pid"),
            ..SshConfig::default()
        },
    };

    if let Some(s) = enabled_section("python", raw.python, |s| s.enabled) {
        config.python.enabled = true;
        config.python.packages = s.packages;
    }

    if let Some(s) = enabled_section("vault", raw.vault, |s| s.enabled) {
        config.vault.enabled = true;
        config.vault.version = s.version;
        config.vault.download_url = s.download_url;
        config.vault.addr = s.addr;
        if let Some(method) = s.login_method {
            config.vault.login_method = method;
        }
        config.vault.load_env_vars = s.load_env_vars;
    }

    if let Some(s) = enabled_section("terraform", raw.terraform, |s| s.enabled) {
        config.terraform = TerraConfig {
            enabled: true,
            version: s.version,
            download_url: s.download_url,
            use_proxy: s.use_proxy,
        };
    }

    if let Some(s) = enabled_section("terragrunt", raw.terragrunt, |s| s.enabled) {
        config.terragrunt = TerraConfig {
            enabled: true,
            version: s.version,
            download_url: s.download_url,
            use_proxy: s.use_proxy,
        };
    }

    if let Some(s) = enabled_section("gcloud", raw.gcloud, |s| s.enabled) {
        config.gcloud.enabled = true;
        config.gcloud.version = s.version;
        config.gcloud.download_url = s.download_url;
    }

    if let Some(s) = enabled_section("k9s", raw.k9s, |s| s.enabled) {
        config.k9s = BinaryToolConfig {
            enabled: true,
            version: s.version,
            download_url: s.download_url,
        };
    }

    if let Some(s) = enabled_section("kubectl", raw.kubectl, |s| s.enabled) {
        config.kubectl.enabled = true;
        config.kubectl.version = s.version;
        config.kubectl.download_url = s.download_url;
    }

    if let Some(s) = enabled_section("gron", raw.gron, |s| s.enabled) {
        config.gron = GronConfig {
            enabled: true,
            repo_url: s.repo_url,
        };
    }

    if let Some(s) = enabled_section("helm", raw.helm, |s| s.enabled) {
        config.helm = BinaryToolConfig {
            enabled: true,
            version: s.version,
            download_url: s.download_url,
        };
    }

    if let Some(s) = enabled_section("argocd", raw.argocd, |s| s.enabled) {
        config.argocd.enabled = true;
        config.argocd.version = s.version;
        config.argocd.download_url = s.download_url;
    }

    if let Some(s) = enabled_section("ansible", raw.ansible, |s| s.enabled) {
        config.ansible.enabled = true;
        config.ansible.version = s.version;
        config.ansible.venv_packages = s.venv_packages;
        config.ansible.repo_url = s.repo_url;
        if !s.repo_path.is_empty() {
            config.ansible.repo_path =
                PathBuf::from(shellexpand::tilde(&s.repo_path).into_owned());
        }
    }

    if let Some(s) = enabled_section("proxy", raw.proxy, |s| s.enabled) {
        config.proxy.http = s.http_addr;
        config.proxy.https = s.https_addr;
    }

    if let Some(s) = enabled_section("ssh", raw.ssh, |s| s.enabled) {
        config.ssh.enabled = true;
        config.ssh.user = s.user;
        config.ssh.load_keys_from_host = s.load_keys_from_host;
    }

    // Once an ansible repo location was resolved on this machine it sticks,
    // even if the config later names a different path.
    if let Some(cached) = PathCache::new(root).load() {
        if cached != config.ansible.repo_path {
            log_debug!(
                "Ansible repo path {} taken from cache (config said {})",
                cached.display().to_string().cyan(),
                config.ansible.repo_path.display()
            );
        }
        config.ansible.repo_path = cached;
    }

    // A cfg inside the repo checkout is the preferred assembly source.
    let repo_cfg = config.ansible.repo_path.join("ansible.cfg");
    if repo_cfg.exists() {
        config.ansible.repo_cfg_path = Some(repo_cfg);
    }

    Ok(config)
}

/// Applies the shared "missing / empty / disabled ⇒ skip with defaults"
/// rule and logs the skip at debug level.
fn enabled_section<S>(name: &str, section: Option<S>, is_enabled: fn(&S) -> bool) -> Option<S> {
    match section {
        None => {
            log_debug!("No '{}' section in config, keeping defaults", name);
            None
        }
        Some(s) if !is_enabled(&s) => {
            log_debug!("'{}' disabled, keeping defaults", name);
            None
        }
        Some(s) => Some(s),
    }
}

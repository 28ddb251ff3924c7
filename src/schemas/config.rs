//! Raw serde model of the JSON configuration file.
//!
//! One optional object per tool-name key. A missing section, an empty
//! section, or `"enabled": false` all mean "tool disabled, keep defaults" —
//! none of these is an error. Unknown keys anywhere are ignored. Every field
//! has an explicit default so a partially-filled section deserializes
//! cleanly; the resolved view built on top of this lives in
//! `libs::config_loading`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// Top-level document. Each key is independent; the per-tool sections are
/// only inspected when present.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub python: Option<PythonSection>,
    pub vault: Option<VaultSection>,
    pub terraform: Option<TerraformSection>,
    pub terragrunt: Option<TerragruntSection>,
    pub gcloud: Option<GcloudSection>,
    pub k9s: Option<K9sSection>,
    pub kubectl: Option<KubectlSection>,
    pub gron: Option<GronSection>,
    pub helm: Option<HelmSection>,
    pub argocd: Option<ArgocdSection>,
    pub ansible: Option<AnsibleSection>,
    pub proxy: Option<ProxySection>,
    pub ssh: Option<SshSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PythonSection {
    pub enabled: bool,
    pub packages: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VaultSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub addr: String,
    /// `vault login -method=<login_method>`. Defaults to "userpass".
    pub login_method: Option<String>,
    /// env var name -> "secret/path;;item". Rendered into the activation
    /// script as `export VAR=$(vault kv get ...)` lines.
    pub load_env_vars: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TerraformSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub use_proxy: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TerragruntSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
    pub use_proxy: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GcloudSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct K9sSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct KubectlSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GronSection {
    pub enabled: bool,
    pub repo_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct HelmSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArgocdSection {
    pub enabled: bool,
    pub version: String,
    pub download_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnsibleSection {
    pub enabled: bool,
    /// Pinned ansible release, used only when the cloned repo has no
    /// requirements.txt.
    pub version: String,
    pub venv_packages: Vec<String>,
    pub repo_url: String,
    /// Where the playbook repo lives (or should be cloned to). Tilde is
    /// expanded. A previously cached path on disk wins over this value.
    pub repo_path: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProxySection {
    pub enabled: bool,
    pub http_addr: String,
    pub https_addr: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SshSection {
    pub enabled: bool,
    pub user: String,
    /// Host whose keys are pre-loaded into the agent when the environment
    /// is activated.
    pub load_keys_from_host: String,
}

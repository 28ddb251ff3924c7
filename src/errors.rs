//! Error taxonomy for the toolbox.
//!
//! Every failure here is fatal: nothing is retried, the run aborts, the
//! scratch directory is cleaned and the process exits non-zero. The variants
//! distinguish *when* a failure can occur (before any installer runs vs.
//! mid-install) so the user knows what state the workdir was left in.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolboxError {
    /// Malformed or unreadable JSON configuration. Pre-install.
    #[error("config error: {0}")]
    Config(String),

    /// Unsupported OS family or architecture. Pre-install.
    #[error("unsupported platform: {0}")]
    Platform(String),

    /// A required external command is missing from PATH. Pre-install.
    #[error("missing dependency: no '{0}' in PATH")]
    Dependency(&'static str),

    /// Workdir layout could not be created or cleared. Pre-install.
    #[error("workdir error: {0}")]
    Workdir(String),

    /// The composed activation script still contains `<NAME>` tokens, or two
    /// adapters claimed the same placeholder. Indicates a broken placeholder
    /// contract, always caught before any install runs.
    #[error("activation template error: {0}")]
    Template(String),

    /// Download, unpack or subprocess failure while installing one tool.
    /// Aborts the remaining install sequence; earlier tools stay installed.
    #[error("install error for {tool}: {message}")]
    Install { tool: &'static str, message: String },

    /// An installed binary's version output did not match the expected
    /// pattern. Distinct from "not installed": we never silently reinstall
    /// over a binary we cannot identify.
    #[error("cannot parse {tool} version output: {output:?}")]
    VersionParse { tool: &'static str, output: String },
}

impl ToolboxError {
    /// Shorthand for an install failure carrying the failing tool's name.
    pub fn install(tool: &'static str, message: impl Into<String>) -> Self {
        ToolboxError::Install {
            tool,
            message: message.into(),
        }
    }
}

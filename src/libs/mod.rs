// Shared plumbing used by the orchestrator and the tool installers.

// Activation script composition: template -> replacements -> validation -> file.
pub mod activation;
// Archive extraction helpers (zip, tar.gz).
pub mod archive;
// JSON config loading and the resolved, immutable Config value.
pub mod config_loading;
// HTTP downloads with optional proxy.
pub mod fetch;
// Cross-run cache of the resolved ansible repo path.
pub mod path_cache;
// Subprocess execution with captured output.
pub mod process;
// Post-install summary (.info) rendering.
pub mod summary;
// Host platform and external-command checks.
pub mod validators;
// Workdir layout and scratch-space lifecycle.
pub mod workdir;

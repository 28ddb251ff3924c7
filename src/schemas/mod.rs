// Serde data model for the JSON configuration file.
pub mod config;

pub mod commands;
pub mod config;
pub mod logging;

/// Name of the environment used when none is configured or requested.
pub const DEFAULT_ENVIRONMENT: &str = "default";

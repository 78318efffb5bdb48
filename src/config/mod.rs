//! Configuration module for lineage-lens.
//!
//! Handles the settings file, environment variable expansion and defaults.

mod settings;

pub use settings::{
    expand_env_vars, ExtractSettings, InputSettings, LoggingSettings, SemanticSettings, Settings,
    SettingsError, SqlSettings, CONFIG_ENV_VAR,
};

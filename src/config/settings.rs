//! TOML-based configuration for lineage-lens.
//!
//! Supports a config file (lineage.toml) with environment variable expansion
//! in input paths.
//!
//! Example configuration:
//! ```toml
//! [sql]
//! dialect = "mssql"
//! strip_comments = true
//!
//! [semantic]
//! source_prefix = "SQL"
//! source_label = "Power Query Source"
//! relationship_label = "Model Relationship"
//!
//! [extract]
//! parallel = true
//!
//! [inputs]
//! metadata = "${LINEAGE_DATA}/model.json"
//! sql_objects = "./exports/sql_objects.json"
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::semantic::{DEFAULT_RELATIONSHIP_LABEL, DEFAULT_SOURCE_LABEL, DEFAULT_SOURCE_PREFIX};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "LINEAGE_LENS_CONFIG";

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Unknown SQL dialect: {0}")]
    UnknownDialect(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub sql: SqlSettings,
    pub semantic: SemanticSettings,
    pub extract: ExtractSettings,
    pub inputs: InputSettings,
    pub logging: LoggingSettings,
}

/// SQL parsing settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SqlSettings {
    /// sqlparser dialect name (mssql, postgresql, snowflake, ...).
    pub dialect: String,

    /// Strip `--` and `/* */` comments before parsing.
    pub strip_comments: bool,
}

impl Default for SqlSettings {
    fn default() -> Self {
        Self {
            dialect: "mssql".to_string(),
            strip_comments: true,
        }
    }
}

/// Labels used for semantic-model edges.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SemanticSettings {
    /// Prefix on warehouse tables found in Power Query sources.
    pub source_prefix: String,

    /// Transformation text on source-mapping edges.
    pub source_label: String,

    /// Transformation text on relationship edges.
    pub relationship_label: String,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self {
            source_prefix: DEFAULT_SOURCE_PREFIX.to_string(),
            source_label: DEFAULT_SOURCE_LABEL.to_string(),
            relationship_label: DEFAULT_RELATIONSHIP_LABEL.to_string(),
        }
    }
}

/// Extraction settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractSettings {
    /// Extract objects and formulas on the rayon pool.
    pub parallel: bool,
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Input file locations (support ${ENV_VAR} expansion).
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InputSettings {
    /// Semantic-model metadata JSON.
    pub metadata: Option<String>,

    /// SQL object catalog JSON.
    pub sql_objects: Option<String>,
}

impl InputSettings {
    /// Metadata path with environment variables expanded.
    pub fn metadata_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        resolve_path(self.metadata.as_deref())
    }

    /// SQL object catalog path with environment variables expanded.
    pub fn sql_objects_path(&self) -> Result<Option<PathBuf>, SettingsError> {
        resolve_path(self.sql_objects.as_deref())
    }
}

fn resolve_path(path: Option<&str>) -> Result<Option<PathBuf>, SettingsError> {
    path.map(|p| expand_env_vars(p).map(PathBuf::from))
        .transpose()
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter when RUST_LOG is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `LINEAGE_LENS_CONFIG`
    /// 2. `./lineage.toml`
    /// 3. `~/.config/lineage-lens/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var(CONFIG_ENV_VAR) {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("lineage.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("lineage-lens").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings the extractors cannot honour.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if sqlparser::dialect::dialect_from_str(&self.sql.dialect).is_none() {
            return Err(SettingsError::UnknownDialect(self.sql.dialect.clone()));
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                // Lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

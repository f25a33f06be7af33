//! Configuration system for rewind.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{RewindError, RewindResult};
use crate::projection::Projection;
use crate::traits::{HistoryBackendConfig, HistoryBackendProvider};

/// Default suffix appended to a collection name to name its history store.
pub const DEFAULT_SUFFIX: &str = "-history";

/// Identifier type of versioned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    /// UUID strings.
    #[default]
    Uuid,
    /// Any non-empty string.
    String,
    /// Signed 64-bit integers rendered as strings.
    Integer,
}

impl IdType {
    /// Human-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdType::Uuid => "uuid",
            IdType::String => "string",
            IdType::Integer => "integer",
        }
    }

    /// Check that `id` is a valid identifier of this type.
    pub fn validate(&self, id: &str) -> RewindResult<()> {
        let valid = match self {
            IdType::Uuid => Uuid::parse_str(id).is_ok(),
            IdType::String => !id.is_empty(),
            IdType::Integer => id.parse::<i64>().is_ok(),
        };

        if valid {
            Ok(())
        } else {
            Err(RewindError::invalid_entity_id(id, self.as_str()))
        }
    }
}

/// Which document fields go into snapshots.
///
/// Mirrors the plugin-style `{fields_include, fields_exclude}` shape. When both
/// lists are given the include list wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Fields to include (everything else is dropped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_include: Option<Vec<String>>,
    /// Fields to exclude (everything else is kept).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields_exclude: Option<Vec<String>>,
}

impl DumpConfig {
    /// Resolve to a projection.
    pub fn projection(&self) -> Projection {
        match (&self.fields_include, &self.fields_exclude) {
            (Some(include), _) => Projection::Include(include.clone()),
            (None, Some(exclude)) => Projection::Exclude(exclude.clone()),
            (None, None) => Projection::Full,
        }
    }
}

/// Main history configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Suffix for history store names.
    pub suffix: String,
    /// Entity identifier type.
    pub id_type: IdType,
    /// Snapshot payload configuration.
    pub dump: DumpConfig,
    /// History backend configuration.
    pub backend: HistoryBackendConfig,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            suffix: DEFAULT_SUFFIX.to_string(),
            id_type: IdType::default(),
            dump: DumpConfig::default(),
            backend: HistoryBackendConfig::default(),
        }
    }
}

impl HistoryConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> RewindResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| RewindError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| RewindError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| RewindError::Configuration(e.to_string()))?,
            _ => {
                return Err(RewindError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        Ok(config.normalized())
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(suffix) = std::env::var("REWIND_HISTORY_SUFFIX") {
            config.suffix = suffix;
        }

        if let Ok(id_type) = std::env::var("REWIND_ID_TYPE") {
            config.id_type = match id_type.to_lowercase().as_str() {
                "string" => IdType::String,
                "integer" | "int" => IdType::Integer,
                _ => IdType::Uuid,
            };
        }

        // Field lists are comma or whitespace separated.
        if let Ok(fields) = std::env::var("REWIND_DUMP_INCLUDE") {
            config.dump.fields_include = Some(split_fields(&fields));
        }
        if let Ok(fields) = std::env::var("REWIND_DUMP_EXCLUDE") {
            config.dump.fields_exclude = Some(split_fields(&fields));
        }

        if let Ok(provider) = std::env::var("REWIND_HISTORY_BACKEND") {
            config.backend.provider = match provider.to_lowercase().as_str() {
                "memory" => HistoryBackendProvider::Memory,
                _ => HistoryBackendProvider::Sqlite,
            };
        }

        if let Ok(path) = std::env::var("REWIND_HISTORY_DB_PATH") {
            config.backend.path = PathBuf::from(path);
        }

        config.normalized()
    }

    /// Build configuration using builder pattern.
    pub fn builder() -> HistoryConfigBuilder {
        HistoryConfigBuilder::default()
    }

    /// Resolved snapshot projection.
    pub fn projection(&self) -> Projection {
        self.dump.projection()
    }

    /// Fill unset values with defaults.
    pub fn normalized(mut self) -> Self {
        if self.suffix.is_empty() {
            self.suffix = DEFAULT_SUFFIX.to_string();
        }
        self
    }
}

fn split_fields(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Builder for HistoryConfig.
#[derive(Default)]
pub struct HistoryConfigBuilder {
    config: HistoryConfig,
}

impl HistoryConfigBuilder {
    /// Set the history store suffix.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.suffix = suffix.into();
        self
    }

    /// Set the entity id type.
    pub fn id_type(mut self, id_type: IdType) -> Self {
        self.config.id_type = id_type;
        self
    }

    /// Snapshot only these fields.
    pub fn fields_include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.dump.fields_include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Snapshot everything except these fields.
    pub fn fields_exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.dump.fields_exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Set history backend configuration.
    pub fn backend(mut self, backend: HistoryBackendConfig) -> Self {
        self.config.backend = backend;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> HistoryConfig {
        self.config.normalized()
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_SECS: u64 = 24 * 60 * 60;
pub const DEFAULT_MODELS: [&str; 3] = ["gemini-1.5-flash", "gemini-2.0-flash", "gemini-2.5-flash"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Application configuration.
///
/// Read from a TOML file, then selectively overridden from the environment so
/// that secrets (API keys, AWS settings) never have to live in the file.
///
/// ```toml
/// [server]
/// bind = "127.0.0.1:8080"
/// log_format = "pretty"
/// session_ttl_secs = 86400
///
/// [storage]
/// backend = "sqlite"
/// path = "/var/lib/pantry/food_items.db"
///
/// [ocr]
/// api_key = "..."
///
/// [llm]
/// api_key = "..."
/// models = ["gemini-1.5-flash", "gemini-2.0-flash", "gemini-2.5-flash"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub ocr: OcrConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub log_format: LogFormat,
    pub max_upload_bytes: usize,
    /// Idle time after which a browser session's draft and menu are dropped.
    pub session_ttl_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            log_format: LogFormat::Pretty,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Sqlite {
        /// Database file; the server falls back to its data directory when unset.
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Dynamodb {
        #[serde(default)]
        table: Option<String>,
        #[serde(default)]
        region: Option<String>,
        /// Override for local DynamoDB instances.
        #[serde(default)]
        endpoint: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite { path: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub models: Vec<String>,
    pub default_model: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            default_model: None,
        }
    }
}

impl LlmConfig {
    /// Model preselected in the menu options.
    pub fn default_model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.models.first().map(String::as_str))
    }
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply environment overrides served by `lookup`; empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = get("PANTRY_BIND") {
            self.server.bind = bind;
        }
        if let Some(key) = get("GOOGLE_VISION_API_KEY") {
            self.ocr.api_key = Some(key);
        }
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.llm.api_key = Some(key);
        }

        match &mut self.storage {
            StorageConfig::Sqlite { path } => {
                if let Some(p) = get("PANTRY_DB_PATH") {
                    *path = Some(PathBuf::from(p));
                }
            }
            StorageConfig::Dynamodb { table, region, .. } => {
                if let Some(t) = get("DYNAMODB_TABLE_NAME") {
                    *table = Some(t);
                }
                if let Some(r) = get("AWS_DEFAULT_REGION") {
                    *region = Some(r);
                }
            }
        }
    }

    /// Reject configurations the application cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let StorageConfig::Dynamodb { table, region, .. } = &self.storage {
            if table.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Missing("storage.table"));
            }
            if region.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::Missing("storage.region"));
            }
        }
        if self.llm.models.is_empty() {
            return Err(ConfigError::Invalid {
                key: "llm.models",
                reason: "at least one model must be listed".to_string(),
            });
        }
        if let Some(model) = &self.llm.default_model {
            if !self.llm.models.contains(model) {
                return Err(ConfigError::Invalid {
                    key: "llm.default_model",
                    reason: format!("'{model}' is not in llm.models"),
                });
            }
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid {
                key: "server.max_upload_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.server.session_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "server.session_ttl_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

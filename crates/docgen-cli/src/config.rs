//! TOML configuration for batch conversion.
//!
//! Every section is optional; missing keys take their defaults and CLI flags
//! override what the file says.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use docgen_ai::box_client::DEFAULT_BASE_URL;
use docgen_ai::{AuthMethod, BoxAiConfig, Credentials};
use docgen_convert::DEFAULT_MAX_TOKENS;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Prefix of exported file names.
pub const DEFAULT_OUTPUT_PREFIX: &str = "converted_";

/// Environment variable holding an already-resolved Box access token.
pub const DEFAULT_TOKEN_ENV: &str = "BOX_ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("AI is enabled but environment variable {variable} holds no access token")]
    MissingToken { variable: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub conversion: ConversionConfig,
    pub ai: AiConfig,
    pub validation: ValidationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Literal legacy text to replacement text; overrides built-in entries.
    pub mappings: BTreeMap<String, String>,
    pub output_prefix: String,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            mappings: BTreeMap::new(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    pub enabled: bool,
    pub base_url: String,
    pub auth_method: AuthMethod,
    pub access_token_env: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
    pub validate_with_ai: bool,
    /// Box file id used as grounding item for text generation.
    pub item_id: Option<String>,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_method: AuthMethod::default(),
            access_token_env: DEFAULT_TOKEN_ENV.to_string(),
            timeout_secs: 30,
            max_tokens: DEFAULT_MAX_TOKENS,
            validate_with_ai: false,
            item_id: None,
        }
    }
}

impl AiConfig {
    pub fn client_config(&self) -> BoxAiConfig {
        BoxAiConfig {
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            item_id: self.item_id.clone(),
        }
    }

    /// Reads the access token from the configured environment variable.
    pub fn credentials(&self) -> Result<Credentials> {
        match std::env::var(&self.access_token_env) {
            Ok(token) if !token.trim().is_empty() => {
                Ok(Credentials::new(self.auth_method, token.trim()))
            }
            _ => Err(ConfigError::MissingToken {
                variable: self.access_token_env.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Block helpers accepted on top of the core handlebars helpers.
    pub extra_helpers: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            extra_helpers: ["eq", "gt", "lt"].map(String::from).to_vec(),
        }
    }
}

impl Config {
    /// Loads `path`, or defaults when no path is given or the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        match fs::read_to_string(path) {
            Ok(content) => {
                let config = Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?;
                debug!(
                    path = %path.display(),
                    mappings = config.conversion.mappings.len(),
                    ai_enabled = config.ai.enabled,
                    "loaded config"
                );
                Ok(config)
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

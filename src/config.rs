//! Configuration system for fellowship-agent
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (`FELLOWSHIP_*` plus the standard Dapr and Hugging Face names)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! Persona text, infrastructure binding names and the model identifier are
//! not configurable; they are fixed per persona.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent callback server and memory settings
    pub agent: AgentSettings,

    /// Dapr sidecar settings
    pub dapr: DaprSettings,

    /// Hosted inference API settings
    pub llm: LlmSettings,

    /// Logging configuration
    pub logging: LoggingSettings,
}

/// Agent callback server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Address the Dapr app callback server binds to
    pub app_host: String,

    /// Port the Dapr app callback server binds to (`--app-port` of `dapr run`)
    pub app_port: u16,

    /// Maximum number of messages kept in conversation memory
    pub memory_max_messages: usize,

    /// Workflow instances kept in the saved state; the oldest are evicted
    pub max_workflow_instances: usize,
}

/// Dapr sidecar settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaprSettings {
    /// Sidecar HTTP endpoint
    pub http_endpoint: String,

    /// Optional `dapr-api-token`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// How long to wait for the sidecar to report healthy
    pub sidecar_wait_secs: u64,

    /// Attempts for conflicting registry writes
    pub registry_retries: u32,
}

/// Hugging Face inference API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Base URL; requests go to `{base_url}/{model}/v1/chat/completions`
    pub base_url: String,

    /// API token (empty = anonymous)
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum retries on transient failures
    pub max_retries: u32,

    /// Maximum tokens to generate per reply
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

// Default implementations

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            app_host: "127.0.0.1".to_string(),
            app_port: 8001,
            memory_max_messages: 50,
            max_workflow_instances: 100,
        }
    }
}

impl Default for DaprSettings {
    fn default() -> Self {
        Self {
            http_endpoint: "http://127.0.0.1:3500".to_string(),
            api_token: None,
            timeout_secs: 30,
            sidecar_wait_secs: 60,
            registry_retries: 5,
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            api_key: String::new(),
            timeout_secs: 120,
            max_retries: 2,
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

fn is_truthy(val: &str) -> bool {
    val.eq_ignore_ascii_case("true") || val == "1"
}

impl AgentConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = Self::find_config_file(config_path)? {
            debug!(path = %path.display(), "Loading configuration file");
            let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
                path: path.clone(),
                source: e,
            })?;
            config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
                message: format!("{}: {}", path.display(), e.message()),
                source: Some(e),
            })?;
            info!(path = %path.display(), "Configuration loaded from file");
        }

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            return if path.exists() {
                Ok(Some(path))
            } else {
                Err(Error::config_not_found(path))
            };
        }

        let search_paths = [
            PathBuf::from("fellowship-agent.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("fellowship").join("agent.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".fellowship").join("agent.toml"))
                .unwrap_or_default(),
            PathBuf::from("/etc/fellowship/agent.toml"),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply overrides from the process environment
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup
    pub(crate) fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Agent server
        if let Some(val) = lookup("FELLOWSHIP_APP_HOST") {
            self.agent.app_host = val;
        }
        if let Some(n) = lookup("APP_PORT").and_then(|v| v.parse().ok()) {
            self.agent.app_port = n;
        }
        if let Some(n) = lookup("FELLOWSHIP_MEMORY_MAX_MESSAGES").and_then(|v| v.parse().ok()) {
            self.agent.memory_max_messages = n;
        }
        if let Some(n) = lookup("FELLOWSHIP_MAX_WORKFLOW_INSTANCES").and_then(|v| v.parse().ok()) {
            self.agent.max_workflow_instances = n;
        }

        // Dapr sidecar; an explicit endpoint wins over a bare port
        if let Some(val) = lookup("DAPR_HTTP_ENDPOINT") {
            self.dapr.http_endpoint = val;
        } else if let Some(port) = lookup("DAPR_HTTP_PORT").and_then(|v| v.parse::<u16>().ok()) {
            self.dapr.http_endpoint = format!("http://127.0.0.1:{}", port);
        }
        if let Some(val) = lookup("DAPR_API_TOKEN") {
            self.dapr.api_token = Some(val);
        }
        if let Some(n) = lookup("FELLOWSHIP_DAPR_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.dapr.timeout_secs = n;
        }
        if let Some(n) = lookup("FELLOWSHIP_SIDECAR_WAIT_SECS").and_then(|v| v.parse().ok()) {
            self.dapr.sidecar_wait_secs = n;
        }

        // Inference API
        if let Some(val) = lookup("FELLOWSHIP_LLM_BASE_URL") {
            self.llm.base_url = val;
        }
        if let Some(val) = lookup("HUGGINGFACE_API_KEY").or_else(|| lookup("HF_TOKEN")) {
            self.llm.api_key = val;
        }
        if let Some(n) = lookup("FELLOWSHIP_LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_secs = n;
        }
        if let Some(n) = lookup("FELLOWSHIP_LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.llm.max_tokens = n;
        }

        // Logging
        if let Some(val) = lookup("FELLOWSHIP_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("FELLOWSHIP_LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("FELLOWSHIP_LOG_JSON") {
            self.logging.json_format = is_truthy(&val);
        }
    }

    /// Expand ~ and environment variables in paths
    fn expand_paths(&mut self) {
        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_http_url("dapr.http_endpoint", &self.dapr.http_endpoint)?;
        validate_http_url("llm.base_url", &self.llm.base_url)?;

        if self.agent.app_host.is_empty() {
            return Err(Error::config_field_invalid("agent.app_host", "app_host cannot be empty"));
        }
        if self.agent.app_port == 0 {
            return Err(Error::config_field_invalid("agent.app_port", "app_port must be non-zero"));
        }
        if self.agent.memory_max_messages == 0 {
            return Err(Error::config_field_invalid(
                "agent.memory_max_messages",
                "memory_max_messages must be at least 1",
            ));
        }
        if self.agent.max_workflow_instances == 0 {
            return Err(Error::config_field_invalid(
                "agent.max_workflow_instances",
                "max_workflow_instances must be at least 1",
            ));
        }
        if self.llm.max_retries > MAX_LLM_RETRIES {
            return Err(Error::config_field_invalid(
                "llm.max_retries",
                format!("max_retries must be at most {}", MAX_LLM_RETRIES),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config_field_invalid(
                "llm.temperature",
                "temperature must be between 0.0 and 2.0",
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        Ok(())
    }
}

const MAX_LLM_RETRIES: u32 = 10;

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::config_field_invalid(field, format!("{} cannot be empty", field)));
    }
    let parsed = Url::parse(value)
        .map_err(|e| Error::config_field_invalid(field, format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::config_field_invalid(
            field,
            format!("{} must use http:// or https://, got {}://", field, other),
        )),
    }
}

/// Expand ~ and environment variables in paths
fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Initialize a new configuration file
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".fellowship")
                .join("agent.toml")
        });

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::IoWrite {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(&config_path, generate_default_config()).map_err(|e| Error::IoWrite {
        path: config_path.clone(),
        source: e,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
pub fn generate_default_config() -> String {
    r#"# fellowship-agent configuration
#
# Persona text, Dapr component names and the model identifier are fixed
# per persona and cannot be changed here.

[agent]
# Address and port of the Dapr app callback server (match `dapr run --app-port`)
app_host = "127.0.0.1"
app_port = 8001

# Messages kept in conversation memory
memory_max_messages = 50

# Workflow instances kept in the state store (oldest evicted first)
max_workflow_instances = 100

[dapr]
# Sidecar HTTP endpoint (DAPR_HTTP_ENDPOINT / DAPR_HTTP_PORT override this)
http_endpoint = "http://127.0.0.1:3500"

# Per-request timeout in seconds
timeout_secs = 30

# Seconds to wait for the sidecar to become healthy
sidecar_wait_secs = 60

# Attempts for conflicting agents-registry writes
registry_retries = 5

[llm]
# Hugging Face inference API base URL
base_url = "https://api-inference.huggingface.co/models"

# The API token is read from HUGGINGFACE_API_KEY (or HF_TOKEN)

# Request timeout in seconds
timeout_secs = 120

# Maximum retries on transient failures (at most 10)
max_retries = 2

# Generation limits
max_tokens = 512
temperature = 0.7

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.fellowship/logs/agent.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false
"#
    .to_string()
}

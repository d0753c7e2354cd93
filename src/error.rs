//! Error types for fellowship-agent
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - User-friendly messages with suggestions
//! - Exit codes for the operator CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,

    // IO errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    Serialization = 204,

    // Sidecar / connection errors (3xx)
    ConnectionFailed = 300,
    ConnectionTimeout = 301,
    SidecarUnavailable = 302,

    // Protocol errors (4xx)
    ProtocolMalformed = 400,
    UnexpectedStatus = 401,
    StateConflict = 402,
    AuthenticationFailed = 403,

    // Agent errors (5xx)
    LlmRequestFailed = 500,
    AgentBindFailed = 501,
    RegistryUpdateFailed = 502,

    // Persona errors (6xx)
    PersonaNotFound = 600,
    PersonaInvalid = 601,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// Get the string code (e.g., "E100")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Get the exit code for CLI (maps to 1-125 range)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            400..=499 => 40,
            500..=599 => 50,
            600..=699 => 60,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    // ─────────────────────────────────────────────────────────────
    // IO Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Sidecar / Connection Errors
    // ─────────────────────────────────────────────────────────────

    /// Request could not reach the remote endpoint
    #[error("Failed to connect to {url}: {message}")]
    ConnectionFailed { url: String, message: String },

    /// Request timed out
    #[error("Request to {url} timed out after {timeout_secs}s")]
    ConnectionTimeout { url: String, timeout_secs: u64 },

    /// Dapr sidecar did not become healthy in time
    #[error("Dapr sidecar at {url} unavailable: {message}")]
    SidecarUnavailable { url: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Protocol Errors
    // ─────────────────────────────────────────────────────────────

    /// Malformed payload (CloudEvent, state value, API response)
    #[error("Malformed message: {message}")]
    ProtocolMalformed { message: String },

    /// Remote endpoint answered with an unexpected status
    #[error("Unexpected status {status} from {url}: {body}")]
    UnexpectedStatus { url: String, status: u16, body: String },

    /// ETag mismatch while saving state
    #[error("State conflict on {store}/{key}")]
    StateConflict { store: String, key: String },

    /// Credentials rejected
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    // ─────────────────────────────────────────────────────────────
    // Agent Errors
    // ─────────────────────────────────────────────────────────────

    /// Chat completion failed
    #[error("LLM request to {model} failed: {message}")]
    LlmRequestFailed { model: String, message: String },

    /// Callback server could not bind its address
    #[error("Failed to bind agent server on {addr}")]
    AgentBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Registry read-modify-write kept conflicting
    #[error("Failed to update agents registry for {agent} after {attempts} attempts")]
    RegistryUpdateFailed { agent: String, attempts: u32 },

    // ─────────────────────────────────────────────────────────────
    // Persona Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Persona not found: {name}")]
    PersonaNotFound { name: String },

    #[error("Persona {name} invalid: {reason}")]
    PersonaInvalid { name: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Get the numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) | Error::Json(_) => ErrorCode::Serialization,

            Error::ConnectionFailed { .. } => ErrorCode::ConnectionFailed,
            Error::ConnectionTimeout { .. } => ErrorCode::ConnectionTimeout,
            Error::SidecarUnavailable { .. } => ErrorCode::SidecarUnavailable,

            Error::ProtocolMalformed { .. } => ErrorCode::ProtocolMalformed,
            Error::UnexpectedStatus { .. } => ErrorCode::UnexpectedStatus,
            Error::StateConflict { .. } => ErrorCode::StateConflict,
            Error::AuthenticationFailed { .. } => ErrorCode::AuthenticationFailed,

            Error::LlmRequestFailed { .. } => ErrorCode::LlmRequestFailed,
            Error::AgentBind { .. } => ErrorCode::AgentBindFailed,
            Error::RegistryUpdateFailed { .. } => ErrorCode::RegistryUpdateFailed,

            Error::PersonaNotFound { .. } => ErrorCode::PersonaNotFound,
            Error::PersonaInvalid { .. } => ErrorCode::PersonaInvalid,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ConnectionFailed { .. }
            | Error::ConnectionTimeout { .. }
            | Error::StateConflict { .. } => true,
            Error::UnexpectedStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Get the exit code for CLI
    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// Get a user-friendly suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'fellowship-agent config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'fellowship-agent config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::ConnectionFailed { .. } | Error::SidecarUnavailable { .. } => Some(
                "Start the agent with 'dapr run' so a sidecar is available, or set DAPR_HTTP_ENDPOINT."
            ),
            Error::ConnectionTimeout { .. } => Some(
                "The endpoint is slow or unreachable. Raise 'timeout_secs' or check your network."
            ),
            Error::AuthenticationFailed { .. } => Some(
                "Set HUGGINGFACE_API_KEY (in the environment or .env) to a valid token."
            ),
            Error::AgentBind { .. } => Some(
                "Another process is using the app port. Set APP_PORT to a free port."
            ),
            Error::PersonaNotFound { .. } => Some(
                "Run 'fellowship-agent persona list' to see the available personas."
            ),
            _ => None,
        }
    }

    /// The message followed by every underlying cause not already part of it
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            let text = err.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            cause = err.source();
        }
        message
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self.chain_message()
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logging (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self.chain_message())
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_not_found(path: impl Into<PathBuf>) -> Self {
        Error::ConfigNotFound {
            path: path.into(),
            source: None,
        }
    }

    pub fn config_parse(message: impl Into<String>) -> Self {
        Error::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn connection_failed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConnectionFailed {
            url: url.into(),
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Error::ProtocolMalformed {
            message: message.into(),
        }
    }

    pub fn llm_failed(model: impl Into<String>, message: impl Into<String>) -> Self {
        Error::LlmRequestFailed {
            model: model.into(),
            message: message.into(),
        }
    }

    /// Classify a transport-level reqwest failure
    pub fn from_reqwest(url: &str, timeout_secs: u64, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::ConnectionTimeout {
                url: url.to_string(),
                timeout_secs,
            }
        } else {
            Error::connection_failed(url, err.to_string())
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

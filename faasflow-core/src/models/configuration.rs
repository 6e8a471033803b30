//! Configuration data structures

use crate::models::workflow::{
    InvocationParams, DEFAULT_CONTENT_TYPE, DEFAULT_GATEWAY, DEFAULT_HTTP_METHOD,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// HTTP verbs accepted for function invocation
const KNOWN_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Logging level configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[serde(rename = "error")]
    Error,
    #[serde(rename = "warn")]
    Warn,
    #[serde(rename = "info")]
    #[default]
    Info,
    #[serde(rename = "debug")]
    Debug,
    #[serde(rename = "trace")]
    Trace,
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Configuration {
    /// Function gateway base URL
    pub gateway: String,
    /// Function namespace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Request content type
    pub content_type: String,
    /// HTTP method for invocations
    pub http_method: String,
    /// Skip TLS certificate verification
    pub tls_insecure: bool,
    /// Maximum number of states evaluated per run (unbounded when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Logging verbosity level
    pub log_level: LogLevel,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            gateway: DEFAULT_GATEWAY.to_string(),
            namespace: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            http_method: DEFAULT_HTTP_METHOD.to_string(),
            tls_insecure: false,
            max_steps: None,
            log_level: LogLevel::Info,
        }
    }
}

impl Configuration {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Configuration = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        } else {
            // Return default configuration if file doesn't exist
            Ok(Configuration::default())
        }
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Get the XDG config directory path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().context("Could not determine config directory")?;
        Ok(config_dir.join("faasflow").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match url::Url::parse(&self.gateway) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {}
            Ok(url) => errors.push(format!(
                "gateway must use http or https, got '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!("gateway is not a valid URL: {}", e)),
        }

        if !is_known_method(&self.http_method) {
            errors.push(format!(
                "http_method must be one of {}",
                KNOWN_METHODS.join(", ")
            ));
        }

        if self.max_steps == Some(0) {
            errors.push("max_steps must be at least 1".to_string());
        }

        if let Some(namespace) = &self.namespace {
            if !is_valid_namespace(namespace) {
                errors.push("namespace must be a lowercase DNS label".to_string());
            }
        }

        if self.content_type.trim().is_empty() {
            errors.push("content_type cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Invocation parameters derived from this configuration
    pub fn invocation_params(&self) -> InvocationParams {
        InvocationParams {
            gateway: self.gateway.clone(),
            content_type: self.content_type.clone(),
            http_method: self.http_method.to_uppercase(),
            tls_insecure: self.tls_insecure,
            namespace: self.namespace.clone(),
            ..InvocationParams::default()
        }
    }
}

fn is_known_method(method: &str) -> bool {
    KNOWN_METHODS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(method))
}

/// Validate namespace according to DNS-1123 label rules
fn is_valid_namespace(name: &str) -> bool {
    if name.is_empty() || name.len() > 63 {
        return false;
    }

    let bytes = name.as_bytes();
    let edge_ok = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !edge_ok(bytes[0]) || !edge_ok(bytes[bytes.len() - 1]) {
        return false;
    }

    bytes
        .iter()
        .all(|&b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

// crates/warden-server/src/config.rs
// ============================================================================
// Module: Warden Configuration
// Description: Configuration loading and validation for the control plane.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, warden-core
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size limits and
//! range checks; missing or invalid configuration fails closed. The manifest
//! signing key never lives in the parsed document: the file names an
//! environment variable, and an inline value is honored only as a
//! development fallback. The resolved key is handed out as a redacting
//! [`SigningKey`] and never serialized back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

use warden_core::SigningKey;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;
/// Default bind address for the HTTP surface.
const DEFAULT_BIND: &str = "127.0.0.1:8400";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Default registry busy timeout in milliseconds.
const DEFAULT_REGISTRY_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default policy evaluator base URL.
const DEFAULT_POLICY_BASE_URL: &str = "http://127.0.0.1:8181";
/// Default policy package evaluated per check.
const DEFAULT_POLICY_PACKAGE: &str = "warden/policy";
/// Default policy request timeout in milliseconds.
const DEFAULT_POLICY_TIMEOUT_MS: u64 = 2_500;
/// Default cap on evaluator response bodies in bytes.
const DEFAULT_POLICY_MAX_RESPONSE_BYTES: usize = 1024 * 1024;
/// Default environment variable naming the signing key.
const DEFAULT_SIGNING_KEY_ENV: &str = "WARDEN_SIGNING_KEY";
/// Minimum accepted policy timeout in milliseconds.
const MIN_POLICY_TIMEOUT_MS: u64 = 100;
/// Maximum accepted policy timeout in milliseconds.
const MAX_POLICY_TIMEOUT_MS: u64 = 30_000;
/// Minimum accepted signing key length in characters.
const MIN_SIGNING_KEY_LENGTH: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file failed to parse.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config contents failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
    /// No usable signing key was resolved.
    #[error("signing key unavailable: {0}")]
    MissingSigningKey(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// HTTP server section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address for the HTTP surface.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum accepted request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

/// Registry database section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistrySection {
    /// Path to the registry database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_registry_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

/// Policy evaluator section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    /// Base URL of the policy evaluator.
    #[serde(default = "default_policy_base_url")]
    pub base_url: String,
    /// Policy package evaluated per check.
    #[serde(default = "default_policy_package")]
    pub package: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_policy_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum evaluator response size in bytes.
    #[serde(default = "default_policy_max_response_bytes")]
    pub max_response_bytes: usize,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            base_url: default_policy_base_url(),
            package: default_policy_package(),
            timeout_ms: default_policy_timeout_ms(),
            max_response_bytes: default_policy_max_response_bytes(),
        }
    }
}

/// Provenance storage and signing section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvenanceSection {
    /// Root directory for the manifest store.
    pub store_root: PathBuf,
    /// Environment variable naming the signing key.
    #[serde(default = "default_signing_key_env")]
    pub signing_key_env: String,
    /// Development-only inline signing key fallback.
    #[serde(default)]
    pub signing_key: Option<String>,
}

// ============================================================================
// SECTION: Config Root
// ============================================================================

/// Root configuration for the Warden control plane.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WardenConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSection,
    /// Registry database settings.
    pub registry: RegistrySection,
    /// Policy evaluator settings.
    #[serde(default)]
    pub policy: PolicySection,
    /// Provenance storage and signing settings.
    pub provenance: ProvenanceSection,
}

impl WardenConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is unreadable, oversized,
    /// unparseable, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let metadata =
            fs::metadata(path).map_err(|err| ConfigError::Io(format!("stat config: {err}")))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let contents = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("read config: {err}")))?;
        let config: Self =
            toml::from_str(&contents).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates field ranges and cross-field consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::Invalid(format!("invalid bind address: {}", self.server.bind)))?;
        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be positive".to_string()));
        }
        if self.registry.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("registry path must not be empty".to_string()));
        }
        if !(MIN_POLICY_TIMEOUT_MS..=MAX_POLICY_TIMEOUT_MS).contains(&self.policy.timeout_ms) {
            return Err(ConfigError::Invalid(format!(
                "policy timeout_ms must be within {MIN_POLICY_TIMEOUT_MS}..={MAX_POLICY_TIMEOUT_MS}"
            )));
        }
        if self.policy.package.is_empty() {
            return Err(ConfigError::Invalid("policy package must not be empty".to_string()));
        }
        if self.provenance.store_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("provenance store_root must not be empty".to_string()));
        }
        if self.provenance.signing_key_env.is_empty() {
            return Err(ConfigError::Invalid("signing_key_env must not be empty".to_string()));
        }
        Ok(())
    }

    /// Resolves the manifest signing key.
    ///
    /// The environment variable named by `signing_key_env` wins; the inline
    /// `signing_key` value is a development fallback only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingSigningKey`] when neither source yields
    /// a key of usable length.
    pub fn signing_key(&self) -> Result<SigningKey, ConfigError> {
        let resolved = env::var(&self.provenance.signing_key_env)
            .ok()
            .filter(|value| !value.is_empty())
            .or_else(|| self.provenance.signing_key.clone());
        match resolved {
            Some(secret) if secret.len() >= MIN_SIGNING_KEY_LENGTH => Ok(SigningKey::new(secret)),
            Some(_) => Err(ConfigError::MissingSigningKey(format!(
                "signing key must be at least {MIN_SIGNING_KEY_LENGTH} characters"
            ))),
            None => Err(ConfigError::MissingSigningKey(format!(
                "set {} or provenance.signing_key",
                self.provenance.signing_key_env
            ))),
        }
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Returns the default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Returns the default request body cap.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Returns the default registry busy timeout.
const fn default_registry_busy_timeout_ms() -> u64 {
    DEFAULT_REGISTRY_BUSY_TIMEOUT_MS
}

/// Returns the default policy base URL.
fn default_policy_base_url() -> String {
    DEFAULT_POLICY_BASE_URL.to_string()
}

/// Returns the default policy package.
fn default_policy_package() -> String {
    DEFAULT_POLICY_PACKAGE.to_string()
}

/// Returns the default policy timeout.
const fn default_policy_timeout_ms() -> u64 {
    DEFAULT_POLICY_TIMEOUT_MS
}

/// Returns the default evaluator response cap.
const fn default_policy_max_response_bytes() -> usize {
    DEFAULT_POLICY_MAX_RESPONSE_BYTES
}

/// Returns the default signing key environment variable name.
fn default_signing_key_env() -> String {
    DEFAULT_SIGNING_KEY_ENV.to_string()
}

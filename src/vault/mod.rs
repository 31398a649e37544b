//! Vault module for the KV node.
//!
//! This module implements the HTTP interaction with HashiCorp Vault: token acquisition,
//! request construction for the KV v1 and v2 engines, and response normalization.
//! Orchestration across a batch of items lives in [`crate::node`].
//!
//! ## Testing strategy:
//! - Each module contains its own unit tests within a `#[cfg(test)] mod tests` block
//! - HTTP behaviour is exercised against a `wiremock` server
//! - Integration tests in the `tests/` directory run against a dev-mode Vault container

pub mod auth;
pub mod client;
pub mod common;
pub mod error;
pub mod kv;
pub mod operations;

// Re-export key types for convenience
pub use client::{RequestOptions, VaultClient};
pub use error::VaultError;
pub use operations::{KvOperation, KvRequest};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default mount path of the AppRole auth method.
pub const DEFAULT_APPROLE_PATH: &str = "approle";

/// Credentials for AppRole authentication, serialized as the login body.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AppRoleCredentials {
    /// The role_id for AppRole authentication.
    pub role_id: String,
    /// The secret_id for AppRole authentication.
    pub secret_id: String,
}

impl fmt::Debug for AppRoleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppRoleCredentials")
            .field("role_id", &self.role_id)
            .field("secret_id", &"<redacted>")
            .finish()
    }
}

/// How the node obtains its Vault token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum AuthMethod {
    /// Exchange role_id/secret_id for a client token.
    #[default]
    #[value(name = "approle", alias = "appRole")]
    AppRole,
    /// Use a static token as-is.
    Token,
}

/// KV secrets engine API version. Selects the URL shape of every request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KvVersion {
    V1,
    #[default]
    V2,
}

/// Connection settings resolved from the host's credentials.
///
/// Field names follow the host credential object (`url`, `authMethod`, `roleId`, ...).
/// Call [`ConnectionConfig::validate`] before use.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// Vault API URL, e.g., "https://vault.example.com:8200".
    pub url: String,
    #[serde(default)]
    pub auth_method: AuthMethod,
    #[serde(default)]
    pub role_id: String,
    #[serde(default)]
    pub secret_id: String,
    /// Mount path of the AppRole auth method.
    #[serde(default = "default_approle_path")]
    pub app_role_path: String,
    /// Static token, used when `auth_method` is `Token`.
    #[serde(default)]
    pub token: String,
    /// Optional namespace for namespaced Vault instances (enterprise)
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub api_version: KvVersion,
    /// Skip TLS certificate validation for this connection only.
    #[serde(default)]
    pub allow_unauthorized_certs: bool,
}

fn default_approle_path() -> String {
    DEFAULT_APPROLE_PATH.to_string()
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("url", &self.url)
            .field("auth_method", &self.auth_method)
            .field("role_id", &self.role_id)
            .field("app_role_path", &self.app_role_path)
            .field("namespace", &self.namespace)
            .field("api_version", &self.api_version)
            .field("allow_unauthorized_certs", &self.allow_unauthorized_certs)
            .finish_non_exhaustive()
    }
}

impl ConnectionConfig {
    /// Config using a static token.
    pub fn with_token(url: &str, token: &str) -> Self {
        Self {
            url: url.to_string(),
            auth_method: AuthMethod::Token,
            token: token.to_string(),
            ..Self::default()
        }
    }

    /// Config using AppRole login.
    pub fn with_approle(url: &str, role_id: &str, secret_id: &str) -> Self {
        Self {
            url: url.to_string(),
            auth_method: AuthMethod::AppRole,
            role_id: role_id.to_string(),
            secret_id: secret_id.to_string(),
            ..Self::default()
        }
    }

    /// Normalizes and checks the config.
    ///
    /// Trims a trailing `/` from the URL, drops an empty namespace and falls back to the
    /// default AppRole mount when none is given.
    pub fn validate(mut self) -> Result<Self, VaultError> {
        self.url = self.url.trim().trim_end_matches('/').to_string();
        if self.url.is_empty() {
            return Err(VaultError::Config("Vault URL is required".into()));
        }
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(VaultError::Config(format!(
                "Vault URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }

        self.namespace = self
            .namespace
            .take()
            .map(|ns| ns.trim().to_string())
            .filter(|ns| !ns.is_empty());

        let mount = self.app_role_path.trim().trim_matches('/');
        self.app_role_path = if mount.is_empty() {
            default_approle_path()
        } else {
            mount.to_string()
        };

        match self.auth_method {
            AuthMethod::AppRole => {
                if self.role_id.is_empty() || self.secret_id.is_empty() {
                    return Err(VaultError::Config(
                        "AppRole authentication requires roleId and secretId".into(),
                    ));
                }
            }
            AuthMethod::Token => {
                if self.token.is_empty() {
                    return Err(VaultError::Config(
                        "Token authentication requires a token".into(),
                    ));
                }
            }
        }
        Ok(self)
    }

    /// The namespace, only when non-empty.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref().filter(|ns| !ns.is_empty())
    }

    /// AppRole login body built from this config.
    pub fn approle_credentials(&self) -> AppRoleCredentials {
        AppRoleCredentials {
            role_id: self.role_id.clone(),
            secret_id: self.secret_id.clone(),
        }
    }
}

// Default configuration
impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8200".to_string(),
            auth_method: AuthMethod::default(),
            role_id: String::new(),
            secret_id: String::new(),
            app_role_path: default_approle_path(),
            token: String::new(),
            namespace: None,
            api_version: KvVersion::default(),
            allow_unauthorized_certs: false,
        }
    }
}

//! Client implementation for Vault API interactions.
//!
//! This module provides a client for making HTTP requests to the Vault API
//! with the token, namespace and custom headers of a single call.

use crate::vault::common::check_response;
use crate::vault::{ConnectionConfig, KvRequest, VaultError};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method,
};
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Default per-call timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const VAULT_TOKEN_HEADER: &str = "x-vault-token";
const VAULT_NAMESPACE_HEADER: &str = "x-vault-namespace";

/// Per-call options.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Extra headers, applied after the defaults so they can override them.
    pub custom_headers: HeaderMap,
    pub timeout: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            custom_headers: HeaderMap::new(),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl RequestOptions {
    /// Builds options from the raw workflow fields. A zero or missing timeout means the default.
    pub fn from_fields(
        custom_headers: Option<&Value>,
        timeout_ms: Option<u64>,
    ) -> Result<Self, VaultError> {
        let timeout_ms = timeout_ms.filter(|ms| *ms > 0).unwrap_or(DEFAULT_TIMEOUT_MS);
        Ok(Self {
            custom_headers: parse_custom_headers(custom_headers)?,
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Parses user-supplied headers given as a JSON object or a JSON string holding one.
pub fn parse_custom_headers(raw: Option<&Value>) -> Result<HeaderMap, VaultError> {
    let parsed;
    let object = match raw {
        None | Some(Value::Null) => return Ok(HeaderMap::new()),
        Some(Value::String(s)) if s.trim().is_empty() => return Ok(HeaderMap::new()),
        Some(Value::String(s)) => {
            parsed = serde_json::from_str::<Value>(s)
                .map_err(|e| VaultError::InvalidHeader(e.to_string()))?;
            &parsed
        }
        Some(other) => other,
    };

    let map = object
        .as_object()
        .ok_or_else(|| VaultError::InvalidHeader("expected a JSON object".into()))?;

    let mut headers = HeaderMap::new();
    for (name, value) in map {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let header_name = HeaderName::from_str(name)
            .map_err(|_| VaultError::InvalidHeader(format!("invalid header name '{}'", name)))?;
        let header_value = HeaderValue::from_str(&value).map_err(|_| {
            VaultError::InvalidHeader(format!("invalid value for header '{}'", name))
        })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Client for interacting with the Vault HTTP API.
#[derive(Debug, Clone)]
pub struct VaultClient {
    /// Base URL of the Vault server
    pub addr: String,
    namespace: Option<String>,
    /// HTTP client for making requests
    client: Client,
}

impl VaultClient {
    /// Creates a client for `config`.
    ///
    /// Certificate validation is relaxed on this client alone when
    /// `allow_unauthorized_certs` is set.
    pub fn new(config: &ConnectionConfig) -> Result<Self, VaultError> {
        let client = Client::builder()
            .user_agent(concat!("vault-kv-node/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(config.allow_unauthorized_certs)
            .build()
            .map_err(|e| VaultError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            addr: config.url.trim_end_matches('/').to_string(),
            namespace: config.namespace().map(str::to_string),
            client,
        })
    }

    /// Sends a KV request with the given token.
    pub async fn send(
        &self,
        request: &KvRequest,
        token: &str,
        options: &RequestOptions,
    ) -> Result<Value, VaultError> {
        self.request(
            request.method.clone(),
            &request.path,
            request.body.as_ref(),
            Some(token),
            options,
        )
        .await
    }

    /// Makes a POST request without a Vault token, as used by login endpoints.
    pub async fn post_unauthenticated(&self, path: &str, body: &Value) -> Result<Value, VaultError> {
        self.request(Method::POST, path, Some(body), None, &RequestOptions::default())
            .await
    }

    /// Headers for one call: token, content type, namespace, then the custom headers.
    fn headers(&self, token: Option<&str>, custom: &HeaderMap) -> Result<HeaderMap, VaultError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = token {
            let value = HeaderValue::from_str(token)
                .map_err(|_| VaultError::Config("token contains invalid characters".into()))?;
            headers.insert(HeaderName::from_static(VAULT_TOKEN_HEADER), value);
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(namespace) = &self.namespace {
            let value = HeaderValue::from_str(namespace)
                .map_err(|_| VaultError::Config("namespace contains invalid characters".into()))?;
            headers.insert(HeaderName::from_static(VAULT_NAMESPACE_HEADER), value);
        }
        for (name, value) in custom.iter() {
            headers.insert(name.clone(), value.clone());
        }
        Ok(headers)
    }

    /// Makes a request to the Vault API with the specified method and optional body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
        options: &RequestOptions,
    ) -> Result<Value, VaultError> {
        let url = format!("{}{}", self.addr, path);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .headers(self.headers(token, &options.custom_headers)?)
            .timeout(options.timeout);

        if let Some(json_body) = body {
            request = request.json(json_body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VaultError::Network(format!("Request failed: {}", e)))?;

        check_response(response).await
    }
}

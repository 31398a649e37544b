//! KV operations and the requests they translate to.
//!
//! The URL shape is decided solely by the [`KvVersion`]:
//! v1 addresses `/v1/{mount}/{path}` directly, v2 goes through the `data/` endpoint for
//! reads and writes and the `metadata/` endpoint for deletes and lists.

use crate::vault::{KvVersion, VaultError};
use reqwest::Method;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// A secret operation selected by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KvOperation {
    Read,
    Write,
    Delete,
    List,
}

impl KvOperation {
    /// Name of the operation as the host sends it.
    pub fn as_str(&self) -> &'static str {
        match self {
            KvOperation::Read => "readSecret",
            KvOperation::Write => "writeSecret",
            KvOperation::Delete => "deleteSecret",
            KvOperation::List => "listSecrets",
        }
    }

    /// Wraps the failure of this operation's call in the matching error kind.
    pub fn failed(&self, cause: &VaultError) -> VaultError {
        let msg = cause.message();
        match self {
            KvOperation::Read => VaultError::ReadSecret(msg),
            KvOperation::Write => VaultError::WriteSecret(msg),
            KvOperation::Delete => VaultError::DeleteSecret(msg),
            KvOperation::List => VaultError::ListSecrets(msg),
        }
    }
}

impl FromStr for KvOperation {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "readSecret" | "read" => Ok(KvOperation::Read),
            "writeSecret" | "write" => Ok(KvOperation::Write),
            "deleteSecret" | "delete" => Ok(KvOperation::Delete),
            "listSecrets" | "list" => Ok(KvOperation::List),
            other => Err(VaultError::UnknownOperation(other.to_string())),
        }
    }
}

impl fmt::Display for KvOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved KV request, relative to the Vault base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct KvRequest {
    pub method: Method,
    /// Path and query, e.g. `/v1/secret/data/app/db?version=3`.
    pub path: String,
    pub body: Option<Value>,
}

impl KvRequest {
    pub fn read(api: KvVersion, mount: &str, path: &str, version: u64) -> Self {
        let path = match api {
            KvVersion::V2 if version > 0 => {
                format!("{}?version={}", endpoint(mount, Some("data"), path), version)
            }
            KvVersion::V2 => endpoint(mount, Some("data"), path),
            KvVersion::V1 => endpoint(mount, None, path),
        };
        Self {
            method: Method::GET,
            path,
            body: None,
        }
    }

    pub fn write(api: KvVersion, mount: &str, path: &str, payload: Value) -> Self {
        let (path, body) = match api {
            KvVersion::V2 => (
                endpoint(mount, Some("data"), path),
                json!({ "data": payload }),
            ),
            KvVersion::V1 => (endpoint(mount, None, path), payload),
        };
        Self {
            method: Method::POST,
            path,
            body: Some(body),
        }
    }

    pub fn delete(api: KvVersion, mount: &str, path: &str) -> Self {
        Self {
            method: Method::DELETE,
            path: endpoint(mount, metadata_segment(api), path),
            body: None,
        }
    }

    pub fn list(api: KvVersion, mount: &str, path: &str) -> Self {
        Self {
            method: Method::GET,
            path: format!("{}?list=true", endpoint(mount, metadata_segment(api), path)),
            body: None,
        }
    }
}

fn metadata_segment(api: KvVersion) -> Option<&'static str> {
    match api {
        KvVersion::V2 => Some("metadata"),
        KvVersion::V1 => None,
    }
}

fn endpoint(mount: &str, segment: Option<&str>, path: &str) -> String {
    let mount = mount.trim_matches('/');
    let path = path.trim_start_matches('/');
    match segment {
        Some(segment) => format!("/v1/{}/{}/{}", mount, segment, path),
        None => format!("/v1/{}/{}", mount, path),
    }
}

/// Resolves the secret data given for a write.
///
/// A JSON string is parsed; any other JSON value is taken as the payload itself.
pub fn parse_secret_data(data: Option<&Value>) -> Result<Value, VaultError> {
    match data {
        None | Some(Value::Null) => Err(VaultError::InvalidSecretData(
            "no secret data provided".into(),
        )),
        Some(Value::String(raw)) => {
            serde_json::from_str(raw).map_err(|e| VaultError::InvalidSecretData(e.to_string()))
        }
        Some(other) => Ok(other.clone()),
    }
}

/// Builds the request for `operation`. Fails before any I/O on invalid secret data.
pub fn build_request(
    operation: KvOperation,
    api: KvVersion,
    mount: &str,
    path: &str,
    version: u64,
    secret_data: Option<&Value>,
) -> Result<KvRequest, VaultError> {
    let request = match operation {
        KvOperation::Read => KvRequest::read(api, mount, path, version),
        KvOperation::Write => KvRequest::write(api, mount, path, parse_secret_data(secret_data)?),
        KvOperation::Delete => KvRequest::delete(api, mount, path),
        KvOperation::List => KvRequest::list(api, mount, path),
    };
    Ok(request)
}

//! Common helper functions for Vault responses.

use crate::vault::VaultError;
use reqwest::{Response, StatusCode};
use serde_json::{json, Value};

/// Checks the HTTP response from Vault. If successful, returns the JSON body;
/// otherwise, it extracts Vault's first error message or returns the status code.
pub async fn check_response(resp: Response) -> Result<Value, VaultError> {
    let status = resp.status();
    if status.is_success() {
        if status == StatusCode::NO_CONTENT {
            return Ok(json!({}));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| VaultError::Network(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_str(&body)
            .map_err(|e| VaultError::ParseError(format!("Failed to parse response: {}", e)))
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(error_from_body(status.as_u16(), body))
    }
}

/// Builds the error for a non-2xx response, preferring `errors[0]` from Vault's body.
///
/// A Vault error envelope with nothing usable in it (`{"errors":[]}`) reports the bare status.
pub fn error_from_body(status: u16, body: String) -> VaultError {
    if let Ok(val) = serde_json::from_str::<Value>(&body) {
        if let Some(errors) = val.get("errors").and_then(|v| v.as_array()) {
            return match errors.first().and_then(|v| v.as_str()) {
                Some(msg) => VaultError::Api(msg.to_string()),
                None => VaultError::HttpStatus(status, String::new()),
            };
        }
    }
    VaultError::HttpStatus(status, body)
}

/// Reads `value[key]`, treating a missing key or `null` as absent.
pub fn non_null<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value.get(key).filter(|v| !v.is_null())
}

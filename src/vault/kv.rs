//! KV secrets engine calls and the shape of their results.

use crate::vault::common::non_null;
use crate::vault::{KvOperation, KvRequest, KvVersion, RequestOptions, VaultClient, VaultError};
use serde_json::{json, Map, Value};

/// Sends `request` and returns the normalized result for `operation`.
///
/// `path` is echoed back in write, delete and list results.
pub async fn execute(
    client: &VaultClient,
    token: &str,
    operation: KvOperation,
    api: KvVersion,
    request: &KvRequest,
    path: &str,
    options: &RequestOptions,
) -> Result<Value, VaultError> {
    let body = client
        .send(request, token, options)
        .await
        .map_err(|e| operation.failed(&e))?;
    Ok(normalize(operation, api, path, &body))
}

pub fn normalize(operation: KvOperation, api: KvVersion, path: &str, body: &Value) -> Value {
    match operation {
        KvOperation::Read => normalize_read(api, body),
        KvOperation::Write => normalize_write(path, body),
        KvOperation::Delete => json!({ "success": true, "deleted": true, "path": path }),
        KvOperation::List => normalize_list(path, body),
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// v2 nests the secret under `data.data` next to `data.metadata`; v1 returns it as `data`.
///
/// `lease_duration` and `renewable` are copied only when Vault sends them.
pub fn normalize_read(api: KvVersion, body: &Value) -> Value {
    let mut result = match api {
        KvVersion::V2 => {
            let outer = non_null(body, "data");
            let data = outer
                .and_then(|d| non_null(d, "data"))
                .cloned()
                .unwrap_or_else(empty_object);
            let metadata = outer
                .and_then(|d| non_null(d, "metadata"))
                .cloned()
                .unwrap_or_else(empty_object);
            json!({ "data": data, "metadata": metadata })
        }
        KvVersion::V1 => json!({
            "data": non_null(body, "data").cloned().unwrap_or_else(empty_object),
        }),
    };

    for key in ["lease_duration", "renewable"] {
        if let Some(value) = non_null(body, key) {
            result[key] = value.clone();
        }
    }
    result
}

pub fn normalize_write(path: &str, body: &Value) -> Value {
    let mut result = json!({ "success": true, "path": path });
    if let Some(metadata) = non_null(body, "data") {
        result["metadata"] = metadata.clone();
    }
    result
}

pub fn normalize_list(path: &str, body: &Value) -> Value {
    let keys = non_null(body, "data")
        .and_then(|d| non_null(d, "keys"))
        .cloned()
        .unwrap_or_else(|| Value::Array(Vec::new()));
    json!({ "keys": keys, "path": path })
}

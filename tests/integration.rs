mod common;

use common::{integration_enabled, VaultFixture, ROOT_TOKEN};
use serde_json::json;
use vault_kv_node::{ConnectionConfig, Job, JobContext, SecretsNode, VaultError};

fn job(credentials: ConnectionConfig, items: Vec<serde_json::Value>) -> JobContext {
    JobContext::new(Job {
        credentials: Some(credentials),
        items,
        continue_on_fail: true,
    })
}

#[tokio::test]
async fn kv2_lifecycle_with_static_token() {
    if !integration_enabled() {
        return;
    }
    let vault = VaultFixture::new().await;
    let credentials = ConnectionConfig::with_token(&vault.addr, ROOT_TOKEN);

    let ctx = job(
        credentials,
        vec![
            json!({ "operation": "writeSecret", "secretPath": "app/db",
                    "secretData": "{\"user\":\"a\",\"password\":\"p\"}" }),
            json!({ "operation": "writeSecret", "secretPath": "app/db",
                    "secretData": { "user": "b" } }),
            json!({ "operation": "readSecret", "secretPath": "app/db", "version": 1 }),
            json!({ "operation": "readSecret", "secretPath": "app/db" }),
            json!({ "operation": "listSecrets", "listPath": "app/" }),
            json!({ "operation": "deleteSecret", "secretPath": "app/db" }),
            json!({ "operation": "readSecret", "secretPath": "app/db" }),
        ],
    );
    let records = SecretsNode::new().execute(&ctx).await.unwrap();
    assert_eq!(records.len(), 7);

    assert_eq!(records[0].json["success"], true);
    assert_eq!(records[0].json["metadata"]["version"], 1);
    assert_eq!(records[2].json["data"], json!({ "user": "a", "password": "p" }));
    assert_eq!(records[3].json["data"], json!({ "user": "b" }));
    assert_eq!(records[3].json["metadata"]["version"], 2);
    assert_eq!(records[4].json, json!({ "keys": ["db"], "path": "app/" }));
    assert_eq!(
        records[5].json,
        json!({ "success": true, "deleted": true, "path": "app/db" })
    );
    assert!(records[6].json["error"]
        .as_str()
        .unwrap()
        .starts_with("Failed to read secret"));
}

#[tokio::test]
async fn approle_login_against_dev_vault() {
    if !integration_enabled() {
        return;
    }
    let vault = VaultFixture::new().await;
    let (role_id, secret_id) = vault.setup_approle("workflow").await;

    let credentials = ConnectionConfig::with_approle(&vault.addr, &role_id, &secret_id);
    let ctx = job(
        credentials,
        vec![
            json!({ "operation": "writeSecret", "secretPath": "svc/api", "secretData": { "k": "v" } }),
            json!({ "operation": "readSecret", "secretPath": "svc/api" }),
        ],
    );
    let records = SecretsNode::new().execute(&ctx).await.unwrap();
    assert_eq!(records[1].json["data"], json!({ "k": "v" }));

    let wrong = ConnectionConfig::with_approle(&vault.addr, &role_id, "not-the-secret");
    let ctx = JobContext::new(Job {
        credentials: Some(wrong),
        items: vec![json!({ "secretPath": "svc/api" })],
        continue_on_fail: false,
    });
    let err = SecretsNode::new().execute(&ctx).await.unwrap_err();
    assert!(matches!(err, VaultError::Authentication(_)));
}

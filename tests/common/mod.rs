//! Common test fixtures for Vault integration tests.
//!
//! Starts a HashiCorp Vault container in dev mode with a fixed root token (`"root"`).
//! Dev mode mounts a KV v2 engine at `secret/`. To run these tests, set the environment
//! variable `VAULT_KV_NODE_RUN_INTEGRATION_TESTS=true`.

use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tokio::time::sleep;

pub const ROOT_TOKEN: &str = "root";

pub fn integration_enabled() -> bool {
    std::env::var("VAULT_KV_NODE_RUN_INTEGRATION_TESTS")
        .map(|v| v == "true")
        .unwrap_or(false)
}

pub struct VaultFixture {
    _container: ContainerAsync<GenericImage>,
    pub addr: String,
}

impl VaultFixture {
    pub async fn new() -> Self {
        let container = GenericImage::new("hashicorp/vault", "1.18.4")
            .with_exposed_port(8200.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Vault server started!"))
            .with_env_var("VAULT_DEV_ROOT_TOKEN_ID", ROOT_TOKEN)
            .with_env_var("VAULT_DEV_LISTEN_ADDRESS", "0.0.0.0:8200")
            .with_cmd(vec!["server", "-dev", "-dev-root-token-id=root"])
            .start()
            .await
            .expect("Failed to start Vault container");

        let host = container.get_host().await.unwrap();
        let port = container.get_host_port_ipv4(8200).await.unwrap();
        let addr = format!("http://{}:{}", host, port);
        wait_for_vault_ready(&addr, 20, 500).await;

        VaultFixture {
            _container: container,
            addr,
        }
    }

    /// Enables AppRole, creates a role allowed to manage `secret/*`, and returns its
    /// role_id and secret_id.
    pub async fn setup_approle(&self, role_name: &str) -> (String, String) {
        let client = Client::new();
        let policy = r#"path "secret/*" { capabilities = ["create", "read", "update", "delete", "list"] }"#;

        self.root_call(&client, "POST", "/v1/sys/auth/approle", json!({ "type": "approle" }))
            .await;
        self.root_call(
            &client,
            "PUT",
            "/v1/sys/policies/acl/kv-rw",
            json!({ "policy": policy }),
        )
        .await;
        self.root_call(
            &client,
            "POST",
            &format!("/v1/auth/approle/role/{}", role_name),
            json!({ "token_policies": "kv-rw" }),
        )
        .await;

        let role = self
            .root_call(
                &client,
                "GET",
                &format!("/v1/auth/approle/role/{}/role-id", role_name),
                Value::Null,
            )
            .await;
        let secret = self
            .root_call(
                &client,
                "POST",
                &format!("/v1/auth/approle/role/{}/secret-id", role_name),
                json!({}),
            )
            .await;

        (
            role["data"]["role_id"].as_str().unwrap().to_string(),
            secret["data"]["secret_id"].as_str().unwrap().to_string(),
        )
    }

    async fn root_call(&self, client: &Client, method: &str, path: &str, body: Value) -> Value {
        let url = format!("{}{}", self.addr, path);
        let mut request = client
            .request(method.parse().unwrap(), &url)
            .header("X-Vault-Token", ROOT_TOKEN);
        if !body.is_null() {
            request = request.json(&body);
        }
        let resp = request.send().await.unwrap();
        assert!(resp.status().is_success(), "{} {} failed: {}", method, path, resp.status());
        resp.json().await.unwrap_or(Value::Null)
    }
}

/// Wait for Vault to be ready
async fn wait_for_vault_ready(addr: &str, max_retries: usize, retry_delay_ms: u64) {
    let client = Client::new();
    let health_url = format!("{}/v1/sys/health", addr);
    for _ in 0..max_retries {
        if let Ok(resp) = client.get(&health_url).send().await {
            if resp.status().as_u16() == 200 {
                return;
            }
        }
        sleep(Duration::from_millis(retry_delay_ms)).await;
    }
    panic!("Vault not ready after {} attempts", max_retries);
}

//! Token acquisition for Vault (static token or AppRole login).

use crate::vault::{AppRoleCredentials, AuthMethod, ConnectionConfig, VaultClient, VaultError};
use serde::Deserialize;
use tracing::{debug, info};

/// Login response; only the fields the node needs.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    auth: Option<LoginAuth>,
}

#[derive(Debug, Deserialize)]
struct LoginAuth {
    client_token: Option<String>,
}

/// Returns the token to use for `config`.
///
/// Static tokens are returned as-is without a network call. AppRole credentials are
/// exchanged for a client token at `/v1/auth/<app_role_path>/login`.
pub async fn authenticate(
    client: &VaultClient,
    config: &ConnectionConfig,
) -> Result<String, VaultError> {
    match config.auth_method {
        AuthMethod::Token => Ok(config.token.clone()),
        AuthMethod::AppRole => {
            approle_login(client, &config.app_role_path, &config.approle_credentials()).await
        }
    }
}

/// Logs in with AppRole credentials and returns `auth.client_token`.
pub async fn approle_login(
    client: &VaultClient,
    mount: &str,
    creds: &AppRoleCredentials,
) -> Result<String, VaultError> {
    let path = format!("/v1/auth/{}/login", mount);
    let payload = serde_json::to_value(creds)
        .map_err(|e| VaultError::Authentication(e.to_string()))?;

    let json_resp = client
        .post_unauthenticated(&path, &payload)
        .await
        .map_err(|e| VaultError::Authentication(e.message()))?;

    let login: LoginResponse = serde_json::from_value(json_resp)
        .map_err(|e| VaultError::Authentication(format!("Unexpected login response: {}", e)))?;

    match login.auth.and_then(|auth| auth.client_token) {
        Some(token) if !token.is_empty() => {
            info!("AppRole login succeeded at mount '{}'", mount);
            Ok(token)
        }
        _ => Err(VaultError::Authentication(
            "Failed to obtain token from AppRole login".into(),
        )),
    }
}

/// Hands out tokens for one execution.
///
/// With reuse enabled, the token of the last successful authentication is returned again
/// as long as the connection config is unchanged. Nothing outlives the provider.
#[derive(Default)]
pub struct TokenProvider {
    reuse: bool,
    cached: Option<(ConnectionConfig, String)>,
}

impl TokenProvider {
    pub fn new(reuse: bool) -> Self {
        Self {
            reuse,
            cached: None,
        }
    }

    pub async fn token(
        &mut self,
        client: &VaultClient,
        config: &ConnectionConfig,
    ) -> Result<String, VaultError> {
        if self.reuse {
            if let Some((cached_config, token)) = &self.cached {
                if cached_config == config {
                    debug!("Reusing token for {}", config.url);
                    return Ok(token.clone());
                }
            }
        }

        let token = authenticate(client, config).await?;
        if self.reuse {
            self.cached = Some((config.clone(), token.clone()));
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::init_logging;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn approle_config(server: &MockServer) -> ConnectionConfig {
        ConnectionConfig::with_approle(&server.uri(), "role-1", "secret-1")
            .validate()
            .unwrap()
    }

    #[tokio::test]
    async fn static_token_makes_no_call() {
        init_logging();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = ConnectionConfig::with_token(&server.uri(), "hvs.static")
            .validate()
            .unwrap();
        let client = VaultClient::new(&config).unwrap();
        assert_eq!(authenticate(&client, &config).await.unwrap(), "hvs.static");
    }

    #[tokio::test]
    async fn approle_login_returns_client_token() {
        init_logging();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .and(body_json(json!({ "role_id": "role-1", "secret_id": "secret-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": { "client_token": "hvs.login", "lease_duration": 3600 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = approle_config(&server);
        let client = VaultClient::new(&config).unwrap();
        assert_eq!(authenticate(&client, &config).await.unwrap(), "hvs.login");
    }

    #[tokio::test]
    async fn approle_login_uses_custom_mount_and_namespace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/workflow-approle/login"))
            .and(header("x-vault-namespace", "team-a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": { "client_token": "hvs.ns" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = approle_config(&server);
        config.app_role_path = "workflow-approle".into();
        config.namespace = Some("team-a".into());
        let client = VaultClient::new(&config).unwrap();
        assert_eq!(authenticate(&client, &config).await.unwrap(), "hvs.ns");
    }

    #[tokio::test]
    async fn missing_client_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "auth": null })))
            .mount(&server)
            .await;

        let config = approle_config(&server);
        let client = VaultClient::new(&config).unwrap();
        let err = authenticate(&client, &config).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "AppRole authentication failed: Failed to obtain token from AppRole login"
        );
    }

    #[tokio::test]
    async fn login_failure_carries_vault_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({ "errors": ["invalid secret id"] })),
            )
            .mount(&server)
            .await;

        let config = approle_config(&server);
        let client = VaultClient::new(&config).unwrap();
        let err = authenticate(&client, &config).await.unwrap_err();
        assert!(matches!(err, VaultError::Authentication(ref msg) if msg == "invalid secret id"));
    }

    #[tokio::test]
    async fn provider_reuses_token_for_same_config() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": { "client_token": "hvs.cached" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = approle_config(&server);
        let client = VaultClient::new(&config).unwrap();
        let mut provider = TokenProvider::new(true);
        for _ in 0..3 {
            assert_eq!(provider.token(&client, &config).await.unwrap(), "hvs.cached");
        }
    }

    #[tokio::test]
    async fn provider_without_reuse_logs_in_every_time() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/auth/approle/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "auth": { "client_token": "hvs.fresh" }
            })))
            .expect(2)
            .mount(&server)
            .await;

        let config = approle_config(&server);
        let client = VaultClient::new(&config).unwrap();
        let mut provider = TokenProvider::new(false);
        provider.token(&client, &config).await.unwrap();
        provider.token(&client, &config).await.unwrap();
    }
}

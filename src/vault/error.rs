/// Errors surfaced by the Vault KV node.
///
/// The first group carries the messages shown to workflow users. The transport-level
/// variants at the bottom come out of [`crate::vault::VaultClient`] and are folded into one
/// of the user-facing variants by the auth and kv layers.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("AppRole authentication failed: {0}")]
    Authentication(String),

    #[error("Secret data must be valid JSON: {0}")]
    InvalidSecretData(String),

    #[error("Custom headers must be valid JSON: {0}")]
    InvalidHeader(String),

    #[error("Failed to read secret: {0}")]
    ReadSecret(String),

    #[error("Failed to write secret: {0}")]
    WriteSecret(String),

    #[error("Failed to delete secret: {0}")]
    DeleteSecret(String),

    #[error("Failed to list secrets: {0}")]
    ListSecrets(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid credentials: {0}")]
    Config(String),

    #[error("Invalid parameters for item {0}: {1}")]
    InvalidParameters(usize, String),

    #[error("API error: {0}")]
    Api(String),

    #[error("HTTP status {0}: {1}")]
    HttpStatus(u16, String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl VaultError {
    /// The cause text without the variant prefix.
    ///
    /// For `Api` this is Vault's first `errors` entry. For `HttpStatus` with no structured body
    /// it falls back to the status line.
    pub fn message(&self) -> String {
        match self {
            VaultError::Api(msg)
            | VaultError::Network(msg)
            | VaultError::ParseError(msg) => msg.clone(),
            VaultError::HttpStatus(code, body) if body.trim().is_empty() => {
                format!("Request failed with status code {}", code)
            }
            VaultError::HttpStatus(code, body) => {
                format!("Request failed with status code {}: {}", code, body.trim())
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_strips_transport_prefix() {
        assert_eq!(
            VaultError::Api("permission denied".into()).message(),
            "permission denied"
        );
        assert_eq!(
            VaultError::Network("connection refused".into()).message(),
            "connection refused"
        );
    }

    #[test]
    fn message_for_bare_status() {
        assert_eq!(
            VaultError::HttpStatus(503, String::new()).message(),
            "Request failed with status code 503"
        );
    }

    #[test]
    fn user_facing_variants_render_prefix() {
        let err = VaultError::ReadSecret("permission denied".into());
        assert_eq!(err.to_string(), "Failed to read secret: permission denied");
        let err = VaultError::UnknownOperation("rotateSecret".into());
        assert_eq!(err.to_string(), "Unknown operation: rotateSecret");
    }
}

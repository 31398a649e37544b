//! vault-kv-node - HashiCorp Vault KV node for workflow automation
//!
//! This crate lets a workflow read, write, delete and list secrets stored in a Vault KV
//! secrets engine (v1 or v2), authenticating with AppRole or a static token.
//!
//! ## Architecture
//!
//! - `interface` module - what the node needs from its host (credentials, item parameters)
//! - `node` module - batch execution; one result record per input item
//! - `vault` module - Vault HTTP layer: auth, request building, response normalization
//! - `cli` module - command-line host that runs jobs against a Vault server

pub mod cli;
pub mod interface;
pub mod node;
pub mod vault;

// Re-export public types for convenience
pub use interface::{ItemParameters, Job, JobContext, NodeContext};
pub use node::{ResultRecord, SecretsNode};
pub use vault::{AuthMethod, ConnectionConfig, KvVersion, VaultError};

/// Initialize logging for tests
#[allow(dead_code)]
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer() // This ensures output goes to both stdout and test output
        .try_init();
}

//! Boundary between the node and the workflow host.
//!
//! The host resolves credentials and per-item parameters; the node only sees them through
//! [`NodeContext`]. [`JobContext`] is the implementation used by the CLI and tests, backed by
//! a JSON job description.

use crate::vault::{ConnectionConfig, VaultError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the node needs from its host for one execution.
#[async_trait]
pub trait NodeContext: Send + Sync {
    /// Resolved Vault credentials.
    async fn credentials(&self) -> Result<ConnectionConfig, VaultError>;

    /// Number of input items.
    fn item_count(&self) -> usize;

    /// Parameters of the item at `index`.
    fn parameters(&self, index: usize) -> Result<ItemParameters, VaultError>;

    /// Whether a failed item becomes an error record instead of aborting the batch.
    fn continue_on_fail(&self) -> bool;
}

/// Per-item node parameters, named as the host sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParameters {
    #[serde(default = "default_operation")]
    pub operation: String,
    /// Mount path of the KV engine.
    #[serde(default = "default_secret_engine")]
    pub secret_engine: String,
    #[serde(default)]
    pub secret_path: String,
    #[serde(default)]
    pub list_path: String,
    /// JSON value, or a string holding JSON.
    #[serde(default)]
    pub secret_data: Option<Value>,
    /// Secret version to read. Zero, negative and missing values read the latest.
    #[serde(default)]
    pub version: f64,
    #[serde(default)]
    pub additional_fields: AdditionalFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalFields {
    /// JSON object, or a string holding one.
    #[serde(default)]
    pub custom_headers: Option<Value>,
    /// Request timeout in milliseconds.
    #[serde(default)]
    pub timeout: Option<u64>,
}

fn default_operation() -> String {
    "readSecret".to_string()
}

fn default_secret_engine() -> String {
    "secret".to_string()
}

impl ItemParameters {
    /// Version to request from Vault, or 0 for the latest.
    pub fn read_version(&self) -> u64 {
        if self.version.is_finite() && self.version >= 1.0 {
            self.version.trunc() as u64
        } else {
            0
        }
    }
}

impl Default for ItemParameters {
    fn default() -> Self {
        Self {
            operation: default_operation(),
            secret_engine: default_secret_engine(),
            secret_path: String::new(),
            list_path: String::new(),
            secret_data: None,
            version: 0.0,
            additional_fields: AdditionalFields::default(),
        }
    }
}

/// A batch to run: optional credentials, raw items and the failure policy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(default)]
    pub credentials: Option<ConnectionConfig>,
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub continue_on_fail: bool,
}

/// [`NodeContext`] over a [`Job`].
///
/// Items stay raw JSON until requested so a malformed item only fails itself.
#[derive(Debug, Clone)]
pub struct JobContext {
    job: Job,
    credentials_override: Option<ConnectionConfig>,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self {
            job,
            credentials_override: None,
        }
    }

    /// Credentials that take precedence over the job's own.
    pub fn with_credentials(mut self, credentials: Option<ConnectionConfig>) -> Self {
        self.credentials_override = credentials;
        self
    }

    /// Overrides the job's failure policy when `enabled` is true.
    pub fn continue_on_fail_if(mut self, enabled: bool) -> Self {
        self.job.continue_on_fail |= enabled;
        self
    }

    /// A one-item job.
    pub fn single(
        credentials: ConnectionConfig,
        params: &ItemParameters,
    ) -> Result<Self, VaultError> {
        let item = serde_json::to_value(params)
            .map_err(|e| VaultError::InvalidParameters(0, e.to_string()))?;
        Ok(Self::new(Job {
            credentials: Some(credentials),
            items: vec![item],
            continue_on_fail: false,
        }))
    }
}

#[async_trait]
impl NodeContext for JobContext {
    async fn credentials(&self) -> Result<ConnectionConfig, VaultError> {
        self.credentials_override
            .as_ref()
            .or(self.job.credentials.as_ref())
            .cloned()
            .ok_or_else(|| VaultError::Config("no Vault credentials configured".into()))
    }

    fn item_count(&self) -> usize {
        self.job.items.len()
    }

    fn parameters(&self, index: usize) -> Result<ItemParameters, VaultError> {
        let raw = self
            .job
            .items
            .get(index)
            .ok_or_else(|| VaultError::InvalidParameters(index, "no such item".into()))?;
        serde_json::from_value(raw.clone())
            .map_err(|e| VaultError::InvalidParameters(index, e.to_string()))
    }

    fn continue_on_fail(&self) -> bool {
        self.job.continue_on_fail
    }
}

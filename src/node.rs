//! Batch execution of KV operations.
//!
//! Items are processed one at a time, in input order. Each item moves through
//! `Pending -> Authenticating -> Requesting -> Done | Failed`; validation of the operation,
//! secret data and headers happens while still `Pending`, so a bad item never reaches Vault.

use crate::interface::{ItemParameters, NodeContext};
use crate::vault::auth::TokenProvider;
use crate::vault::operations::build_request;
use crate::vault::{kv, KvOperation, RequestOptions, VaultClient, VaultError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, info, warn};

/// Index of the input item a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// One output record per input item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultRecord {
    pub json: Value,
    pub paired_item: PairedItem,
}

impl ResultRecord {
    pub fn new(json: Value, item: usize) -> Self {
        Self {
            json,
            paired_item: PairedItem { item },
        }
    }

    pub fn error(err: &VaultError, item: usize) -> Self {
        Self::new(json!({ "error": err.to_string() }), item)
    }

    pub fn is_error(&self) -> bool {
        self.json.get("error").is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    Authenticating,
    Requesting,
    Done,
    Failed,
}

impl fmt::Display for ItemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemState::Pending => "pending",
            ItemState::Authenticating => "authenticating",
            ItemState::Requesting => "requesting",
            ItemState::Done => "done",
            ItemState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn enter(index: usize, state: ItemState) {
    debug!("item {}: {}", index, state);
}

/// The Vault KV node.
#[derive(Debug, Clone, Default)]
pub struct SecretsNode {
    reauthenticate_per_item: bool,
}

impl SecretsNode {
    /// A node that logs in at most once per execution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Log in again for every item instead of reusing the execution's token.
    pub fn reauthenticate_per_item(mut self, enabled: bool) -> Self {
        self.reauthenticate_per_item = enabled;
        self
    }

    /// Runs every item of `ctx` and returns one record per processed item.
    ///
    /// Without continue-on-fail the first failing item aborts the batch and its error is
    /// returned; records collected so far are dropped.
    pub async fn execute(&self, ctx: &dyn NodeContext) -> Result<Vec<ResultRecord>, VaultError> {
        let count = ctx.item_count();
        let mut tokens = TokenProvider::new(!self.reauthenticate_per_item);
        let mut records = Vec::with_capacity(count);
        info!("Processing {} item(s)", count);

        for index in 0..count {
            enter(index, ItemState::Pending);
            match self.process_item(ctx, index, &mut tokens).await {
                Ok(result) => {
                    enter(index, ItemState::Done);
                    records.push(ResultRecord::new(result, index));
                }
                Err(err) => {
                    enter(index, ItemState::Failed);
                    warn!("Item {} failed: {}", index, err);
                    if ctx.continue_on_fail() {
                        records.push(ResultRecord::error(&err, index));
                        continue;
                    }
                    return Err(err);
                }
            }
        }

        let failed = records.iter().filter(|r| r.is_error()).count();
        info!("Processed {} item(s), {} failed", records.len(), failed);
        Ok(records)
    }

    async fn process_item(
        &self,
        ctx: &dyn NodeContext,
        index: usize,
        tokens: &mut TokenProvider,
    ) -> Result<Value, VaultError> {
        let config = ctx.credentials().await?.validate()?;
        let params = ctx.parameters(index)?;
        let operation: KvOperation = params.operation.parse()?;
        let path = target_path(operation, &params);

        let request = build_request(
            operation,
            config.api_version,
            &params.secret_engine,
            path,
            params.read_version(),
            params.secret_data.as_ref(),
        )?;
        let options = RequestOptions::from_fields(
            params.additional_fields.custom_headers.as_ref(),
            params.additional_fields.timeout,
        )?;
        let client = VaultClient::new(&config)?;

        enter(index, ItemState::Authenticating);
        let token = tokens.token(&client, &config).await?;

        enter(index, ItemState::Requesting);
        kv::execute(
            &client,
            &token,
            operation,
            config.api_version,
            &request,
            path,
            &options,
        )
        .await
    }
}

/// Lists address `listPath`; every other operation addresses `secretPath`.
fn target_path(operation: KvOperation, params: &ItemParameters) -> &str {
    match operation {
        KvOperation::List => &params.list_path,
        _ => &params.secret_path,
    }
}

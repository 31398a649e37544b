use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::interface::{AdditionalFields, ItemParameters, Job, JobContext};
use crate::node::{ResultRecord, SecretsNode};
use crate::vault::{AuthMethod, ConnectionConfig, KvVersion, DEFAULT_APPROLE_PATH};

#[derive(Parser)]
#[command(
    name = "vault-kv-node",
    about = "Read, write, delete and list HashiCorp Vault KV secrets",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Vault connection settings. A job file's credentials are used when no address is given.
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// Vault server address.
    #[arg(long, env = "VAULT_ADDR", global = true)]
    pub vault_addr: Option<String>,
    /// Authentication method; inferred from the other flags when omitted.
    #[arg(long, env = "VAULT_AUTH_METHOD", value_enum, global = true)]
    pub auth_method: Option<AuthMethod>,
    /// Static Vault token.
    #[arg(long, env = "VAULT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,
    /// AppRole role_id.
    #[arg(long, env = "VAULT_ROLE_ID", global = true)]
    pub role_id: Option<String>,
    /// AppRole secret_id.
    #[arg(long, env = "VAULT_SECRET_ID", hide_env_values = true, global = true)]
    pub secret_id: Option<String>,
    /// Mount path of the AppRole auth method.
    #[arg(long, env = "VAULT_APPROLE_PATH", default_value = DEFAULT_APPROLE_PATH, global = true)]
    pub approle_path: String,
    /// Vault Enterprise namespace.
    #[arg(long, env = "VAULT_NAMESPACE", global = true)]
    pub namespace: Option<String>,
    /// KV secrets engine version.
    #[arg(long, env = "VAULT_KV_VERSION", value_enum, default_value = "v2", global = true)]
    pub kv_version: KvVersion,
    /// Skip TLS certificate verification.
    #[arg(long, env = "VAULT_SKIP_VERIFY", global = true)]
    pub skip_verify: bool,
}

impl ConnectionArgs {
    /// Credentials from flags/env, or `None` when no address is set.
    pub fn to_config(&self) -> Option<ConnectionConfig> {
        let url = self.vault_addr.clone()?;
        let auth_method = self.auth_method.unwrap_or(
            if self.token.is_some() && self.role_id.is_none() {
                AuthMethod::Token
            } else {
                AuthMethod::AppRole
            },
        );
        Some(ConnectionConfig {
            url,
            auth_method,
            role_id: self.role_id.clone().unwrap_or_default(),
            secret_id: self.secret_id.clone().unwrap_or_default(),
            app_role_path: self.approle_path.clone(),
            token: self.token.clone().unwrap_or_default(),
            namespace: self.namespace.clone(),
            api_version: self.kv_version,
            allow_unauthorized_certs: self.skip_verify,
        })
    }
}

/// Options shared by the single-secret commands.
#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// Mount path of the KV secrets engine.
    #[arg(long, default_value = "secret")]
    pub mount: String,
    /// Extra request headers as a JSON object.
    #[arg(long)]
    pub header_json: Option<String>,
    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a JSON job file (`{"credentials": {...}, "items": [...], "continueOnFail": bool}`).
    Run {
        #[arg(long)]
        job: PathBuf,
        /// Record failed items as errors instead of aborting.
        #[arg(long)]
        continue_on_fail: bool,
        /// Log in again for every item.
        #[arg(long)]
        reauthenticate_per_item: bool,
    },
    /// Read a secret.
    Read {
        path: String,
        /// Version to read (0 for latest, KV v2 only).
        #[arg(long, default_value_t = 0)]
        version: u64,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Write a secret.
    Write {
        path: String,
        /// Secret data as a JSON object.
        #[arg(long)]
        data: String,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Delete a secret.
    Delete {
        path: String,
        #[command(flatten)]
        item: ItemArgs,
    },
    /// List secrets below a path.
    List {
        #[arg(default_value = "")]
        path: String,
        #[command(flatten)]
        item: ItemArgs,
    },
}

impl Commands {
    /// Parameters for the single-secret commands; `None` for `run`.
    pub fn item_parameters(&self) -> Option<ItemParameters> {
        let (operation, item) = match self {
            Commands::Run { .. } => return None,
            Commands::Read { item, .. } => ("readSecret", item),
            Commands::Write { item, .. } => ("writeSecret", item),
            Commands::Delete { item, .. } => ("deleteSecret", item),
            Commands::List { item, .. } => ("listSecrets", item),
        };

        let mut params = ItemParameters {
            operation: operation.to_string(),
            secret_engine: item.mount.clone(),
            additional_fields: AdditionalFields {
                custom_headers: item.header_json.clone().map(Value::String),
                timeout: Some(item.timeout_ms),
            },
            ..ItemParameters::default()
        };
        match self {
            Commands::Read { path, version, .. } => {
                params.secret_path = path.clone();
                params.version = *version as f64;
            }
            Commands::Write { path, data, .. } => {
                params.secret_path = path.clone();
                params.secret_data = Some(Value::String(data.clone()));
            }
            Commands::Delete { path, .. } => params.secret_path = path.clone(),
            Commands::List { path, .. } => params.list_path = path.clone(),
            Commands::Run { .. } => {}
        }
        Some(params)
    }
}

/// Reads and parses a job file.
pub fn load_job(path: &Path) -> Result<Job> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse job file {}", path.display()))
}

/// Executes the parsed command and returns the node's output ports.
pub async fn execute(cli: &Cli) -> Result<Vec<Vec<ResultRecord>>> {
    let credentials = cli.connection.to_config();

    let (ctx, node) = match &cli.command {
        Commands::Run {
            job,
            continue_on_fail,
            reauthenticate_per_item,
        } => {
            info!("Running job {}", job.display());
            let ctx = JobContext::new(load_job(job)?)
                .with_credentials(credentials)
                .continue_on_fail_if(*continue_on_fail);
            let node = SecretsNode::new().reauthenticate_per_item(*reauthenticate_per_item);
            (ctx, node)
        }
        command => {
            let credentials = credentials
                .context("No Vault address configured (set --vault-addr or VAULT_ADDR)")?;
            let params = command
                .item_parameters()
                .context("Command takes no item parameters")?;
            (JobContext::single(credentials, &params)?, SecretsNode::new())
        }
    };

    let records = node.execute(&ctx).await?;
    Ok(vec![records])
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    let output = execute(&cli).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

use crate::error::{Error, Result};
use crate::utils::extract_keypair_from_str;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use web3::signing::SecretKey;
use web3::types::Address;

pub const DEFAULT_CHAIN_ID: u64 = 31337;

pub const SERVICE_MANAGER_ABI: &str = "CrowdFunding";
pub const DELEGATION_MANAGER_ABI: &str = "IDelegationManager";
pub const STAKE_REGISTRY_ABI: &str = "ECDSAStakeRegistry";
pub const AVS_DIRECTORY_ABI: &str = "IAVSDirectory";

#[derive(clap::Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Opts {
    /// JSON-RPC endpoint of the node
    #[clap(long, env = "RPC_URL")]
    pub rpc_url: String,

    /// hex encoded operator key
    #[clap(long, env = "PRIVATE_KEY", hide_env_values = true)]
    pub private_key: String,

    /// chain id, also selects the deployment files
    #[clap(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: u64,

    /// directory holding `hello-world/<chain>.json` and `core/<chain>.json`
    #[clap(long, env = "DEPLOYMENTS_DIR", default_value = "contracts/deployments")]
    pub deployments_dir: PathBuf,

    /// directory holding the contract ABI files
    #[clap(long, env = "ABI_DIR", default_value = "abis")]
    pub abi_dir: PathBuf,

    /// http request timeout, seconds
    #[clap(long, env = "RPC_TIMEOUT", default_value_t = 30)]
    pub timeout: u64,

    /// how long to wait for a transaction receipt, seconds
    #[clap(long, env = "CONFIRMATION_TIMEOUT", default_value_t = 300)]
    pub confirmation_timeout: u64,

    /// receipt and event polling interval, milliseconds
    #[clap(long, env = "POLL_INTERVAL_MS", default_value_t = 4000)]
    pub poll_interval: u64,

    /// fixed gas limit, estimated by the node when unset
    #[clap(long, env = "GAS_LIMIT")]
    pub gas_limit: Option<u64>,

    /// fixed gas price in wei, queried from the node when unset
    #[clap(long, env = "GAS_PRICE")]
    pub gas_price: Option<u128>,
}

/// Per-transaction settings shared by every signed call.
#[derive(Debug, Clone)]
pub struct TxOptions {
    pub gas: Option<u64>,
    pub gas_price: Option<u128>,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub chain_id: u64,
    pub secret_key: SecretKey,
    pub operator: Address,
    pub deployments_dir: PathBuf,
    pub abi_dir: PathBuf,
    pub timeout: Duration,
    pub tx: TxOptions,
}

impl Config {
    pub fn from_opts(opts: &Opts) -> Result<Self> {
        if opts.rpc_url.trim().is_empty() {
            return Err(Error::Config("RPC_URL is empty".to_string()));
        }
        let (secret_key, operator) = extract_keypair_from_str(&opts.private_key)?;
        Ok(Self {
            rpc_url: opts.rpc_url.trim().to_string(),
            chain_id: opts.chain_id,
            secret_key,
            operator,
            deployments_dir: opts.deployments_dir.clone(),
            abi_dir: opts.abi_dir.clone(),
            timeout: Duration::from_secs(opts.timeout),
            tx: TxOptions {
                gas: opts.gas_limit,
                gas_price: opts.gas_price,
                confirmation_timeout: Duration::from_secs(opts.confirmation_timeout),
                poll_interval: Duration::from_millis(opts.poll_interval),
            },
        })
    }

    /// Service manager and stake registry addresses.
    pub fn avs_deployment(&self) -> Result<Deployment> {
        Deployment::parse_from_file(&self.deployment_path("hello-world"))
    }

    /// Delegation manager and AVS directory addresses.
    pub fn core_deployment(&self) -> Result<Deployment> {
        Deployment::parse_from_file(&self.deployment_path("core"))
    }

    pub fn deployment_path(&self, group: &str) -> PathBuf {
        self.deployments_dir.join(group).join(format!("{}.json", self.chain_id))
    }

    pub fn read_abi(&self, name: &str) -> Result<Vec<u8>> {
        read_abi_file(&self.abi_dir.join(format!("{}.json", name)))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Deployment {
    /// Parsed lazily; unrelated entries never fail the file.
    pub addresses: HashMap<String, Value>,
    #[serde(skip)]
    source: String,
}

impl Deployment {
    pub fn parse_from_file(file: &Path) -> Result<Self> {
        let confstr = std::fs::read_to_string(file)?;
        let mut deployment: Deployment = serde_json::from_str(&confstr)?;
        deployment.source = file.display().to_string();
        Ok(deployment)
    }

    pub fn address(&self, key: &str) -> Result<Address> {
        let value = self
            .addresses
            .get(key)
            .ok_or_else(|| Error::MissingAddress(key.to_string(), self.source.clone()))?;
        value
            .as_str()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Config(format!("`{}` in {} is not an address: {}", key, self.source, value)))
    }
}

/// Reads an ABI file. Accepts a bare ABI array or a build artifact with an
/// `abi` field and always returns the bare array.
pub fn read_abi_file(file: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read(file)?;
    let value: Value = serde_json::from_slice(&raw)?;
    match value {
        Value::Array(_) => Ok(raw),
        Value::Object(mut obj) => match obj.remove("abi") {
            Some(abi @ Value::Array(_)) => Ok(serde_json::to_vec(&abi)?),
            _ => Err(Error::Config(format!("{} has no abi array", file.display()))),
        },
        _ => Err(Error::Config(format!("{} is not an abi", file.display()))),
    }
}

pub mod agent;
pub mod chain;
pub mod config;
pub mod contract;
pub mod error;
pub mod generator;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use crate::{
    config::{Config, Opts, TxOptions},
    error::{Error, Result},
};
use clap::Parser;
use env_logger::Env;
use futures::stream::{BoxStream, StreamExt};
use log::{debug, info, warn};
use reqwest::{Client, Url};
use std::{collections::VecDeque, sync::Arc, time::Duration};
use tokio::{sync::Mutex, time::timeout};
use web3::{
    api::{BaseFilter, Eth},
    contract::{tokens::Tokenize, Contract, Options},
    signing::{Key, SecretKey, SecretKeyRef},
    transports::Http,
    types::{Address, BlockNumber, FilterBuilder, Log, TransactionReceipt, H256, U256, U64},
};

/// Interval between two generated tasks.
pub const TASK_INTERVAL: Duration = Duration::from_secs(24);
/// Lifetime of an operator registration signature, seconds.
pub const SIGNATURE_EXPIRY: u64 = 3600;

/// Donation sent for every newly created task: 0.1 ether in wei.
pub fn donation_amount() -> U256 {
    U256::from(100_000_000_000_000_000u64)
}

pub fn init_logger() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

/// Loads `.env`, parses the command line and connects to the configured chain.
/// Every failure here is fatal for the calling binary.
pub async fn bootstrap() -> Result<(Config, Arc<ChainClient>)> {
    if let Err(e) = dotenvy::dotenv() {
        debug!("no .env loaded: {}", e);
    }
    let opts = Opts::parse();
    let config = Config::from_opts(&opts)?;
    let client = ChainClient::setup(&config)?;
    client.check_chain_id(config.chain_id).await?;
    Ok((config, Arc::new(client)))
}

/// Signing client shared by every contract proxy of a process.
#[derive(Debug)]
pub struct ChainClient {
    pub web3: web3::Web3<Http>,
    pub eth: Eth<Http>,
    pub root_sk: SecretKey,
    pub root_addr: Address,
    pub tx: TxOptions,
    send_lock: Mutex<()>,
}

impl ChainClient {
    pub fn setup(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;
        let url = Url::parse(config.rpc_url.as_str()).map_err(|e| Error::Config(format!("RPC_URL: {}", e)))?;
        let transport = Http::with_client(client, url);
        let web3 = web3::Web3::new(transport);
        let eth = web3.eth();

        Ok(Self {
            web3,
            eth,
            root_sk: config.secret_key,
            root_addr: config.operator,
            tx: config.tx.clone(),
            send_lock: Mutex::new(()),
        })
    }

    /// Fails unless the node serves the configured chain.
    pub async fn check_chain_id(&self, expected: u64) -> Result<()> {
        let actual = self.eth.chain_id().await?;
        if actual != U256::from(expected) {
            return Err(Error::CheckChainErr { expected, actual });
        }
        let block = self.eth.block_number().await?;
        info!("chain_id:{}, block_num:{}, operator:{:?}", actual, block, self.root_addr);
        Ok(())
    }

    pub fn contract(&self, address: Address, abi: &[u8]) -> Result<Contract<Http>> {
        Ok(Contract::from_json(self.eth.clone(), address, abi)?)
    }

    /// Signs and submits `func`, then waits for the mined receipt.
    ///
    /// The pending nonce is read and the transaction sent under a lock so
    /// overlapping calls from this key never reuse a nonce. Waiting for the
    /// receipt happens outside the lock and is bounded by the confirmation
    /// timeout.
    pub async fn send<P>(&self, contract: &Contract<Http>, func: &str, params: P, value: Option<U256>) -> Result<TransactionReceipt>
    where
        P: Tokenize + Clone + Send,
    {
        let gas = match self.tx.gas {
            Some(gas) => gas.into(),
            None => {
                let opt = Options {
                    value,
                    ..Default::default()
                };
                contract.estimate_gas(func, params.clone(), self.root_addr, opt).await?
            }
        };

        let hash = {
            let _guard = self.send_lock.lock().await;
            let nonce = self
                .eth
                .transaction_count(self.root_addr, Some(BlockNumber::Pending))
                .await?;
            let opt = Options {
                gas: Some(gas),
                gas_price: self.tx.gas_price.map(U256::from),
                value,
                nonce: Some(nonce),
                ..Default::default()
            };
            contract
                .signed_call(func, params, opt, SecretKeyRef::new(&self.root_sk))
                .await?
        };
        debug!("{} submitted: {:?}", func, hash);

        let receipt = timeout(self.tx.confirmation_timeout, self.wait_for_tx_receipt(hash))
            .await
            .map_err(|_| Error::ConfirmationTimeout(hash))??;
        if receipt.status == Some(U64::zero()) {
            return Err(Error::TxReverted(hash));
        }
        Ok(receipt)
    }

    pub async fn wait_for_tx_receipt(&self, hash: H256) -> Result<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.eth.transaction_receipt(hash).await? {
                if receipt.block_number.is_some() {
                    break Ok(receipt);
                }
            }
            tokio::time::sleep(self.tx.poll_interval).await;
        }
    }

    /// Raw signature over a 32-byte digest as `r || s || v`, v in {27, 28}.
    pub fn sign_digest(&self, digest: H256) -> Result<Vec<u8>> {
        let sig = SecretKeyRef::new(&self.root_sk).sign(digest.as_bytes(), None)?;
        let mut res = Vec::with_capacity(65);
        res.extend_from_slice(sig.r.as_bytes());
        res.extend_from_slice(sig.s.as_bytes());
        res.push(sig.v as u8);
        Ok(res)
    }

    /// Installs a log filter on the node and polls it forever.
    ///
    /// A failed poll is yielded as an error and the filter is dropped. The next
    /// poll installs a fresh one starting at the first block not yet delivered
    /// and fetches the logs missed in between, so a node restart or an expired
    /// filter costs no events.
    pub async fn log_stream(&self, filter: FilterBuilder) -> Result<BoxStream<'static, Result<Log>>> {
        let head = self.eth.block_number().await?;
        let installed = self.web3.eth_filter().create_logs_filter(filter.build()).await?;
        let poller = FilterPoller {
            web3: self.web3.clone(),
            template: filter,
            installed: Some(installed),
            next_block: head + U64::one(),
            pending: VecDeque::new(),
            interval: self.tx.poll_interval,
        };
        Ok(futures::stream::unfold(poller, |mut poller| async move {
            let item = poller.next().await;
            Some((item, poller))
        })
        .boxed())
    }
}

struct FilterPoller {
    web3: web3::Web3<Http>,
    template: FilterBuilder,
    installed: Option<BaseFilter<Http, Log>>,
    /// First block whose logs have not been delivered yet.
    next_block: U64,
    pending: VecDeque<Log>,
    interval: Duration,
}

impl FilterPoller {
    async fn next(&mut self) -> Result<Log> {
        loop {
            if let Some(log) = self.pending.pop_front() {
                if let Some(block) = log.block_number {
                    self.next_block = self.next_block.max(block + U64::one());
                }
                return Ok(log);
            }

            let filter = match &self.installed {
                Some(filter) => filter,
                None => {
                    self.reinstall().await?;
                    continue;
                }
            };
            tokio::time::sleep(self.interval).await;
            let polled = filter.poll().await;
            match polled {
                Ok(Some(logs)) => self.pending.extend(logs),
                Ok(None) => {}
                Err(e) => {
                    warn!("log filter poll failed, reinstalling from block {}: {}", self.next_block, e);
                    self.installed = None;
                    return Err(e.into());
                }
            }
        }
    }

    async fn reinstall(&mut self) -> Result<()> {
        let from = BlockNumber::Number(self.next_block);
        let filter = self.template.clone().from_block(from).build();
        let installed = match self.web3.eth_filter().create_logs_filter(filter).await {
            Ok(installed) => installed,
            Err(e) => {
                tokio::time::sleep(self.interval).await;
                return Err(e.into());
            }
        };
        // a fresh filter only reports changes made after it was installed
        let missed = installed.logs().await?;
        info!("log filter reinstalled from block {}, {} missed logs", self.next_block, missed.len());
        self.pending.extend(missed);
        self.installed = Some(installed);
        Ok(())
    }
}

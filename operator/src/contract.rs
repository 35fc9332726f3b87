use crate::chain::{
    EmittedEvent, NewTaskEvent, OperatorDetails, OperatorRegistry, SignatureWithSaltAndExpiry, TaskParams, TaskService,
    TxReceipt, NEW_TASK_CREATED,
};
use crate::config::{
    Config, Deployment, AVS_DIRECTORY_ABI, DELEGATION_MANAGER_ABI, SERVICE_MANAGER_ABI, STAKE_REGISTRY_ABI,
};
use crate::error::{Error, Result};
use crate::ChainClient;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::sync::Arc;
use web3::{
    contract::{Contract, Options},
    ethabi::{self, RawLog, Token},
    transports::Http,
    types::{Address, FilterBuilder, Log, TransactionReceipt, H256, U256},
};

/// Crowdfunding service manager: task creation, donations and the task event feed.
#[derive(Debug)]
pub struct ServiceManagerContract {
    client: Arc<ChainClient>,
    contract: Contract<Http>,
}

impl ServiceManagerContract {
    pub fn load(client: Arc<ChainClient>, config: &Config, avs: &Deployment) -> Result<Self> {
        let address = avs.address("helloWorldServiceManager")?;
        let contract = client.contract(address, &config.read_abi(SERVICE_MANAGER_ABI)?)?;
        Ok(Self { client, contract })
    }
}

#[async_trait]
impl TaskService for ServiceManagerContract {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn create_new_task(&self, params: &TaskParams) -> Result<TxReceipt> {
        let args = (params.name.clone(), params.goal_amount, U256::from(params.duration));
        let receipt = self.client.send(&self.contract, "createNewTask", args, None).await?;
        Ok(decode_receipt(&self.contract, &receipt))
    }

    async fn donate_to_task(&self, task_index: U256, amount: U256) -> Result<TxReceipt> {
        let receipt = self
            .client
            .send(&self.contract, "donateToTask", task_index, Some(amount))
            .await?;
        Ok(decode_receipt(&self.contract, &receipt))
    }

    async fn new_task_events(&self) -> Result<BoxStream<'static, Result<NewTaskEvent>>> {
        let event = self.contract.abi().event(NEW_TASK_CREATED)?.clone();
        let filter = FilterBuilder::default()
            .address(vec![self.contract.address()])
            .topics(Some(vec![event.signature()]), None, None, None);
        let logs = self.client.log_stream(filter).await?;
        Ok(logs.map(move |log| decode_new_task(&event, log?)).boxed())
    }
}

/// Delegation manager, AVS directory and ECDSA stake registry behind one signer.
#[derive(Debug)]
pub struct RegistryContracts {
    client: Arc<ChainClient>,
    delegation_manager: Contract<Http>,
    avs_directory: Contract<Http>,
    stake_registry: Contract<Http>,
}

impl RegistryContracts {
    pub fn load(client: Arc<ChainClient>, config: &Config, core: &Deployment, avs: &Deployment) -> Result<Self> {
        let delegation_manager = client.contract(
            core.address("delegation")?,
            &config.read_abi(DELEGATION_MANAGER_ABI)?,
        )?;
        let avs_directory = client.contract(core.address("avsDirectory")?, &config.read_abi(AVS_DIRECTORY_ABI)?)?;
        let stake_registry = client.contract(avs.address("stakeRegistry")?, &config.read_abi(STAKE_REGISTRY_ABI)?)?;
        Ok(Self {
            client,
            delegation_manager,
            avs_directory,
            stake_registry,
        })
    }
}

#[async_trait]
impl OperatorRegistry for RegistryContracts {
    fn operator(&self) -> Address {
        self.client.root_addr
    }

    async fn is_operator(&self, operator: Address) -> Result<bool> {
        let registered: bool = self
            .delegation_manager
            .query("isOperator", operator, self.client.root_addr, Options::default(), None)
            .await?;
        Ok(registered)
    }

    async fn register_as_operator(&self, details: OperatorDetails, metadata_uri: &str) -> Result<TxReceipt> {
        let args = (details.into_token(), metadata_uri.to_string());
        let receipt = self
            .client
            .send(&self.delegation_manager, "registerAsOperator", args, None)
            .await?;
        Ok(decode_receipt(&self.delegation_manager, &receipt))
    }

    async fn calculate_registration_digest(
        &self,
        operator: Address,
        service_manager: Address,
        salt: [u8; 32],
        expiry: U256,
    ) -> Result<H256> {
        let args = (operator, service_manager, Token::FixedBytes(salt.to_vec()), expiry);
        let digest: Vec<u8> = self
            .avs_directory
            .query(
                "calculateOperatorAVSRegistrationDigestHash",
                args,
                self.client.root_addr,
                Options::default(),
                None,
            )
            .await?;
        if digest.len() != 32 {
            return Err(Error::InvalidOutput(format!("digest of {} bytes", digest.len())));
        }
        Ok(H256::from_slice(&digest))
    }

    fn sign_digest(&self, digest: H256) -> Result<Vec<u8>> {
        self.client.sign_digest(digest)
    }

    async fn register_operator_with_signature(
        &self,
        signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt> {
        let args = (signature.into_token(), operator);
        let receipt = self
            .client
            .send(&self.stake_registry, "registerOperatorWithSignature", args, None)
            .await?;
        Ok(decode_receipt(&self.stake_registry, &receipt))
    }
}

/// Decodes the logs of `receipt` emitted by `contract` against its ABI.
/// Logs from other addresses, or with no matching event, keep only their raw topics.
pub fn decode_receipt(contract: &Contract<Http>, receipt: &TransactionReceipt) -> TxReceipt {
    decode_logs(contract.abi(), contract.address(), receipt.transaction_hash, &receipt.logs)
}

pub fn decode_logs(abi: &ethabi::Contract, address: Address, transaction_hash: H256, logs: &[Log]) -> TxReceipt {
    let events = logs
        .iter()
        .map(|log| {
            let decoded = if log.address == address {
                log.topics
                    .first()
                    .and_then(|topic| abi.events().find(|e| !e.anonymous && e.signature() == *topic))
                    .and_then(|event| {
                        event
                            .parse_log(raw_log(log))
                            .ok()
                            .map(|parsed| (event.name.clone(), parsed.params))
                    })
            } else {
                None
            };
            match decoded {
                Some((name, params)) => EmittedEvent {
                    address: log.address,
                    name: Some(name),
                    params: params.into_iter().map(|p| (p.name, p.value)).collect(),
                    topics: log.topics.clone(),
                },
                None => EmittedEvent {
                    address: log.address,
                    name: None,
                    params: Vec::new(),
                    topics: log.topics.clone(),
                },
            }
        })
        .collect();

    TxReceipt {
        transaction_hash,
        events,
    }
}

/// `NewTaskCreated(uint32 indexed taskIndex, Task task)`; the task name is the
/// first string member of the `task` tuple.
pub fn decode_new_task(event: &ethabi::Event, log: Log) -> Result<NewTaskEvent> {
    let parsed = event.parse_log(raw_log(&log))?;
    let mut task_index = None;
    let mut name = None;
    for param in parsed.params {
        match (param.name.as_str(), param.value) {
            ("taskIndex", Token::Uint(index)) => task_index = Some(index),
            ("task", Token::Tuple(fields)) => {
                name = fields.into_iter().find_map(|f| match f {
                    Token::String(s) => Some(s),
                    _ => None,
                })
            }
            _ => {}
        }
    }
    match (task_index, name) {
        (Some(task_index), Some(name)) => Ok(NewTaskEvent { task_index, name }),
        _ => Err(Error::InvalidOutput(format!(
            "{} log without taskIndex/task.name: {:?}",
            NEW_TASK_CREATED, log.transaction_hash
        ))),
    }
}

fn raw_log(log: &Log) -> RawLog {
    RawLog {
        topics: log.topics.clone(),
        data: log.data.0.clone(),
    }
}

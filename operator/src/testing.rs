use crate::chain::{
    NewTaskEvent, OperatorDetails, OperatorRegistry, SignatureWithSaltAndExpiry, TaskParams, TaskService, TxReceipt,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;
use web3::types::{Address, H160, H256, U256};

fn empty_receipt() -> TxReceipt {
    TxReceipt {
        transaction_hash: H256::repeat_byte(0xee),
        events: Vec::new(),
    }
}

/// Service manager double. Records every call; unscripted calls succeed
/// with an empty receipt unless built with [`MockTaskService::failing`].
#[derive(Default)]
pub struct MockTaskService {
    failing: bool,
    receipts: Mutex<VecDeque<Result<TxReceipt>>>,
    created: Mutex<Vec<TaskParams>>,
    donations: Mutex<Vec<(U256, U256)>>,
    donation_failures: Mutex<usize>,
    donation_feed: Mutex<Option<mpsc::UnboundedSender<U256>>>,
    events: Mutex<Option<Vec<Result<NewTaskEvent>>>>,
}

impl MockTaskService {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn push_receipt(&self, receipt: Result<TxReceipt>) {
        self.receipts.lock().unwrap().push_back(receipt);
    }

    /// The next `n` donations fail.
    pub fn fail_donations(&self, n: usize) {
        *self.donation_failures.lock().unwrap() = n;
    }

    pub fn set_events(&self, events: Vec<Result<NewTaskEvent>>) {
        *self.events.lock().unwrap() = Some(events);
    }

    /// Receives the task index of every donation attempt.
    pub fn donation_feed(&self) -> mpsc::UnboundedReceiver<U256> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.donation_feed.lock().unwrap() = Some(tx);
        rx
    }

    pub fn created(&self) -> Vec<TaskParams> {
        self.created.lock().unwrap().clone()
    }

    pub fn donations(&self) -> Vec<(U256, U256)> {
        self.donations.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskService for MockTaskService {
    fn address(&self) -> Address {
        Address::repeat_byte(0x5e)
    }

    async fn create_new_task(&self, params: &TaskParams) -> Result<TxReceipt> {
        self.created.lock().unwrap().push(params.clone());
        if self.failing {
            return Err(Error::Contract("node unreachable".to_string()));
        }
        self.receipts.lock().unwrap().pop_front().unwrap_or_else(|| Ok(empty_receipt()))
    }

    async fn donate_to_task(&self, task_index: U256, amount: U256) -> Result<TxReceipt> {
        self.donations.lock().unwrap().push((task_index, amount));
        if let Some(feed) = self.donation_feed.lock().unwrap().as_ref() {
            let _ = feed.send(task_index);
        }
        let mut failures = self.donation_failures.lock().unwrap();
        if self.failing || *failures > 0 {
            *failures = failures.saturating_sub(1);
            return Err(Error::TxReverted(H256::repeat_byte(0xdd)));
        }
        Ok(empty_receipt())
    }

    async fn new_task_events(&self) -> Result<BoxStream<'static, Result<NewTaskEvent>>> {
        if self.failing {
            return Err(Error::Contract("filter not installed".to_string()));
        }
        let events = self.events.lock().unwrap().take().unwrap_or_default();
        Ok(stream::iter(events).boxed())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    IsOperator(Address),
    RegisterAsOperator(OperatorDetails, String),
    CalculateDigest(Address, Address, [u8; 32], U256),
    SignDigest(H256),
    RegisterWithSignature(SignatureWithSaltAndExpiry, Address),
}

/// Registry double recording calls in order.
pub struct MockRegistry {
    registered: bool,
    fail_core: bool,
    fail_signature: bool,
    calls: Mutex<Vec<RegistryCall>>,
}

impl MockRegistry {
    pub const OPERATOR: Address = H160([0x0a; 20]);
    pub const DIGEST: H256 = H256([0x5a; 32]);

    pub fn new(registered: bool) -> Self {
        Self {
            registered,
            fail_core: false,
            fail_signature: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_core_registration(mut self) -> Self {
        self.fail_core = true;
        self
    }

    pub fn fail_signature_registration(mut self) -> Self {
        self.fail_signature = true;
        self
    }

    pub fn signature_of(digest: H256) -> Vec<u8> {
        let mut sig = digest.as_bytes().to_vec();
        sig.extend_from_slice(digest.as_bytes());
        sig.push(27);
        sig
    }

    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RegistryCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl OperatorRegistry for MockRegistry {
    fn operator(&self) -> Address {
        Self::OPERATOR
    }

    async fn is_operator(&self, operator: Address) -> Result<bool> {
        self.record(RegistryCall::IsOperator(operator));
        Ok(self.registered)
    }

    async fn register_as_operator(&self, details: OperatorDetails, metadata_uri: &str) -> Result<TxReceipt> {
        self.record(RegistryCall::RegisterAsOperator(details, metadata_uri.to_string()));
        if self.fail_core {
            return Err(Error::TxReverted(H256::repeat_byte(0xc0)));
        }
        Ok(empty_receipt())
    }

    async fn calculate_registration_digest(
        &self,
        operator: Address,
        service_manager: Address,
        salt: [u8; 32],
        expiry: U256,
    ) -> Result<H256> {
        self.record(RegistryCall::CalculateDigest(operator, service_manager, salt, expiry));
        Ok(Self::DIGEST)
    }

    fn sign_digest(&self, digest: H256) -> Result<Vec<u8>> {
        self.record(RegistryCall::SignDigest(digest));
        Ok(Self::signature_of(digest))
    }

    async fn register_operator_with_signature(
        &self,
        signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt> {
        self.record(RegistryCall::RegisterWithSignature(signature, operator));
        if self.fail_signature {
            return Err(Error::ConfirmationTimeout(H256::repeat_byte(0x5f)));
        }
        Ok(empty_receipt())
    }
}

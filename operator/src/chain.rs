//! Remote-call seams used by the task generator and the operator agent.
//!
//! `TaskService` covers the crowdfunding service manager, `OperatorRegistry`
//! the delegation manager, AVS directory and stake registry. The web3-backed
//! implementations live in [`crate::contract`].

use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use web3::ethabi::Token;
use web3::types::{Address, H256, U256};

pub const NEW_TASK_CREATED: &str = "NewTaskCreated";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskParams {
    pub name: String,
    /// wei
    pub goal_amount: U256,
    /// seconds
    pub duration: u64,
}

/// A receipt log, decoded against the emitting contract's ABI when possible.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    pub address: Address,
    pub name: Option<String>,
    pub params: Vec<(String, Token)>,
    pub topics: Vec<H256>,
}

impl EmittedEvent {
    pub fn param(&self, name: &str) -> Option<&Token> {
        self.params.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

impl fmt::Display for EmittedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => {
                write!(f, "{}@{:?}(", name, self.address)?;
                for (i, (k, v)) in self.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}=", k)?;
                    write_token(f, v)?;
                }
                write!(f, ")")
            }
            None => write!(f, "<unknown>@{:?} topics={:?}", self.address, self.topics),
        }
    }
}

/// Like `Token`'s own `Display`, but integers in decimal.
fn write_token(f: &mut fmt::Formatter<'_>, token: &Token) -> fmt::Result {
    match token {
        Token::Uint(v) => write!(f, "{}", v),
        Token::Int(v) if v.bit(255) => write!(f, "-{}", (!*v).overflowing_add(U256::one()).0),
        Token::Int(v) => write!(f, "{}", v),
        Token::Tuple(items) | Token::Array(items) | Token::FixedArray(items) => {
            let (open, close) = match token {
                Token::Tuple(_) => ("(", ")"),
                _ => ("[", "]"),
            };
            write!(f, "{}", open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write_token(f, item)?;
            }
            write!(f, "{}", close)
        }
        other => write!(f, "{}", other),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TxReceipt {
    pub transaction_hash: H256,
    pub events: Vec<EmittedEvent>,
}

impl TxReceipt {
    pub fn find_event(&self, name: &str) -> Option<&EmittedEvent> {
        self.events.iter().find(|e| e.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTaskEvent {
    pub task_index: U256,
    pub name: String,
}

/// Payload of the delegation manager's `registerAsOperator`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorDetails {
    pub earnings_receiver: Address,
    pub delegation_approver: Address,
    pub staker_opt_out_window_blocks: u32,
}

impl OperatorDetails {
    pub fn into_token(self) -> Token {
        Token::Tuple(vec![
            Token::Address(self.earnings_receiver),
            Token::Address(self.delegation_approver),
            Token::Uint(self.staker_opt_out_window_blocks.into()),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureWithSaltAndExpiry {
    pub signature: Vec<u8>,
    pub salt: [u8; 32],
    pub expiry: U256,
}

impl SignatureWithSaltAndExpiry {
    pub fn into_token(self) -> Token {
        Token::Tuple(vec![
            Token::Bytes(self.signature),
            Token::FixedBytes(self.salt.to_vec()),
            Token::Uint(self.expiry),
        ])
    }
}

#[async_trait]
pub trait TaskService: Send + Sync {
    /// Service manager address.
    fn address(&self) -> Address;

    async fn create_new_task(&self, params: &TaskParams) -> Result<TxReceipt>;

    async fn donate_to_task(&self, task_index: U256, amount: U256) -> Result<TxReceipt>;

    async fn new_task_events(&self) -> Result<BoxStream<'static, Result<NewTaskEvent>>>;
}

#[async_trait]
pub trait OperatorRegistry: Send + Sync {
    /// Address of the signing key.
    fn operator(&self) -> Address;

    async fn is_operator(&self, operator: Address) -> Result<bool>;

    async fn register_as_operator(&self, details: OperatorDetails, metadata_uri: &str) -> Result<TxReceipt>;

    async fn calculate_registration_digest(
        &self,
        operator: Address,
        service_manager: Address,
        salt: [u8; 32],
        expiry: U256,
    ) -> Result<H256>;

    /// Raw secp256k1 signature over a 32-byte digest, `r || s || v`.
    fn sign_digest(&self, digest: H256) -> Result<Vec<u8>>;

    async fn register_operator_with_signature(
        &self,
        signature: SignatureWithSaltAndExpiry,
        operator: Address,
    ) -> Result<TxReceipt>;
}

use web3::types::{H256, U256};

use crate::utils::handle_error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("chain id check failed: expected {expected}, node reports {actual}")]
    CheckChainErr { expected: u64, actual: U256 },

    #[error("missing `{0}` in deployment file {1}")]
    MissingAddress(String, String),

    #[error("invalid private key: {0}")]
    InvalidKey(String),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("Abi error: {0}")]
    Abi(#[from] web3::ethabi::Error),

    #[error("contract error: {0}")]
    Contract(String),

    #[error("Api error: {0}")]
    Api(#[from] web3::Error),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("transaction {0:?} reverted")]
    TxReverted(H256),

    #[error("transaction {0:?} not confirmed in time")]
    ConfirmationTimeout(H256),

    #[error("unexpected output: {0}")]
    InvalidOutput(String),

    #[error("event subscription closed")]
    SubscriptionClosed,

    #[error("Io error {0}")]
    Io(#[from] std::io::Error),

    #[error("json error {0}")]
    Json(#[from] serde_json::Error),
}

impl From<web3::contract::Error> for Error {
    fn from(e: web3::contract::Error) -> Self {
        Error::Contract(handle_error(e))
    }
}

impl From<web3::signing::SigningError> for Error {
    fn from(e: web3::signing::SigningError) -> Self {
        Error::Signing(format!("{:?}", e))
    }
}

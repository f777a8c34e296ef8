use alloy::primitives::Address;
use thiserror::Error;

/// Problems with the run's inputs. These are the only errors that stop the
/// process with a non-zero exit code.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("wallet file not found at {0}")]
    WalletFileMissing(String),

    #[error("error loading wallet file {path}: {reason}")]
    WalletFileUnreadable { path: String, reason: String },

    #[error("wallet file does not contain a valid 'wallets' array")]
    WalletListMissing,

    #[error("invalid number {0:?}, please enter a positive number")]
    InvalidTransactionCount(String),

    #[error("invalid network config {path}: {reason}")]
    NetworkFile { path: String, reason: String },

    #[error("at least one rpc endpoint is required")]
    NoRpcEndpoints,

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Why a wallet entry was skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing privatekey")]
    MissingKey,

    #[error("privatekey must start with '0x'")]
    MissingPrefix,

    #[error("privatekey is not a valid 64-character hexadecimal string")]
    MalformedKey,

    #[error("privatekey is not a valid secp256k1 secret key")]
    InvalidScalar,
}

/// Failures of a single chain call.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The endpoint could not be reached or timed out.
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The node rejected the transaction or it reverted once mined.
    #[error("transaction failed: {reason}")]
    Transaction { reason: String },
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("indexer request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("indexer returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("indexer returned errors: {0}")]
    GraphQl(String),
}

/// Reasons a wallet's pipeline ends early.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0} has no token balance, fund the wallet first")]
    Funds(Address),

    #[error("approve failed: {0}")]
    Approval(ChainError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// The operator asked to stop.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("run cancelled")]
pub struct Cancelled;

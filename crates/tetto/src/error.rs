use thiserror::Error;

/// Errors returned by Tetto SDK operations.
///
/// The SDK fails fast and surfaces server error strings verbatim. The one
/// deliberate exception is the associated-account existence lookup, which
/// swallows RPC failures and falls back to idempotent account creation
/// (see [`crate::ata`]).
#[derive(Debug, Error)]
pub enum TettoError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid wallet: {0}")]
    InvalidWallet(String),

    #[error("unknown token/network combination: {0}")]
    UnknownMint(String),

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("signing rejected: {0}")]
    SigningRejected(String),

    #[error("call failed: {0}")]
    CallFailed(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error("transaction error: {0}")]
    TransactionError(String),

    #[error("rpc error: {0}")]
    RpcError(String),

    #[error("http error: {0}")]
    HttpError(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

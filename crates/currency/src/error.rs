//! Currency error types.

use thiserror::Error;

/// Errors raised while building, broadcasting or confirming a funding
/// transaction.
#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("RPC transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed RPC response: {0}")]
    BadResponse(String),

    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },

    #[error("transaction {tx_hash} not mined within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("transaction {tx_hash} was broadcast but not confirmed: {source}")]
    Unconfirmed {
        tx_hash: String,
        #[source]
        source: Box<CurrencyError>,
    },

    #[error(transparent)]
    Signer(#[from] irys_signer::SignerError),
}

impl CurrencyError {
    /// Hash of a transaction that reached the chain before the failure.
    ///
    /// When this is `Some`, funds may already have moved: confirm the hash
    /// with the node instead of funding again.
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::Reverted { tx_hash }
            | Self::ConfirmationTimeout { tx_hash, .. }
            | Self::Unconfirmed { tx_hash, .. } => Some(tx_hash),
            _ => None,
        }
    }
}

/// Result type for currency operations.
pub type CurrencyResult<T> = std::result::Result<T, CurrencyError>;

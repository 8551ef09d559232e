//! Client error types.

use irys_currency::CurrencyError;
use irys_signer::SignerError;
use thiserror::Error;

/// Errors returned by client operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("network error calling {endpoint}: {source}")]
    Network {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("bad response from {endpoint}: {message}")]
    BadResponse { endpoint: String, message: String },

    #[error("unexpected status {status} from {endpoint}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("currency {0} is not supported by the node")]
    InvalidCurrency(String),

    #[error("insufficient balance for {endpoint}: {body}")]
    InsufficientBalance { endpoint: String, body: String },

    #[error("funding transaction failed: {0}")]
    FundingFailed(#[source] CurrencyError),

    #[error("funding transaction {tx_id} was broadcast but not confirmed: {source}")]
    FundingUnconfirmed {
        tx_id: String,
        #[source]
        source: CurrencyError,
    },

    #[error("node rejected funding confirmation for {tx_id} (status {status}): {body}")]
    ConfirmationFailed {
        tx_id: String,
        status: u16,
        body: String,
    },

    #[error("signing failed: {0}")]
    SigningFailed(#[from] SignerError),

    #[error("chunked upload size {size} is outside [{min}, {max}]")]
    SizeOutOfRange { size: u64, min: u64, max: u64 },

    #[error("chunk session {0} has expired")]
    SessionExpired(String),

    #[error("chunk at offset {offset} of session {session_id} failed: {source}")]
    ChunkUploadFailed {
        session_id: String,
        offset: u64,
        #[source]
        source: Box<Error>,
    },

    #[error("chunk session error: {0}")]
    Session(irys_core::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("client is closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a retry of the same request may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { source, .. } => source.is_connect() || source.is_timeout(),
            Self::Status { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    /// Chain hash of a funding transaction that was broadcast before the
    /// failure. Confirm it instead of funding again.
    pub fn funding_tx(&self) -> Option<&str> {
        match self {
            Self::FundingUnconfirmed { tx_id, .. } | Self::ConfirmationFailed { tx_id, .. } => {
                Some(tx_id)
            }
            _ => None,
        }
    }

    pub(crate) fn network(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn bad_response(endpoint: impl Into<String>, message: impl ToString) -> Self {
        Self::BadResponse {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }
}

impl From<CurrencyError> for Error {
    fn from(err: CurrencyError) -> Self {
        match err.tx_hash().map(str::to_owned) {
            Some(tx_id) => Self::FundingUnconfirmed { tx_id, source: err },
            None => Self::FundingFailed(err),
        }
    }
}

impl From<irys_core::Error> for Error {
    fn from(err: irys_core::Error) -> Self {
        match err {
            irys_core::Error::SessionExpired(id) => Self::SessionExpired(id),
            irys_core::Error::Config(message) => Self::Config(message),
            other => Self::Session(other),
        }
    }
}

/// 429 and 5xx except 501.
pub(crate) fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status != 501)
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

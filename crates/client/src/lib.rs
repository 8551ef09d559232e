//! Funded upload orchestrator for the Irys storage network.
//!
//! A [`Client`] quotes prices, keeps the caller's prepaid balance topped up,
//! signs payloads as data items and uploads them either in one request or
//! through a resumable chunk session. It also retrieves stored payloads,
//! metadata and receipts.

mod api;
pub mod chunked;
pub mod client;
pub mod error;
pub mod funding;
pub mod oracle;
pub mod retrieval;
pub mod transport;
pub mod upload;

pub use api::NodeInfo;
pub use chunked::ChunkUploadRequest;
pub use client::{Client, ClientBuilder};
pub use error::{Error, Result};
pub use funding::FundingOutcome;
pub use retrieval::File;
pub use transport::{BackoffPolicy, HttpTransport, ReqwestTransport, RetryTransport};
pub use upload::UploadRequest;

pub use irys_core::{ClientConfig, Receipt, SessionId, Tag, Transaction, U256};
pub use tokio_util::sync::CancellationToken;

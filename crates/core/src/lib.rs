//! Core domain types and the data item codec for the Irys upload client.
//!
//! This crate defines the canonical data model used across all other crates:
//! - Tags and their Avro encoding
//! - Unsigned data items and their canonical byte layout
//! - Deep hashing of the fields covered by a signature
//! - Signed transactions, receipts and node transaction metadata
//! - Chunk spans and the resumable chunk session lifecycle
//! - Client configuration

pub mod chunk;
pub mod config;
pub mod data_item;
pub mod deep_hash;
pub mod error;
pub mod hash;
pub mod tag;
pub mod transaction;
pub mod upload;

pub use alloy_primitives::U256;
pub use chunk::{ChunkSpan, split_spans};
pub use config::{ChunkingConfig, ClientConfig, Node, RetryConfig};
pub use data_item::{DataItem, SignatureType};
pub use error::{Error, Result};
pub use hash::{ContentHash, TxId};
pub use tag::Tag;
pub use transaction::{Receipt, SignedTransaction, Transaction, TransactionTag};
pub use upload::{ChunkSession, SessionId, SessionState};

/// Smallest payload accepted by a chunked upload: 500 KiB.
pub const MIN_CHUNKED_UPLOAD_SIZE: u64 = 500 * 1024;

/// Largest payload accepted by a chunked upload: 95 MiB.
pub const MAX_CHUNKED_UPLOAD_SIZE: u64 = 95 * 1024 * 1024;

/// Inactivity window after which the node drops a chunk session: 30 minutes.
pub const CHUNK_SESSION_TIMEOUT: time::Duration = time::Duration::minutes(30);

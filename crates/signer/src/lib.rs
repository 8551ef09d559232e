//! Data item signers for the Irys upload client.
//!
//! This crate provides:
//! - The [`Signer`] trait used by currencies and the upload path
//! - Ethereum (secp256k1, EIP-191) and Ed25519 signers
//! - Data item signing and signature verification

pub mod ed25519;
pub mod error;
pub mod ethereum;
pub mod signer;

pub use ed25519::Ed25519Signer;
pub use error::{SignerError, SignerResult};
pub use ethereum::EthereumSigner;
pub use signer::{Signer, sign_data_item, verify, verify_transaction};

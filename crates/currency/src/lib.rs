//! Currency providers for the Irys upload client.
//!
//! A currency owns the signer used for data items and knows how to move
//! funds on its chain to the node's custodial address.

pub mod currency;
pub mod error;
pub mod matic;
pub mod rpc;
pub mod tx;

pub use currency::Currency;
pub use error::{CurrencyError, CurrencyResult};
pub use matic::Matic;
pub use rpc::EvmRpc;

//! The currency abstraction consumed by the client.

use crate::error::CurrencyResult;
use async_trait::async_trait;
use irys_core::U256;
use irys_signer::Signer;

/// A payment currency accepted by the node.
#[async_trait]
pub trait Currency: Send + Sync {
    /// Name as the node knows it, used in URL paths (e.g., "matic").
    fn name(&self) -> &str;

    /// Signer for data items paid with this currency.
    fn signer(&self) -> &dyn Signer;

    /// Account address whose node balance pays for uploads.
    fn address(&self) -> String;

    /// Create, sign and broadcast a transfer of `amount` (smallest unit) to
    /// `to`, returning the chain transaction hash once it is mined.
    async fn create_funding_tx(&self, to: &str, amount: U256) -> CurrencyResult<String>;
}

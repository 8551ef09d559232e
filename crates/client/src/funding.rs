//! Balance top-ups.
//!
//! The chain broadcast happens at most once per call. Only the confirmation
//! to the node goes through the retrying transport.

use crate::api::FundingConfirmation;
use crate::client::{Client, debug_msg, read_body};
use crate::error::{Error, Result};
use irys_core::U256;
use reqwest::Method;

/// What [`Client::ensure_funded`] had to do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FundingOutcome {
    /// The balance already covered the price.
    AlreadyFunded { balance: U256 },
    /// A funding transaction was broadcast and confirmed with the node.
    ToppedUp { tx_id: String, amount: U256 },
}

impl FundingOutcome {
    pub fn funding_tx(&self) -> Option<&str> {
        match self {
            Self::AlreadyFunded { .. } => None,
            Self::ToppedUp { tx_id, .. } => Some(tx_id),
        }
    }
}

impl Client {
    /// Make sure the balance covers `price`, topping up by exactly `price`
    /// when it does not.
    pub async fn ensure_funded(&self, price: U256) -> Result<FundingOutcome> {
        self.scoped(async {
            let balance = self.get_balance().await?;
            if balance >= price {
                debug_msg!(self, balance = %balance, price = %price, "Balance covers price");
                return Ok(FundingOutcome::AlreadyFunded { balance });
            }
            let tx_id = self.top_up_balance(price).await?;
            Ok(FundingOutcome::ToppedUp {
                tx_id,
                amount: price,
            })
        })
        .await
    }

    /// Send `amount` to the node's custodial address and register the
    /// transaction with the node. Returns the chain transaction hash.
    pub async fn top_up_balance(&self, amount: U256) -> Result<String> {
        self.scoped(async {
            if self.is_closed() {
                return Err(Error::Closed);
            }
            let tx_id = self
                .currency()
                .create_funding_tx(self.custodial_address(), amount)
                .await?;
            tracing::info!(
                tx_id = %tx_id,
                amount = %amount,
                to = %self.custodial_address(),
                "Funding transaction created"
            );

            let currency = self.currency().name();
            let endpoint = self.node_endpoint(&format!("account/balance/{currency}"));
            let request = self.json_request(
                Method::POST,
                &endpoint,
                &FundingConfirmation { tx_id: &tx_id },
            )?;
            let response = self.send(request).await?;
            let (status, body) = read_body(&endpoint, response).await?;
            if !status.is_success() {
                return Err(Error::ConfirmationFailed {
                    tx_id,
                    status: status.as_u16(),
                    body,
                });
            }
            debug_msg!(self, tx_id = %tx_id, "Node confirmed funding transaction");
            Ok(tx_id)
        })
        .await
    }
}

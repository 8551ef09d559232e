//! Price and balance queries. Every call is a fresh round trip.

use crate::api::{BalanceResponse, parse_amount};
use crate::client::{Client, debug_msg, status_error};
use crate::error::{Error, Result};
use irys_core::U256;
use reqwest::{Method, StatusCode};

impl Client {
    /// Cost of storing `size` bytes, in the currency's smallest unit.
    pub async fn get_price(&self, size: u64) -> Result<U256> {
        self.scoped(async {
            let currency = self.currency().name();
            let endpoint = self.node_endpoint(&format!("price/{currency}/{size}"));
            let (status, body) = self.send_text(self.request(Method::GET, &endpoint)?).await?;
            if !status.is_success() {
                return Err(self.currency_status_error(&endpoint, status, body));
            }
            let price = parse_amount(&body)
                .ok_or_else(|| Error::bad_response(&endpoint, format!("invalid price: {body}")))?;
            debug_msg!(self, size, price = %price, "Fetched price");
            Ok(price)
        })
        .await
    }

    /// Prepaid balance of the currency's own address.
    pub async fn get_balance(&self) -> Result<U256> {
        let address = self.currency().address();
        self.get_balance_of(&address).await
    }

    /// Prepaid balance of any address.
    pub async fn get_balance_of(&self, address: &str) -> Result<U256> {
        self.scoped(async {
            let currency = self.currency().name();
            let endpoint = self.node_endpoint(&format!("account/balance/{currency}"));
            let mut request = self.request(Method::GET, &endpoint)?;
            request
                .url_mut()
                .query_pairs_mut()
                .append_pair("address", address);
            let (status, body) = self.send_text(request).await?;
            if !status.is_success() {
                return Err(self.currency_status_error(&endpoint, status, body));
            }
            let response: BalanceResponse =
                serde_json::from_str(&body).map_err(|e| Error::bad_response(&endpoint, e))?;
            debug_msg!(self, address, balance = %response.balance, "Fetched balance");
            Ok(response.balance)
        })
        .await
    }

    /// The node answers 400/404 for currencies it does not know.
    fn currency_status_error(&self, endpoint: &str, status: StatusCode, body: String) -> Error {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                Error::InvalidCurrency(self.currency().name().to_string())
            }
            _ => status_error(endpoint, status, body),
        }
    }
}

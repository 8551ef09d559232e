//! Polygon (Matic) currency.

use crate::currency::Currency;
use crate::error::{CurrencyError, CurrencyResult};
use crate::rpc::EvmRpc;
use crate::tx::{LegacyTransfer, TRANSFER_GAS};
use alloy_primitives::Address;
use async_trait::async_trait;
use irys_core::U256;
use irys_signer::{EthereumSigner, Signer};
use std::str::FromStr;
use std::time::Duration;

/// Default public Polygon RPC endpoint.
pub const DEFAULT_RPC_URL: &str = "https://polygon-rpc.com";

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Matic on Polygon, paid with an Ethereum-style key.
#[derive(Debug)]
pub struct Matic {
    signer: EthereumSigner,
    rpc: EvmRpc,
    confirmation_timeout: Duration,
    poll_interval: Duration,
}

impl Matic {
    pub fn new(signer: EthereumSigner, rpc: EvmRpc, confirmation_timeout: Duration) -> Self {
        Self {
            signer,
            rpc,
            confirmation_timeout,
            poll_interval: RECEIPT_POLL_INTERVAL,
        }
    }

    /// Build from a hex private key and an RPC URL.
    pub fn from_private_key(
        private_key: &str,
        rpc_url: &str,
        confirmation_timeout: Duration,
    ) -> CurrencyResult<Self> {
        let signer = EthereumSigner::from_hex(private_key)?;
        let rpc = EvmRpc::new(rpc_url, confirmation_timeout)?;
        Ok(Self::new(signer, rpc, confirmation_timeout))
    }

    /// Override how often the receipt is polled while waiting for a transfer.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[async_trait]
impl Currency for Matic {
    fn name(&self) -> &str {
        "matic"
    }

    fn signer(&self) -> &dyn Signer {
        &self.signer
    }

    fn address(&self) -> String {
        self.signer.address().to_string()
    }

    async fn create_funding_tx(&self, to: &str, amount: U256) -> CurrencyResult<String> {
        let to = Address::from_str(to)
            .map_err(|e| CurrencyError::InvalidAddress(format!("{to}: {e}")))?;
        let from = self.address();

        let chain_id = self.rpc.chain_id().await?;
        let nonce = self.rpc.nonce(&from).await?;
        let gas_price = self.rpc.gas_price().await?;

        let transfer = LegacyTransfer {
            chain_id,
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS,
            to,
            value: amount,
        };
        let signature = self.signer.sign_hash(&transfer.signing_hash().0)?;
        let raw = transfer.encode_signed(&signature);

        let tx_hash = self.rpc.send_raw_transaction(&raw).await?;
        tracing::info!(
            tx_hash = %tx_hash,
            to = %to,
            amount = %amount,
            chain_id,
            nonce,
            "Broadcast funding transaction"
        );

        let receipt = self
            .rpc
            .wait_for_receipt(&tx_hash, self.confirmation_timeout, self.poll_interval)
            .await
            .map_err(|source| match source {
                CurrencyError::Reverted { .. } | CurrencyError::ConfirmationTimeout { .. } => {
                    source
                }
                source => CurrencyError::Unconfirmed {
                    tx_hash: tx_hash.clone(),
                    source: Box::new(source),
                },
            })?;
        tracing::debug!(
            tx_hash = %tx_hash,
            block = ?receipt.block_number,
            "Funding transaction mined"
        );

        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use serde_json::json;
    use std::net::TcpListener;

    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const NODE_ADDRESS: &str = "0x853758425e953739F5438fd6fd0Efe04A477b039";

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn rpc_result(result: serde_json::Value) -> serde_json::Value {
        json!({ "jsonrpc": "2.0", "id": 1, "result": result })
    }

    fn mock_prelude(server: &MockServer) {
        server.mock(|when, then| {
            when.method(POST).path("/").body_contains("eth_chainId");
            then.status(200).json_body(rpc_result(json!("0x89")));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_getTransactionCount");
            then.status(200).json_body(rpc_result(json!("0x5")));
        });
        server.mock(|when, then| {
            when.method(POST).path("/").body_contains("eth_gasPrice");
            then.status(200).json_body(rpc_result(json!("0x6fc23ac00")));
        });
    }

    fn mock_broadcast<'a>(server: &'a MockServer, hash: &str) -> httpmock::Mock<'a> {
        let hash = hash.to_string();
        server.mock(move |when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_sendRawTransaction");
            then.status(200).json_body(rpc_result(json!(hash)));
        })
    }

    #[test]
    fn test_identity() {
        let matic = Matic::from_private_key(DEV_KEY, "http://127.0.0.1:1", Duration::from_secs(1))
            .unwrap();
        assert_eq!(matic.name(), "matic");
        assert_eq!(matic.address(), "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
        assert_eq!(matic.signer().public_key().len(), 65);
    }

    #[tokio::test]
    async fn test_create_funding_tx_broadcasts_and_waits() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start();
        mock_prelude(&server);
        let broadcast = mock_broadcast(&server, "0xfeed");
        let receipt = server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_getTransactionReceipt")
                .body_contains("0xfeed");
            then.status(200).json_body(rpc_result(json!({
                "transactionHash": "0xfeed",
                "blockNumber": "0x100",
                "status": "0x1"
            })));
        });

        let matic = Matic::from_private_key(DEV_KEY, &server.url("/"), Duration::from_secs(5))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));

        let hash = matic
            .create_funding_tx(NODE_ADDRESS, U256::from(1_000u64))
            .await
            .unwrap();

        assert_eq!(hash, "0xfeed");
        broadcast.assert_hits(1);
        receipt.assert_hits(1);
    }

    #[tokio::test]
    async fn test_failed_receipt_poll_keeps_broadcast_hash() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start();
        mock_prelude(&server);
        let broadcast = mock_broadcast(&server, "0xfeedbeef");
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_getTransactionReceipt");
            then.status(502).body("bad gateway");
        });

        let matic = Matic::from_private_key(DEV_KEY, &server.url("/"), Duration::from_secs(5))
            .unwrap()
            .with_poll_interval(Duration::from_millis(10));

        let err = matic
            .create_funding_tx(NODE_ADDRESS, U256::from(1_000u64))
            .await
            .unwrap_err();

        assert_eq!(err.tx_hash(), Some("0xfeedbeef"));
        match err {
            CurrencyError::Unconfirmed { tx_hash, source } => {
                assert_eq!(tx_hash, "0xfeedbeef");
                assert!(matches!(*source, CurrencyError::BadResponse(_)), "{source:?}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        broadcast.assert_hits(1);
    }

    #[test]
    fn test_tx_hash_only_after_broadcast() {
        assert_eq!(CurrencyError::BadResponse("x".into()).tx_hash(), None);
        assert_eq!(
            CurrencyError::Reverted {
                tx_hash: "0xab".into()
            }
            .tx_hash(),
            Some("0xab")
        );
    }

    #[tokio::test]
    async fn test_invalid_destination_is_rejected_before_rpc() {
        let matic = Matic::from_private_key(DEV_KEY, "http://127.0.0.1:1", Duration::from_secs(1))
            .unwrap();
        let result = matic.create_funding_tx("not-an-address", U256::from(1u8)).await;
        assert!(matches!(result, Err(CurrencyError::InvalidAddress(_))));
    }
}

#![allow(dead_code)] // Each test binary uses a different subset

use async_trait::async_trait;
use httpmock::Method::GET;
use httpmock::{Mock, MockServer};
use irys_client::{Client, ClientConfig, U256};
use irys_currency::{Currency, CurrencyError, CurrencyResult};
use irys_signer::{Ed25519Signer, Signer};
use serde_json::json;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

pub const CUSTODIAL_ADDRESS: &str = "0x853758425e953739F5438fd6fd0Efe04A477b039";
pub const PAYER_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
pub const FUNDING_TX: &str = "0xfunding";

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Currency backed by an Ed25519 key that records funding calls instead of
/// touching a chain.
pub struct FakeCurrency {
    signer: Ed25519Signer,
    funding_calls: Mutex<Vec<(String, U256)>>,
    failure: Option<FundingFailure>,
}

#[derive(Clone, Copy)]
enum FundingFailure {
    /// Rejected before anything was broadcast.
    Rejected,
    /// Broadcast as [`FUNDING_TX`], then the receipt poll failed.
    Unconfirmed,
}

impl FakeCurrency {
    fn with_failure(failure: Option<FundingFailure>) -> Arc<Self> {
        Arc::new(Self {
            signer: Ed25519Signer::generate(),
            funding_calls: Mutex::new(Vec::new()),
            failure,
        })
    }

    pub fn new() -> Arc<Self> {
        Self::with_failure(None)
    }

    pub fn failing() -> Arc<Self> {
        Self::with_failure(Some(FundingFailure::Rejected))
    }

    pub fn unconfirmed() -> Arc<Self> {
        Self::with_failure(Some(FundingFailure::Unconfirmed))
    }

    pub fn funding_calls(&self) -> Vec<(String, U256)> {
        self.funding_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Currency for FakeCurrency {
    fn name(&self) -> &str {
        "matic"
    }

    fn signer(&self) -> &dyn Signer {
        &self.signer
    }

    fn address(&self) -> String {
        PAYER_ADDRESS.to_string()
    }

    async fn create_funding_tx(&self, to: &str, amount: U256) -> CurrencyResult<String> {
        self.funding_calls
            .lock()
            .unwrap()
            .push((to.to_string(), amount));
        match self.failure {
            None => Ok(FUNDING_TX.to_string()),
            Some(FundingFailure::Rejected) => Err(CurrencyError::Rpc {
                code: -32000,
                message: "insufficient funds for gas".to_string(),
            }),
            Some(FundingFailure::Unconfirmed) => Err(CurrencyError::Unconfirmed {
                tx_hash: FUNDING_TX.to_string(),
                source: Box::new(CurrencyError::BadResponse(
                    "eth_getTransactionReceipt returned HTTP 502 Bad Gateway".to_string(),
                )),
            }),
        }
    }
}

/// Config pointing node and gateway at the mock server, with fast retries.
pub fn test_config(server: &MockServer) -> ClientConfig {
    let mut config = ClientConfig::for_node(server.base_url());
    config.gateway = server.base_url();
    config.debug = true;
    config.request_timeout_secs = 10;
    config.retry.max_retries = 2;
    config.retry.wait_min_ms = 10;
    config.retry.wait_max_ms = 20;
    config
}

pub fn mock_node_info(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/");
        then.status(200).json_body(json!({
            "version": "0.2.0",
            "gateway": "gateway.irys.xyz",
            "addresses": {
                "matic": CUSTODIAL_ADDRESS,
                "solana": "DHyDV2ZjN3rB6qNGXS48dP5onfbZd3fAEz6C5HJwSqRD"
            }
        }));
    })
}

pub async fn connect(server: &MockServer, currency: Arc<FakeCurrency>) -> Client {
    mock_node_info(server);
    Client::connect(test_config(server), currency).await.unwrap()
}

pub fn transaction_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "timestamp": 1700000000000u64,
        "version": "1.0.0",
        "public": "owner",
        "signature": "sig",
        "deadlineHeight": 1234,
        "block": 1200,
        "validatorSignatures": []
    })
}

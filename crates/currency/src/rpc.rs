//! Minimal Ethereum JSON-RPC client for funding transfers.
//!
//! Requests are sent once. A broadcast that failed in transit may still have
//! reached the mempool, so nothing here retries.

use crate::error::{CurrencyError, CurrencyResult};
use alloy_primitives::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// JSON-RPC client bound to one endpoint.
#[derive(Debug)]
pub struct EvmRpc {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// The subset of a transaction receipt needed to confirm a transfer.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: Option<String>,
    /// `0x1` on success, `0x0` when reverted.
    pub status: Option<String>,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref().is_none_or(|s| s == "0x1")
    }
}

impl EvmRpc {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CurrencyResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> CurrencyResult<Option<T>> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let response = self.http.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CurrencyError::BadResponse(format!(
                "{method} returned HTTP {status}: {body}"
            )));
        }
        let parsed: RpcResponse<T> = serde_json::from_str(&body)
            .map_err(|e| CurrencyError::BadResponse(format!("{method}: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(CurrencyError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(parsed.result)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> CurrencyResult<T> {
        self.call(method, params)
            .await?
            .ok_or_else(|| CurrencyError::BadResponse(format!("{method}: missing result")))
    }

    pub async fn chain_id(&self) -> CurrencyResult<u64> {
        let raw: String = self.call_required("eth_chainId", json!([])).await?;
        parse_quantity_u64(&raw)
    }

    /// Pending nonce for `address`.
    pub async fn nonce(&self, address: &str) -> CurrencyResult<u64> {
        let raw: String = self
            .call_required("eth_getTransactionCount", json!([address, "pending"]))
            .await?;
        parse_quantity_u64(&raw)
    }

    pub async fn gas_price(&self) -> CurrencyResult<U256> {
        let raw: String = self.call_required("eth_gasPrice", json!([])).await?;
        parse_quantity(&raw)
    }

    /// Broadcast a signed transaction and return its hash.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> CurrencyResult<String> {
        let encoded = format!("0x{}", hex::encode(raw));
        self.call_required("eth_sendRawTransaction", json!([encoded])).await
    }

    /// Receipt for `tx_hash`, or `None` while it is still pending.
    pub async fn transaction_receipt(
        &self,
        tx_hash: &str,
    ) -> CurrencyResult<Option<TransactionReceipt>> {
        self.call("eth_getTransactionReceipt", json!([tx_hash])).await
    }

    /// Poll until `tx_hash` is mined, failing if it reverted or `timeout`
    /// elapses first.
    pub async fn wait_for_receipt(
        &self,
        tx_hash: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> CurrencyResult<TransactionReceipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(receipt) = self.transaction_receipt(tx_hash).await? {
                if !receipt.succeeded() {
                    return Err(CurrencyError::Reverted {
                        tx_hash: tx_hash.to_string(),
                    });
                }
                return Ok(receipt);
            }
            if tokio::time::Instant::now() + poll_interval > deadline {
                return Err(CurrencyError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: timeout.as_secs(),
                });
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

fn parse_quantity(raw: &str) -> CurrencyResult<U256> {
    U256::from_str(raw)
        .map_err(|e| CurrencyError::BadResponse(format!("invalid quantity {raw}: {e}")))
}

fn parse_quantity_u64(raw: &str) -> CurrencyResult<u64> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u64::from_str_radix(digits, 16)
        .map_err(|e| CurrencyError::BadResponse(format!("invalid quantity {raw}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;
    use std::net::TcpListener;

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[test]
    fn test_parse_quantities() {
        assert_eq!(parse_quantity_u64("0x89").unwrap(), 137);
        assert_eq!(parse_quantity("0x3b9aca00").unwrap(), U256::from(1_000_000_000u64));
        assert!(parse_quantity_u64("0xzz").is_err());
    }

    #[tokio::test]
    async fn test_chain_id_and_rpc_error() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/").body_contains("eth_chainId");
            then.status(200)
                .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x89" }));
        });
        server.mock(|when, then| {
            when.method(POST).path("/").body_contains("eth_gasPrice");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 2,
                "error": { "code": -32000, "message": "boom" }
            }));
        });

        let rpc = EvmRpc::new(server.url("/"), Duration::from_secs(5)).unwrap();
        assert_eq!(rpc.chain_id().await.unwrap(), 137);
        assert!(matches!(
            rpc.gas_price().await,
            Err(CurrencyError::Rpc { code: -32000, .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_body_is_transport_error() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        if !can_bind_localhost() {
            eprintln!("Skipping socket tests: cannot bind to localhost");
            return;
        }

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let node = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !String::from_utf8_lossy(&request).contains("eth_chainId") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            // Promise more bytes than are sent, then hang up.
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 256\r\n\r\n{\"jsonrpc\":")
                .await
                .unwrap();
            socket.shutdown().await.unwrap();
        });

        let rpc = EvmRpc::new(format!("http://{addr}/"), Duration::from_secs(5)).unwrap();
        let err = rpc.chain_id().await.unwrap_err();
        assert!(matches!(err, CurrencyError::Transport(_)), "{err:?}");
        node.await.unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_receipt_reports_revert() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_getTransactionReceipt");
            then.status(200).json_body(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "transactionHash": "0xabc", "blockNumber": "0x10", "status": "0x0" }
            }));
        });

        let rpc = EvmRpc::new(server.url("/"), Duration::from_secs(5)).unwrap();
        let result = rpc
            .wait_for_receipt("0xabc", Duration::from_secs(1), Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(CurrencyError::Reverted { .. })));
    }

    #[tokio::test]
    async fn test_wait_for_receipt_times_out_while_pending() {
        if !can_bind_localhost() {
            eprintln!("Skipping httpmock tests: cannot bind to localhost");
            return;
        }

        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/")
                .body_contains("eth_getTransactionReceipt");
            then.status(200)
                .json_body(json!({ "jsonrpc": "2.0", "id": 1, "result": null }));
        });

        let rpc = EvmRpc::new(server.url("/"), Duration::from_secs(5)).unwrap();
        let result = rpc
            .wait_for_receipt("0xabc", Duration::from_millis(50), Duration::from_millis(20))
            .await;
        assert!(matches!(result, Err(CurrencyError::ConfirmationTimeout { .. })));
    }
}

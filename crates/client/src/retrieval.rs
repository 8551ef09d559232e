//! Downloads, transaction metadata and receipts.

use crate::api::{ReceiptResponse, receipt_query};
use crate::client::{Client, debug_msg, read_body, status_error};
use crate::error::{Error, Result};
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use irys_core::{Receipt, Transaction};
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use std::fmt;

/// A stored payload being streamed from the gateway.
///
/// The body is not buffered; dropping the file releases the connection.
pub struct File {
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
    pub content_type: Option<String>,
    data: BoxStream<'static, Result<Bytes>>,
}

impl File {
    /// The body as a stream of chunks.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        self.data
    }

    /// Read the whole body into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        let mut out = Vec::with_capacity(self.content_length.unwrap_or(0) as usize);
        let mut data = self.data;
        while let Some(chunk) = data.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }
}

impl fmt::Debug for File {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("File")
            .field("content_length", &self.content_length)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Stream a stored payload from the gateway.
    pub async fn download(&self, tx_id: &str) -> Result<File> {
        self.scoped(async {
            let endpoint = self.gateway_endpoint(tx_id);
            let response = self.send(self.request(Method::GET, &endpoint)?).await?;
            let status = response.status();
            if !status.is_success() {
                let (_, body) = read_body(&endpoint, response).await?;
                return Err(status_error(&endpoint, status, body));
            }

            let headers = response.headers().clone();
            let content_length = response.content_length();
            let content_type = headers
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            debug_msg!(
                self,
                tx_id,
                content_length = ?content_length,
                content_type = ?content_type,
                "Downloading"
            );

            let stream_endpoint = endpoint.clone();
            let data = response
                .bytes_stream()
                .map_err(move |e| Error::network(stream_endpoint.clone(), e))
                .boxed();
            Ok(File {
                headers,
                content_length,
                content_type,
                data,
            })
        })
        .await
    }

    /// Transaction metadata from the gateway.
    pub async fn get_metadata(&self, tx_id: &str) -> Result<Transaction> {
        self.scoped(async {
            let endpoint = self.gateway_endpoint(&format!("tx/{tx_id}"));
            self.send_json(self.request(Method::GET, &endpoint)?).await
        })
        .await
    }

    /// Proof-of-storage receipt from the node's GraphQL index.
    ///
    /// Returns an empty [`Receipt`] when nothing is indexed for `tx_id` yet.
    pub async fn get_receipt(&self, tx_id: &str) -> Result<Receipt> {
        self.scoped(async {
            let endpoint = self.node_endpoint("graphql");
            let request = self.json_request(Method::POST, &endpoint, &receipt_query(tx_id))?;
            let response: ReceiptResponse = self.send_json(request).await?;
            let receipt = response.into_receipt();
            if receipt.is_empty() {
                debug_msg!(self, tx_id, "No receipt indexed yet");
            }
            Ok(receipt)
        })
        .await
    }
}

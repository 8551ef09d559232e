//! Signing and single-request uploads.

use crate::client::{Client, debug_msg};
use crate::error::Result;
use bytes::Bytes;
use irys_core::{DataItem, SignedTransaction, Tag, Transaction};
use irys_signer::{SignerError, sign_data_item};
use reqwest::Method;

/// A payload and its tags, plus the optional target and anchor.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub data: Bytes,
    pub tags: Vec<Tag>,
    pub target: Option<[u8; 32]>,
    pub anchor: Option<[u8; 32]>,
}

impl UploadRequest {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn with_tag(mut self, name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags.extend(tags);
        self
    }
}

impl Client {
    /// Build and sign a data item with the currency's signer.
    pub fn sign(&self, request: UploadRequest) -> Result<SignedTransaction> {
        let signer = self.currency().signer();
        let mut item = DataItem::new(signer.signature_type(), signer.public_key(), request.data)
            .and_then(|item| item.with_tags(request.tags))
            .map_err(SignerError::from)?;
        if let Some(target) = request.target {
            item = item.with_target(target);
        }
        if let Some(anchor) = request.anchor {
            item = item.with_anchor(anchor);
        }
        let tx = sign_data_item(item, signer)?;
        debug_msg!(self, id = %tx.id(), size = tx.encoded_len(), "Signed data item");
        Ok(tx)
    }

    /// Sign and upload in one request without checking the balance.
    ///
    /// An unfunded account gets [`crate::Error::InsufficientBalance`].
    pub async fn upload(&self, request: UploadRequest) -> Result<Transaction> {
        self.scoped(async {
            let tx = self.sign(request)?;
            self.upload_signed(&tx).await
        })
        .await
    }

    /// Upload an already signed transaction in one request.
    pub async fn upload_signed(&self, tx: &SignedTransaction) -> Result<Transaction> {
        self.scoped(async {
            let currency = self.currency().name();
            let endpoint = self.node_endpoint(&format!("tx/{currency}"));
            let request = self.octet_request(Method::POST, &endpoint, Bytes::from(tx.to_bytes()))?;
            let transaction: Transaction = self.send_json(request).await?;
            tracing::info!(id = %transaction.id, size = tx.encoded_len(), "Uploaded transaction");
            Ok(transaction)
        })
        .await
    }

    /// Price the payload, top up if the balance falls short, then upload.
    pub async fn basic_upload(&self, request: UploadRequest) -> Result<Transaction> {
        self.scoped(async {
            let price = self.get_price(request.data.len() as u64).await?;
            let outcome = self.ensure_funded(price).await?;
            debug_msg!(self, price = %price, outcome = ?outcome, "Funding checked");
            self.upload(request).await
        })
        .await
    }
}

//! Signed transactions, node transaction metadata and receipts.

use crate::data_item::{DataItem, SignatureType};
use crate::hash::TxId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed data item ready for upload.
///
/// Created once by a signer and never mutated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    item: DataItem,
    signature: Vec<u8>,
    id: TxId,
}

impl SignedTransaction {
    /// Assemble a signed transaction from an item and its signature.
    ///
    /// Only checks the signature length; cryptographic verification lives
    /// with the signers.
    pub fn from_parts(item: DataItem, signature: Vec<u8>) -> crate::Result<Self> {
        let expected = item.signature_type().signature_len();
        if signature.len() != expected {
            return Err(crate::Error::InvalidDataItem(format!(
                "signature must be {expected} bytes, got {}",
                signature.len()
            )));
        }
        let id = TxId::from_signature(&signature);
        Ok(Self {
            item,
            signature,
            id,
        })
    }

    /// Parse the full binary form produced by [`SignedTransaction::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> crate::Result<Self> {
        if bytes.len() < 2 {
            return Err(crate::Error::InvalidDataItem(
                "missing signature type".to_string(),
            ));
        }
        let signature_type = SignatureType::from_u16(u16::from_le_bytes([bytes[0], bytes[1]]))?;
        let sig_end = 2 + signature_type.signature_len();
        if bytes.len() < sig_end {
            return Err(crate::Error::InvalidDataItem("truncated signature".to_string()));
        }
        let item = DataItem::decode(signature_type, &bytes[sig_end..])?;
        Self::from_parts(item, bytes[2..sig_end].to_vec())
    }

    /// Binary form: signature type (u16 LE), signature, unsigned layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let unsigned = self.item.encode();
        let mut out = Vec::with_capacity(2 + self.signature.len() + unsigned.len());
        out.extend_from_slice(&self.item.signature_type().as_u16().to_le_bytes());
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&unsigned);
        out
    }

    /// Size of the binary form in bytes.
    pub fn encoded_len(&self) -> usize {
        2 + self.signature.len() + self.item.encoded_len()
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn item(&self) -> &DataItem {
        &self.item
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("id", &self.id)
            .field("item", &self.item)
            .finish()
    }
}

/// A tag as reported in JSON by nodes and gateways.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionTag {
    pub name: String,
    pub value: String,
}

/// Transaction metadata returned by the node on upload or by the gateway.
///
/// Nodes and gateways populate different subsets, so every field is optional
/// or defaulted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transaction {
    pub id: String,
    pub timestamp: Option<u64>,
    pub version: Option<String>,
    pub public: Option<String>,
    pub signature: Option<String>,
    pub deadline_height: Option<u64>,
    pub block: Option<u64>,
    pub validator_signatures: Vec<ValidatorSignature>,
    pub currency: Option<String>,
    pub address: Option<String>,
    pub owner: Option<String>,
    pub target: Option<String>,
    pub anchor: Option<String>,
    pub tags: Vec<TransactionTag>,
    #[serde(alias = "data_size")]
    pub data_size: Option<u64>,
}

/// A validator's signature over an accepted transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSignature {
    pub address: String,
    pub signature: String,
}

/// Proof-of-storage receipt for an accepted transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Receipt {
    pub signature: String,
    pub timestamp: u64,
    pub version: String,
    pub deadline_height: u64,
}

impl Receipt {
    /// True for the empty receipt returned when no receipt is indexed yet.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

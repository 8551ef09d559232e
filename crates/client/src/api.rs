//! Node and gateway wire types.

use irys_core::{ChunkSpan, Receipt, U256};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Node root document.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    pub version: Option<String>,
    /// Custodial address per currency name.
    pub addresses: HashMap<String, String>,
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BalanceResponse {
    #[serde(deserialize_with = "deserialize_amount")]
    pub balance: U256,
}

#[derive(Debug, Serialize)]
pub(crate) struct FundingConfirmation<'a> {
    pub tx_id: &'a str,
}

/// Chunk session bounds returned when a session is created or resumed.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ChunkSessionInfo {
    pub id: String,
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub min: Option<u64>,
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub max: Option<u64>,
    /// Chunk size fixed for a resumed session.
    #[serde(default, deserialize_with = "deserialize_opt_u64")]
    pub size: Option<u64>,
    /// Already received `[offset, size]` pairs.
    #[serde(default)]
    pub chunks: Vec<[FlexU64; 2]>,
}

impl ChunkSessionInfo {
    pub fn received(&self) -> impl Iterator<Item = ChunkSpan> + '_ {
        self.chunks
            .iter()
            .map(|[offset, size]| ChunkSpan::new(offset.0, size.0))
    }
}

/// A `u64` sent either as a JSON number or a decimal string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FlexU64(pub u64);

impl<'de> Deserialize<'de> for FlexU64 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(Self(n)),
            Raw::Text(s) => s
                .trim()
                .parse()
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

fn deserialize_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    Ok(Option::<FlexU64>::deserialize(d)?.map(|v| v.0))
}

fn deserialize_amount<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
    let value = serde_json::Value::deserialize(d)?;
    let text = match &value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        other => {
            return Err(serde::de::Error::custom(format!(
                "expected an integer amount, got {other}"
            )));
        }
    };
    parse_amount(&text).ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {text}")))
}

/// Parse a non-negative decimal integer of any size, optionally quoted.
pub(crate) fn parse_amount(text: &str) -> Option<U256> {
    let text = text.trim().trim_matches('"');
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    U256::from_str(text).ok()
}

/// GraphQL query for a transaction's receipt.
pub(crate) fn receipt_query(tx_id: &str) -> serde_json::Value {
    serde_json::json!({
        "query": "query ($ids: [String!]) { transactions(ids: $ids) { edges { node { receipt { signature timestamp version deadlineHeight } } } } }",
        "variables": { "ids": [tx_id] }
    })
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptResponse {
    pub data: ReceiptData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptData {
    pub transactions: ReceiptConnection,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptConnection {
    #[serde(default)]
    pub edges: Vec<ReceiptEdge>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptEdge {
    pub node: ReceiptNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReceiptNode {
    pub receipt: Option<Receipt>,
}

impl ReceiptResponse {
    /// The first edge's receipt, or the empty receipt when nothing is indexed.
    pub fn into_receipt(self) -> Receipt {
        self.data
            .transactions
            .edges
            .into_iter()
            .next()
            .and_then(|edge| edge.node.receipt)
            .unwrap_or_default()
    }
}

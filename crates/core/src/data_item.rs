//! Unsigned data items and their canonical byte layout.
//!
//! The unsigned layout is:
//!
//! ```text
//! owner | target flag (u8) [+ 32 bytes] | anchor flag (u8) [+ 32 bytes]
//!       | tag count (u64 LE) | tag bytes length (u64 LE) | tag bytes | data
//! ```
//!
//! A signed item prefixes this with the signature type (u16 LE) and the
//! signature, see [`crate::transaction::SignedTransaction`].

use crate::deep_hash::{DeepHashItem, deep_hash};
use crate::tag::{Tag, decode_tags, encode_tags, validate_tags};
use bytes::Bytes;
use std::fmt;

/// Signature scheme of a data item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SignatureType {
    /// Ed25519 (Solana, Aptos and friends).
    Ed25519 = 2,
    /// secp256k1 with EIP-191 message prefix (Ethereum, Matic).
    Ethereum = 3,
}

impl SignatureType {
    /// Numeric discriminator written into the item header.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Parse the numeric discriminator.
    pub fn from_u16(value: u16) -> crate::Result<Self> {
        match value {
            2 => Ok(Self::Ed25519),
            3 => Ok(Self::Ethereum),
            other => Err(crate::Error::UnsupportedSignatureType(other)),
        }
    }

    /// Length of a signature in bytes.
    pub fn signature_len(self) -> usize {
        match self {
            Self::Ed25519 => 64,
            Self::Ethereum => 65,
        }
    }

    /// Length of the owner public key in bytes.
    pub fn owner_len(self) -> usize {
        match self {
            Self::Ed25519 => 32,
            Self::Ethereum => 65,
        }
    }
}

/// An unsigned data item: owner, optional target/anchor, tags and payload.
#[derive(Clone, PartialEq, Eq)]
pub struct DataItem {
    signature_type: SignatureType,
    owner: Vec<u8>,
    target: Option<[u8; 32]>,
    anchor: Option<[u8; 32]>,
    tags: Vec<Tag>,
    data: Bytes,
}

impl DataItem {
    /// Create an item owned by `owner` with no target, anchor or tags.
    pub fn new(
        signature_type: SignatureType,
        owner: impl Into<Vec<u8>>,
        data: impl Into<Bytes>,
    ) -> crate::Result<Self> {
        let owner = owner.into();
        if owner.len() != signature_type.owner_len() {
            return Err(crate::Error::InvalidDataItem(format!(
                "owner must be {} bytes for {:?}, got {}",
                signature_type.owner_len(),
                signature_type,
                owner.len()
            )));
        }
        Ok(Self {
            signature_type,
            owner,
            target: None,
            anchor: None,
            tags: Vec::new(),
            data: data.into(),
        })
    }

    /// Set the target address.
    pub fn with_target(mut self, target: [u8; 32]) -> Self {
        self.target = Some(target);
        self
    }

    /// Set the anti-replay anchor.
    pub fn with_anchor(mut self, anchor: [u8; 32]) -> Self {
        self.anchor = Some(anchor);
        self
    }

    /// Attach tags, validating the tag limits.
    pub fn with_tags(mut self, tags: Vec<Tag>) -> crate::Result<Self> {
        validate_tags(&tags)?;
        self.tags = tags;
        Ok(self)
    }

    pub fn signature_type(&self) -> SignatureType {
        self.signature_type
    }

    pub fn owner(&self) -> &[u8] {
        &self.owner
    }

    pub fn target(&self) -> Option<&[u8; 32]> {
        self.target.as_ref()
    }

    pub fn anchor(&self) -> Option<&[u8; 32]> {
        self.anchor.as_ref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Canonical unsigned encoding. Identical items always encode identically.
    pub fn encode(&self) -> Vec<u8> {
        let tag_bytes = encode_tags(&self.tags);
        let mut out = Vec::with_capacity(self.encoded_len_with(tag_bytes.len()));
        out.extend_from_slice(&self.owner);
        push_optional(&mut out, self.target.as_ref());
        push_optional(&mut out, self.anchor.as_ref());
        out.extend_from_slice(&(self.tags.len() as u64).to_le_bytes());
        out.extend_from_slice(&(tag_bytes.len() as u64).to_le_bytes());
        out.extend_from_slice(&tag_bytes);
        out.extend_from_slice(&self.data);
        out
    }

    /// Length of [`DataItem::encode`] without building it.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len_with(encode_tags(&self.tags).len())
    }

    fn encoded_len_with(&self, tag_bytes_len: usize) -> usize {
        self.owner.len()
            + 1
            + self.target.map_or(0, |_| 32)
            + 1
            + self.anchor.map_or(0, |_| 32)
            + 16
            + tag_bytes_len
            + self.data.len()
    }

    /// The 48-byte deep hash that signers sign.
    pub fn signing_message(&self) -> [u8; 48] {
        let signature_type = self.signature_type.as_u16().to_string();
        let tag_bytes = encode_tags(&self.tags);
        let fields = [
            DeepHashItem::Blob(b"dataitem"),
            DeepHashItem::Blob(b"1"),
            DeepHashItem::Blob(signature_type.as_bytes()),
            DeepHashItem::Blob(&self.owner),
            DeepHashItem::Blob(self.target.as_ref().map_or(&[][..], |t| &t[..])),
            DeepHashItem::Blob(self.anchor.as_ref().map_or(&[][..], |a| &a[..])),
            DeepHashItem::Blob(&tag_bytes),
            DeepHashItem::Blob(&self.data),
        ];
        deep_hash(&DeepHashItem::List(&fields))
    }

    /// Parse the unsigned layout for a known signature type.
    pub fn decode(signature_type: SignatureType, bytes: &[u8]) -> crate::Result<Self> {
        let mut reader = Reader(bytes);
        let owner = reader.take(signature_type.owner_len(), "owner")?.to_vec();
        let target = reader.optional("target")?;
        let anchor = reader.optional("anchor")?;
        let tag_count = reader.u64_le("tag count")?;
        let tag_bytes_len = usize::try_from(reader.u64_le("tag bytes length")?)
            .map_err(|_| crate::Error::InvalidDataItem("tag bytes length overflow".to_string()))?;
        let tags = decode_tags(reader.take(tag_bytes_len, "tags")?)?;
        if tags.len() as u64 != tag_count {
            return Err(crate::Error::InvalidDataItem(format!(
                "header declares {tag_count} tags, found {}",
                tags.len()
            )));
        }
        Ok(Self {
            signature_type,
            owner,
            target,
            anchor,
            tags,
            data: Bytes::copy_from_slice(reader.0),
        })
    }
}

impl fmt::Debug for DataItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataItem")
            .field("signature_type", &self.signature_type)
            .field("target", &self.target.is_some())
            .field("anchor", &self.anchor.is_some())
            .field("tags", &self.tags)
            .field("size", &self.data.len())
            .finish()
    }
}

fn push_optional(out: &mut Vec<u8>, value: Option<&[u8; 32]>) {
    match value {
        Some(bytes) => {
            out.push(1);
            out.extend_from_slice(bytes);
        }
        None => out.push(0),
    }
}

struct Reader<'a>(&'a [u8]);

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, field: &str) -> crate::Result<&'a [u8]> {
        if self.0.len() < len {
            return Err(crate::Error::InvalidDataItem(format!(
                "truncated {field}: need {len} bytes, {} remaining",
                self.0.len()
            )));
        }
        let (head, rest) = self.0.split_at(len);
        self.0 = rest;
        Ok(head)
    }

    fn optional(&mut self, field: &str) -> crate::Result<Option<[u8; 32]>> {
        match self.take(1, field)? {
            [0] => Ok(None),
            [1] => {
                let mut value = [0u8; 32];
                value.copy_from_slice(self.take(32, field)?);
                Ok(Some(value))
            }
            other => Err(crate::Error::InvalidDataItem(format!(
                "invalid {field} presence byte {other:?}"
            ))),
        }
    }

    fn u64_le(&mut self, field: &str) -> crate::Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, field)?);
        Ok(u64::from_le_bytes(buf))
    }
}

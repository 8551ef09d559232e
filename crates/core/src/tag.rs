//! Data item tags and their Avro encoding.
//!
//! Tags are serialized as an Avro array of `{ name: bytes, value: bytes }`
//! records. The encoded bytes are covered by the item signature, so tag order
//! is significant and preserved exactly as inserted.

use std::fmt;

/// Maximum number of tags on a single data item.
pub const MAX_TAGS: usize = 128;

/// Maximum tag name length in bytes.
pub const MAX_TAG_NAME_LEN: usize = 1024;

/// Maximum tag value length in bytes.
pub const MAX_TAG_VALUE_LEN: usize = 3072;

/// A metadata tag attached to a data item.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    name: Vec<u8>,
    value: Vec<u8>,
}

impl Tag {
    /// Create a tag from a name and value.
    pub fn new(name: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Tag name bytes.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Tag value bytes.
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Check the tag against the per-tag size limits.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() || self.name.len() > MAX_TAG_NAME_LEN {
            return Err(crate::Error::InvalidTag(format!(
                "name must be 1..={MAX_TAG_NAME_LEN} bytes, got {}",
                self.name.len()
            )));
        }
        if self.value.is_empty() || self.value.len() > MAX_TAG_VALUE_LEN {
            return Err(crate::Error::InvalidTag(format!(
                "value must be 1..={MAX_TAG_VALUE_LEN} bytes, got {}",
                self.value.len()
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tag")
            .field("name", &String::from_utf8_lossy(&self.name))
            .field("value", &String::from_utf8_lossy(&self.value))
            .finish()
    }
}

/// Validate a full tag list.
pub fn validate_tags(tags: &[Tag]) -> crate::Result<()> {
    if tags.len() > MAX_TAGS {
        return Err(crate::Error::InvalidTag(format!(
            "at most {MAX_TAGS} tags allowed, got {}",
            tags.len()
        )));
    }
    tags.iter().try_for_each(Tag::validate)
}

/// Encode tags as an Avro array. An empty list encodes to zero bytes.
pub fn encode_tags(tags: &[Tag]) -> Vec<u8> {
    if tags.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    write_long(&mut out, tags.len() as i64);
    for tag in tags {
        write_bytes(&mut out, &tag.name);
        write_bytes(&mut out, &tag.value);
    }
    write_long(&mut out, 0);
    out
}

/// Decode an Avro tag array produced by [`encode_tags`].
pub fn decode_tags(mut input: &[u8]) -> crate::Result<Vec<Tag>> {
    let mut tags = Vec::new();
    if input.is_empty() {
        return Ok(tags);
    }
    loop {
        let mut count = read_long(&mut input)?;
        if count == 0 {
            break;
        }
        if count < 0 {
            // Negative block counts are followed by the block size in bytes.
            count = -count;
            read_long(&mut input)?;
        }
        for _ in 0..count {
            let name = read_bytes(&mut input)?;
            let value = read_bytes(&mut input)?;
            tags.push(Tag { name, value });
        }
    }
    if !input.is_empty() {
        return Err(crate::Error::InvalidTag(format!(
            "{} trailing bytes after tag array",
            input.len()
        )));
    }
    Ok(tags)
}

fn write_long(out: &mut Vec<u8>, n: i64) {
    let mut v = ((n << 1) ^ (n >> 63)) as u64;
    while v >= 0x80 {
        out.push((v as u8) | 0x80);
        v >>= 7;
    }
    out.push(v as u8);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_long(out, bytes.len() as i64);
    out.extend_from_slice(bytes);
}

fn read_long(input: &mut &[u8]) -> crate::Result<i64> {
    let mut v: u64 = 0;
    let mut shift = 0u32;
    loop {
        let (&byte, rest) = input
            .split_first()
            .ok_or_else(|| crate::Error::InvalidTag("truncated varint".to_string()))?;
        *input = rest;
        if shift > 63 {
            return Err(crate::Error::InvalidTag("varint overflow".to_string()));
        }
        v |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    Ok(((v >> 1) as i64) ^ -((v & 1) as i64))
}

fn read_bytes(input: &mut &[u8]) -> crate::Result<Vec<u8>> {
    let len = read_long(input)?;
    let len = usize::try_from(len)
        .map_err(|_| crate::Error::InvalidTag(format!("negative length {len}")))?;
    if input.len() < len {
        return Err(crate::Error::InvalidTag(format!(
            "expected {len} bytes, {} remaining",
            input.len()
        )));
    }
    let (bytes, rest) = input.split_at(len);
    *input = rest;
    Ok(bytes.to_vec())
}

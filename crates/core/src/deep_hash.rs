//! Arweave deep hash over nested byte lists (SHA-384).

use sha2::{Digest, Sha384};

/// A node in a deep-hash tree: either a blob of bytes or a list of nodes.
#[derive(Debug, Clone, Copy)]
pub enum DeepHashItem<'a> {
    Blob(&'a [u8]),
    List(&'a [DeepHashItem<'a>]),
}

/// Compute the 48-byte deep hash of an item.
pub fn deep_hash(item: &DeepHashItem<'_>) -> [u8; 48] {
    match item {
        DeepHashItem::Blob(data) => {
            let tag = sha384(format!("blob{}", data.len()).as_bytes());
            let data_hash = sha384(data);
            let mut hasher = Sha384::new();
            hasher.update(tag);
            hasher.update(data_hash);
            finish(hasher)
        }
        DeepHashItem::List(items) => {
            let mut acc = sha384(format!("list{}", items.len()).as_bytes());
            for child in *items {
                let mut hasher = Sha384::new();
                hasher.update(acc);
                hasher.update(deep_hash(child));
                acc = finish(hasher);
            }
            acc
        }
    }
}

fn sha384(data: &[u8]) -> [u8; 48] {
    let mut hasher = Sha384::new();
    hasher.update(data);
    finish(hasher)
}

fn finish(hasher: Sha384) -> [u8; 48] {
    let mut out = [0u8; 48];
    out.copy_from_slice(&hasher.finalize());
    out
}

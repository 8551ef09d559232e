//! Chunk spans for chunked uploads.

use serde::{Deserialize, Serialize};

/// A contiguous byte range of an upload, addressed by its offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkSpan {
    /// Byte offset of the chunk within the upload.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
}

impl ChunkSpan {
    /// Create a new span.
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    /// Check whether two spans share at least one byte.
    pub fn overlaps(&self, other: &ChunkSpan) -> bool {
        self.offset < other.end() && other.offset < self.end()
    }

    /// Borrow this span's bytes out of the full upload.
    pub fn slice<'a>(&self, data: &'a [u8]) -> Option<&'a [u8]> {
        let start = usize::try_from(self.offset).ok()?;
        let end = usize::try_from(self.end()).ok()?;
        data.get(start..end)
    }
}

/// Split `total` bytes into spans of `chunk_size`; the last may be shorter.
pub fn split_spans(total: u64, chunk_size: u64) -> Vec<ChunkSpan> {
    if chunk_size == 0 {
        return Vec::new();
    }
    (0..total.div_ceil(chunk_size))
        .map(|i| {
            let offset = i * chunk_size;
            ChunkSpan::new(offset, chunk_size.min(total - offset))
        })
        .collect()
}

//! Splitting external configuration strings into bounded chunks.
//!
//! The peripheral reassembles a configuration from consecutive packets:
//!
//! ```text
//! Packet 1: total_size=L  chunk_size=4000  done=0  bytes[0..4000]
//! Packet 2: total_size=L  chunk_size=4000  done=0  bytes[4000..8000]
//! Packet N: total_size=L  chunk_size=rest  done=1  bytes[..L]
//! ```
//!
//! An empty configuration still produces one (empty, final) chunk.

use crate::error::{PacketError, Result};

/// Maximum configuration bytes carried by one packet.
pub const MAX_CHUNK_SIZE: usize = 4000;

/// Chunk prefix: total_size (4) + chunk_size (4) + done (1) = 9 bytes.
pub const EXT_CONFIG_HEADER_SIZE: usize = 9;

/// One fragment of an external configuration transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtConfigChunk<'a> {
    /// Length of the whole logical payload, identical for every chunk.
    pub total_size: u32,
    /// Set on the final chunk only.
    pub done: bool,
    /// Content of this chunk.
    pub bytes: &'a [u8],
}

impl<'a> ExtConfigChunk<'a> {
    /// A single chunk carrying an entire payload.
    pub fn whole(bytes: &'a [u8]) -> Result<Self> {
        let total_size = total_size(bytes.len())?;
        Ok(Self {
            total_size,
            done: true,
            bytes,
        })
    }

    /// Number of content bytes in this chunk.
    pub fn chunk_size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Serialized size of the chunk value (prefix + content).
    pub fn wire_size(&self) -> usize {
        EXT_CONFIG_HEADER_SIZE + self.bytes.len()
    }
}

/// Iterator over the chunks of one logical payload, in send order.
#[derive(Debug, Clone)]
pub struct ChunkPlan<'a> {
    payload: &'a [u8],
    offset: usize,
    total_size: u32,
    finished: bool,
}

impl<'a> ChunkPlan<'a> {
    /// Length of the logical payload.
    pub fn total_size(&self) -> u32 {
        self.total_size
    }
}

impl<'a> Iterator for ChunkPlan<'a> {
    type Item = ExtConfigChunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let remaining = self.payload.len() - self.offset;
        let take = remaining.min(MAX_CHUNK_SIZE);
        let bytes = &self.payload[self.offset..self.offset + take];
        self.offset += take;
        let done = self.offset == self.payload.len();
        self.finished = done;
        Some(ExtConfigChunk {
            total_size: self.total_size,
            done,
            bytes,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.finished {
            0
        } else {
            chunk_count(self.payload.len() - self.offset)
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for ChunkPlan<'_> {}

/// Plan the chunks for `payload`.
pub fn plan_chunks(payload: &[u8]) -> Result<ChunkPlan<'_>> {
    Ok(ChunkPlan {
        payload,
        offset: 0,
        total_size: total_size(payload.len())?,
        finished: false,
    })
}

/// Number of packets needed for a payload of `len` bytes.
pub fn chunk_count(len: usize) -> usize {
    len.max(1).div_ceil(MAX_CHUNK_SIZE)
}

fn total_size(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| PacketError::PayloadTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}

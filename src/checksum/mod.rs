//! Running CRC-32 over the compressed bytes of a block.
//!
//! Blocks declare 16 bit checksums: the IEEE CRC-32 folded by xoring its
//! halves together.

use crc32fast::Hasher;
use std::io::{self, Read, Take};

/// Folds a CRC-32 into the 16 bit form stored in block headers.
#[inline]
pub fn fold(crc: u32) -> u16 {
    (crc ^ (crc >> 16)) as u16
}

/// Folded CRC-32 of `data`.
pub fn folded_crc(data: &[u8]) -> u16 {
    fold(crc32fast::hash(data))
}

/// Reads at most the current block's compressed budget from the source and
/// feeds every byte it hands out into the block checksum.
#[derive(Debug)]
pub struct ChecksumReader<R> {
    inner: Take<R>,
    hasher: Hasher,
}

impl<R: Read> ChecksumReader<R> {
    /// Starts with a zero budget: nothing can be read before [`Self::start_block`].
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader.take(0),
            hasher: Hasher::new(),
        }
    }

    /// Arms the reader for a block of `compressed_len` bytes and clears the checksum.
    pub fn start_block(&mut self, compressed_len: u64) {
        self.inner.set_limit(compressed_len);
        self.hasher.reset();
    }

    /// Compressed bytes of the current block not yet pulled from the source.
    pub fn budget(&self) -> u64 {
        self.inner.limit()
    }

    /// Folded checksum of everything read since the block started.
    pub fn sum(&self) -> u16 {
        fold(self.hasher.clone().finalize())
    }

    /// The raw source, bypassing both the budget and the checksum.
    pub fn source_mut(&mut self) -> &mut R {
        self.inner.get_mut()
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

//! Byte-level access to a block's compressed bytes.
//!
//! The inflate engine pulls through [`BufRead`]; [`ByteCursor::read_byte`] is
//! the single-byte form of the same pull for callers walking raw block data.

use std::io::{self, BufRead, Read};

use crate::checksum::ChecksumReader;

const CURSOR_CAPACITY: usize = 4096;

/// Pull-side view of the compressed bytes for the inflate engine.
///
/// The only buffer between the source and the engine. Refills never cross a
/// block boundary because the underlying [`ChecksumReader`] is limited to the
/// block's compressed length, and every byte the engine consumes is counted.
#[derive(Debug)]
pub struct ByteCursor<R> {
    inner: ChecksumReader<R>,
    buf: Box<[u8]>,
    pos: usize,
    end: usize,
    consumed: u64,
}

impl<R: Read> ByteCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: ChecksumReader::new(reader),
            buf: vec![0u8; CURSOR_CAPACITY].into_boxed_slice(),
            pos: 0,
            end: 0,
            consumed: 0,
        }
    }

    /// Pulls a single byte, `None` once the block budget is spent.
    ///
    /// Counted and checksummed exactly like bytes taken through `BufRead`.
    pub fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = self.fill_buf()?.first().copied();
        if byte.is_some() {
            self.consume(1);
        }
        Ok(byte)
    }

    /// Total compressed bytes handed to the engine over the cursor's lifetime.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Bytes pulled from the source but not consumed yet.
    pub fn buffered(&self) -> usize {
        self.end - self.pos
    }

    /// True once the block budget is spent and nothing is left in the buffer.
    pub fn block_exhausted(&self) -> bool {
        self.buffered() == 0 && self.inner.budget() == 0
    }

    pub fn checksum(&self) -> &ChecksumReader<R> {
        &self.inner
    }

    pub fn checksum_mut(&mut self) -> &mut ChecksumReader<R> {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

impl<R: Read> Read for ByteCursor<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let n = {
            let available = self.fill_buf()?;
            let n = available.len().min(out.len());
            out[..n].copy_from_slice(&available[..n]);
            n
        };
        self.consume(n);
        Ok(n)
    }
}

impl<R: Read> BufRead for ByteCursor<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        if self.pos == self.end {
            self.end = self.inner.read(&mut self.buf)?;
            self.pos = 0;
        }
        Ok(&self.buf[self.pos..self.end])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.buffered());
        self.pos += amt;
        self.consumed += amt as u64;
    }
}

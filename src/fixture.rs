//! Helpers for assembling block streams in tests.

use std::io::{self, BufRead, Read, Write};

use bytes::{BufMut, BytesMut};
use flate2::{write::ZlibEncoder, Compression};

use crate::block::{BlockHeader, HeaderLayout};
use crate::checksum::folded_crc;
use crate::error::Result;
use crate::records::{Encoding, RecordDecoder};

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Header for `compressed`, declaring `decompressed_len` bytes of output.
pub fn header_for(compressed: &[u8], decompressed_len: u32) -> BlockHeader {
    BlockHeader {
        compressed_len: compressed.len() as u32,
        decompressed_len,
        header_crc: 0,
        payload_crc: folded_crc(compressed),
    }
}

/// One encoded block: header followed by the zlib payload.
pub fn block(layout: HeaderLayout, data: &[u8]) -> Vec<u8> {
    let compressed = zlib(data);
    let mut buf = BytesMut::new();
    buf.put_slice(&header_for(&compressed, data.len() as u32).to_bytes(layout));
    buf.put_slice(&compressed);
    buf.to_vec()
}

pub fn stream(layout: HeaderLayout, blocks: &[&[u8]]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    for data in blocks {
        buf.put_slice(&block(layout, data));
    }
    buf.to_vec()
}

/// Deterministic, mildly compressible test data.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed) ^ ((i / 7) as u8))
        .collect()
}

/// Source that fails once with `Interrupted` when it reaches byte `at`.
pub struct Hiccup<R> {
    inner: R,
    pos: usize,
    at: Option<usize>,
}

impl<R> Hiccup<R> {
    pub fn new(inner: R, at: usize) -> Self {
        Self {
            inner,
            pos: 0,
            at: Some(at),
        }
    }
}

impl<R: Read> Read for Hiccup<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = match self.at {
            Some(at) if self.pos == at => {
                self.at = None;
                return Err(io::ErrorKind::Interrupted.into());
            }
            Some(at) if self.pos < at => buf.len().min(at - self.pos),
            _ => buf.len(),
        };
        let n = self.inner.read(&mut buf[..len])?;
        self.pos += n;
        Ok(n)
    }
}

/// Records framed as a little-endian `u16` length followed by the payload.
pub struct LengthPrefixed;

impl LengthPrefixed {
    pub fn encode(records: &[&[u8]]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for record in records {
            buf.put_u16_le(record.len() as u16);
            buf.put_slice(record);
        }
        buf.to_vec()
    }
}

impl RecordDecoder for LengthPrefixed {
    type Record = Vec<u8>;

    fn decode<R: BufRead>(
        &mut self,
        _encoding: &Encoding,
        reader: &mut R,
    ) -> Result<Option<Vec<u8>>> {
        if reader.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut len = [0u8; 2];
        reader.read_exact(&mut len)?;
        let mut record = vec![0u8; u16::from_le_bytes(len) as usize];
        reader.read_exact(&mut record)?;
        Ok(Some(record))
    }
}

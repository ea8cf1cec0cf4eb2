//! Block headers.
//!
//! Layout of a compressed replay body: `block_count` blocks written back to back,
//! each one a header ([LegacyBlockHeader] or [ModernBlockHeader]) followed by
//! [BlockHeader::compressed_len] bytes of zlib data.

use core::mem::size_of;
use std::io::Read;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, LittleEndian, Unaligned, U16, U32};

use crate::checksum::folded_crc;
use crate::error::{ChecksumKind, Error, Result};

/// First game version using 32 bit block lengths.
pub const MODERN_HEADER_VERSION: u32 = 10032;

#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct LegacyBlockHeader {
    pub compressed_len: U16<LittleEndian>,
    pub decompressed_len: U16<LittleEndian>,
    pub header_crc: U16<LittleEndian>,
    pub payload_crc: U16<LittleEndian>,
}

#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
#[repr(C)]
pub struct ModernBlockHeader {
    pub compressed_len: U32<LittleEndian>,
    pub decompressed_len: U32<LittleEndian>,
    pub header_crc: U16<LittleEndian>,
    pub payload_crc: U16<LittleEndian>,
}

/// Header encoding in use for a whole stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    /// 8 bytes, 16 bit lengths.
    Legacy,
    /// 12 bytes, 32 bit lengths.
    Modern,
}

impl HeaderLayout {
    /// Version 0 means "unknown" and is treated as modern.
    pub fn for_game_version(game_version: u32) -> Self {
        if game_version > 0 && game_version < MODERN_HEADER_VERSION {
            HeaderLayout::Legacy
        } else {
            HeaderLayout::Modern
        }
    }

    pub const fn size(self) -> usize {
        match self {
            HeaderLayout::Legacy => size_of::<LegacyBlockHeader>(),
            HeaderLayout::Modern => size_of::<ModernBlockHeader>(),
        }
    }
}

/// A decoded block header, independent of its on-disk layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub compressed_len: u32,
    pub decompressed_len: u32,
    pub header_crc: u16,
    pub payload_crc: u16,
}

impl BlockHeader {
    /// Parses a raw header and verifies its checksum.
    ///
    /// `raw` must be exactly [`HeaderLayout::size`] bytes long.
    pub fn parse(layout: HeaderLayout, raw: &[u8]) -> Result<Self> {
        let header = match layout {
            HeaderLayout::Legacy => {
                let h = LegacyBlockHeader::ref_from_bytes(raw)
                    .map_err(|_| Error::UnexpectedEndOfData)?;
                BlockHeader {
                    compressed_len: h.compressed_len.get().into(),
                    decompressed_len: h.decompressed_len.get().into(),
                    header_crc: h.header_crc.get(),
                    payload_crc: h.payload_crc.get(),
                }
            }
            HeaderLayout::Modern => {
                let h = ModernBlockHeader::ref_from_bytes(raw)
                    .map_err(|_| Error::UnexpectedEndOfData)?;
                BlockHeader {
                    compressed_len: h.compressed_len.get(),
                    decompressed_len: h.decompressed_len.get(),
                    header_crc: h.header_crc.get(),
                    payload_crc: h.payload_crc.get(),
                }
            }
        };

        let actual = header_checksum(raw);
        if actual != header.header_crc {
            return Err(Error::InvalidChecksum {
                kind: ChecksumKind::Header,
                expected: header.header_crc,
                actual,
            });
        }

        Ok(header)
    }

    /// Reads and verifies the next header from `reader`.
    pub fn read(layout: HeaderLayout, mut reader: impl Read) -> Result<Self> {
        let mut raw = [0u8; size_of::<ModernBlockHeader>()];
        let raw = &mut raw[..layout.size()];
        reader.read_exact(raw)?;
        Self::parse(layout, raw)
    }

    /// Serializes the header in `layout`, recomputing the header checksum.
    ///
    /// Lengths are truncated to 16 bits for [`HeaderLayout::Legacy`].
    pub fn to_bytes(&self, layout: HeaderLayout) -> Vec<u8> {
        let mut raw = match layout {
            HeaderLayout::Legacy => LegacyBlockHeader {
                compressed_len: U16::new(self.compressed_len as u16),
                decompressed_len: U16::new(self.decompressed_len as u16),
                header_crc: U16::new(0),
                payload_crc: U16::new(self.payload_crc),
            }
            .as_bytes()
            .to_vec(),
            HeaderLayout::Modern => ModernBlockHeader {
                compressed_len: U32::new(self.compressed_len),
                decompressed_len: U32::new(self.decompressed_len),
                header_crc: U16::new(0),
                payload_crc: U16::new(self.payload_crc),
            }
            .as_bytes()
            .to_vec(),
        };

        let crc = header_checksum(&raw);
        let at = raw.len() - 4;
        raw[at..at + 2].copy_from_slice(&crc.to_le_bytes());
        raw
    }
}

/// Folded CRC-32 of a raw header with both checksum fields zeroed.
///
/// `raw` is at most a [`ModernBlockHeader`] long.
pub(crate) fn header_checksum(raw: &[u8]) -> u16 {
    debug_assert!(raw.len() <= size_of::<ModernBlockHeader>());

    let mut scratch = [0u8; size_of::<ModernBlockHeader>()];
    let scratch = &mut scratch[..raw.len()];
    scratch.copy_from_slice(raw);

    let at = scratch.len().saturating_sub(4);
    scratch[at..].fill(0);

    folded_crc(scratch)
}

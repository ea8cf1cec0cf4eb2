//! # w3g-inflate
//!
//! Streaming decompressor for block-compressed replay bodies.
//!
//! The body is a sequence of zlib blocks, each preceded by a small header
//! carrying its lengths and two folded CRC-32 checksums. [`Decompressor`]
//! exposes the blocks as one `io::Read` stream and verifies every checksum on
//! the way; [`RecordReader`] drives a caller supplied [`RecordDecoder`] over
//! that stream.

pub mod block;
pub mod checksum;
pub mod cursor;
pub mod error;
pub mod inflate;
pub mod records;

#[cfg(test)]
mod fixture;

pub use block::{BlockHeader, HeaderLayout, MODERN_HEADER_VERSION};
pub use error::{ChecksumKind, Error, Result};
pub use inflate::{Decompressor, Progress, StreamParams};
pub use records::{Encoding, RecordDecoder, RecordReader, DEFAULT_RECORD_BUFFER};

//! Error kinds raised while inflating a block stream.

use std::io;
use thiserror::Error;

/// Which of the two checksums of a block failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumKind {
    Header,
    Payload,
}

impl core::fmt::Display for ChecksumKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ChecksumKind::Header => f.write_str("header"),
            ChecksumKind::Payload => f.write_str("payload"),
        }
    }
}

/// Every failure the decompressor can report. All of them are fatal for the
/// session that produced them.
#[derive(Debug, Error)]
pub enum Error {
    /// A declared block checksum does not match the computed one.
    #[error("Invalid {kind} checksum: expected {expected:#06x}, got {actual:#06x}")]
    InvalidChecksum {
        kind: ChecksumKind,
        expected: u16,
        actual: u16,
    },

    /// A block ended before its declared compressed or decompressed length was satisfied.
    #[error("Unexpected end of block data")]
    UnexpectedEndOfData,

    /// Every declared block was consumed while decompressed bytes are still owed.
    #[error("No blocks left but the stream still owes data")]
    EndOfBlocks,

    /// A block inflated to more bytes than its header declares.
    #[error("Block inflated past its declared length of {declared} bytes")]
    BlockOverrun { declared: u32 },

    /// The session failed earlier and refuses further reads.
    #[error("Decompressor already failed")]
    Poisoned,

    /// The record decoder rejected the decompressed data.
    #[error("Record decoding failed: {0}")]
    Record(String),

    /// I/O error from the byte source or the inflate engine.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

/// A convenience `Result` type alias using the crate's `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The source was interrupted before producing anything; the read may be retried.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == io::ErrorKind::Interrupted)
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Error::InvalidChecksum { .. } | Error::BlockOverrun { .. } | Error::Record(_) => {
                io::ErrorKind::InvalidData
            }
            Error::UnexpectedEndOfData | Error::EndOfBlocks => io::ErrorKind::UnexpectedEof,
            Error::Poisoned => io::ErrorKind::Other,
            Error::Io(e) => e.kind(),
        }
    }
}

/// Plain io errors pass through untouched; our own kinds are boxed so that
/// `From<io::Error>` can recover them on the other side of an `io::Read`.
impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Io(e) => e,
            e => io::Error::new(e.io_kind(), e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            let kind = e.kind();
            return match e.into_inner().map(|inner| inner.downcast::<Error>()) {
                Some(Ok(inner)) => *inner,
                Some(Err(inner)) => Error::Io(io::Error::new(kind, inner)),
                None => Error::Io(kind.into()),
            };
        }

        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_survive_io_round_trip() {
        let io_err: io::Error = Error::EndOfBlocks.into();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(matches!(Error::from(io_err), Error::EndOfBlocks));

        let io_err: io::Error = Error::InvalidChecksum {
            kind: ChecksumKind::Payload,
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(io_err.kind(), io::ErrorKind::InvalidData);
        assert!(matches!(
            Error::from(io_err),
            Error::InvalidChecksum { kind: ChecksumKind::Payload, expected: 1, actual: 2 }
        ));
    }

    #[test]
    fn plain_io_errors_stay_io() {
        let err = Error::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));

        let back: io::Error = err.into();
        assert_eq!(back.kind(), io::ErrorKind::BrokenPipe);
        assert!(back.get_ref().is_none());
    }
}

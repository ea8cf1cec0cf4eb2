//! The block sequencer.
//!
//! [`Decompressor`] turns a sequence of independently compressed and
//! checksummed blocks back into one logical byte stream. Each block is
//! verified twice: its header against the header checksum when the block is
//! opened, and its compressed bytes against the payload checksum once the
//! block has been inflated completely.

use std::io::{self, Read};

use log::{debug, trace, warn};
use tap::Pipe;

use crate::block::{BlockHeader, HeaderLayout};
use crate::cursor::ByteCursor;
use crate::error::{ChecksumKind, Error, Result};
use crate::records::{Encoding, RecordDecoder, RecordReader};

mod engine;

pub use engine::{Inflated, Inflater};

const DRAIN_CHUNK: usize = 512;

/// Stream-wide values taken from the outer container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Decompressed bytes the stream delivers in total.
    pub total_size: u32,
    /// Number of blocks in the stream.
    pub block_count: u32,
    /// Selects the header layout; 0 means unknown.
    pub game_version: u32,
}

/// Read-only snapshot of a session's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Compressed bytes consumed from the source, headers included.
    pub compressed_read: u64,
    /// Decompressed bytes still owed by the whole stream.
    pub total_remaining: u32,
    /// Decompressed bytes still owed by the open block.
    pub block_remaining: u32,
    /// Blocks not opened yet.
    pub blocks_remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    BlockOpen,
    Closed,
    Failed,
}

/// Streaming reader over a block-compressed replay body.
///
/// Generic over `R: Read`; the source is read strictly in order and never
/// seeked. Not meant to be shared between threads.
#[derive(Debug)]
pub struct Decompressor<R> {
    cursor: ByteCursor<R>,
    engine: Inflater,
    layout: HeaderLayout,
    encoding: Encoding,

    total_remaining: u32,
    block_remaining: u32,
    blocks_remaining: u32,
    blocks_opened: u32,
    header_bytes: u64,

    declared_len: u32,
    payload_crc: u16,
    state: State,
    pending: Option<Error>,
}

impl<R: Read> Decompressor<R> {
    pub fn new(reader: R, params: StreamParams) -> Self {
        Self {
            cursor: ByteCursor::new(reader),
            engine: Inflater::new(),
            layout: HeaderLayout::for_game_version(params.game_version),
            encoding: Encoding {
                game_version: params.game_version,
            },
            total_remaining: params.total_size,
            block_remaining: 0,
            blocks_remaining: params.block_count,
            blocks_opened: 0,
            header_bytes: 0,
            declared_len: 0,
            payload_crc: 0,
            state: if params.total_size == 0 { State::Closed } else { State::Idle },
            pending: None,
        }
    }

    pub fn layout(&self) -> HeaderLayout {
        self.layout
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn compressed_read(&self) -> u64 {
        self.header_bytes + self.cursor.consumed()
    }

    pub fn total_remaining(&self) -> u32 {
        self.total_remaining
    }

    pub fn block_remaining(&self) -> u32 {
        self.block_remaining
    }

    pub fn blocks_remaining(&self) -> u32 {
        self.blocks_remaining
    }

    pub fn progress(&self) -> Progress {
        Progress {
            compressed_read: self.compressed_read(),
            total_remaining: self.total_remaining,
            block_remaining: self.block_remaining,
            blocks_remaining: self.blocks_remaining,
        }
    }

    /// True once every declared byte has been delivered.
    pub fn is_finished(&self) -> bool {
        self.state == State::Closed
    }

    /// Fills as much of `buf` as the stream allows.
    ///
    /// Returns the bytes produced together with the outcome, so data inflated
    /// before a failure is not lost. `(0, Ok(()))` with a non-empty `buf`
    /// means the stream has ended. An interrupted source leaves the session
    /// untouched so the call can be retried; after any other error every
    /// further call fails with [`Error::Poisoned`].
    pub fn read_some(&mut self, buf: &mut [u8]) -> (usize, Result<()>) {
        match self.state {
            State::Failed => return (0, Err(Error::Poisoned)),
            State::Closed => return (0, Ok(())),
            State::Idle | State::BlockOpen => {}
        }

        let want = buf.len().min(self.total_remaining as usize);
        let mut produced = 0;
        let result = self.fill(&mut buf[..want], &mut produced);

        match result {
            Ok(()) if self.total_remaining == 0 => self.state = State::Closed,
            Ok(()) => {}
            Err(ref e) if e.is_interrupted() => {}
            Err(ref e) => {
                debug!("Block stream failed after {} blocks: {e}", self.blocks_opened);
                self.state = State::Failed;
            }
        }

        (produced, result)
    }

    /// Reads the rest of the declared stream into memory.
    pub fn read_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.total_remaining as usize);
        self.read_to_end(&mut out)?;
        out.pipe(Ok)
    }

    /// Decodes every remaining record and hands it to `f`.
    ///
    /// Buffering starts fresh on each call, so a stream should be driven by a
    /// single `for_each`; use [`Self::records`] to keep a reader around.
    pub fn for_each<D, F, E>(&mut self, decoder: D, f: F) -> std::result::Result<(), E>
    where
        D: RecordDecoder,
        F: FnMut(D::Record) -> std::result::Result<(), E>,
        E: From<Error>,
    {
        let encoding = self.encoding;
        RecordReader::new(self, encoding, decoder).for_each_record(f)
    }

    pub fn records<D: RecordDecoder>(self, decoder: D) -> RecordReader<Self, D> {
        let encoding = self.encoding;
        RecordReader::new(self, encoding, decoder)
    }

    /// Releases the engine and gives the source back.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }

    /// Resumable: an interrupted close or drain is finished on the next call.
    fn fill(&mut self, buf: &mut [u8], produced: &mut usize) -> Result<()> {
        loop {
            if self.state == State::BlockOpen {
                if self.block_remaining == 0 {
                    self.close_block()?;
                } else if self.total_remaining == 0 {
                    self.drain_block()?;
                }
            }

            if *produced == buf.len() {
                return Ok(());
            }

            if self.state == State::Idle {
                self.open_block()?;
                continue;
            }

            let room = (buf.len() - *produced).min(self.block_remaining as usize);
            let out = &mut buf[*produced..*produced + room];
            let n = match self.engine.inflate(&mut self.cursor, out)? {
                Inflated::Data(n) => n,
                Inflated::End | Inflated::Starved => return Err(Error::UnexpectedEndOfData),
            };

            *produced += n;
            self.total_remaining -= n as u32;
            self.block_remaining -= n as u32;
        }
    }

    fn open_block(&mut self) -> Result<()> {
        if self.blocks_remaining == 0 {
            return Err(Error::EndOfBlocks);
        }
        if self.state == State::BlockOpen {
            self.close_block()?;
        }

        self.blocks_remaining -= 1;

        let header = BlockHeader::read(self.layout, self.cursor.checksum_mut().source_mut())?;
        self.header_bytes += self.layout.size() as u64;

        self.cursor.checksum_mut().start_block(header.compressed_len.into());
        self.engine.reset();
        self.payload_crc = header.payload_crc;
        self.declared_len = header.decompressed_len;
        self.block_remaining = header.decompressed_len;
        self.state = State::BlockOpen;

        debug!(
            "Opened block {} ({:?}): {} compressed, {} decompressed, {} blocks left",
            self.blocks_opened,
            self.layout,
            header.compressed_len,
            header.decompressed_len,
            self.blocks_remaining
        );
        self.blocks_opened += 1;

        Ok(())
    }

    /// Verifies the open block was consumed exactly and its payload checksum matches.
    fn close_block(&mut self) -> Result<()> {
        if self.block_remaining > 0 {
            return Err(Error::UnexpectedEndOfData);
        }

        let mut scratch = [0u8; 1];
        match self.engine.inflate(&mut self.cursor, &mut scratch)? {
            Inflated::End => {}
            Inflated::Data(_) => {
                return Err(Error::BlockOverrun {
                    declared: self.declared_len,
                })
            }
            Inflated::Starved => return Err(Error::UnexpectedEndOfData),
        }

        if !self.cursor.block_exhausted() {
            return Err(Error::UnexpectedEndOfData);
        }

        let actual = self.cursor.checksum().sum();
        if actual != self.payload_crc {
            return Err(Error::InvalidChecksum {
                kind: ChecksumKind::Payload,
                expected: self.payload_crc,
                actual,
            });
        }

        trace!("Closed block {} (payload checksum {actual:#06x})", self.blocks_opened - 1);
        self.state = State::Idle;
        Ok(())
    }

    /// Inflates and discards what the final block declares beyond the stream total.
    fn drain_block(&mut self) -> Result<()> {
        warn!(
            "Final block declares {} bytes past the stream total, draining",
            self.block_remaining
        );

        let mut scratch = [0u8; DRAIN_CHUNK];
        while self.block_remaining > 0 {
            let room = scratch.len().min(self.block_remaining as usize);
            match self.engine.inflate(&mut self.cursor, &mut scratch[..room])? {
                Inflated::Data(n) => self.block_remaining -= n as u32,
                Inflated::End | Inflated::Starved => return Err(Error::UnexpectedEndOfData),
            }
        }

        self.close_block()
    }
}

impl<R: Read> Read for Decompressor<R> {
    /// A failure after some bytes were produced is held back and returned by
    /// the next call. `Interrupted` is passed through and may be retried.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(e) = self.pending.take() {
            return Err(e.into());
        }

        match self.read_some(buf) {
            (n, Ok(())) => Ok(n),
            (0, Err(e)) => Err(e.into()),
            (n, Err(e)) if e.is_interrupted() => Ok(n),
            (n, Err(e)) => {
                self.pending = Some(e);
                Ok(n)
            }
        }
    }
}

use std::io::{self, BufRead};

use flate2::{Decompress, FlushDecompress, Status};

/// Outcome of one [`Inflater::inflate`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inflated {
    /// Bytes written into the output buffer.
    Data(usize),
    /// The zlib stream reached its end (trailer verified by the engine).
    End,
    /// The source ran dry before the zlib stream ended.
    Starved,
}

/// A zlib engine reused across blocks.
pub struct Inflater {
    decompress: Decompress,
    finished: bool,
}

impl Inflater {
    pub fn new() -> Self {
        Self {
            decompress: Decompress::new(true),
            finished: false,
        }
    }

    /// Prepares the engine for the next independent zlib stream.
    pub fn reset(&mut self) {
        self.decompress.reset(true);
        self.finished = false;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Inflates from `src` into `dst`, consuming from `src` only what the engine used.
    ///
    /// `dst` must not be empty.
    pub fn inflate(&mut self, src: &mut impl BufRead, dst: &mut [u8]) -> io::Result<Inflated> {
        debug_assert!(!dst.is_empty());

        loop {
            if self.finished {
                return Ok(Inflated::End);
            }

            let (status, consumed, produced, eof) = {
                let input = src.fill_buf()?;
                let eof = input.is_empty();
                let before_in = self.decompress.total_in();
                let before_out = self.decompress.total_out();

                let flush = if eof { FlushDecompress::Finish } else { FlushDecompress::None };
                let status = self
                    .decompress
                    .decompress(input, dst, flush)
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

                (
                    status,
                    (self.decompress.total_in() - before_in) as usize,
                    (self.decompress.total_out() - before_out) as usize,
                    eof,
                )
            };
            src.consume(consumed);

            match status {
                Status::StreamEnd => {
                    self.finished = true;
                    if produced > 0 {
                        return Ok(Inflated::Data(produced));
                    }
                }
                Status::Ok | Status::BufError if produced > 0 => {
                    return Ok(Inflated::Data(produced));
                }
                Status::Ok | Status::BufError if eof => return Ok(Inflated::Starved),
                // Only framing or an empty deflate block was consumed so far.
                Status::Ok | Status::BufError => {}
            }
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Inflater")
            .field("total_in", &self.decompress.total_in())
            .field("total_out", &self.decompress.total_out())
            .field("finished", &self.finished)
            .finish()
    }
}

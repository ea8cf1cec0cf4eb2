//! Record iteration over the decompressed byte stream.
//!
//! The record schema itself lives with the caller: anything implementing
//! [`RecordDecoder`] can be driven by a [`RecordReader`].

use std::io::{BufRead, BufReader, Read};

use crate::error::{Error, Result};

/// Buffer placed between the decompressor and the record decoder.
pub const DEFAULT_RECORD_BUFFER: usize = 8192;

/// Context handed to the record decoder alongside the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Encoding {
    pub game_version: u32,
}

/// Decodes one record at a time from a buffered byte stream.
pub trait RecordDecoder {
    type Record;

    /// Returns `Ok(None)` when the stream ends cleanly before a new record starts.
    fn decode<R: BufRead>(
        &mut self,
        encoding: &Encoding,
        reader: &mut R,
    ) -> Result<Option<Self::Record>>;
}

impl<D: RecordDecoder + ?Sized> RecordDecoder for &mut D {
    type Record = D::Record;

    fn decode<R: BufRead>(
        &mut self,
        encoding: &Encoding,
        reader: &mut R,
    ) -> Result<Option<Self::Record>> {
        (**self).decode(encoding, reader)
    }
}

/// Feeds a byte source through a [`RecordDecoder`] until it runs out.
pub struct RecordReader<S, D> {
    reader: BufReader<S>,
    decoder: D,
    encoding: Encoding,
    records_read: u64,
    done: bool,
}

impl<S: Read, D: RecordDecoder> RecordReader<S, D> {
    pub fn new(source: S, encoding: Encoding, decoder: D) -> Self {
        Self::with_capacity(DEFAULT_RECORD_BUFFER, source, encoding, decoder)
    }

    pub fn with_capacity(capacity: usize, source: S, encoding: Encoding, decoder: D) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, source),
            decoder,
            encoding,
            records_read: 0,
            done: false,
        }
    }

    /// Next record, or `None` once the stream has ended cleanly.
    ///
    /// After an error the reader is finished and keeps returning `None`.
    pub fn next_record(&mut self) -> Result<Option<D::Record>> {
        if self.done {
            return Ok(None);
        }

        match self.decoder.decode(&self.encoding, &mut self.reader) {
            Ok(Some(record)) => {
                self.records_read += 1;
                Ok(Some(record))
            }
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }

    /// Calls `f` on every remaining record, in stream order.
    ///
    /// Stops at the first decoding error or the first error returned by `f`.
    pub fn for_each_record<F, E>(&mut self, mut f: F) -> std::result::Result<(), E>
    where
        F: FnMut(D::Record) -> std::result::Result<(), E>,
        E: From<Error>,
    {
        while let Some(record) = self.next_record()? {
            if let Err(e) = f(record) {
                self.done = true;
                return Err(e);
            }
        }
        Ok(())
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    pub fn get_ref(&self) -> &S {
        self.reader.get_ref()
    }

    /// Gives the source back. Bytes already buffered for decoding are lost.
    pub fn into_inner(self) -> S {
        self.reader.into_inner()
    }
}

impl<S: Read, D: RecordDecoder> Iterator for RecordReader<S, D> {
    type Item = Result<D::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

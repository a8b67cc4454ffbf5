//! Record reader over one aligned split.

use std::sync::Arc;

use blocksplit_codec::{BlockCodec, DecompressedRead, reader::from_io_error};
use blocksplit_common::{Result, error::Error, try_or_ret_some_err};
use blocksplit_io::ReadAt;
use log::debug;

use crate::{line_reader::LineReader, planner::FileSplit};

/// One line of decompressed text and the compressed-file offset of the stream
/// at the moment it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: u64,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Stream opened at the split start; the partial leading record (if any)
    /// has not been skipped yet.
    Positioned,
    Reading,
    Exhausted,
    Failed,
    Closed,
}

/// Reads the records owned by one aligned split.
///
/// A split that does not start at offset 0 begins in the middle of a record
/// whose head belongs to the previous split, so that partial record is skipped
/// before the first record is returned. Records are then read while the stream
/// position has not passed the split end, which makes the last record of a
/// split the one that crosses into the next split's first block.
pub struct SplitRecordReader {
    split: FileSplit,
    lines: Option<LineReader<Box<dyn DecompressedRead>>>,
    state: ReaderState,
    start: u64,
    end: u64,
    pos: u64,
    max_record_length: usize,
    discarded: u64,
}

impl SplitRecordReader {
    /// Opens `source` at the split start through `codec`.
    ///
    /// `max_record_length` of `None` means records are never truncated.
    pub fn open(
        codec: &dyn BlockCodec,
        source: Arc<dyn ReadAt>,
        split: FileSplit,
        max_record_length: Option<usize>,
    ) -> Result<SplitRecordReader> {
        let stream = codec.open_decompressed_read(source, split.start)?;
        debug!(
            "opened {} reader for {} [start={}, length={}]",
            codec.kind(),
            split.path.display(),
            split.start,
            split.length
        );
        Ok(SplitRecordReader {
            start: split.start,
            end: split.end(),
            pos: split.start,
            split,
            lines: Some(LineReader::new(stream)),
            state: ReaderState::Positioned,
            max_record_length: max_record_length.unwrap_or(usize::MAX),
            discarded: 0,
        })
    }

    pub fn split(&self) -> &FileSplit {
        &self.split
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Compressed-file offset of the stream after the last record read.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Offset from which progress is measured: the split start, or the stream
    /// position after the partial leading record was skipped.
    pub fn logical_start(&self) -> u64 {
        self.start
    }

    /// Number of partial leading records skipped: 1 for a split starting past
    /// offset 0 once reading began, 0 otherwise.
    pub fn discarded_leading_records(&self) -> u64 {
        self.discarded
    }

    /// Fraction of the split consumed so far, in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        if self.end <= self.start {
            return 0.0;
        }
        let done = self.pos.saturating_sub(self.start) as f64;
        (done / (self.end - self.start) as f64).min(1.0) as f32
    }

    /// Returns the next record of the split, or `None` once the split is done.
    ///
    /// # Errors
    ///
    /// A read or decompression failure moves the reader to
    /// [`ReaderState::Failed`] and releases the stream; later calls return
    /// `InvalidOperation`.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        match self.state {
            ReaderState::Exhausted | ReaderState::Closed => return Ok(None),
            ReaderState::Failed => {
                return Err(Error::invalid_operation("read from a failed split reader"));
            }
            ReaderState::Positioned => {
                if let Err(e) = self.skip_partial_record() {
                    return Err(self.fail(e));
                }
            }
            ReaderState::Reading => {}
        }

        if self.pos > self.end {
            self.state = ReaderState::Exhausted;
            return Ok(None);
        }
        let key = self.pos;
        let mut value = Vec::new();
        let res = match self.lines.as_mut() {
            Some(lines) => lines
                .read_line(&mut value, self.max_record_length)
                .map(|n| (n, lines.get_ref().compressed_position())),
            None => return Err(Error::invalid_operation("split reader without a stream")),
        };
        match res {
            Ok((0, _)) => {
                self.state = ReaderState::Exhausted;
                Ok(None)
            }
            Ok((_, pos)) => {
                self.pos = pos;
                Ok(Some(Record { key, value }))
            }
            Err(e) => Err(self.fail(from_io_error(
                format!("read {}", self.split.path.display()),
                e,
            ))),
        }
    }

    /// Releases the underlying stream. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.lines.take().is_some() {
            debug!(
                "closed reader for {} at position {}",
                self.split.path.display(),
                self.pos
            );
        }
        if self.state != ReaderState::Failed {
            self.state = ReaderState::Closed;
        }
    }

    fn skip_partial_record(&mut self) -> Result<()> {
        if self.split.start != 0 {
            let lines = self
                .lines
                .as_mut()
                .ok_or_else(|| Error::invalid_operation("split reader without a stream"))?;
            let mut scratch = Vec::new();
            lines
                .read_line(&mut scratch, 0)
                .map_err(|e| from_io_error(format!("read {}", self.split.path.display()), e))?;
            self.discarded = 1;
            self.start = lines.get_ref().compressed_position();
            self.pos = self.start;
        }
        self.state = ReaderState::Reading;
        Ok(())
    }

    fn fail(&mut self, e: Error) -> Error {
        self.state = ReaderState::Failed;
        self.lines = None;
        e
    }
}

impl Iterator for SplitRecordReader {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ReaderState::Failed {
            return None;
        }
        try_or_ret_some_err!(self.next_record()).map(Ok)
    }
}

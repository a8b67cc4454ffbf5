//! Write path: records through the compression transform into a store.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use blocksplit_codec::{BlockCodec, CompressedWrite, index_format, reader::from_io_error};
use blocksplit_common::{Result, error::Error};
use blocksplit_io::SealingWrite;
use blocksplit_store::ObjectStore;
use log::debug;

/// Serializes records into the decompressed byte stream.
pub trait RecordEncoder {
    type Record: ?Sized;

    fn encode(&mut self, record: &Self::Record, out: &mut dyn Write) -> std::io::Result<()>;
}

/// Newline-delimited records, the framing read back by
/// [`LineReader`](crate::line_reader::LineReader).
#[derive(Debug, Default, Clone, Copy)]
pub struct LineEncoder;

impl RecordEncoder for LineEncoder {
    type Record = [u8];

    fn encode(&mut self, record: &[u8], out: &mut dyn Write) -> std::io::Result<()> {
        out.write_all(record)?;
        out.write_all(b"\n")
    }
}

pub struct StreamWriter<E: RecordEncoder = LineEncoder> {
    path: PathBuf,
    inner: Box<dyn CompressedWrite>,
    encoder: E,
    records: u64,
}

impl<E: RecordEncoder> StreamWriter<E> {
    /// Creates `path` in `store` and opens a compressing writer on it.
    pub fn create(
        store: &dyn ObjectStore,
        codec: &dyn BlockCodec,
        path: &Path,
        encoder: E,
    ) -> Result<StreamWriter<E>> {
        let sink = store
            .create(path)
            .map_err(|e| Error::io(format!("create {}", path.display()), e))?;
        Self::new(codec, sink, path, encoder)
    }

    /// Wraps an already opened sink; `path` only labels the output.
    pub fn new(
        codec: &dyn BlockCodec,
        sink: Box<dyn SealingWrite>,
        path: &Path,
        encoder: E,
    ) -> Result<StreamWriter<E>> {
        let inner = codec.open_compressed_write(sink)?;
        Ok(StreamWriter {
            path: path.to_path_buf(),
            inner,
            encoder,
            records: 0,
        })
    }

    pub fn write_record(&mut self, record: &E::Record) -> Result<()> {
        self.encoder
            .encode(record, &mut self.inner)
            .map_err(|e| from_io_error(format!("write {}", self.path.display()), e))?;
        self.records += 1;
        Ok(())
    }

    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Compresses what is still buffered and seals the output.
    pub fn finish(self) -> Result<WriteSummary> {
        let StreamWriter {
            path,
            inner,
            records,
            ..
        } = self;
        let written = inner.finish()?;
        let summary = WriteSummary {
            path,
            records,
            block_offsets: written.offsets,
            compressed_size: written.compressed_size,
        };
        debug!(
            "wrote {} records to {} in {} blocks",
            summary.records,
            summary.path.display(),
            summary.block_offsets.len()
        );
        Ok(summary)
    }
}

/// Outcome of a finished [`StreamWriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub path: PathBuf,
    pub records: u64,
    /// Block start offsets, the first one 0.
    pub block_offsets: Vec<u64>,
    pub compressed_size: u64,
}

impl WriteSummary {
    /// Writes the side index artifact next to the data file.
    pub fn write_index(&self, store: &dyn ObjectStore) -> Result<PathBuf> {
        let index_path = index_format::index_path(&self.path);
        let mut sink = store
            .create(&index_path)
            .map_err(|e| Error::io(format!("create {}", index_path.display()), e))?;
        sink.write_all(&index_format::encode(&self.block_offsets))
            .and_then(|_| sink.seal())
            .map_err(|e| Error::io(format!("write {}", index_path.display()), e))?;
        debug!(
            "wrote block index {} ({} blocks)",
            index_path.display(),
            self.block_offsets.len()
        );
        Ok(index_path)
    }
}

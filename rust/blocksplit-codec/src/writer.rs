use std::{io::Write, sync::Arc};

use blocksplit_common::{Result, error::Error};
use blocksplit_io::SealingWrite;
use log::debug;

use crate::{
    CompressedWrite, WrittenBlocks,
    compressors::BlockCompressor,
    container::{self, BlockHeader, FILE_HEADER_LEN, FileHeader},
    reader::into_io_error,
};

/// Compressing writer producing the block container.
///
/// Incoming bytes are accumulated until `block_size` is reached, then compressed
/// and emitted as one block. A block that does not shrink is stored raw.
pub struct BlockWriter {
    sink: Box<dyn SealingWrite>,
    compressor: Arc<dyn BlockCompressor>,
    block_size: usize,
    pending: Vec<u8>,
    position: u64,
    block_offsets: Vec<u64>,
}

impl BlockWriter {
    pub fn new(
        mut sink: Box<dyn SealingWrite>,
        compressor: Arc<dyn BlockCompressor>,
        block_size: usize,
    ) -> Result<BlockWriter> {
        let header = FileHeader::new(compressor.kind());
        sink.write_all(&header.encode())
            .map_err(|e| Error::io("block writer: file header", e))?;
        Ok(BlockWriter {
            sink,
            compressor,
            block_size,
            pending: Vec::new(),
            position: FILE_HEADER_LEN,
            block_offsets: Vec::new(),
        })
    }

    /// Start offsets of the blocks emitted so far.
    pub fn block_offsets(&self) -> &[u64] {
        &self.block_offsets
    }

    fn flush_block(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        // The first block is addressed as offset 0, readers skip the file header.
        let offset = if self.block_offsets.is_empty() {
            0
        } else {
            self.position
        };

        let compressed = self.compressor.compress(&self.pending)?;
        let raw_len = self.pending.len() as u32;
        let payload = if compressed.len() < self.pending.len() {
            &compressed[..]
        } else {
            &self.pending[..]
        };
        let header = BlockHeader {
            raw_len,
            stored_len: payload.len() as u32,
            checksum: container::checksum(&self.pending),
        };
        self.sink
            .write_all(&header.encode())
            .and_then(|_| self.sink.write_all(payload))
            .map_err(|e| Error::io(format!("block writer: block at {}", self.position), e))?;

        self.position += header.block_len();
        self.block_offsets.push(offset);
        self.pending.clear();
        Ok(())
    }
}

impl Write for BlockWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut rest = buf;
        while !rest.is_empty() {
            if self.pending.capacity() == 0 {
                self.pending.reserve(self.block_size.min(1 << 20));
            }
            let take = (self.block_size - self.pending.len()).min(rest.len());
            self.pending.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if self.pending.len() == self.block_size {
                self.flush_block().map_err(into_io_error)?;
            }
        }
        Ok(buf.len())
    }

    /// Block boundaries depend on the block size only; a partial block stays
    /// pending until it fills up or the writer is finished.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl CompressedWrite for BlockWriter {
    fn compressed_position(&self) -> u64 {
        self.position
    }

    fn finish(self: Box<Self>) -> Result<WrittenBlocks> {
        let mut this = *self;
        this.flush_block()?;
        this.sink
            .seal()
            .map_err(|e| Error::io("block writer: seal", e))?;
        debug!(
            "finished {} compressed file: {} blocks, {} bytes",
            this.compressor.kind(),
            this.block_offsets.len(),
            this.position
        );
        Ok(WrittenBlocks {
            offsets: this.block_offsets,
            compressed_size: this.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{io::Write, sync::Arc};

    use blocksplit_io::ReadAt;

    use crate::{
        CodecKind, CompressedWrite,
        compressors::{BlockCompressor, Lz4CompressionMode, Lz4Compressor},
        container::{BLOCK_HEADER_LEN, BlockHeader, FILE_HEADER_LEN, FileHeader},
    };

    use super::BlockWriter;

    fn finish_into_vec(writer: BlockWriter) -> Vec<u64> {
        Box::new(writer).finish().unwrap().offsets
    }

    #[test]
    fn test_block_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.blz4");
        let sink = blocksplit_io::file::FileWriter::create(&path).unwrap();
        let compressor: Arc<dyn BlockCompressor> =
            Arc::new(Lz4Compressor::new(Lz4CompressionMode::Fast));
        let mut writer = BlockWriter::new(Box::new(sink), compressor, 100).unwrap();

        for i in 0..50 {
            writeln!(writer, "row {i:04}").unwrap();
        }
        assert_eq!(writer.block_offsets().len(), 4);
        let offsets = finish_into_vec(writer);
        assert_eq!(offsets.len(), 5);
        assert_eq!(offsets[0], 0);
        assert!(offsets.windows(2).all(|w| w[0] < w[1]));

        let file = blocksplit_io::file::FileReader::open(&path).unwrap();
        let size = file.size().unwrap();
        let header = FileHeader::decode(&file.read_at(0..FILE_HEADER_LEN).unwrap()).unwrap();
        assert_eq!(header.codec, CodecKind::Lz4);

        // Walk the blocks by their headers and compare against the recorded offsets.
        let mut pos = FILE_HEADER_LEN;
        let mut raw_total = 0;
        for (i, &offset) in offsets.iter().enumerate() {
            if i > 0 {
                assert_eq!(offset, pos);
            }
            let bytes = file.read_at(pos..pos + BLOCK_HEADER_LEN).unwrap();
            let block = BlockHeader::decode(&bytes).unwrap();
            raw_total += block.raw_len as u64;
            pos += block.block_len();
        }
        assert_eq!(pos, size);
        assert_eq!(raw_total, 50 * 9);
    }

    #[test]
    fn test_incompressible_block_is_stored_raw() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.blz4");
        let sink = blocksplit_io::file::FileWriter::create(&path).unwrap();
        let compressor: Arc<dyn BlockCompressor> =
            Arc::new(Lz4Compressor::new(Lz4CompressionMode::Fast));
        let mut writer = BlockWriter::new(Box::new(sink), compressor, 64).unwrap();
        let mut rng = fastrand::Rng::with_seed(7);
        let noise = (0..64).map(|_| rng.u8(..)).collect::<Vec<_>>();
        writer.write_all(&noise).unwrap();
        finish_into_vec(writer);

        let file = blocksplit_io::file::FileReader::open(&path).unwrap();
        let bytes = file
            .read_at(FILE_HEADER_LEN..FILE_HEADER_LEN + BLOCK_HEADER_LEN)
            .unwrap();
        let block = BlockHeader::decode(&bytes).unwrap();
        assert!(block.is_stored_raw());
        assert_eq!(block.raw_len, 64);
    }

    #[test]
    fn test_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bzst");
        let sink = blocksplit_io::file::FileWriter::create(&path).unwrap();
        let compressor: Arc<dyn BlockCompressor> =
            Arc::new(crate::compressors::ZstdCompressor::default());
        let writer = BlockWriter::new(Box::new(sink), compressor, 64).unwrap();
        assert_eq!(writer.compressed_position(), FILE_HEADER_LEN);
        let written = Box::new(writer).finish().unwrap();
        assert!(written.offsets.is_empty());
        assert_eq!(written.compressed_size, FILE_HEADER_LEN);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), FILE_HEADER_LEN);
    }
}

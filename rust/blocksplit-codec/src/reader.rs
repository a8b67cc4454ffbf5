use std::{
    io::{BufRead, Read},
    sync::Arc,
};

use blocksplit_common::{
    Result,
    error::{Error, ErrorKind},
};
use blocksplit_io::{ReadAt, StorageProfile};
use log::trace;

use crate::{
    DecompressedRead,
    compressors::BlockCompressor,
    container::{self, BLOCK_HEADER_LEN, BlockHeader, FILE_HEADER_LEN, FileHeader},
};

/// Decompressing reader over the block container.
///
/// Blocks are fetched from the source one at a time, when the previous one has
/// been fully consumed. The decoded block is the read buffer.
pub struct BlockReader {
    source: Arc<dyn ReadAt>,
    compressor: Arc<dyn BlockCompressor>,
    profile: StorageProfile,
    size: u64,
    next_block_pos: u64,
    block: Vec<u8>,
    cursor: usize,
    blocks_loaded: u64,
}

impl BlockReader {
    /// Validates the file header and positions the reader on the block that
    /// starts at `offset`. Offsets inside the file header denote the first block.
    pub fn open(
        source: Arc<dyn ReadAt>,
        compressor: Arc<dyn BlockCompressor>,
        offset: u64,
    ) -> Result<BlockReader> {
        let size = source
            .size()
            .map_err(|e| Error::io("block reader: file size", e))?;
        let header = source
            .read_at(0..FILE_HEADER_LEN)
            .map_err(|e| Error::io("block reader: file header", e))?;
        let header = FileHeader::decode(&header)?;
        if header.codec != compressor.kind() {
            return Err(Error::invalid_format_msg(
                "file header",
                format!(
                    "file is compressed with {}, expected {}",
                    header.codec,
                    compressor.kind()
                ),
            ));
        }
        if offset > size {
            return Err(Error::io(
                format!("block reader: seek to {offset}"),
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("offset beyond end of file ({size} bytes)"),
                ),
            ));
        }
        let profile = source.storage_profile();
        Ok(BlockReader {
            source,
            compressor,
            profile,
            size,
            next_block_pos: offset.max(FILE_HEADER_LEN),
            block: Vec::new(),
            cursor: 0,
            blocks_loaded: 0,
        })
    }

    /// Number of blocks decoded so far.
    pub fn blocks_loaded(&self) -> u64 {
        self.blocks_loaded
    }

    fn load_next_block(&mut self) -> Result<bool> {
        let pos = self.next_block_pos;
        if pos >= self.size {
            return Ok(false);
        }

        let prefetch = self.profile.clamp_io_size(BLOCK_HEADER_LEN as usize) as u64;
        let mut buf = self
            .source
            .read_at(pos..pos + prefetch.max(BLOCK_HEADER_LEN))
            .map_err(|e| Error::io(format!("block reader: block header at {pos}"), e))?;
        if (buf.len() as u64) < BLOCK_HEADER_LEN {
            return Err(Error::invalid_format_msg(
                "block header",
                format!("truncated block header at {pos}"),
            ));
        }
        let header = BlockHeader::decode(&buf)?;
        let block_end = pos + header.block_len();
        if block_end > self.size {
            return Err(Error::invalid_format_msg(
                "block",
                format!("block at {pos} extends beyond end of file"),
            ));
        }
        if (buf.len() as u64) < header.block_len() {
            buf = self
                .source
                .read_at(pos..block_end)
                .map_err(|e| Error::io(format!("block reader: block at {pos}"), e))?;
        }
        buf.truncate(header.block_len() as usize);

        let block = if header.is_stored_raw() {
            buf.drain(..BLOCK_HEADER_LEN as usize);
            buf
        } else {
            self.compressor
                .decompress(&buf[BLOCK_HEADER_LEN as usize..], header.raw_len as usize)?
        };
        if container::checksum(&block) != header.checksum {
            return Err(Error::checksum_mismatch(format!("block at {pos}")));
        }

        trace!(
            "loaded block at {pos}: {} stored bytes, {} raw bytes",
            header.stored_len, header.raw_len
        );
        self.block = block;
        self.cursor = 0;
        self.next_block_pos = block_end;
        self.blocks_loaded += 1;
        Ok(true)
    }
}

impl BufRead for BlockReader {
    fn fill_buf(&mut self) -> std::io::Result<&[u8]> {
        while self.cursor >= self.block.len() {
            if !self.load_next_block().map_err(into_io_error)? {
                return Ok(&[]);
            }
        }
        Ok(&self.block[self.cursor..])
    }

    fn consume(&mut self, amt: usize) {
        self.cursor = (self.cursor + amt).min(self.block.len());
    }
}

impl Read for BlockReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl DecompressedRead for BlockReader {
    fn compressed_position(&self) -> u64 {
        self.next_block_pos
    }
}

/// Wraps a codec error for transport through `std::io` interfaces.
pub fn into_io_error(e: Error) -> std::io::Error {
    match e.into_kind() {
        ErrorKind::Io { source, .. } => source,
        kind => std::io::Error::new(std::io::ErrorKind::InvalidData, Error::from(kind)),
    }
}

/// Recovers a codec error that traveled through `std::io`, or wraps a plain
/// I/O error with `context`.
pub fn from_io_error(context: impl Into<String>, e: std::io::Error) -> Error {
    if !e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
        return Error::io(context, e);
    }
    match e.into_inner().map(|inner| inner.downcast::<Error>()) {
        Some(Ok(inner)) => *inner,
        _ => Error::invalid_operation("unwrap io error"),
    }
}

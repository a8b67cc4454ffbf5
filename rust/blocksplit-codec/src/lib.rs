//! Block-compression transform for splittable files.
//!
//! A compressed file is a fixed header followed by a sequence of independently
//! decompressable blocks (see [`container`]). The codec is exposed to the rest of
//! the system only through the [`BlockCodec`] capability: open a decompressed
//! reader at a block boundary, or open a compressing writer. Which compressor sits
//! behind it (LZ4, Zstd) is selected by [`CodecKind`].
//!
//! The side index artifact that records block start offsets is defined in
//! [`index_format`].

use std::{
    io::{BufRead, Write},
    path::Path,
    str::FromStr,
    sync::Arc,
};

use blocksplit_common::{Result, error::Error};
use blocksplit_io::{ReadAt, SealingWrite};
use serde::{Deserialize, Serialize};

pub mod compressors;
pub mod container;
pub mod index_format;
pub mod reader;
pub mod writer;

use compressors::{BlockCompressor, Lz4Compressor, ZstdCompressor};

/// Identifies the block compressor of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    #[default]
    Lz4,
    Zstd,
}

impl CodecKind {
    pub const ALL: [CodecKind; 2] = [CodecKind::Lz4, CodecKind::Zstd];

    /// Codec id as stored in the container header.
    pub fn id(self) -> u32 {
        match self {
            CodecKind::Lz4 => 1,
            CodecKind::Zstd => 2,
        }
    }

    pub fn from_id(id: u32) -> Option<CodecKind> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    pub fn name(self) -> &'static str {
        match self {
            CodecKind::Lz4 => "lz4",
            CodecKind::Zstd => "zstd",
        }
    }

    /// File extension (including the leading dot) of files written with this codec.
    pub fn extension(self) -> &'static str {
        match self {
            CodecKind::Lz4 => ".blz4",
            CodecKind::Zstd => ".bzst",
        }
    }
}

impl std::fmt::Display for CodecKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<CodecKind> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_arg("codec", format!("unknown codec '{s}'")))
    }
}

/// Tuning knobs of the write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecOptions {
    /// Uncompressed bytes per block.
    pub block_size: usize,
    pub level: i32,
}

impl CodecOptions {
    pub const DEFAULT_BLOCK_SIZE: usize = 4 * 1024 * 1024;
    pub const MAX_BLOCK_SIZE: usize = i32::MAX as usize;

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            block_size: Self::DEFAULT_BLOCK_SIZE,
            level: ZstdCompressor::DEFAULT_LEVEL,
        }
    }
}

/// A decompressed byte stream over a block-compressed file.
///
/// `fill_buf` never returns more than the rest of the current block, so the
/// compressed position advances one whole block at a time.
pub trait DecompressedRead: BufRead + Send {
    /// Offset in the compressed file where the next block will be fetched from.
    fn compressed_position(&self) -> u64;
}

/// A compressing writer. Bytes written are grouped into blocks; nothing is
/// durable until [`finish`](CompressedWrite::finish) seals the sink.
pub trait CompressedWrite: Write + Send {
    /// Number of compressed bytes emitted to the sink so far.
    fn compressed_position(&self) -> u64;

    /// Compresses pending data and seals the sink.
    fn finish(self: Box<Self>) -> Result<WrittenBlocks>;
}

/// Layout of a finished compressed file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WrittenBlocks {
    /// Start offset of every block, the first one recorded as 0.
    pub offsets: Vec<u64>,
    /// Total size of the compressed file.
    pub compressed_size: u64,
}

/// The compression transform capability.
pub trait BlockCodec: Send + Sync + 'static {
    fn kind(&self) -> CodecKind;

    fn default_extension(&self) -> &'static str {
        self.kind().extension()
    }

    /// Opens a decompressed stream starting at the block that begins at `offset`.
    /// Offset 0 denotes the first block.
    fn open_decompressed_read(
        &self,
        source: Arc<dyn ReadAt>,
        offset: u64,
    ) -> Result<Box<dyn DecompressedRead>>;

    /// Opens a compressing writer on top of `sink`.
    fn open_compressed_write(&self, sink: Box<dyn SealingWrite>)
    -> Result<Box<dyn CompressedWrite>>;
}

/// [`BlockCodec`] implemented with the block container framing over a
/// [`BlockCompressor`].
pub struct ContainerCodec {
    compressor: Arc<dyn BlockCompressor>,
    block_size: usize,
}

impl ContainerCodec {
    pub fn new(compressor: Arc<dyn BlockCompressor>, block_size: usize) -> Result<ContainerCodec> {
        if block_size == 0 || block_size > CodecOptions::MAX_BLOCK_SIZE {
            return Err(Error::invalid_arg(
                "block_size",
                format!("{block_size} is out of range"),
            ));
        }
        Ok(ContainerCodec {
            compressor,
            block_size,
        })
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl BlockCodec for ContainerCodec {
    fn kind(&self) -> CodecKind {
        self.compressor.kind()
    }

    fn open_decompressed_read(
        &self,
        source: Arc<dyn ReadAt>,
        offset: u64,
    ) -> Result<Box<dyn DecompressedRead>> {
        let reader = reader::BlockReader::open(source, self.compressor.clone(), offset)?;
        Ok(Box::new(reader))
    }

    fn open_compressed_write(
        &self,
        sink: Box<dyn SealingWrite>,
    ) -> Result<Box<dyn CompressedWrite>> {
        let writer = writer::BlockWriter::new(sink, self.compressor.clone(), self.block_size)?;
        Ok(Box::new(writer))
    }
}

/// Instantiates the codec for `kind`.
pub fn create_codec(kind: CodecKind, options: &CodecOptions) -> Result<Arc<dyn BlockCodec>> {
    let compressor: Arc<dyn BlockCompressor> = match kind {
        CodecKind::Lz4 => Arc::new(Lz4Compressor::with_level(options.level)),
        CodecKind::Zstd => Arc::new(ZstdCompressor::new(options.level)),
    };
    Ok(Arc::new(ContainerCodec::new(compressor, options.block_size)?))
}

/// Resolves codecs by file extension.
pub struct CodecFactory {
    codecs: Vec<Arc<dyn BlockCodec>>,
}

impl CodecFactory {
    /// Factory with every known codec, using `options` for the write path.
    pub fn new(options: &CodecOptions) -> Result<CodecFactory> {
        let codecs = CodecKind::ALL
            .into_iter()
            .map(|kind| create_codec(kind, options))
            .collect::<Result<Vec<_>>>()?;
        Ok(CodecFactory { codecs })
    }

    pub fn codec(&self, kind: CodecKind) -> Option<Arc<dyn BlockCodec>> {
        self.codecs.iter().find(|c| c.kind() == kind).cloned()
    }

    /// Returns the codec whose extension `path` carries.
    pub fn codec_for_path(&self, path: &Path) -> Option<Arc<dyn BlockCodec>> {
        let name = path.file_name()?.to_str()?;
        self.codecs
            .iter()
            .find(|c| name.ends_with(c.default_extension()))
            .cloned()
    }

    pub fn is_codec_path(&self, path: &Path) -> bool {
        self.codec_for_path(path).is_some()
    }
}

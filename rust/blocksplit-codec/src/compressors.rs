//! Per-block compression primitives. A compressor turns one block of
//! uncompressed bytes into an opaque payload and back; framing, checksums and
//! positioning belong to the container.

use blocksplit_common::{Result, error::Error};

use crate::CodecKind;

pub trait BlockCompressor: Send + Sync + 'static {
    fn kind(&self) -> CodecKind;

    /// Compresses a whole block.
    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>>;

    /// Decompresses a payload that is known to expand to `uncompressed_size` bytes.
    fn decompress(&self, encoded: &[u8], uncompressed_size: usize) -> Result<Vec<u8>>;
}

pub struct Lz4Compressor {
    mode: Lz4CompressionMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz4CompressionMode {
    Fast,
    HighCompression(i32),
}

impl Lz4Compressor {
    pub fn new(mode: Lz4CompressionMode) -> Lz4Compressor {
        Lz4Compressor { mode }
    }

    /// Levels above 3 select the high-compression mode.
    pub fn with_level(level: i32) -> Lz4Compressor {
        if level > 3 {
            Self::new(Lz4CompressionMode::HighCompression(level))
        } else {
            Self::new(Lz4CompressionMode::Fast)
        }
    }
}

impl BlockCompressor for Lz4Compressor {
    fn kind(&self) -> CodecKind {
        CodecKind::Lz4
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mode = match self.mode {
            Lz4CompressionMode::Fast => lz4::block::CompressionMode::FAST(1),
            Lz4CompressionMode::HighCompression(level) => {
                lz4::block::CompressionMode::HIGHCOMPRESSION(level)
            }
        };
        lz4::block::compress(bytes, Some(mode), false)
            .map_err(|e| Error::io("Failed to compress block with LZ4", e))
    }

    fn decompress(&self, encoded: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let size = i32::try_from(uncompressed_size)
            .map_err(|_| Error::invalid_format_msg("lz4 block", "block too large"))?;
        let decoded = lz4::block::decompress(encoded, Some(size))
            .map_err(|e| Error::io("Failed to decompress block with LZ4", e))?;
        if decoded.len() != uncompressed_size {
            return Err(Error::invalid_format("LZ4 decompressed size mismatch"));
        }
        Ok(decoded)
    }
}

pub struct ZstdCompressor {
    level: i32,
}

impl ZstdCompressor {
    pub const DEFAULT_LEVEL: i32 = 3;

    pub fn new(level: i32) -> ZstdCompressor {
        ZstdCompressor { level }
    }
}

impl Default for ZstdCompressor {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LEVEL)
    }
}

impl BlockCompressor for ZstdCompressor {
    fn kind(&self) -> CodecKind {
        CodecKind::Zstd
    }

    fn compress(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        zstd::stream::encode_all(bytes, self.level)
            .map_err(|e| Error::io("Failed to compress block with ZSTD", e))
    }

    fn decompress(&self, encoded: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
        let decoded = zstd::stream::decode_all(encoded)
            .map_err(|e| Error::io("Failed to decompress block with ZSTD", e))?;
        if decoded.len() != uncompressed_size {
            return Err(Error::invalid_format("ZSTD decompressed size mismatch"));
        }
        Ok(decoded)
    }
}

//! Block container framing.
//!
//! ```text
//! +--------------------------------------------+
//! | magic "BSPLTBLK" | version u32 | codec u32 |   file header, 16 bytes
//! +--------------------------------------------+
//! | raw_len u32 | stored_len u32 | xxh32 u32   |   block header, 12 bytes
//! | payload (stored_len bytes)                 |
//! +--------------------------------------------+
//! | ... more blocks, no footer ...             |
//! +--------------------------------------------+
//! ```
//!
//! All integers are little-endian. A block whose `stored_len` equals its
//! `raw_len` is stored uncompressed. The checksum covers the uncompressed bytes.

use blocksplit_common::{Result, error::Error, verify_data};

use crate::CodecKind;

pub const MAGIC: &[u8; 8] = b"BSPLTBLK";
pub const VERSION: u32 = 1;
pub const FILE_HEADER_LEN: u64 = 16;
pub const BLOCK_HEADER_LEN: u64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u32,
    pub codec: CodecKind,
}

impl FileHeader {
    pub fn new(codec: CodecKind) -> FileHeader {
        FileHeader {
            version: VERSION,
            codec,
        }
    }

    pub fn encode(&self) -> [u8; FILE_HEADER_LEN as usize] {
        let mut buf = [0u8; FILE_HEADER_LEN as usize];
        buf[..8].copy_from_slice(MAGIC);
        buf[8..12].copy_from_slice(&self.version.to_le_bytes());
        buf[12..16].copy_from_slice(&self.codec.id().to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<FileHeader> {
        verify_data!(file_header, buf.len() >= FILE_HEADER_LEN as usize);
        if &buf[..8] != MAGIC {
            return Err(Error::invalid_format_msg(
                "file header",
                format!("bad magic {:?}", &buf[..8]),
            ));
        }
        let version = read_u32(buf, 8);
        if version != VERSION {
            return Err(Error::invalid_format_msg(
                "file header",
                format!("unsupported version {version}"),
            ));
        }
        let codec_id = read_u32(buf, 12);
        let codec = CodecKind::from_id(codec_id).ok_or_else(|| {
            Error::invalid_format_msg("file header", format!("unknown codec id {codec_id}"))
        })?;
        Ok(FileHeader { version, codec })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub raw_len: u32,
    pub stored_len: u32,
    pub checksum: u32,
}

impl BlockHeader {
    pub fn is_stored_raw(&self) -> bool {
        self.raw_len == self.stored_len
    }

    /// Total size of the block in the file, header included.
    pub fn block_len(&self) -> u64 {
        BLOCK_HEADER_LEN + self.stored_len as u64
    }

    pub fn encode(&self) -> [u8; BLOCK_HEADER_LEN as usize] {
        let mut buf = [0u8; BLOCK_HEADER_LEN as usize];
        buf[..4].copy_from_slice(&self.raw_len.to_le_bytes());
        buf[4..8].copy_from_slice(&self.stored_len.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<BlockHeader> {
        verify_data!(block_header, buf.len() >= BLOCK_HEADER_LEN as usize);
        Ok(BlockHeader {
            raw_len: read_u32(buf, 0),
            stored_len: read_u32(buf, 4),
            checksum: read_u32(buf, 8),
        })
    }
}

pub fn checksum(bytes: &[u8]) -> u32 {
    xxhash_rust::xxh32::xxh32(bytes, 0)
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[pos..pos + 4]);
    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_header() {
        let encoded = FileHeader::new(CodecKind::Zstd).encode();
        assert_eq!(&encoded[..8], MAGIC);
        let header = FileHeader::decode(&encoded).unwrap();
        assert_eq!(header.codec, CodecKind::Zstd);

        let mut bad = encoded;
        bad[0] = b'X';
        assert!(FileHeader::decode(&bad).is_err());

        let mut bad = encoded;
        bad[12] = 77;
        assert!(FileHeader::decode(&bad).is_err());

        assert!(FileHeader::decode(&encoded[..10]).is_err());
    }

    #[test]
    fn test_block_header() {
        let header = BlockHeader {
            raw_len: 100,
            stored_len: 40,
            checksum: checksum(b"payload"),
        };
        assert!(!header.is_stored_raw());
        assert_eq!(header.block_len(), 52);
        assert_eq!(BlockHeader::decode(&header.encode()).unwrap(), header);
        assert!(BlockHeader::decode(&[0u8; 5]).is_err());
    }
}

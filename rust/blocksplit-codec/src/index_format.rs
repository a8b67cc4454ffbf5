//! Side index artifact.
//!
//! For a compressed file at `P` the index lives at `P.index` and lists the
//! start offset of every block:
//!
//! ```text
//! u64 LE  block count N
//! N x u64 LE  block start offsets, first one 0
//! ```

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use blocksplit_common::{Result, error::Error};
use blocksplit_io::utils::read_fully;

pub const INDEX_SUFFIX: &str = ".index";

const ENTRY_LEN: u64 = 8;

/// Location of the index artifact belonging to `data_path`.
pub fn index_path(data_path: &Path) -> PathBuf {
    let mut path = data_path.as_os_str().to_owned();
    path.push(INDEX_SUFFIX);
    PathBuf::from(path)
}

pub fn is_index_path(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(INDEX_SUFFIX))
}

pub fn encode(offsets: &[u64]) -> Vec<u8> {
    let mut buf = Vec::with_capacity((offsets.len() + 1) * ENTRY_LEN as usize);
    buf.extend_from_slice(&(offsets.len() as u64).to_le_bytes());
    for offset in offsets {
        buf.extend_from_slice(&offset.to_le_bytes());
    }
    buf
}

/// Parses an index artifact of `len` bytes.
///
/// Only the framing is checked here: the count must agree with the artifact
/// length. Ordering of the offsets is validated by the consumer.
pub fn decode<R: Read>(mut reader: R, len: u64) -> Result<Vec<u64>> {
    if len < ENTRY_LEN {
        return Err(Error::invalid_format_msg(
            "block index",
            format!("artifact of {len} bytes is too short"),
        ));
    }
    let count = read_u64(&mut reader)?;
    let expected = count
        .checked_mul(ENTRY_LEN)
        .and_then(|n| n.checked_add(ENTRY_LEN));
    if expected != Some(len) {
        return Err(Error::invalid_format_msg(
            "block index",
            format!("{count} entries do not match artifact length {len}"),
        ));
    }
    (0..count).map(|_| read_u64(&mut reader)).collect()
}

fn read_u64<R: Read>(reader: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    let n = read_fully(reader, &mut buf).map_err(|e| Error::io("block index", e))?;
    if n < buf.len() {
        return Err(Error::invalid_format_msg("block index", "truncated artifact"));
    }
    Ok(u64::from_le_bytes(buf))
}

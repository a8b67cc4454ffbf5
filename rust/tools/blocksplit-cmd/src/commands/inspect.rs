//! Inspect command implementation

use std::path::Path;

use anyhow::{Context, Result};
use blocksplit::BlockIndex;
use blocksplit_codec::container::{BLOCK_HEADER_LEN, BlockHeader, FILE_HEADER_LEN, FileHeader};
use blocksplit_io::ReadAt;
use blocksplit_store::ObjectStore;
use serde::Serialize;

use crate::utils;

#[derive(Serialize)]
struct InspectSummary {
    path: String,
    codec: String,
    format_version: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    block_count: usize,
    raw_block_count: usize,
    index: IndexInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    blocks: Vec<BlockInfo>,
}

#[derive(Serialize)]
struct IndexInfo {
    present: bool,
    entries: usize,
    matches_blocks: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct BlockInfo {
    offset: u64,
    stored_len: u32,
    raw_len: u32,
}

/// Run the inspect command
pub fn run(detail: u8, file: String) -> Result<()> {
    let path = utils::absolute_path(&file)?;
    let store = utils::local_store();
    let summary = inspect(store.as_ref(), &path, detail > 0)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn inspect(store: &dyn ObjectStore, path: &Path, list_blocks: bool) -> Result<InspectSummary> {
    let reader = store
        .open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let size = reader.size()?;
    let header = FileHeader::decode(&reader.read_at(0..FILE_HEADER_LEN)?)
        .with_context(|| format!("{} is not a block-compressed file", path.display()))?;

    // Offsets as the index records them: the first block at 0.
    let mut offsets = Vec::new();
    let mut blocks = Vec::new();
    let mut uncompressed_size = 0;
    let mut raw_block_count = 0;
    let mut pos = FILE_HEADER_LEN;
    while pos < size {
        let block = BlockHeader::decode(&reader.read_at(pos..pos + BLOCK_HEADER_LEN)?)
            .with_context(|| format!("Invalid block header at {pos}"))?;
        let offset = if offsets.is_empty() { 0 } else { pos };
        offsets.push(offset);
        uncompressed_size += block.raw_len as u64;
        if block.is_stored_raw() {
            raw_block_count += 1;
        }
        if list_blocks {
            blocks.push(BlockInfo {
                offset,
                stored_len: block.stored_len,
                raw_len: block.raw_len,
            });
        }
        pos += block.block_len();
    }
    anyhow::ensure!(pos == size, "last block extends beyond the end of the file");

    let index = match BlockIndex::load(store, path) {
        Ok(index) => IndexInfo {
            present: true,
            entries: index.len(),
            matches_blocks: index.offsets() == offsets.as_slice(),
            error: None,
        },
        Err(e) => IndexInfo {
            present: !matches!(
                e.kind(),
                blocksplit_common::error::ErrorKind::IndexMissing { .. }
            ),
            entries: 0,
            matches_blocks: false,
            error: Some(e.to_string()),
        },
    };

    Ok(InspectSummary {
        path: path.display().to_string(),
        codec: header.codec.to_string(),
        format_version: header.version,
        compressed_size: size,
        uncompressed_size,
        block_count: offsets.len(),
        raw_block_count,
        index,
        blocks,
    })
}

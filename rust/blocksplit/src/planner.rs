//! Snapping naive byte ranges onto block boundaries.

use std::path::PathBuf;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::index::BlockIndex;

/// A byte range `[start, start + length)` of one file in compressed-file
/// coordinates. The same type carries both naive and aligned ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSplit {
    pub path: PathBuf,
    pub start: u64,
    pub length: u64,
    /// Placement hints, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,
}

impl FileSplit {
    pub fn new(path: impl Into<PathBuf>, start: u64, length: u64) -> FileSplit {
        FileSplit {
            path: path.into(),
            start,
            length,
            hosts: Vec::new(),
        }
    }

    /// Exclusive end offset.
    pub fn end(&self) -> u64 {
        self.start + self.length
    }
}

/// Turns one naive split into its block-aligned counterpart.
///
/// Returns:
/// * the naive split unchanged when `index` is empty;
/// * `None` when no block starts inside `[split.start, split.end())`, since all
///   of its bytes belong to a block claimed by an earlier split;
/// * otherwise the split `[align_start, align_end)`.
///
/// Applied to a contiguous ordered partition of `[0, file_len)`, the surviving
/// splits again partition `[0, file_len)` with every boundary on a block start
/// or at the file end.
pub fn plan(split: &FileSplit, index: &BlockIndex, file_len: u64) -> Option<FileSplit> {
    if index.is_empty() {
        return Some(split.clone());
    }

    let Some(start) = index.align_start(split.start, split.end()) else {
        debug!(
            "dropping split of {} [start={}, length={}]: no block starts inside",
            split.path.display(),
            split.start,
            split.length
        );
        return None;
    };
    let end = index.align_end(split.end(), file_len);

    debug!(
        "added block split for {} [start={start}, length={}]",
        split.path.display(),
        end - start
    );
    Some(FileSplit {
        path: split.path.clone(),
        start,
        length: end - start,
        hosts: split.hosts.clone(),
    })
}

//! Block start offsets of one compressed file and the alignment lookups over them.

use std::path::Path;

use blocksplit_codec::index_format;
use blocksplit_common::{
    Result,
    error::{Error, ErrorKind},
};
use blocksplit_io::{ReadAdapter, ReadAt};
use blocksplit_store::ObjectStore;
use log::debug;

/// Sorted start offsets `B_0 < B_1 < ... < B_{n-1}` of the independently
/// decompressable blocks of a file, with `B_0 == 0` when non-empty.
///
/// An empty index is legal (a file smaller than one block may have none); no
/// alignment is possible for such a file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockIndex {
    offsets: Vec<u64>,
}

impl BlockIndex {
    /// Builds an index from block start offsets.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` if the offsets are not strictly increasing or do not
    /// start at 0.
    pub fn new(offsets: Vec<u64>) -> Result<BlockIndex> {
        check_offsets(&offsets).map_err(|msg| Error::invalid_arg("offsets", msg))?;
        Ok(BlockIndex { offsets })
    }

    pub fn empty() -> BlockIndex {
        BlockIndex::default()
    }

    /// Reads the side index artifact of `data_path` from `store`.
    ///
    /// # Errors
    ///
    /// * `IndexMissing` when the artifact does not exist.
    /// * `IndexCorrupt` when it is truncated, carries trailing bytes, or its
    ///   offsets are not strictly increasing from 0.
    /// * `Io` for any other storage failure.
    pub fn load(store: &dyn ObjectStore, data_path: &Path) -> Result<BlockIndex> {
        let path = index_format::index_path(data_path);
        let reader = match store.open(&path) {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::index_missing(data_path));
            }
            Err(e) => return Err(Error::io(format!("open {}", path.display()), e)),
        };
        let len = reader
            .size()
            .map_err(|e| Error::io(format!("size of {}", path.display()), e))?;
        let offsets = index_format::decode(ReadAdapter::new(reader), len).map_err(|e| {
            match e.into_kind() {
                ErrorKind::InvalidFormat { message, .. } => Error::index_corrupt(data_path, message),
                kind => kind.into(),
            }
        })?;
        check_offsets(&offsets).map_err(|msg| Error::index_corrupt(data_path, msg))?;

        debug!(
            "loaded block index for {}: {} blocks",
            data_path.display(),
            offsets.len()
        );
        Ok(BlockIndex { offsets })
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn offsets(&self) -> &[u64] {
        &self.offsets
    }

    /// Finds the first block that starts inside the half-open window `[start, end)`.
    ///
    /// # Arguments
    ///
    /// * `start` - Inclusive start of the window
    /// * `end` - Exclusive end of the window
    ///
    /// # Returns
    ///
    /// The smallest `B_i` with `start <= B_i < end`, or `None` when the window
    /// lies entirely inside a block that started before it.
    pub fn align_start(&self, start: u64, end: u64) -> Option<u64> {
        let i = self.offsets.partition_point(|&b| b < start);
        self.offsets.get(i).copied().filter(|&b| b < end)
    }

    /// Finds where the split ending at `end` must actually end.
    ///
    /// # Returns
    ///
    /// The smallest `B_i >= end`, or `file_len` when no block starts at or
    /// after `end`.
    pub fn align_end(&self, end: u64, file_len: u64) -> u64 {
        let i = self.offsets.partition_point(|&b| b < end);
        self.offsets.get(i).copied().unwrap_or(file_len)
    }
}

fn check_offsets(offsets: &[u64]) -> std::result::Result<(), String> {
    if let Some(&first) = offsets.first() {
        if first != 0 {
            return Err(format!("first block starts at {first}, expected 0"));
        }
    }
    if let Some(w) = offsets.windows(2).find(|w| w[0] >= w[1]) {
        return Err(format!("offsets not increasing: {} followed by {}", w[0], w[1]));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use blocksplit_codec::index_format;
    use blocksplit_common::error::ErrorKind;
    use blocksplit_store::MemoryObjectStore;
    use proptest::prelude::*;

    use super::BlockIndex;

    fn index(offsets: &[u64]) -> BlockIndex {
        BlockIndex::new(offsets.to_vec()).unwrap()
    }

    #[test]
    fn test_align_start() {
        let index = index(&[0, 1000, 2500]);
        assert_eq!(index.align_start(0, 1500), Some(0));
        assert_eq!(index.align_start(1500, 3000), Some(2500));
        assert_eq!(index.align_start(3000, 4000), None);
        assert_eq!(index.align_start(1000, 1001), Some(1000));
        assert_eq!(index.align_start(1001, 2500), None);
        assert_eq!(index.align_start(500, 500), None);
    }

    #[test]
    fn test_align_end() {
        let index = index(&[0, 1000, 2500]);
        assert_eq!(index.align_end(1500, 4000), 2500);
        assert_eq!(index.align_end(2500, 4000), 2500);
        assert_eq!(index.align_end(3000, 4000), 4000);
        assert_eq!(index.align_end(0, 4000), 0);

        let empty = BlockIndex::empty();
        assert_eq!(empty.align_end(10, 4000), 4000);
        assert_eq!(empty.align_start(0, 4000), None);
    }

    #[test]
    fn test_new_validates_offsets() {
        assert!(BlockIndex::new(vec![]).unwrap().is_empty());
        assert!(BlockIndex::new(vec![0, 10, 10]).is_err());
        assert!(BlockIndex::new(vec![0, 20, 10]).is_err());
        assert!(BlockIndex::new(vec![5, 10]).is_err());
        assert_eq!(index(&[0, 7]).len(), 2);
    }

    #[test]
    fn test_load() {
        let store = MemoryObjectStore::new();
        let data = Path::new("/in/a.blz4");
        store.put(index_format::index_path(data), index_format::encode(&[0, 100, 250]));
        let loaded = BlockIndex::load(&store, data).unwrap();
        assert_eq!(loaded.offsets(), &[0, 100, 250]);

        let err = BlockIndex::load(&store, Path::new("/in/b.blz4")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IndexMissing { .. }));
        assert!(err.is_index_error());
    }

    #[test]
    fn test_load_corrupt() {
        let store = MemoryObjectStore::new();
        let cases: Vec<(&str, Vec<u8>)> = vec![
            ("/in/unordered.blz4", index_format::encode(&[0, 300, 200])),
            ("/in/no-zero.blz4", index_format::encode(&[16, 300])),
            ("/in/truncated.blz4", index_format::encode(&[0, 300])[..20].to_vec()),
            ("/in/trailing.blz4", {
                let mut bytes = index_format::encode(&[0, 300]);
                bytes.extend_from_slice(&[1, 2, 3]);
                bytes
            }),
            ("/in/tiny.blz4", vec![1, 2]),
        ];
        for (path, bytes) in cases {
            store.put(index_format::index_path(Path::new(path)), bytes);
            let err = BlockIndex::load(&store, Path::new(path)).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::IndexCorrupt { .. }),
                "{path}: {err}"
            );
        }
    }

    fn offsets_strategy() -> impl Strategy<Value = (Vec<u64>, u64)> {
        (proptest::collection::btree_set(1u64..10_000, 0..40), 1u64..2_000).prop_map(
            |(rest, tail)| {
                let mut offsets = vec![0];
                offsets.extend(rest);
                let file_len = offsets.last().copied().unwrap_or_default() + tail;
                (offsets, file_len)
            },
        )
    }

    proptest! {
        #[test]
        fn align_start_finds_first_block_in_window(
            (offsets, file_len) in offsets_strategy(),
            a in 0u64..12_000,
            b in 0u64..12_000,
        ) {
            let (start, end) = (a.min(b).min(file_len), a.max(b).min(file_len));
            let index = BlockIndex::new(offsets.clone()).unwrap();
            match index.align_start(start, end) {
                Some(v) => {
                    prop_assert!(start <= v && v < end);
                    prop_assert!(offsets.contains(&v));
                    prop_assert!(!offsets.iter().any(|&o| start <= o && o < v));
                }
                None => prop_assert!(!offsets.iter().any(|&o| start <= o && o < end)),
            }
        }

        #[test]
        fn align_end_is_smallest_offset_not_below_end(
            (offsets, file_len) in offsets_strategy(),
            e in 0u64..12_000,
        ) {
            let e = e.min(file_len);
            let index = BlockIndex::new(offsets.clone()).unwrap();
            let v = index.align_end(e, file_len);
            prop_assert!(v >= e);
            let expected = offsets.iter().copied().find(|&o| o >= e).unwrap_or(file_len);
            prop_assert_eq!(v, expected);
        }
    }
}

use std::{path::Path, sync::Arc};

use blocksplit_common::Result;
use blocksplit_store::{FileStatus, ObjectStore};
use log::debug;

use crate::index::BlockIndex;

/// Single-slot memo of the most recently loaded [`BlockIndex`].
///
/// Split planning visits the naive splits of one file before moving on to the
/// next, so remembering only the last file avoids reloading its index for every
/// split. A request for any other file simply replaces the slot. The cache
/// belongs to one planning pass and is not meant to be shared between threads.
#[derive(Default)]
pub struct IndexCache {
    slot: Option<CacheSlot>,
    loads: u64,
}

struct CacheSlot {
    file: FileStatus,
    index: Arc<BlockIndex>,
}

impl IndexCache {
    pub fn new() -> IndexCache {
        IndexCache::default()
    }

    /// Returns the index of `file`, loading it from `store` unless it is the
    /// file served by the previous call.
    ///
    /// A file is identified by its path and length, so a file rewritten in
    /// place with a different size is not served a stale index.
    pub fn get_or_load(
        &mut self,
        store: &dyn ObjectStore,
        file: &FileStatus,
    ) -> Result<Arc<BlockIndex>> {
        if let Some(slot) = &self.slot {
            if slot.file.path == file.path && slot.file.len == file.len {
                debug!("block index cache hit for {}", file.path.display());
                return Ok(slot.index.clone());
            }
        }

        self.slot = None;
        let index = Arc::new(BlockIndex::load(store, &file.path)?);
        self.loads += 1;
        self.slot = Some(CacheSlot {
            file: file.clone(),
            index: index.clone(),
        });
        Ok(index)
    }

    /// Path of the file whose index is currently cached.
    pub fn cached_path(&self) -> Option<&Path> {
        self.slot.as_ref().map(|slot| slot.file.path.as_path())
    }

    /// Number of index loads performed so far.
    pub fn loads(&self) -> u64 {
        self.loads
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use blocksplit_codec::index_format;
    use blocksplit_store::{FileStatus, MemoryObjectStore};

    use super::IndexCache;

    fn put_index(store: &MemoryObjectStore, path: &str, offsets: &[u64]) -> FileStatus {
        store.put(path, vec![0; 64]);
        store.put(
            index_format::index_path(Path::new(path)),
            index_format::encode(offsets),
        );
        FileStatus::file(path, 64)
    }

    #[test]
    fn test_consecutive_requests_share_one_load() {
        let store = MemoryObjectStore::new();
        let a = put_index(&store, "/in/a.blz4", &[0, 10]);
        let b = put_index(&store, "/in/b.blz4", &[0, 20, 40]);

        let mut cache = IndexCache::new();
        for _ in 0..3 {
            assert_eq!(cache.get_or_load(&store, &a).unwrap().offsets(), &[0, 10]);
        }
        assert_eq!(cache.loads(), 1);
        assert_eq!(cache.get_or_load(&store, &b).unwrap().len(), 3);
        assert_eq!(cache.cached_path(), Some(Path::new("/in/b.blz4")));
        assert_eq!(cache.loads(), 2);

        // Interleaved requests stay correct, they just reload.
        assert_eq!(cache.get_or_load(&store, &a).unwrap().len(), 2);
        assert_eq!(cache.get_or_load(&store, &b).unwrap().len(), 3);
        assert_eq!(cache.loads(), 4);
    }

    #[test]
    fn test_changed_length_reloads() {
        let store = MemoryObjectStore::new();
        let a = put_index(&store, "/in/a.blz4", &[0, 10]);
        let mut cache = IndexCache::new();
        cache.get_or_load(&store, &a).unwrap();

        let grown = FileStatus::file("/in/a.blz4", 128);
        cache.get_or_load(&store, &grown).unwrap();
        assert_eq!(cache.loads(), 2);
    }

    #[test]
    fn test_failed_load_empties_slot() {
        let store = MemoryObjectStore::new();
        let a = put_index(&store, "/in/a.blz4", &[0, 10]);
        let mut cache = IndexCache::new();
        cache.get_or_load(&store, &a).unwrap();

        let missing = FileStatus::file("/in/missing.blz4", 10);
        assert!(cache.get_or_load(&store, &missing).is_err());
        assert_eq!(cache.cached_path(), None);

        cache.clear();
        cache.get_or_load(&store, &a).unwrap();
        assert_eq!(cache.loads(), 2);
    }
}

//! Input side of a job: file enumeration, naive splitting and the
//! [`BlockInputFormat`] that ties them to split planning and record reading.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use blocksplit_codec::{BlockCodec, CodecFactory, index_format};
use blocksplit_common::{Result, error::Error};
use blocksplit_store::{FileStatus, ObjectStore};
use itertools::Itertools;
use log::debug;

use crate::{
    cache::IndexCache,
    config::JobConfig,
    planner::{self, FileSplit},
    reader::SplitRecordReader,
    writer::{LineEncoder, StreamWriter},
};

/// The last naive split of a file may exceed the split size by this factor
/// instead of leaving a small tail split.
pub const SPLIT_SLOP: f64 = 1.1;

/// Names starting with `.` or `_` are hidden (markers, temporary outputs).
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.') || name.starts_with('_')
}

/// Expands `roots` into the compressed files to process.
///
/// A root directory always contributes its visible children; directories below
/// it are descended into only when `recursive` is set. Files must be visible,
/// carry a registered codec extension and not be index artifacts.
pub fn list_input_files(
    store: &dyn ObjectStore,
    roots: &[PathBuf],
    recursive: bool,
    codecs: &CodecFactory,
) -> Result<Vec<FileStatus>> {
    let mut files = Vec::new();
    for root in roots {
        let status = store
            .status(root)
            .map_err(|e| Error::io(format!("input path {}", root.display()), e))?;
        if status.is_dir {
            for child in list_visible(store, &status.path)? {
                add_input(store, &child, recursive, codecs, &mut files)?;
            }
        } else if is_input_file(&status, codecs) {
            files.push(status);
        }
    }
    debug!("total input files to process: {}", files.len());
    Ok(files)
}

fn add_input(
    store: &dyn ObjectStore,
    status: &FileStatus,
    recursive: bool,
    codecs: &CodecFactory,
    files: &mut Vec<FileStatus>,
) -> Result<()> {
    if status.is_dir {
        if recursive {
            for child in list_visible(store, &status.path)? {
                add_input(store, &child, recursive, codecs, files)?;
            }
        }
    } else if is_input_file(status, codecs) {
        files.push(status.clone());
    }
    Ok(())
}

fn list_visible(store: &dyn ObjectStore, dir: &Path) -> Result<Vec<FileStatus>> {
    let entries = store
        .list(dir)
        .map_err(|e| Error::io(format!("list {}", dir.display()), e))?;
    Ok(entries
        .into_iter()
        .filter(|entry| !is_hidden(entry.name()))
        .sorted_by(|a, b| a.path.cmp(&b.path))
        .collect())
}

fn is_input_file(status: &FileStatus, codecs: &CodecFactory) -> bool {
    !is_hidden(status.name())
        && !index_format::is_index_path(&status.path)
        && codecs.is_codec_path(&status.path)
}

/// Cuts `[0, file.len)` into contiguous windows of `split_size` bytes.
///
/// The final window absorbs a remainder of up to `SPLIT_SLOP` times the split
/// size. An empty file yields a single empty split.
pub fn naive_splits(file: &FileStatus, split_size: u64) -> Vec<FileSplit> {
    let split_size = split_size.max(1);
    let mut splits = Vec::new();
    let mut remaining = file.len;
    while remaining as f64 / split_size as f64 > SPLIT_SLOP {
        splits.push(FileSplit::new(
            file.path.clone(),
            file.len - remaining,
            split_size,
        ));
        remaining -= split_size;
    }
    if remaining != 0 || splits.is_empty() {
        splits.push(FileSplit::new(
            file.path.clone(),
            file.len - remaining,
            remaining,
        ));
    }
    splits
}

/// Block-aware input format: plans aligned splits for a set of input paths and
/// opens record readers over them.
pub struct BlockInputFormat {
    store: Arc<dyn ObjectStore>,
    config: JobConfig,
    codecs: CodecFactory,
}

impl BlockInputFormat {
    pub fn new(store: Arc<dyn ObjectStore>, config: JobConfig) -> Result<BlockInputFormat> {
        config.validate()?;
        let codecs = CodecFactory::new(&config.codec_options())?;
        Ok(BlockInputFormat {
            store,
            config,
            codecs,
        })
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    pub fn list_files(&self, roots: &[PathBuf]) -> Result<Vec<FileStatus>> {
        list_input_files(
            self.store.as_ref(),
            roots,
            self.config.recursive_input,
            &self.codecs,
        )
    }

    /// Plans the aligned splits of every input file, in file order.
    ///
    /// Fails as a whole when the block index of any file cannot be loaded.
    pub fn get_splits(&self, roots: &[PathBuf]) -> Result<Vec<FileSplit>> {
        let files = self.list_files(roots)?;
        let mut cache = IndexCache::new();
        self.plan_files(&files, &mut cache)
    }

    /// Plans the aligned splits of `files` with a caller-provided cache.
    pub fn plan_files(
        &self,
        files: &[FileStatus],
        cache: &mut IndexCache,
    ) -> Result<Vec<FileSplit>> {
        let split_size = self.config.effective_split_size();
        let mut result = Vec::new();
        for file in files {
            for split in naive_splits(file, split_size) {
                let index = cache.get_or_load(self.store.as_ref(), file)?;
                result.extend(planner::plan(&split, &index, file.len));
            }
        }
        Ok(result)
    }

    pub fn codec_for(&self, path: &Path) -> Result<Arc<dyn BlockCodec>> {
        self.codecs
            .codec_for_path(path)
            .ok_or_else(|| Error::codec_not_found(path))
    }

    /// Opens a record reader over `split`.
    pub fn open_reader(&self, split: &FileSplit) -> Result<SplitRecordReader> {
        let codec = self.codec_for(&split.path)?;
        let source = self
            .store
            .open(&split.path)
            .map_err(|e| Error::io(format!("open {}", split.path.display()), e))?;
        SplitRecordReader::open(
            codec.as_ref(),
            source,
            split.clone(),
            self.config.max_record_length,
        )
    }

    /// Creates a line writer for `path` with the configured codec.
    pub fn create_writer(&self, path: &Path) -> Result<StreamWriter<LineEncoder>> {
        let codec = self
            .codecs
            .codec(self.config.codec)
            .ok_or_else(|| Error::codec_not_found(path))?;
        StreamWriter::create(self.store.as_ref(), codec.as_ref(), path, LineEncoder)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use blocksplit_codec::{CodecFactory, CodecOptions, index_format};
    use blocksplit_store::{FileStatus, MemoryObjectStore};

    use super::{is_hidden, list_input_files, naive_splits};

    fn store_with(paths: &[&str]) -> MemoryObjectStore {
        let store = MemoryObjectStore::new();
        for path in paths {
            store.put(*path, vec![1, 2, 3]);
        }
        store
    }

    fn names(files: &[FileStatus]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.path.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_is_hidden() {
        assert!(is_hidden(".staging"));
        assert!(is_hidden("_SUCCESS"));
        assert!(!is_hidden("part-0.blz4"));
    }

    #[test]
    fn test_list_input_files() {
        let store = store_with(&[
            "/in/b.blz4",
            "/in/a.bzst",
            "/in/a.bzst.index",
            "/in/_SUCCESS",
            "/in/.a.blz4",
            "/in/notes.txt",
            "/in/sub/c.blz4",
            "/in/sub/deeper/d.blz4",
            "/in/_tmp/e.blz4",
            "/other/f.blz4",
        ]);
        let codecs = CodecFactory::new(&CodecOptions::default()).unwrap();
        let roots = vec![PathBuf::from("/in"), PathBuf::from("/other/f.blz4")];

        let flat = list_input_files(&store, &roots, false, &codecs).unwrap();
        assert_eq!(names(&flat), vec!["/in/a.bzst", "/in/b.blz4", "/other/f.blz4"]);

        let deep = list_input_files(&store, &roots, true, &codecs).unwrap();
        assert_eq!(
            names(&deep),
            vec![
                "/in/a.bzst",
                "/in/b.blz4",
                "/in/sub/c.blz4",
                "/in/sub/deeper/d.blz4",
                "/other/f.blz4"
            ]
        );
        assert_eq!(deep[0].len, 3);

        assert!(list_input_files(&store, &[PathBuf::from("/missing")], false, &codecs).is_err());
        let hidden_root = vec![PathBuf::from("/in/.a.blz4")];
        assert!(
            list_input_files(&store, &hidden_root, false, &codecs)
                .unwrap()
                .is_empty()
        );
        assert!(index_format::is_index_path(std::path::Path::new("/in/a.bzst.index")));
    }

    #[test]
    fn test_naive_splits() {
        let file = FileStatus::file("/in/a.blz4", 4000);
        let splits = naive_splits(&file, 1500);
        let bounds = splits.iter().map(|s| (s.start, s.end())).collect::<Vec<_>>();
        assert_eq!(bounds, vec![(0, 1500), (1500, 3000), (3000, 4000)]);

        // A remainder within 10% joins the last split.
        let splits = naive_splits(&FileStatus::file("/in/a.blz4", 1050), 1000);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].length, 1050);

        let splits = naive_splits(&FileStatus::file("/in/a.blz4", 2000), 1000);
        assert_eq!(splits.len(), 2);

        let splits = naive_splits(&FileStatus::file("/in/empty.blz4", 0), 1000);
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].length, 0);
    }
}

//! *Object Store* abstraction: a "storage service" client capable of issuing
//! readers and writers for a given object path, and of describing and listing
//! the objects it holds.

pub mod local_store;
pub mod memory_store;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use blocksplit_io::{ReadAt, SealingWrite};

pub use local_store::{LocalFsMode, LocalFsObjectStore};
pub use memory_store::MemoryObjectStore;

/// Describes a single object (or directory) in the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStatus {
    pub path: PathBuf,
    /// Object length in bytes; zero for directories.
    pub len: u64,
    pub is_dir: bool,
}

impl FileStatus {
    pub fn file(path: impl Into<PathBuf>, len: u64) -> FileStatus {
        FileStatus {
            path: path.into(),
            len,
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<PathBuf>) -> FileStatus {
        FileStatus {
            path: path.into(),
            len: 0,
            is_dir: true,
        }
    }

    /// Final component of the path, or an empty string.
    pub fn name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// The `ObjectStore` trait represents a "storage service" abstraction.
///
/// Readers are positional ([`ReadAt`]) so that independent tasks can each
/// start at their own byte offset within a shared object.
pub trait ObjectStore: Send + Sync + 'static {
    /// Opens a reader for an existing object.
    ///
    /// A missing object is reported as `std::io::ErrorKind::NotFound`.
    fn open(&self, path: &Path) -> std::io::Result<Arc<dyn ReadAt>>;

    /// Creates a writer for a new object. Fails if the object already exists.
    fn create(&self, path: &Path) -> std::io::Result<Box<dyn SealingWrite>>;

    /// Returns the status of an object or directory.
    fn status(&self, path: &Path) -> std::io::Result<FileStatus>;

    /// Lists the immediate children of a directory, sorted by path.
    fn list(&self, dir: &Path) -> std::io::Result<Vec<FileStatus>>;

    /// Returns `true` if an object or directory exists at `path`.
    fn exists(&self, path: &Path) -> std::io::Result<bool> {
        match self.status(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl<T> ObjectStore for Arc<T>
where
    T: ObjectStore + ?Sized,
{
    fn open(&self, path: &Path) -> std::io::Result<Arc<dyn ReadAt>> {
        self.as_ref().open(path)
    }

    fn create(&self, path: &Path) -> std::io::Result<Box<dyn SealingWrite>> {
        self.as_ref().create(path)
    }

    fn status(&self, path: &Path) -> std::io::Result<FileStatus> {
        self.as_ref().status(path)
    }

    fn list(&self, dir: &Path) -> std::io::Result<Vec<FileStatus>> {
        self.as_ref().list(dir)
    }
}

//! In-memory object store, used by tests and by callers that stage small
//! datasets without touching the filesystem.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use blocksplit_io::{ReadAt, SealingWrite, StorageProfile};

use crate::{FileStatus, ObjectStore};

type Objects = Arc<RwLock<BTreeMap<PathBuf, Arc<Vec<u8>>>>>;

/// Objects are keyed by their full path; directories exist implicitly as
/// prefixes of stored object paths.
#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    objects: Objects,
}

impl MemoryObjectStore {
    pub fn new() -> MemoryObjectStore {
        Default::default()
    }

    /// Stores `data` at `path`, replacing any existing object.
    pub fn put(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.objects
            .write()
            .expect("write lock")
            .insert(path.into(), Arc::new(data));
    }

    /// Returns a copy of the object at `path`, if present.
    pub fn get(&self, path: &Path) -> Option<Arc<Vec<u8>>> {
        self.objects.read().expect("read lock").get(path).cloned()
    }

    pub fn remove(&self, path: &Path) -> bool {
        self.objects
            .write()
            .expect("write lock")
            .remove(path)
            .is_some()
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.objects
            .read()
            .expect("read lock")
            .keys()
            .any(|k| k != path && k.starts_with(path))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn open(&self, path: &Path) -> std::io::Result<Arc<dyn ReadAt>> {
        self.get(path)
            .map(|data| data as Arc<dyn ReadAt>)
            .ok_or_else(|| not_found(path))
    }

    fn create(&self, path: &Path) -> std::io::Result<Box<dyn SealingWrite>> {
        if self.get(path).is_some() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("object {} already exists", path.display()),
            ));
        }
        Ok(Box::new(MemoryWriter {
            objects: self.objects.clone(),
            path: path.to_path_buf(),
            buf: Some(Vec::new()),
        }))
    }

    fn status(&self, path: &Path) -> std::io::Result<FileStatus> {
        if let Some(data) = self.get(path) {
            Ok(FileStatus::file(path, data.len() as u64))
        } else if self.is_dir(path) {
            Ok(FileStatus::dir(path))
        } else {
            Err(not_found(path))
        }
    }

    fn list(&self, dir: &Path) -> std::io::Result<Vec<FileStatus>> {
        let objects = self.objects.read().expect("read lock");
        let mut entries = BTreeMap::<PathBuf, FileStatus>::new();
        for (key, data) in objects.range(dir.to_path_buf()..) {
            let Ok(rest) = key.strip_prefix(dir) else {
                continue;
            };
            let mut components = rest.components();
            let Some(first) = components.next() else {
                continue;
            };
            let child = dir.join(first);
            let status = if components.next().is_some() {
                FileStatus::dir(&child)
            } else {
                FileStatus::file(&child, data.len() as u64)
            };
            entries.entry(child).or_insert(status);
        }
        if entries.is_empty() && !objects.keys().any(|k| k.starts_with(dir)) {
            return Err(not_found(dir));
        }
        Ok(entries.into_values().collect())
    }
}

/// Publishes its content into the store on `seal()`.
struct MemoryWriter {
    objects: Objects,
    path: PathBuf,
    buf: Option<Vec<u8>>,
}

impl SealingWrite for MemoryWriter {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.buf
            .as_mut()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?
            .extend_from_slice(buf);
        Ok(())
    }

    fn seal(&mut self) -> std::io::Result<()> {
        let buf = self
            .buf
            .take()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound))?;
        self.objects
            .write()
            .map_err(|_| std::io::Error::other("poisoned object map"))?
            .insert(self.path.clone(), Arc::new(buf));
        Ok(())
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            ..Default::default()
        }
    }
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("object {} not found", path.display()),
    )
}

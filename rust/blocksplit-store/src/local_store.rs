use std::{
    fs::File,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use blocksplit_common::error::Error;
use blocksplit_io::{
    ReadAt, SealingWrite,
    file::{FileReader, FileWriter},
};

use crate::{FileStatus, ObjectStore};

/// An `ObjectStore` over the local filesystem, optionally confined to a
/// container directory.
///
/// In `Passthrough` mode, object paths are host paths and must reside within the
/// container directory. In `VirtualRoot` mode, object paths are interpreted as
/// rooted in the container directory. Listings report paths in the same form
/// they were requested in.
pub struct LocalFsObjectStore {
    /// The top-level directory for this object store.
    container_path: PathBuf,
    mode: LocalFsMode,
}

impl LocalFsObjectStore {
    /// Creates a new `LocalFsObjectStore` with the given container directory.
    ///
    /// The container directory will be created if it does not exist.
    pub fn new(
        container_path: &Path,
        mode: LocalFsMode,
    ) -> blocksplit_common::Result<LocalFsObjectStore> {
        if container_path.as_os_str().is_empty() {
            return Err(Error::invalid_arg(
                "container",
                "empty path for local object store",
            ));
        }
        let _ = std::fs::create_dir_all(container_path);
        Ok(LocalFsObjectStore {
            container_path: container_path.to_path_buf(),
            mode,
        })
    }

    /// Creates a store that is not confined to any directory: every path is used
    /// as-is on the host filesystem.
    pub fn new_unscoped() -> LocalFsObjectStore {
        LocalFsObjectStore {
            container_path: PathBuf::new(),
            mode: LocalFsMode::Passthrough,
        }
    }

    /// Returns the file system path of the store's top-level container.
    pub fn container_path(&self) -> &Path {
        &self.container_path
    }

    /// Converts an object path to a host filesystem path.
    pub fn resolve(&self, path: &Path) -> std::io::Result<PathBuf> {
        if path
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(invalid_path(path, "parent directory references"));
        }
        match self.mode {
            LocalFsMode::Passthrough => {
                if !self.container_path.as_os_str().is_empty()
                    && !path.starts_with(&self.container_path)
                {
                    return Err(invalid_path(path, "outside of the container"));
                }
                Ok(path.to_path_buf())
            }
            LocalFsMode::VirtualRoot => {
                let relative = path
                    .components()
                    .filter(|c| matches!(c, Component::Normal(_)))
                    .collect::<PathBuf>();
                if relative.as_os_str().is_empty() {
                    return Err(invalid_path(path, "empty object path"));
                }
                Ok(self.container_path.join(relative))
            }
        }
    }
}

impl ObjectStore for LocalFsObjectStore {
    fn open(&self, path: &Path) -> std::io::Result<Arc<dyn ReadAt>> {
        let file = File::open(self.resolve(path)?)?;
        Ok(Arc::new(FileReader::new(file)))
    }

    fn create(&self, path: &Path) -> std::io::Result<Box<dyn SealingWrite>> {
        let host_path = self.resolve(path)?;
        if let Some(parent) = host_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Box::new(FileWriter::create(host_path)?))
    }

    fn status(&self, path: &Path) -> std::io::Result<FileStatus> {
        let metadata = std::fs::metadata(self.resolve(path)?)?;
        Ok(if metadata.is_dir() {
            FileStatus::dir(path)
        } else {
            FileStatus::file(path, metadata.len())
        })
    }

    fn list(&self, dir: &Path) -> std::io::Result<Vec<FileStatus>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(self.resolve(dir)?)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            let path = dir.join(entry.file_name());
            entries.push(if metadata.is_dir() {
                FileStatus::dir(path)
            } else {
                FileStatus::file(path, metadata.len())
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

fn invalid_path(path: &Path, reason: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::InvalidInput,
        format!("invalid object path {}: {reason}", path.display()),
    )
}

/// Local Filesystem Mode: defines how `LocalFsObjectStore` interprets object paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalFsMode {
    /// Object paths are host paths confined to the container directory.
    Passthrough,
    /// The container directory acts as a virtual root for all object paths.
    VirtualRoot,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tempfile::TempDir;

    use crate::ObjectStore;

    use super::{LocalFsMode, LocalFsObjectStore};

    fn create_temp_fs(mode: LocalFsMode) -> (LocalFsObjectStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let fs = LocalFsObjectStore::new(dir.path(), mode).unwrap();
        (fs, dir)
    }

    #[test]
    fn test_local_fs_passthrough_mode() {
        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        let (_fs2, dir2) = create_temp_fs(LocalFsMode::Passthrough);

        let file_path = dir.path().join("sub/data.blz4");
        let mut writer = fs.create(&file_path).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.seal().unwrap();
        assert!(file_path.is_file());

        let reader = fs.open(&file_path).unwrap();
        assert_eq!(reader.read_at(0..5).unwrap(), b"hello");
        assert_eq!(fs.status(&file_path).unwrap().len, 5);
        assert!(fs.status(&dir.path().join("sub")).unwrap().is_dir);

        let outside = dir2.path().join("outside.txt");
        assert!(fs.create(&outside).is_err());
        assert!(fs.open(&outside).is_err());
        assert!(fs.open(&dir.path().join("sub/../sub/data.blz4")).is_err());
    }

    #[test]
    fn test_local_fs_virtual_root_mode() {
        let (fs, dir) = create_temp_fs(LocalFsMode::VirtualRoot);

        let mut writer = fs.create(Path::new("/logs/part-0.blz4")).unwrap();
        writer.write_all(b"world").unwrap();
        writer.seal().unwrap();
        assert!(dir.path().join("logs/part-0.blz4").exists());

        let reader = fs.open(Path::new("logs/part-0.blz4")).unwrap();
        assert_eq!(reader.read_at(0..5).unwrap(), b"world");
        assert!(fs.create(Path::new("/")).is_err());
    }

    #[test]
    fn test_local_fs_list_sorted() {
        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        std::fs::write(dir.path().join("b.blz4"), b"bb").unwrap();
        std::fs::write(dir.path().join("a.blz4"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("c")).unwrap();

        let entries = fs.list(dir.path()).unwrap();
        let names = entries.iter().map(|e| e.name()).collect::<Vec<_>>();
        assert_eq!(names, ["a.blz4", "b.blz4", "c"]);
        assert_eq!(entries[1].len, 2);
        assert!(entries[2].is_dir);
    }

    #[test]
    fn test_local_fs_missing_object() {
        let (fs, dir) = create_temp_fs(LocalFsMode::Passthrough);
        let missing = dir.path().join("missing.index");
        let err = fs.open(&missing).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
        assert!(!fs.exists(&missing).unwrap());
    }

    #[test]
    fn test_unscoped_local_fs() {
        let dir = TempDir::new().unwrap();
        let test_path = dir.path().join("test.txt");
        std::fs::write(&test_path, b"1234567").unwrap();

        let fs = LocalFsObjectStore::new_unscoped();
        let reader = fs.open(&test_path).unwrap();
        assert_eq!(reader.read_at(0..7).unwrap(), b"1234567");

        let write_path = dir.path().join("test1.txt");
        let mut writer = fs.create(&write_path).unwrap();
        writer.write_all(b"123456789").unwrap();
        writer.seal().unwrap();
        assert_eq!(std::fs::read(&write_path).unwrap(), b"123456789");
    }
}

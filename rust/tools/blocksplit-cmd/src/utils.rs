//! Common utilities for blocksplit-cmd

use std::{
    env,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use blocksplit::JobConfig;
use blocksplit_store::{LocalFsObjectStore, ObjectStore};

/// Loads the job configuration, or the defaults when no file is given.
pub fn load_config(path: Option<&str>) -> Result<JobConfig> {
    match path {
        Some(path) => JobConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load job config from {path}")),
        None => Ok(JobConfig::default()),
    }
}

/// Resolves a command-line path against the current directory.
pub fn absolute_path(path: &str) -> Result<PathBuf> {
    let path = Path::new(path);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(env::current_dir()
        .with_context(|| "Failed to get current directory")?
        .join(path))
}

/// Object store over the host filesystem; paths are used as-is.
pub fn local_store() -> Arc<dyn ObjectStore> {
    Arc::new(LocalFsObjectStore::new_unscoped())
}

/// Formats file size in human-readable format
pub fn format_size(size: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = size as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", size as u64, UNITS[unit])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}

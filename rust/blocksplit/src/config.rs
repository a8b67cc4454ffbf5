use std::path::Path;

use blocksplit_codec::{CodecKind, CodecOptions};
use blocksplit_common::{Result, error::Error};
use serde::{Deserialize, Serialize};

/// Job-level options of the input format and the write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobConfig {
    /// Records longer than this are truncated; `None` leaves them intact.
    pub max_record_length: Option<usize>,
    /// Descend into nested directories of the input paths.
    pub recursive_input: bool,
    /// Compression transform of the write path.
    pub codec: CodecKind,
    /// Target size of the naive splits, in compressed bytes.
    pub split_size: u64,
    pub min_split_size: u64,
    /// Uncompressed bytes per compression block.
    pub block_size: usize,
    pub compression_level: i32,
}

impl JobConfig {
    pub const DEFAULT_SPLIT_SIZE: u64 = 64 * 1024 * 1024;

    pub fn from_json(json: &str) -> Result<JobConfig> {
        let config: JobConfig =
            serde_json::from_str(json).map_err(|e| Error::config_source("parse job config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<JobConfig> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::config_source(format!("read {}", path.display()), e))?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::config_source("serialize job config", e))
    }

    pub fn validate(&self) -> Result<()> {
        if self.split_size == 0 {
            return Err(Error::config("split_size must be positive"));
        }
        if self.block_size == 0 || self.block_size > CodecOptions::MAX_BLOCK_SIZE {
            return Err(Error::config(format!(
                "block_size {} is out of range",
                self.block_size
            )));
        }
        if self.max_record_length == Some(0) {
            return Err(Error::config("max_record_length must be positive"));
        }
        Ok(())
    }

    /// Effective split size: never below `min_split_size`.
    pub fn effective_split_size(&self) -> u64 {
        self.split_size.max(self.min_split_size).max(1)
    }

    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions::default()
            .with_block_size(self.block_size)
            .with_level(self.compression_level)
    }

    pub fn with_max_record_length(mut self, max_record_length: Option<usize>) -> Self {
        self.max_record_length = max_record_length;
        self
    }

    pub fn with_recursive_input(mut self, recursive_input: bool) -> Self {
        self.recursive_input = recursive_input;
        self
    }

    pub fn with_codec(mut self, codec: CodecKind) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_split_size(mut self, split_size: u64) -> Self {
        self.split_size = split_size;
        self
    }

    pub fn with_min_split_size(mut self, min_split_size: u64) -> Self {
        self.min_split_size = min_split_size;
        self
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_compression_level(mut self, compression_level: i32) -> Self {
        self.compression_level = compression_level;
        self
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        let codec = CodecOptions::default();
        JobConfig {
            max_record_length: None,
            recursive_input: false,
            codec: CodecKind::default(),
            split_size: Self::DEFAULT_SPLIT_SIZE,
            min_split_size: 1,
            block_size: codec.block_size,
            compression_level: codec.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use blocksplit_codec::CodecKind;
    use blocksplit_common::error::ErrorKind;

    use super::JobConfig;

    #[test]
    fn test_defaults() {
        let config = JobConfig::default();
        assert_eq!(config.max_record_length, None);
        assert!(!config.recursive_input);
        assert_eq!(config.codec, CodecKind::Lz4);
        assert_eq!(config.split_size, 64 * 1024 * 1024);
        assert_eq!(config.block_size, 4 * 1024 * 1024);
        assert_eq!(config.compression_level, 3);
        config.validate().unwrap();
    }

    #[test]
    fn test_from_json() {
        let config = JobConfig::from_json(
            r#"{ "codec": "zstd", "recursive_input": true, "max_record_length": 1024 }"#,
        )
        .unwrap();
        assert_eq!(config.codec, CodecKind::Zstd);
        assert!(config.recursive_input);
        assert_eq!(config.max_record_length, Some(1024));
        assert_eq!(config.split_size, JobConfig::DEFAULT_SPLIT_SIZE);

        let round = JobConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(round, config);
    }

    #[test]
    fn test_rejects_invalid() {
        for json in [
            r#"{ "split_size": 0 }"#,
            r#"{ "block_size": 0 }"#,
            r#"{ "max_record_length": 0 }"#,
            r#"{ "codec": "gzip" }"#,
            r#"{ "unknown": 1 }"#,
        ] {
            let err = JobConfig::from_json(json).unwrap_err();
            assert!(matches!(err.kind(), ErrorKind::Config { .. }), "{json}");
        }
    }

    #[test]
    fn test_effective_split_size() {
        let config = JobConfig::default()
            .with_split_size(100)
            .with_min_split_size(500);
        assert_eq!(config.effective_split_size(), 500);
        assert_eq!(config.with_min_split_size(0).effective_split_size(), 100);
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.json");
        std::fs::write(&path, r#"{ "split_size": 4096 }"#).unwrap();
        assert_eq!(JobConfig::from_file(&path).unwrap().split_size, 4096);
        assert!(JobConfig::from_file(&dir.path().join("missing.json")).is_err());
    }
}

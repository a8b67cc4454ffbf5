//! Block-aligned splitting of block-compressed files.
//!
//! A block-compressed file can only be decompressed starting at one of its
//! block boundaries, which a byte-range splitter knows nothing about. The side
//! index of a file ([`BlockIndex`]) records where each block starts; the
//! [`planner`] snaps naive byte ranges onto those boundaries, and a
//! [`SplitRecordReader`] recovers the records owned by one aligned range.
//!
//! [`BlockInputFormat`] ties it together for a set of input paths:
//!
//! ```no_run
//! use std::{path::PathBuf, sync::Arc};
//!
//! use blocksplit::{BlockInputFormat, JobConfig};
//! use blocksplit_store::LocalFsObjectStore;
//!
//! # fn main() -> blocksplit_common::Result<()> {
//! let store = Arc::new(LocalFsObjectStore::new_unscoped());
//! let format = BlockInputFormat::new(store, JobConfig::default())?;
//! for split in format.get_splits(&[PathBuf::from("/data/events")])? {
//!     for record in format.open_reader(&split)? {
//!         let record = record?;
//!         println!("{}: {}", record.key, String::from_utf8_lossy(&record.value));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod index;
pub mod input;
pub mod line_reader;
pub mod planner;
pub mod reader;
pub mod writer;

pub use cache::IndexCache;
pub use config::JobConfig;
pub use index::BlockIndex;
pub use input::{BlockInputFormat, list_input_files, naive_splits};
pub use line_reader::LineReader;
pub use planner::{FileSplit, plan};
pub use reader::{ReaderState, Record, SplitRecordReader};
pub use writer::{LineEncoder, RecordEncoder, StreamWriter, WriteSummary};

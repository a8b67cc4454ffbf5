//! Cat command implementation

use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use blocksplit::{BlockInputFormat, FileSplit, JobConfig};
use blocksplit_store::ObjectStore;

use crate::utils;

/// Run the cat command
pub fn run(
    config: JobConfig,
    start: Option<u64>,
    length: Option<u64>,
    max_record_length: Option<usize>,
    keys: bool,
    file: String,
) -> Result<()> {
    let mut config = config;
    if max_record_length.is_some() {
        config = config.with_max_record_length(max_record_length);
    }
    let path = utils::absolute_path(&file)?;
    let store = utils::local_store();
    let file_len = store
        .status(&path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len;
    let start = start.unwrap_or(0);
    anyhow::ensure!(start <= file_len, "start {start} is beyond the end of {file}");
    let length = length.unwrap_or(file_len - start);

    let format = BlockInputFormat::new(store, config)?;
    let mut reader = format.open_reader(&FileSplit::new(&path, start, length))?;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in reader.by_ref() {
        let record = record?;
        if keys {
            write!(out, "{}\t", record.key)?;
        }
        out.write_all(&record.value)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    reader.close();
    Ok(())
}

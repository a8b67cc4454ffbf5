//! Splits command implementation

use anyhow::{Context, Result};
use blocksplit::{BlockInputFormat, JobConfig};

use crate::utils;

/// Run the splits command
pub fn run(
    config: JobConfig,
    split_size: Option<u64>,
    recursive: bool,
    json: bool,
    paths: Vec<String>,
) -> Result<()> {
    let mut config = config;
    if let Some(split_size) = split_size {
        config = config.with_split_size(split_size);
    }
    if recursive {
        config = config.with_recursive_input(true);
    }

    let roots = paths
        .iter()
        .map(|p| utils::absolute_path(p))
        .collect::<Result<Vec<_>>>()?;
    let format = BlockInputFormat::new(utils::local_store(), config)?;
    let splits = format
        .get_splits(&roots)
        .with_context(|| "Failed to plan splits")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&splits)?);
    } else {
        for split in &splits {
            println!("{}\t{}\t{}", split.path.display(), split.start, split.length);
        }
    }
    Ok(())
}

//! Compress command implementation

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use anyhow::{Context, Result};
use blocksplit::{BlockInputFormat, JobConfig};
use blocksplit_codec::CodecKind;

use crate::utils;

/// Run the compress command
pub fn run(
    config: JobConfig,
    codec: Option<CodecKind>,
    block_size: Option<usize>,
    level: Option<i32>,
    input: String,
    output: String,
) -> Result<()> {
    let mut config = config;
    if let Some(codec) = codec {
        config = config.with_codec(codec);
    }
    if let Some(block_size) = block_size {
        config = config.with_block_size(block_size);
    }
    if let Some(level) = level {
        config = config.with_compression_level(level);
    }

    let output = output_path(&output, config.codec)?;
    let format = BlockInputFormat::new(utils::local_store(), config)
        .with_context(|| "Invalid compression options")?;

    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(std::io::stdin().lock())
    } else {
        let file = File::open(&input).with_context(|| format!("Failed to open {input}"))?;
        Box::new(BufReader::new(file))
    };

    let mut writer = format
        .create_writer(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    for line in split_lines(reader) {
        let line = line.with_context(|| format!("Failed to read {input}"))?;
        writer.write_record(&line)?;
    }
    let summary = writer.finish()?;
    let index_path = summary.write_index(format.store().as_ref())?;

    println!(
        "{}: {} records, {} blocks, {}",
        output.display(),
        summary.records,
        summary.block_offsets.len(),
        utils::format_size(summary.compressed_size)
    );
    println!("index: {}", index_path.display());
    Ok(())
}

fn output_path(output: &str, codec: CodecKind) -> Result<PathBuf> {
    let mut path = utils::absolute_path(output)?;
    let has_extension = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| CodecKind::ALL.iter().any(|k| name.ends_with(k.extension())));
    if !has_extension {
        let mut name = path.as_os_str().to_owned();
        name.push(codec.extension());
        path = PathBuf::from(name);
    }
    Ok(path)
}

/// Lines of `reader` without their `\n` or `\r\n` terminators.
fn split_lines(mut reader: impl BufRead) -> impl Iterator<Item = std::io::Result<Vec<u8>>> {
    std::iter::from_fn(move || {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                if line.ends_with(b"\n") {
                    line.pop();
                    if line.ends_with(b"\r") {
                        line.pop();
                    }
                }
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    })
}

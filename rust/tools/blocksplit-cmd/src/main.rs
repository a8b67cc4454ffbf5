use anyhow::Result;
use blocksplit_codec::CodecKind;
use clap::{Parser, Subcommand};
use log::LevelFilter;

mod commands;
mod utils;

#[derive(Parser)]
#[command(name = "blocksplit-cmd")]
#[command(about = "Command-line utility for block-splittable compressed files")]
#[command(version)]
struct Cli {
    /// JSON job configuration; command-line options override its values
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log at debug level regardless of RUST_LOG
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a text file into a block-compressed file and write its block index
    Compress {
        /// Compression codec (lz4 or zstd)
        #[arg(long)]
        codec: Option<CodecKind>,

        /// Uncompressed bytes per block
        #[arg(long)]
        block_size: Option<usize>,

        /// Compression level
        #[arg(long)]
        level: Option<i32>,

        /// Text file to compress ("-" for stdin)
        input: String,

        /// Output path; gets the codec extension if it has none
        output: String,
    },

    /// Plan the block-aligned splits of the given input paths
    Splits {
        /// Target naive split size in bytes
        #[arg(long)]
        split_size: Option<u64>,

        /// Descend into nested directories
        #[arg(short, long)]
        recursive: bool,

        /// Print the splits as JSON
        #[arg(long)]
        json: bool,

        /// Input files or directories
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Print the records of a compressed file, or of one split of it
    Cat {
        /// Split start offset (compressed bytes)
        #[arg(long)]
        start: Option<u64>,

        /// Split length (compressed bytes); defaults to the rest of the file
        #[arg(long)]
        length: Option<u64>,

        /// Truncate records longer than this
        #[arg(long)]
        max_record_length: Option<usize>,

        /// Prefix each record with its position key
        #[arg(long)]
        keys: bool,

        /// Compressed file
        file: String,
    },

    /// Describe the block layout of a compressed file and check its index
    Inspect {
        /// Increase detail (-b lists block offsets)
        #[arg(short = 'b', long, action = clap::ArgAction::Count)]
        blocks: u8,

        /// Compressed file
        file: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        env_logger::builder().filter_level(LevelFilter::Debug).init();
    } else {
        env_logger::init();
    }

    let config = utils::load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Compress {
            codec,
            block_size,
            level,
            input,
            output,
        } => commands::compress::run(config, codec, block_size, level, input, output),
        Commands::Splits {
            split_size,
            recursive,
            json,
            paths,
        } => commands::splits::run(config, split_size, recursive, json, paths),
        Commands::Cat {
            start,
            length,
            max_record_length,
            keys,
            file,
        } => commands::cat::run(config, start, length, max_record_length, keys, file),
        Commands::Inspect { blocks, file } => commands::inspect::run(blocks, file),
    }
}

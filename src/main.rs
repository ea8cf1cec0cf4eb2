use std::{
    io::{stdin, stdout, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tap::Pipe;
use w3g_inflate::{Decompressor, StreamParams};

#[derive(Debug, Parser)]
#[command(about = "Inflate a block-compressed replay body")]
struct Cli {
    /// Compressed body, stdin when omitted
    pub input: Option<PathBuf>,
    /// Decompressed output, stdout when omitted
    pub output: Option<PathBuf>,

    /// Number of blocks declared by the container
    #[arg(short, long)]
    pub blocks: u32,

    /// Decompressed size declared by the container
    #[arg(short, long)]
    pub size: u32,

    /// Game version, selects the block header layout (0 = unknown)
    #[arg(short, long, default_value_t = 0)]
    pub game_version: u32,

    /// Leading bytes to skip before the first block
    #[arg(short, long, default_value_t = 0)]
    pub offset: u64,

    /// Print counters to stderr when done
    #[arg(long)]
    pub stats: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Cli::parse();

    let params = StreamParams {
        total_size: args.size,
        block_count: args.blocks,
        game_version: args.game_version,
    };

    let reader: Box<dyn Read> = if let Some(input) = args.input.as_ref() {
        std::fs::File::open(input)
            .with_context(|| format!("Unable to open {}", input.display()))?
            .pipe(BufReader::new)
            .pipe(Box::new)
    } else {
        Box::new(stdin().lock())
    };

    match args.output.as_ref() {
        Some(output) => inflate_file(reader, params, &args, output),
        None => inflate(reader, params, &args, stdout().lock()).map(|_| ()),
    }
}

fn inflate_file(
    reader: impl Read,
    params: StreamParams,
    args: &Cli,
    output: impl AsRef<Path>,
) -> anyhow::Result<()> {
    let mut writer = std::fs::File::create(output.as_ref()).map(BufWriter::new)?;

    inflate(reader, params, args, &mut writer)
        .and_then(|_| writer.flush().context("Unable to flush file"))
        .context(anyhow!("{}", output.as_ref().display()))
        .inspect_err(|_| {
            std::fs::remove_file(output.as_ref()).inspect_err(|e| eprintln!("{e}")).ok();
        })?;

    Ok(())
}

fn inflate(
    mut reader: impl Read,
    params: StreamParams,
    args: &Cli,
    mut writer: impl Write,
) -> anyhow::Result<u64> {
    if args.offset > 0 {
        let skipped = std::io::copy(&mut reader.by_ref().take(args.offset), &mut std::io::sink())?;
        if skipped != args.offset {
            bail!("Input ends inside the {} byte container header", args.offset);
        }
    }

    let mut decompressor = Decompressor::new(reader, params);
    let copied = std::io::copy(&mut decompressor, &mut writer);

    if args.stats {
        let progress = decompressor.progress();
        eprintln!("Layout:            {:?}", decompressor.layout());
        eprintln!("Compressed read:   {}", progress.compressed_read);
        eprintln!("Bytes remaining:   {}", progress.total_remaining);
        eprintln!("Block remaining:   {}", progress.block_remaining);
        eprintln!("Blocks remaining:  {}", progress.blocks_remaining);
    }

    let copied = copied
        .map_err(w3g_inflate::Error::from)
        .context("Decompression failed")?;
    writer.flush()?;

    Ok(copied)
}

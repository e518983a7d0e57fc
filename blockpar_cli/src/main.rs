//! The `blockpar` command-line tool.
//!
//! Plans, compresses, decompresses, and inspects chunked arrays.
//! Raw array files hold native-endian elements in row-major order.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use blockpar::{
    ChunkedArray, ChunkedArrayBuilder, ElementType, ParallelOptions, Shape,
    codec::{CodecParameters, ZfpCodec},
    layout::{ArtifactStorage, read_artifacts, read_header, write_artifacts},
};
use clap::{Args, Parser, Subcommand};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "blockpar", version)]
#[command(about = "Chunked parallel compression of multidimensional arrays")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the chunk plan of an array
    Plan(PartitionArgs),
    /// Compress a raw array file into artifact files and a layout header
    Compress(CompressArgs),
    /// Decompress an array described by a layout header into a raw array file
    Decompress(DecompressArgs),
    /// Print and validate a layout header
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct PartitionArgs {
    /// Array shape, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    shape: Vec<u64>,
    /// Element type (float32, float64, int32, int64)
    #[arg(long)]
    element_type: ElementType,
    /// Target compressed bytes per chunk
    #[arg(long, conflicts_with = "parts")]
    bytes_per_chunk: Option<u64>,
    /// Number of parts
    #[arg(long)]
    parts: Option<u64>,
    /// Estimated compression ratio used with --bytes-per-chunk
    #[arg(long)]
    ratio: Option<f64>,
}

impl PartitionArgs {
    fn builder(&self) -> ChunkedArrayBuilder {
        let mut builder = ChunkedArrayBuilder::new(self.shape.clone(), self.element_type);
        if let Some(bytes_per_chunk) = self.bytes_per_chunk {
            builder.bytes_per_chunk(bytes_per_chunk);
        }
        if let Some(parts) = self.parts {
            builder.parts(parts);
        }
        if let Some(ratio) = self.ratio {
            builder.estimated_compression_ratio(ratio);
        }
        builder
    }
}

#[derive(Args, Debug)]
struct CompressArgs {
    /// Raw array file
    #[arg(long)]
    input: PathBuf,
    #[command(flatten)]
    partition: PartitionArgs,
    /// Absolute error tolerance
    #[arg(long)]
    tolerance: Option<f64>,
    /// Bits per value
    #[arg(long)]
    rate: Option<f64>,
    /// Bits of precision per value
    #[arg(long)]
    precision: Option<u32>,
    /// Number of workers
    #[arg(long)]
    workers: Option<usize>,
    /// Output directory for the artifacts and header
    #[arg(long)]
    output_dir: PathBuf,
    /// File stem of the artifacts and header
    #[arg(long, default_value = "array")]
    stem: String,
    /// Write all chunks to a single artifact file
    #[arg(long)]
    combined: bool,
}

#[derive(Args, Debug)]
struct DecompressArgs {
    /// Layout header
    #[arg(long)]
    header: PathBuf,
    /// Element type (float32, float64, int32, int64)
    #[arg(long)]
    element_type: ElementType,
    /// Raw array file to write
    #[arg(long)]
    output: PathBuf,
    /// Number of workers
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// Layout header
    #[arg(long)]
    header: PathBuf,
}

type Result<T> = std::result::Result<T, anyhow::Error>;

fn parallel_options(workers: Option<usize>) -> ParallelOptions {
    let options = ParallelOptions::default();
    match workers {
        Some(workers) => options.with_worker_count(workers),
        None => options,
    }
}

fn header_directory(header: &Path) -> &Path {
    header.parent().unwrap_or_else(|| Path::new("."))
}

fn plan(args: &PartitionArgs) -> Result<()> {
    let policy = args.builder().partition_policy()?;
    let shape = Shape::new(args.shape.clone())?;
    let plan = blockpar::plan(&shape, args.element_type, &policy)?;
    println!(
        "{} {} array, {} blocks of grid {:?}, {} chunks",
        plan.element_type(),
        plan.shape(),
        plan.grid().num_blocks(),
        plan.grid().grid_shape(),
        plan.len()
    );
    for chunk in plan.chunks() {
        println!(
            "chunk {}: blocks {:?}, {} elements",
            chunk.index(),
            chunk.blocks(),
            plan.chunk_num_elements(chunk.index()).unwrap_or_default()
        );
    }
    Ok(())
}

fn compress(args: &CompressArgs) -> Result<()> {
    let mut array = args.partition.builder().build()?;
    let input = std::fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    array.buffer_mut().copy_from_bytes(&input)?;

    let parameters = CodecParameters::new(args.tolerance, args.rate, args.precision);
    let artifacts = array.compress_with_parameters(&parameters, &parallel_options(args.workers))?;

    std::fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("failed to create {}", args.output_dir.display()))?;
    let storage = if args.combined {
        ArtifactStorage::Combined
    } else {
        ArtifactStorage::PerChunk
    };
    let files = write_artifacts(&args.output_dir, &args.stem, &artifacts, storage)?;
    let header = args.output_dir.join(format!("{}.json", args.stem));
    array.layout_header(files).write(&header)?;

    let compressed: usize = artifacts.iter().map(Vec::len).sum();
    println!(
        "compressed {} bytes to {compressed} bytes in {} chunks, header {}",
        input.len(),
        artifacts.len(),
        header.display()
    );
    Ok(())
}

fn decompress(args: &DecompressArgs) -> Result<()> {
    let header = read_header(&args.header)?;
    let mut array = ChunkedArray::from_header(
        &header,
        args.element_type,
        Arc::new(ZfpCodec::new()),
    )?;
    let artifacts = read_artifacts(
        header_directory(&args.header),
        header.compressed_files(),
        header.num_chunks(),
    )?;
    array.decompress(&artifacts, &parallel_options(args.workers))?;
    std::fs::write(&args.output, array.buffer().as_bytes())
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!(
        "decompressed {} chunks to {}",
        artifacts.len(),
        args.output.display()
    );
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let header = read_header(&args.header)?;
    println!("dimensions: {:?}", header.dimensions());
    println!("chunks: {}", header.num_chunks());
    for (chunk, split) in header.block_splits().iter().enumerate() {
        println!("  chunk {chunk}: blocks {split:?}");
    }
    println!("compressed files: {:?}", header.compressed_files());
    header
        .validate()
        .with_context(|| format!("invalid layout header {}", args.header.display()))?;
    println!("valid");
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Plan(args) => plan(args),
        Command::Compress(args) => compress(args),
        Command::Decompress(args) => decompress(args),
        Command::Inspect(args) => inspect(args),
    }
}

/// Main entry point for the `blockpar` binary.
fn main() -> Result<()> {
    env_logger::init();
    run(&Cli::parse())
}

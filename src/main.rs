//! FastBam2fq CLI entry point
//!
//! Converts coordinate-sorted alignment files back into paired FASTQ.

use clap::{Parser, Subcommand};
use fast_bam2fq::core::{partition_count, ContigCatalogue, DEFAULT_WINDOW_SIZE};
#[cfg(feature = "bam")]
use fast_bam2fq::formats;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fast-bam2fq")]
#[command(about = "Coordinate-sorted BAM to paired FASTQ conversion")]
#[command(version)]
#[command(author = "FastBam2fq Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert BAM/SAM/CRAM to paired FASTQ
    #[cfg(feature = "bam")]
    Bam {
        /// Input BAM/SAM/CRAM file (coordinate sorted; indexed for parallel scanning)
        input: PathBuf,
        /// Output FASTQ for first mates (.gz to compress)
        r1: PathBuf,
        /// Output FASTQ for second mates (.gz to compress)
        r2: PathBuf,
        /// Output FASTQ for reads whose mate was never seen
        #[arg(short = 's', long)]
        singletons: Option<PathBuf>,
        /// Number of threads
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
        /// Genomic window per cache partition, in bp
        #[arg(short = 'w', long = "window-size", default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: u64,
    },
    /// Print the cache partition layout for a chrom.sizes or .fai file
    Partitions {
        /// Contig sizes file (chrom.sizes or .fai, optionally compressed)
        sizes: PathBuf,
        /// Genomic window per cache partition, in bp
        #[arg(short = 'w', long = "window-size", default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: u64,
    },
}

fn print_partitions(sizes: &PathBuf, window_size: u64) -> anyhow::Result<()> {
    if window_size == 0 {
        anyhow::bail!("Window size must be > 0");
    }
    let catalogue = ContigCatalogue::from_sizes_file(sizes)
        .map_err(|e| anyhow::anyhow!("Failed to load contig sizes: {}", e))?;

    let mut total = 0;
    for (name, length) in catalogue.iter() {
        let count = partition_count(length, window_size);
        total += count;
        println!("{}\t{}\t{}", name, length, count);
    }
    println!("unmapped\t0\t1");

    eprintln!("\n=== Partition Layout ===");
    eprintln!("Contigs:         {}", catalogue.len());
    eprintln!("Window size:     {}", window_size);
    eprintln!("Partitions:      {}", total + 1);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        #[cfg(feature = "bam")]
        Commands::Bam { input, r1, r2, singletons, threads, window_size } => {
            let outputs = formats::FastqOutputs { r1, r2, singletons };
            let config = fast_bam2fq::CacheConfig::with_window_size(window_size);

            eprintln!("Converting BAM file: {:?} -> {:?}, {:?}", input, outputs.r1, outputs.r2);
            let stats = formats::convert_bam(&input, &outputs, config, threads)?;

            eprintln!("\n=== Conversion Statistics ===");
            eprintln!("Total records:   {}", stats.total);
            eprintln!("Pairs:           {}", stats.pairs);
            eprintln!("Singletons:      {}", stats.singletons);
            eprintln!("  - Unpaired:    {}", stats.unpaired);
            eprintln!("Skipped:         {}", stats.skipped);
            eprintln!("Peak buffered:   {}", stats.peak_buffered);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Partitions { sizes, window_size } => {
            print_partitions(&sizes, window_size)?;
        }
    }

    Ok(())
}

//! tnpool: transposon insertion pool annotation
//!
//! Usage: tnpool <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use log::info;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process;

use tnpool::commands::{AnnotateCommand, GenerateCommand, GenerateConfig, SummaryCommand};
use tnpool::config::{AnnotateConfig, CentralRegion, DEFAULT_CENTRAL_LOWER, DEFAULT_CENTRAL_UPPER};
use tnpool::table::{Result, TableError};

#[derive(Parser)]
#[command(name = "tnpool")]
#[command(version)]
#[command(about = "Annotate transposon insertion pools with the genes they hit", long_about = None)]
struct Cli {
    /// Number of threads to use (default: number of CPUs)
    #[arg(long, short = 't', global = true)]
    threads: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by commands that annotate a pool.
#[derive(clap::Args)]
struct AnnotateArgs {
    /// Gene feature table
    #[arg(short = 'g', long)]
    genes: PathBuf,

    /// Barcode pool table
    #[arg(short = 'p', long)]
    pool: PathBuf,

    /// Number of features in the top-N ranking
    #[arg(long, default_value_t = tnpool::config::DEFAULT_TOP_N)]
    top_n: usize,

    /// Lower bound of the central region (relative position)
    #[arg(long, default_value_t = DEFAULT_CENTRAL_LOWER)]
    central_lower: f64,

    /// Upper bound of the central region (relative position)
    #[arg(long, default_value_t = DEFAULT_CENTRAL_UPPER)]
    central_upper: f64,

    /// Skip pool rows with no mapped position instead of failing
    #[arg(long)]
    drop_unmapped: bool,
}

impl AnnotateArgs {
    fn config(&self) -> Result<AnnotateConfig> {
        Ok(AnnotateConfig::new()
            .with_central(CentralRegion::new(self.central_lower, self.central_upper)?)
            .with_top_n(self.top_n)
            .with_drop_unmapped(self.drop_unmapped))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate every pool insertion with the gene that contains it
    Annotate {
        #[command(flatten)]
        args: AnnotateArgs,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Directory for summary tables
        #[arg(long)]
        summary_dir: Option<PathBuf>,

        /// Print run statistics to stderr
        #[arg(long)]
        stats: bool,
    },

    /// Print summary tables for an annotated pool
    Summary {
        #[command(flatten)]
        args: AnnotateArgs,
    },

    /// Generate a synthetic gene table and pool table
    Generate {
        /// Output directory
        #[arg(short, long, default_value = "./tnpool_data")]
        output: PathBuf,

        /// Number of scaffolds carrying genes
        #[arg(long, default_value = "3")]
        scaffolds: usize,

        /// Genes per scaffold
        #[arg(long, default_value = "500")]
        genes: usize,

        /// Number of barcoded insertions
        #[arg(long, default_value = "100000")]
        barcodes: usize,

        /// Random seed for reproducibility
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
}

/// Initializes the logger; warnings are shown unless `quiet` is set.
fn init_log(verbose: u8, quiet: bool) {
    if let Err(e) = stderrlog::new()
        .module(module_path!())
        .quiet(quiet)
        .verbosity(1 + verbose as usize)
        .timestamp(stderrlog::Timestamp::Off)
        .init()
    {
        eprintln!("Warning: logging disabled: {}", e);
    }
}

fn main() {
    let cli = Cli::parse();
    init_log(cli.verbose, cli.quiet);

    let result = configure_threads(cli.threads).and_then(|_| match cli.command {
        Commands::Annotate {
            args,
            output,
            summary_dir,
            stats,
        } => run_annotate(args, output, summary_dir, stats),
        Commands::Summary { args } => run_summary(args),
        Commands::Generate {
            output,
            scaffolds,
            genes,
            barcodes,
            seed,
            force,
        } => run_generate(GenerateConfig {
            output_dir: output,
            scaffolds,
            genes_per_scaffold: genes,
            barcodes,
            seed,
            force,
            ..Default::default()
        }),
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn configure_threads(threads: Option<usize>) -> Result<()> {
    if let Some(n) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .map_err(|e| TableError::InvalidConfig(format!("thread pool: {}", e)))?;
    }
    Ok(())
}

fn run_annotate(
    args: AnnotateArgs,
    output: Option<PathBuf>,
    summary_dir: Option<PathBuf>,
    stats: bool,
) -> Result<()> {
    let cmd = AnnotateCommand::new().with_config(args.config()?);

    let report = match output {
        Some(path) => cmd.run(
            &args.genes,
            &args.pool,
            File::create(&path)?,
            summary_dir.as_deref(),
        )?,
        None => {
            let stdout = io::stdout();
            let handle = stdout.lock();
            cmd.run(&args.genes, &args.pool, handle, summary_dir.as_deref())?
        }
    };

    if stats {
        eprintln!("Annotate stats: {}", report);
    }
    Ok(())
}

fn run_summary(args: AnnotateArgs) -> Result<()> {
    let cmd = SummaryCommand::new().with_config(args.config()?);
    let stdout = io::stdout();
    cmd.run(&args.genes, &args.pool, stdout.lock())?;
    Ok(())
}

fn run_generate(config: GenerateConfig) -> Result<()> {
    let output_dir = config.output_dir.clone();
    let stats = GenerateCommand::new(config).run()?;
    info!("Generated {} in {}", stats, output_dir.display());
    Ok(())
}

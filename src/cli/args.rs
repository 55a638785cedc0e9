//! Command line argument parsing for the silo-gt CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::groundtruth::{FileShard, PartitionAxis};

/// silo-gt - exact filtered groundtruth for sharded vector benchmarks
#[derive(Parser, Debug, Clone)]
#[command(name = "silo-gt")]
#[command(about = "Prepare sharded vector benchmarks and compute exact filtered groundtruth")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct GroundtruthArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human", global = true)]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl GroundtruthArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }

    /// Log level requested on the command line, or `None` when neither
    /// `-v` nor `-q` was given and the environment decides.
    pub fn log_filter(&self) -> Option<LevelFilter> {
        if !self.quiet && self.verbose == 0 {
            return None;
        }
        Some(match self.verbosity() {
            0 => LevelFilter::Error,
            1 => LevelFilter::Warn,
            2 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        })
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compute exact filtered nearest neighbors for a query set
    Groundtruth(GroundtruthCommandArgs),

    /// Show the header and a summary of a data file
    Inspect(InspectArgs),

    /// Convert raw .fbin vectors into a shard with sequential ids
    #[command(name = "convert-fbin")]
    ConvertFbin(ConvertFbinArgs),

    /// Split a shard and its metadata into contiguous silos
    Split(SplitArgs),

    /// Generate random metadata for a shard
    #[command(name = "generate-metadata")]
    GenerateMetadata(GenerateMetadataArgs),

    /// Sample query vectors from shards and attach random predicates
    #[command(name = "generate-queries")]
    GenerateQueries(GenerateQueriesArgs),

    /// Compute recall@K of an answer file against groundtruth
    Evaluate(EvaluateArgs),
}

/// Where to find the shards of a dataset.
#[derive(Args, Debug, Clone)]
pub struct ShardSelection {
    /// Vector shard files, in shard order
    #[arg(long = "vectors", value_name = "FIVECS", num_args = 1.., conflicts_with = "dir")]
    pub vectors: Vec<PathBuf>,

    /// Metadata files, aligned with --vectors
    #[arg(long = "metadata", value_name = "META", num_args = 1.., conflicts_with = "dir")]
    pub metadata: Vec<PathBuf>,

    /// Directory holding `{prefix}_{i}.fivecs` and `meta_{i}.txt` silo files
    #[arg(long, value_name = "DIR", requires = "silos")]
    pub dir: Option<PathBuf>,

    /// Number of silos in --dir
    #[arg(long, value_name = "N")]
    pub silos: Option<usize>,

    /// Vector file prefix of the silos in --dir
    #[arg(long, default_value = "deep")]
    pub prefix: String,
}

impl ShardSelection {
    /// Resolve the selection to shard file pairs.
    pub fn shards(&self) -> crate::error::Result<Vec<FileShard>> {
        if let (Some(dir), Some(silos)) = (&self.dir, self.silos) {
            return Ok(FileShard::silos(dir, &self.prefix, silos));
        }
        if self.vectors.len() != self.metadata.len() {
            return Err(crate::error::GroundtruthError::invalid_config(format!(
                "{} vector files but {} metadata files",
                self.vectors.len(),
                self.metadata.len()
            )));
        }
        Ok(self
            .vectors
            .iter()
            .zip(&self.metadata)
            .map(|(v, m)| FileShard::new(v, m))
            .collect())
    }
}

/// Arguments for computing groundtruth
#[derive(Parser, Debug, Clone)]
pub struct GroundtruthCommandArgs {
    /// Query set file
    #[arg(long, value_name = "QUERY_FILE")]
    pub queries: PathBuf,

    /// Groundtruth output file (.ivecs)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub shards: ShardSelection,

    /// Job configuration file (JSON); flags override its values
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Number of neighbors per query
    #[arg(short, long)]
    pub k: Option<usize>,

    /// Number of worker threads
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// How work is divided between threads
    #[arg(short, long)]
    pub partition: Option<PartitionAxis>,
}

/// Arguments for inspecting a file
#[derive(Parser, Debug, Clone)]
pub struct InspectArgs {
    /// File to inspect
    #[arg(value_name = "FILE")]
    pub path: PathBuf,

    /// File kind (guessed from the extension by default)
    #[arg(long, default_value = "auto")]
    pub kind: FileKind,

    /// Number of records to print
    #[arg(short, long, default_value = "3")]
    pub limit: usize,
}

/// Kinds of files the CLI understands
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// Guess from the file extension
    Auto,
    /// Vector shard (.fivecs)
    Shard,
    /// Metadata text file
    Metadata,
    /// Query set text file
    Queries,
    /// Groundtruth (.ivecs)
    Groundtruth,
    /// Raw vectors (.fbin)
    Fbin,
}

/// Arguments for converting .fbin files
#[derive(Parser, Debug, Clone)]
pub struct ConvertFbinArgs {
    /// Input .fbin file
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output shard file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// First row to convert
    #[arg(long, default_value = "0")]
    pub start: usize,

    /// Number of rows to convert (default: all remaining)
    #[arg(long)]
    pub count: Option<usize>,

    /// Id of the first converted row (default: --start)
    #[arg(long)]
    pub first_id: Option<i32>,
}

/// Arguments for splitting a shard
#[derive(Parser, Debug, Clone)]
pub struct SplitArgs {
    /// Vector shard file
    #[arg(value_name = "VECTORS")]
    pub vectors: PathBuf,

    /// Metadata file aligned with the shard
    #[arg(value_name = "METADATA")]
    pub metadata: PathBuf,

    /// Output directory
    #[arg(value_name = "OUT_DIR")]
    pub out_dir: PathBuf,

    /// Number of silos
    #[arg(short, long, default_value = "5")]
    pub silos: usize,

    /// Vector file prefix of the silos
    #[arg(long, default_value = "deep")]
    pub prefix: String,
}

/// Arguments for generating metadata
#[derive(Parser, Debug, Clone)]
pub struct GenerateMetadataArgs {
    /// Vector shard whose record count the metadata follows
    #[arg(value_name = "VECTORS")]
    pub vectors: PathBuf,

    /// Output metadata file
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Label vocabulary (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Name of the label field
    #[arg(long, default_value = "color")]
    pub label_field: String,

    /// Name of the integer field
    #[arg(long, default_value = "value")]
    pub value_field: String,

    /// Do not generate the integer field
    #[arg(long)]
    pub no_values: bool,

    /// Inclusive upper bound of the integer field
    #[arg(long, default_value = "10000")]
    pub value_max: i64,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Arguments for generating a query workload
#[derive(Parser, Debug, Clone)]
pub struct GenerateQueriesArgs {
    /// Output query set file
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: PathBuf,

    #[command(flatten)]
    pub shards: ShardSelection,

    /// Queries sampled from each shard
    #[arg(short = 'n', long, default_value = "20")]
    pub per_shard: usize,

    /// Label vocabulary (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Field of the equality clause
    #[arg(long, default_value = "color")]
    pub label_field: String,

    /// Field of the range clause
    #[arg(long, default_value = "value")]
    pub range_field: String,

    /// Do not attach an equality clause
    #[arg(long)]
    pub no_equality: bool,

    /// Do not attach a range clause
    #[arg(long)]
    pub no_range: bool,

    /// Smallest range bound
    #[arg(long, default_value = "0")]
    pub range_min: i64,

    /// Largest range bound
    #[arg(long, default_value = "10000")]
    pub range_max: i64,

    /// Ranges are strictly wider than this
    #[arg(long, default_value = "100")]
    pub min_width: i64,

    /// Random seed
    #[arg(long, default_value = "42")]
    pub seed: u64,
}

/// Arguments for evaluating answers
#[derive(Parser, Debug, Clone)]
pub struct EvaluateArgs {
    /// Groundtruth file (.ivecs)
    #[arg(value_name = "TRUTH")]
    pub truth: PathBuf,

    /// Answer file in groundtruth layout
    #[arg(value_name = "ANSWERS")]
    pub answers: PathBuf,

    /// Recall cut-off
    #[arg(short, long, default_value = "10")]
    pub k: usize,

    /// Print the recall of every query
    #[arg(long)]
    pub per_query: bool,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

//! Command implementations for the silo-gt CLI.

use std::path::Path;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::dataset::{
    MetadataGenConfig, SplitConfig, WorkloadConfig, convert_fbin, generate_metadata,
    generate_workload, recall_at_k, split_files,
};
use crate::error::{GroundtruthError, Result};
use crate::format::{
    file_len, read_fbin_chunk, read_fbin_header, read_groundtruth, read_metadata, read_query_set,
    read_shard, read_shard_header, write_groundtruth, write_metadata, write_query_set,
};
use crate::groundtruth::{GroundtruthConfig, GroundtruthEngine, ShardSource};

/// Execute a CLI command.
pub fn execute_command(args: GroundtruthArgs) -> Result<()> {
    match &args.command {
        Command::Groundtruth(gt_args) => compute_groundtruth(gt_args, &args),
        Command::Inspect(inspect_args) => inspect_file(inspect_args, &args),
        Command::ConvertFbin(convert_args) => convert(convert_args, &args),
        Command::Split(split_args) => split(split_args, &args),
        Command::GenerateMetadata(gen_args) => generate_meta(gen_args, &args),
        Command::GenerateQueries(gen_args) => generate_queries(gen_args, &args),
        Command::Evaluate(eval_args) => evaluate(eval_args, &args),
    }
}

/// Build the job configuration: defaults, then the config file, then flags.
fn job_config(args: &GroundtruthCommandArgs) -> Result<GroundtruthConfig> {
    let mut config = match &args.config {
        Some(path) => GroundtruthConfig::from_json_file(path)?,
        None => GroundtruthConfig::default(),
    };
    if let Some(k) = args.k {
        config = config.with_k(k);
    }
    if let Some(threads) = args.threads {
        config = config.with_num_threads(threads);
    }
    if let Some(partition) = args.partition {
        config = config.with_partition(partition);
    }
    config.validate()?;
    Ok(config)
}

/// Compute groundtruth for a query set.
fn compute_groundtruth(args: &GroundtruthCommandArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let config = job_config(args)?;
    let shards = args.shards.shards()?;

    let queries = read_query_set(&args.queries)?;
    info!(
        "Loaded {} queries of dimension {} from {}",
        queries.len(),
        queries.dimension(),
        args.queries.display()
    );

    let engine = GroundtruthEngine::new(config)?;
    let output = engine.run(&queries, &shards)?;
    write_groundtruth(&args.output, &output.results)?;

    output_result(
        "Groundtruth computed successfully",
        &GroundtruthJobResult {
            output: args.output.display().to_string(),
            queries: queries.len(),
            k: engine.config().k,
            output_bytes: file_len(&args.output)?,
            stats: output.stats,
        },
        cli_args,
    )
}

/// Guess a file kind from its name.
fn detect_kind(path: &Path) -> Result<FileKind> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();

    match ext.as_deref() {
        Some("fivecs") => Ok(FileKind::Shard),
        Some("ivecs") => Ok(FileKind::Groundtruth),
        Some("fbin") | Some("bin") => Ok(FileKind::Fbin),
        Some("txt") if name.starts_with("meta") => Ok(FileKind::Metadata),
        Some("txt") if name.starts_with("query") => Ok(FileKind::Queries),
        _ => Err(GroundtruthError::invalid_config(format!(
            "Cannot tell the kind of {}; pass --kind",
            path.display()
        ))),
    }
}

/// Show a summary of a data file.
fn inspect_file(args: &InspectArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let path = args.path.as_path();
    let kind = match args.kind {
        FileKind::Auto => detect_kind(path)?,
        kind => kind,
    };

    let mut result = InspectResult {
        path: path.display().to_string(),
        kind: format!("{kind:?}").to_lowercase(),
        size_bytes: file_len(path)?,
        records: 0,
        dimension: None,
        schema: None,
        sample: Vec::new(),
    };

    match kind {
        FileKind::Shard => {
            let header = read_shard_header(path)?;
            result.records = header.count;
            result.dimension = Some(header.dimension);
            if args.limit > 0 {
                let shard = read_shard(path)?;
                result.sample = shard
                    .records()
                    .iter()
                    .take(args.limit)
                    .map(|r| format!("id {}: {}", r.id, preview(&r.embedding)))
                    .collect();
            }
        }
        FileKind::Metadata => {
            let table = read_metadata(path)?;
            result.records = table.len();
            result.schema = Some(table.schema().to_string());
            result.sample = table
                .records()
                .iter()
                .take(args.limit)
                .map(|r| {
                    r.values()
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect();
        }
        FileKind::Queries => {
            let set = read_query_set(path)?;
            result.records = set.len();
            result.dimension = Some(set.dimension());
            result.sample = set
                .queries()
                .iter()
                .take(args.limit)
                .map(|q| format!("{} | {}", preview(&q.embedding), q.predicate))
                .collect();
        }
        FileKind::Groundtruth => {
            let lists = read_groundtruth(path)?;
            result.records = lists.len();
            result.sample = lists
                .iter()
                .take(args.limit)
                .map(|ids| format!("k={}: {}", ids.len(), preview(ids)))
                .collect();
        }
        FileKind::Fbin => {
            let header = read_fbin_header(path)?;
            result.records = header.count;
            result.dimension = Some(header.dimension);
            let (_, rows) = read_fbin_chunk(path, 0, Some(args.limit.min(header.count)))?;
            result.sample = rows.iter().map(|row| preview(row)).collect();
        }
        FileKind::Auto => {
            return Err(GroundtruthError::internal("file kind left unresolved"));
        }
    }

    output_result("File summary", &result, cli_args)
}

/// Format the first few values of a list.
fn preview<T: std::fmt::Display>(values: &[T]) -> String {
    const SHOWN: usize = 6;
    let head: Vec<String> = values.iter().take(SHOWN).map(|v| v.to_string()).collect();
    if values.len() > SHOWN {
        format!("[{}, ...]", head.join(", "))
    } else {
        format!("[{}]", head.join(", "))
    }
}

/// Convert an .fbin file into a shard.
fn convert(args: &ConvertFbinArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let first_id = match args.first_id {
        Some(id) => id,
        None => i32::try_from(args.start).map_err(|_| {
            GroundtruthError::invalid_config(format!("Start row {} exceeds i32 ids", args.start))
        })?,
    };
    let header = convert_fbin(&args.input, &args.output, args.start, args.count, first_id)?;

    output_result(
        "Conversion completed",
        &ConversionResult {
            input: args.input.display().to_string(),
            output: args.output.display().to_string(),
            vectors: header.count,
            dimension: header.dimension,
            first_id,
        },
        cli_args,
    )
}

/// Split a shard into silos.
fn split(args: &SplitArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let config = SplitConfig::new(args.silos).with_prefix(args.prefix.as_str());
    let files = split_files(&args.vectors, &args.metadata, &args.out_dir, &config)?;

    let mut silos = Vec::with_capacity(files.len());
    for file in &files {
        silos.push(SiloInfo {
            vectors: file.vectors_path().display().to_string(),
            metadata: file.metadata_path().display().to_string(),
            records: file.header()?.count,
        });
    }

    output_result(
        "Split completed",
        &SplitResult {
            out_dir: args.out_dir.display().to_string(),
            silos,
        },
        cli_args,
    )
}

/// Generate metadata for a shard.
fn generate_meta(args: &GenerateMetadataArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let mut config = MetadataGenConfig::default().with_seed(args.seed);
    if !args.labels.is_empty() {
        config = config.with_labels(args.labels.iter().map(String::as_str));
    }
    if args.no_values {
        config = config.without_values();
    } else {
        config.value_field = Some(args.value_field.clone());
    }
    config.label_field = args.label_field.clone();
    config.value_max = args.value_max;

    let count = read_shard_header(&args.vectors)?.count;
    let table = generate_metadata(count, &config)?;
    write_metadata(&args.output, &table)?;

    output_result(
        "Metadata generated",
        &MetadataGenerationResult {
            output: args.output.display().to_string(),
            records: table.len(),
            schema: table.schema().to_string(),
            seed: args.seed,
        },
        cli_args,
    )
}

/// Generate a query workload.
fn generate_queries(args: &GenerateQueriesArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let sources = args.shards.shards()?;
    if sources.is_empty() {
        return Err(GroundtruthError::invalid_config(
            "No shards given; pass --vectors/--metadata or --dir/--silos",
        ));
    }

    let mut config = WorkloadConfig::new(args.per_shard).with_seed(args.seed);
    if !args.labels.is_empty() {
        config.labels = args.labels.clone();
    }
    config.label_field = (!args.no_equality).then(|| args.label_field.clone());
    config = config.with_range(
        (!args.no_range).then_some(args.range_field.as_str()),
        args.range_min,
        args.range_max,
        args.min_width,
    );

    let shards = sources
        .iter()
        .map(|s| read_shard(s.vectors_path()))
        .collect::<Result<Vec<_>>>()?;
    let set = generate_workload(&shards, &config)?;
    write_query_set(&args.output, &set)?;

    output_result(
        "Query workload generated",
        &WorkloadGenerationResult {
            output: args.output.display().to_string(),
            queries: set.len(),
            dimension: set.dimension(),
            shards: shards.len(),
            seed: args.seed,
        },
        cli_args,
    )
}

/// Evaluate an answer file against groundtruth.
fn evaluate(args: &EvaluateArgs, cli_args: &GroundtruthArgs) -> Result<()> {
    let truth = read_groundtruth(&args.truth)?;
    let answers = read_groundtruth(&args.answers)?;
    let mut report = recall_at_k(&truth, &answers, args.k)?;
    if !args.per_query {
        report.per_query.clear();
    }

    output_result(
        &format!("Recall@{}", args.k),
        &EvaluationResult {
            truth: args.truth.display().to_string(),
            answers: args.answers.display().to_string(),
            report,
        },
        cli_args,
    )
}

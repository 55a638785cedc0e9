//! Output formatting for CLI commands.

use serde::{Deserialize, Serialize};

use crate::cli::args::{GroundtruthArgs, OutputFormat};
use crate::dataset::RecallReport;
use crate::error::Result;
use crate::groundtruth::ScanStats;

/// Result structure for a groundtruth job.
#[derive(Debug, Serialize, Deserialize)]
pub struct GroundtruthJobResult {
    pub output: String,
    pub queries: usize,
    pub k: usize,
    pub output_bytes: u64,
    pub stats: ScanStats,
}

/// Summary of one inspected file.
#[derive(Debug, Serialize, Deserialize)]
pub struct InspectResult {
    pub path: String,
    pub kind: String,
    pub size_bytes: u64,
    pub records: usize,
    pub dimension: Option<usize>,
    pub schema: Option<String>,
    pub sample: Vec<String>,
}

/// Result structure for .fbin conversion.
#[derive(Debug, Serialize, Deserialize)]
pub struct ConversionResult {
    pub input: String,
    pub output: String,
    pub vectors: usize,
    pub dimension: usize,
    pub first_id: i32,
}

/// Result structure for shard splitting.
#[derive(Debug, Serialize, Deserialize)]
pub struct SplitResult {
    pub out_dir: String,
    pub silos: Vec<SiloInfo>,
}

/// One silo written by a split.
#[derive(Debug, Serialize, Deserialize)]
pub struct SiloInfo {
    pub vectors: String,
    pub metadata: String,
    pub records: usize,
}

/// Result structure for metadata generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct MetadataGenerationResult {
    pub output: String,
    pub records: usize,
    pub schema: String,
    pub seed: u64,
}

/// Result structure for workload generation.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkloadGenerationResult {
    pub output: String,
    pub queries: usize,
    pub dimension: usize,
    pub shards: usize,
    pub seed: u64,
}

/// Result structure for answer evaluation.
#[derive(Debug, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub truth: String,
    pub answers: String,
    #[serde(flatten)]
    pub report: RecallReport,
}

/// Output a result in the specified format.
pub fn output_result<T: Serialize>(message: &str, result: &T, args: &GroundtruthArgs) -> Result<()> {
    match args.output_format {
        OutputFormat::Human => output_human(message, result, args),
        OutputFormat::Json => output_json(result, args),
    }
}

/// Output in human-readable format.
fn output_human<T: Serialize>(message: &str, result: &T, args: &GroundtruthArgs) -> Result<()> {
    if args.verbosity() > 0 {
        println!("{message}");
        println!();
    }

    let value = serde_json::to_value(result)?;
    print_human_value(&value, 0);
    Ok(())
}

/// Print a JSON value as indented `key: value` lines.
fn print_human_value(value: &serde_json::Value, indent: usize) {
    let spaces = "  ".repeat(indent);

    match value {
        serde_json::Value::Object(obj) => {
            for (key, val) in obj {
                match val {
                    serde_json::Value::Object(_) => {
                        println!("{spaces}{key}:");
                        print_human_value(val, indent + 1);
                    }
                    serde_json::Value::Array(arr)
                        if arr.iter().any(|v| v.is_object()) =>
                    {
                        println!("{spaces}{key}:");
                        for item in arr {
                            println!("{spaces}  -");
                            print_human_value(item, indent + 2);
                        }
                    }
                    _ if key.ends_with("_bytes") => {
                        let formatted = val.as_u64().map_or_else(|| format_value(val), format_bytes);
                        println!("{spaces}{key}: {formatted}");
                    }
                    _ => {
                        let formatted_val = format_value(val);
                        println!("{spaces}{key}: {formatted_val}");
                    }
                }
            }
        }
        _ => {
            let formatted_value = format_value(value);
            println!("{spaces}{formatted_value}");
        }
    }
}

/// Output in JSON format.
fn output_json<T: Serialize>(result: &T, args: &GroundtruthArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}

/// Format a JSON value for human-readable output.
fn format_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{f:.4}"),
            _ => n.to_string(),
        },
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Array(arr) => {
            let formatted_values = arr.iter().map(format_value).collect::<Vec<_>>().join(", ");
            format!("[{formatted_values}]")
        }
        serde_json::Value::Object(_) => "[object]".to_string(),
        serde_json::Value::Null => "-".to_string(),
    }
}

/// Format bytes into human-readable format.
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        let unit = UNITS[unit_index];
        format!("{bytes} {unit}")
    } else {
        let unit = UNITS[unit_index];
        format!("{size:.1} {unit}")
    }
}

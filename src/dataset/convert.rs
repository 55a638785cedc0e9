//! Conversion of raw `.fbin` vectors into id-carrying shards.

use std::path::Path;

use log::info;

use crate::error::{GroundtruthError, Result};
use crate::format::{ShardHeader, VectorRecord, VectorShard, read_fbin_chunk, write_shard};

/// Build a shard from raw rows, giving row `i` the id `first_id + i`.
pub fn vectors_to_shard(
    dimension: usize,
    vectors: Vec<Vec<f32>>,
    first_id: i32,
) -> Result<VectorShard> {
    let last = i64::from(first_id) + vectors.len() as i64 - 1;
    if last > i64::from(i32::MAX) {
        return Err(GroundtruthError::validation(format!(
            "Ids {first_id}..={last} do not fit in i32"
        )));
    }

    let records = vectors
        .into_iter()
        .enumerate()
        .map(|(i, embedding)| VectorRecord::new(first_id + i as i32, embedding))
        .collect();
    VectorShard::from_records(dimension, records)
}

/// Convert rows `start..start + len` of an `.fbin` file into a shard file.
///
/// Ids continue from `first_id`, so converting consecutive chunks with
/// consecutive offsets keeps ids unique across the resulting shards.
pub fn convert_fbin<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    start: usize,
    len: Option<usize>,
    first_id: i32,
) -> Result<ShardHeader> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let (dimension, vectors) = read_fbin_chunk(input, start, len)?;
    info!(
        "Read {} vectors of dimension {dimension} from {}",
        vectors.len(),
        input.display()
    );

    let shard = vectors_to_shard(dimension, vectors, first_id)?;
    write_shard(output, &shard)?;
    info!("Wrote {} vectors to {}", shard.len(), output.display());

    Ok(shard.header())
}

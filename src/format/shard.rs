//! Vector shard files (`.fivecs`).
//!
//! A shard stores `count` vectors of a single dimension, each preceded by its
//! id. Ids are assigned once by the producer and carried unchanged through
//! splitting and merging, so they stay unique across all shards of a dataset.

use std::io::{Cursor, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::format::binary::{StructReader, StructWriter};
use crate::format::{create_writer, file_len, open_reader, read_bytes};

/// Size of the `(count, dim)` header in bytes.
pub const HEADER_BYTES: u64 = 8;

/// One vector and its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: i32,
    pub embedding: Vec<f32>,
}

impl VectorRecord {
    /// Create a new vector record.
    pub fn new(id: i32, embedding: Vec<f32>) -> Self {
        VectorRecord { id, embedding }
    }
}

/// The decoded header of a shard file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardHeader {
    pub count: usize,
    pub dimension: usize,
}

impl ShardHeader {
    /// The exact file length a shard with this header must have.
    pub fn expected_len(&self) -> Option<u64> {
        let record = (self.dimension as u64).checked_mul(4)?.checked_add(4)?;
        (self.count as u64)
            .checked_mul(record)?
            .checked_add(HEADER_BYTES)
    }
}

/// All vectors of one shard, materialized in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorShard {
    dimension: usize,
    records: Vec<VectorRecord>,
}

impl VectorShard {
    /// Create an empty shard of the given dimension.
    pub fn new(dimension: usize) -> Self {
        VectorShard {
            dimension,
            records: Vec::new(),
        }
    }

    /// Create a shard from records, checking that all share `dimension`.
    pub fn from_records(dimension: usize, records: Vec<VectorRecord>) -> Result<Self> {
        let mut shard = VectorShard::new(dimension);
        shard.records.reserve(records.len());
        for record in records {
            shard.push(record)?;
        }
        Ok(shard)
    }

    /// Append a record.
    pub fn push(&mut self, record: VectorRecord) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(GroundtruthError::validation(format!(
                "Vector {} has dimension {}, shard dimension is {}",
                record.id,
                record.embedding.len(),
                self.dimension
            )));
        }
        self.records.push(record);
        Ok(())
    }

    /// Get the vector dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get all records in file order.
    pub fn records(&self) -> &[VectorRecord] {
        &self.records
    }

    /// Consume the shard, returning its records.
    pub fn into_records(self) -> Vec<VectorRecord> {
        self.records
    }

    /// Get the number of vectors.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the shard is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the header describing this shard.
    pub fn header(&self) -> ShardHeader {
        ShardHeader {
            count: self.records.len(),
            dimension: self.dimension,
        }
    }
}

fn decode_header(count: i32, dim: i32, path: &Path) -> Result<ShardHeader> {
    if count <= 0 || dim <= 0 {
        return Err(GroundtruthError::format(format!(
            "{}: count and dimension must be positive, found count={count} dim={dim}",
            path.display()
        )));
    }
    Ok(ShardHeader {
        count: count as usize,
        dimension: dim as usize,
    })
}

fn check_len(header: &ShardHeader, actual: u64, path: &Path) -> Result<()> {
    let expected = header.expected_len().ok_or_else(|| {
        GroundtruthError::format(format!(
            "{}: header count={} dim={} overflows the addressable size",
            path.display(),
            header.count,
            header.dimension
        ))
    })?;

    if actual != expected {
        let what = if actual < expected {
            "truncated"
        } else {
            "has trailing bytes"
        };
        return Err(GroundtruthError::format(format!(
            "{}: file {what}: expected {expected} bytes for count={} dim={}, found {actual}",
            path.display(),
            header.count,
            header.dimension
        )));
    }
    Ok(())
}

/// Read only the header of a shard file and check the file length against it.
pub fn read_shard_header<P: AsRef<Path>>(path: P) -> Result<ShardHeader> {
    let path = path.as_ref();
    let actual = file_len(path)?;
    if actual < HEADER_BYTES {
        return Err(GroundtruthError::format(format!(
            "{}: truncated header ({actual} bytes)",
            path.display()
        )));
    }

    let mut reader = StructReader::new(open_reader(path)?.take(HEADER_BYTES), path);
    let count = reader.read_i32()?;
    let dim = reader.read_i32()?;
    let header = decode_header(count, dim, path)?;
    check_len(&header, actual, path)?;

    Ok(header)
}

/// Read a whole shard file into memory.
pub fn read_shard<P: AsRef<Path>>(path: P) -> Result<VectorShard> {
    let path = path.as_ref();
    let bytes = read_bytes(path)?;
    decode_shard(&bytes, path)
}

/// Decode a shard from an in-memory buffer. `source` is used in error messages.
pub fn decode_shard<P: AsRef<Path>>(bytes: &[u8], source: P) -> Result<VectorShard> {
    let path = source.as_ref();
    if (bytes.len() as u64) < HEADER_BYTES {
        return Err(GroundtruthError::format(format!(
            "{}: truncated header ({} bytes)",
            path.display(),
            bytes.len()
        )));
    }

    let mut reader = StructReader::new(Cursor::new(bytes), path);
    let count = reader.read_i32()?;
    let dim = reader.read_i32()?;
    let header = decode_header(count, dim, path)?;
    check_len(&header, bytes.len() as u64, path)?;

    let mut records = Vec::with_capacity(header.count);
    for _ in 0..header.count {
        let id = reader.read_i32()?;
        let mut embedding = vec![0.0f32; header.dimension];
        reader.read_f32_into(&mut embedding)?;
        records.push(VectorRecord { id, embedding });
    }

    Ok(VectorShard {
        dimension: header.dimension,
        records,
    })
}

/// Write a shard file.
pub fn write_shard<P: AsRef<Path>>(path: P, shard: &VectorShard) -> Result<()> {
    let path = path.as_ref();
    let count = i32::try_from(shard.len()).map_err(|_| {
        GroundtruthError::format(format!("Shard of {} vectors exceeds i32 count", shard.len()))
    })?;
    let dim = i32::try_from(shard.dimension()).map_err(|_| {
        GroundtruthError::format(format!("Dimension {} exceeds i32", shard.dimension()))
    })?;
    if count == 0 || dim == 0 {
        return Err(GroundtruthError::format(format!(
            "{}: refusing to write an empty shard (count={count} dim={dim})",
            path.display()
        )));
    }

    let mut writer = StructWriter::new(create_writer(path)?, path);
    writer.write_i32(count)?;
    writer.write_i32(dim)?;
    for record in shard.records() {
        writer.write_i32(record.id)?;
        writer.write_f32s(&record.embedding)?;
    }
    writer.finish()
}

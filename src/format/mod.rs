//! On-disk formats shared by every producer and consumer of benchmark data.
//!
//! All binary integers and floats are little-endian.
//!
//! | Artifact | Layout |
//! |---|---|
//! | vector shard (`.fivecs`) | `i32 count, i32 dim, count × (i32 id, dim × f32)` |
//! | metadata (text) | `"<count> <pairs>"`, `(name type)` pairs, `count` value lines |
//! | query set (text) | `"<count> <dim>"`, each line `dim` floats + predicate tokens |
//! | groundtruth (`.ivecs`) | `(i32 k, k × i32 id)` per query |
//! | raw vectors (`.fbin`) | `i32 count, i32 dim, count × dim × f32` |

pub mod binary;
pub mod fbin;
pub mod groundtruth;
pub mod metadata;
pub mod query;
pub mod shard;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{GroundtruthError, Result};

pub use fbin::{read_fbin, read_fbin_chunk, read_fbin_header, write_fbin};
pub use groundtruth::{decode_groundtruth, read_groundtruth, write_groundtruth, write_id_lists};
pub use metadata::{MetadataTable, read_metadata, read_metadata_header, write_metadata};
pub use query::{QueryRecord, QuerySet, read_query_set, write_query_set};
pub use shard::{ShardHeader, VectorRecord, VectorShard, read_shard, read_shard_header, write_shard};

/// Open a file for buffered reading, attaching the path to any failure.
pub(crate) fn open_reader(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| GroundtruthError::io_at(path, e))
}

/// Create (or truncate) a file for buffered writing.
pub(crate) fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| GroundtruthError::io_at(path, e))
}

/// Read a whole file into memory.
pub(crate) fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| GroundtruthError::io_at(path, e))
}

/// Read a whole UTF-8 text file into memory.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| GroundtruthError::io_at(path, e))
}

/// Get the size of a file in bytes.
pub(crate) fn file_len(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| GroundtruthError::io_at(path, e))
}

//! Shards as seen by the groundtruth engine.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::error::{GroundtruthError, Result};
use crate::format::{
    MetadataTable, ShardHeader, VectorShard, read_metadata, read_metadata_header, read_shard,
    read_shard_header,
};
use crate::schema::Schema;

/// A shard's vectors together with its aligned metadata records.
#[derive(Debug, Clone, PartialEq)]
pub struct Shard {
    vectors: VectorShard,
    metadata: MetadataTable,
}

impl Shard {
    /// Pair vectors with their metadata. Both must hold the same number of records.
    pub fn new(vectors: VectorShard, metadata: MetadataTable) -> Result<Self> {
        if vectors.len() != metadata.len() {
            return Err(GroundtruthError::format(format!(
                "Shard holds {} vectors but {} metadata records",
                vectors.len(),
                metadata.len()
            )));
        }
        Ok(Shard { vectors, metadata })
    }

    /// Get the vectors.
    pub fn vectors(&self) -> &VectorShard {
        &self.vectors
    }

    /// Get the metadata table.
    pub fn metadata(&self) -> &MetadataTable {
        &self.metadata
    }

    /// Get the metadata schema.
    pub fn schema(&self) -> &Schema {
        self.metadata.schema()
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the shard has no records.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Split into vectors and metadata.
    pub fn into_parts(self) -> (VectorShard, MetadataTable) {
        (self.vectors, self.metadata)
    }
}

/// Something the engine can validate cheaply and then load in full.
pub trait ShardSource: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn describe(&self) -> String;

    /// Vector count and dimension, without loading the vectors.
    fn header(&self) -> Result<ShardHeader>;

    /// Metadata record count and schema, without loading the records.
    fn metadata_header(&self) -> Result<(usize, Schema)>;

    /// Load every vector and metadata record.
    fn load(&self) -> Result<Cow<'_, Shard>>;
}

impl ShardSource for Shard {
    fn describe(&self) -> String {
        format!("in-memory shard ({} vectors)", self.len())
    }

    fn header(&self) -> Result<ShardHeader> {
        Ok(self.vectors.header())
    }

    fn metadata_header(&self) -> Result<(usize, Schema)> {
        Ok((self.metadata.len(), self.metadata.schema().clone()))
    }

    fn load(&self) -> Result<Cow<'_, Shard>> {
        Ok(Cow::Borrowed(self))
    }
}

/// A shard stored as a vector file and a metadata file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileShard {
    vectors_path: PathBuf,
    metadata_path: PathBuf,
}

impl FileShard {
    /// Create a file-backed shard.
    pub fn new<V: Into<PathBuf>, M: Into<PathBuf>>(vectors_path: V, metadata_path: M) -> Self {
        FileShard {
            vectors_path: vectors_path.into(),
            metadata_path: metadata_path.into(),
        }
    }

    /// The shard for silo `index` in `dir`: `{prefix}_{index}.fivecs` and `meta_{index}.txt`.
    pub fn silo<P: AsRef<Path>>(dir: P, prefix: &str, index: usize) -> Self {
        let dir = dir.as_ref();
        FileShard::new(
            dir.join(format!("{prefix}_{index}.fivecs")),
            dir.join(format!("meta_{index}.txt")),
        )
    }

    /// All `count` silos of a dataset, in silo order.
    pub fn silos<P: AsRef<Path>>(dir: P, prefix: &str, count: usize) -> Vec<FileShard> {
        (0..count)
            .map(|i| FileShard::silo(dir.as_ref(), prefix, i))
            .collect()
    }

    /// Get the vector file path.
    pub fn vectors_path(&self) -> &Path {
        &self.vectors_path
    }

    /// Get the metadata file path.
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }
}

impl ShardSource for FileShard {
    fn describe(&self) -> String {
        format!(
            "{} + {}",
            self.vectors_path.display(),
            self.metadata_path.display()
        )
    }

    fn header(&self) -> Result<ShardHeader> {
        read_shard_header(&self.vectors_path)
    }

    fn metadata_header(&self) -> Result<(usize, Schema)> {
        read_metadata_header(&self.metadata_path)
    }

    fn load(&self) -> Result<Cow<'_, Shard>> {
        let vectors = read_shard(&self.vectors_path)?;
        let metadata = read_metadata(&self.metadata_path)?;
        if vectors.len() != metadata.len() {
            return Err(GroundtruthError::format(format!(
                "{} holds {} vectors but {} holds {} metadata records",
                self.vectors_path.display(),
                vectors.len(),
                self.metadata_path.display(),
                metadata.len()
            )));
        }
        Ok(Cow::Owned(Shard { vectors, metadata }))
    }
}

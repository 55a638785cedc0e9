//! IID splitting of one shard into contiguous silos.

use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::format::{MetadataTable, VectorShard, read_metadata, read_shard, write_metadata, write_shard};
use crate::groundtruth::{FileShard, Shard};

/// Configuration for splitting a shard into silos.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Number of silos to produce.
    pub silos: usize,

    /// File name prefix of the silo vector files.
    pub prefix: String,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            silos: 5,
            prefix: "deep".to_string(),
        }
    }
}

impl SplitConfig {
    /// Create a new config with the specified silo count.
    pub fn new(silos: usize) -> Self {
        Self {
            silos,
            ..Default::default()
        }
    }

    /// Set the vector file name prefix.
    pub fn with_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Check the configuration against a shard of `records` records.
    pub fn validate(&self, records: usize) -> Result<()> {
        if self.silos == 0 {
            return Err(GroundtruthError::invalid_config("silos must be at least 1"));
        }
        if self.silos > records {
            return Err(GroundtruthError::invalid_config(format!(
                "Cannot split {records} records into {} non-empty silos",
                self.silos
            )));
        }
        if self.prefix.is_empty() || self.prefix.contains(['/', '\\']) {
            return Err(GroundtruthError::invalid_config(format!(
                "Invalid silo prefix '{}'",
                self.prefix
            )));
        }
        Ok(())
    }
}

/// Split a shard into `silos` contiguous parts.
///
/// The first `len % silos` parts get one extra record. Ids, record order and
/// vector/metadata alignment are preserved.
pub fn split_iid(shard: &Shard, silos: usize) -> Result<Vec<Shard>> {
    SplitConfig::new(silos).validate(shard.len())?;

    let dimension = shard.vectors().dimension();
    let schema = shard.schema();
    let records = shard.vectors().records();
    let metadata = shard.metadata().records();

    let base = records.len() / silos;
    let extra = records.len() % silos;

    let mut parts = Vec::with_capacity(silos);
    let mut start = 0;
    for i in 0..silos {
        let end = start + base + usize::from(i < extra);
        let vectors = VectorShard::from_records(dimension, records[start..end].to_vec())?;
        let table = MetadataTable::from_records(schema.clone(), metadata[start..end].to_vec())?;
        parts.push(Shard::new(vectors, table)?);
        start = end;
    }

    Ok(parts)
}

/// Split a vector file and its metadata file into silo files under `out_dir`.
///
/// Silo `i` is written as `{prefix}_{i}.fivecs` and `meta_{i}.txt`.
pub fn split_files<P, Q, R>(
    vectors_path: P,
    metadata_path: Q,
    out_dir: R,
    config: &SplitConfig,
) -> Result<Vec<FileShard>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let out_dir = out_dir.as_ref();
    let source = FileShard::new(vectors_path.as_ref(), metadata_path.as_ref());
    let shard = Shard::new(read_shard(source.vectors_path())?, read_metadata(source.metadata_path())?)?;
    config.validate(shard.len())?;

    fs::create_dir_all(out_dir).map_err(|e| GroundtruthError::io_at(out_dir, e))?;

    let parts = split_iid(&shard, config.silos)?;
    let mut files = Vec::with_capacity(parts.len());
    for (i, part) in parts.iter().enumerate() {
        let target = FileShard::silo(out_dir, &config.prefix, i);
        write_shard(target.vectors_path(), part.vectors())?;
        write_metadata(target.metadata_path(), part.metadata())?;
        info!("Silo {i}: {} records -> {}", part.len(), target.vectors_path().display());
        files.push(target);
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::VectorRecord;
    use crate::schema::{FieldType, MetadataRecord, Schema};

    fn shard(n: usize) -> Shard {
        let vectors = VectorShard::from_records(
            1,
            (0..n)
                .map(|i| VectorRecord::new(1000 + i as i32, vec![i as f32]))
                .collect(),
        )
        .unwrap();
        let schema = Schema::builder().field("value", FieldType::Int).build().unwrap();
        let metadata = MetadataTable::from_records(
            schema,
            (0..n)
                .map(|i| MetadataRecord::new(vec![(i as i64).into()]))
                .collect(),
        )
        .unwrap();
        Shard::new(vectors, metadata).unwrap()
    }

    #[test]
    fn test_split_sizes_and_order() {
        let parts = split_iid(&shard(7), 3).unwrap();
        let sizes: Vec<usize> = parts.iter().map(Shard::len).collect();
        assert_eq!(sizes, vec![3, 2, 2]);

        let ids: Vec<i32> = parts
            .iter()
            .flat_map(|p| p.vectors().records().iter().map(|r| r.id))
            .collect();
        assert_eq!(ids, (1000..1007).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_keeps_alignment() {
        for part in split_iid(&shard(10), 4).unwrap() {
            for (record, meta) in part.vectors().records().iter().zip(part.metadata().records()) {
                assert_eq!(
                    meta.get(0).and_then(|v| v.as_f64()),
                    Some(f64::from(record.embedding[0]))
                );
            }
        }
    }

    #[test]
    fn test_invalid_silo_count() {
        assert!(matches!(
            split_iid(&shard(2), 3),
            Err(GroundtruthError::InvalidConfig(_))
        ));
        assert!(matches!(
            split_iid(&shard(2), 0),
            Err(GroundtruthError::InvalidConfig(_))
        ));
    }
}

//! Groundtruth files (`.ivecs`): one `(i32 k, k × i32 id)` block per query.
//!
//! Blocks appear in query order. `k` is the number of neighbors actually
//! found for that query and may be smaller than the requested K.

use std::io::Read;
use std::path::Path;

use crate::error::{GroundtruthError, Result};
use crate::format::binary::{StructReader, StructWriter};
use crate::format::{create_writer, open_reader};
use crate::search::NeighborResult;

/// Write the ids of per-query results.
pub fn write_groundtruth<P: AsRef<Path>>(path: P, results: &[NeighborResult]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = StructWriter::new(create_writer(path)?, path);
    for result in results {
        write_block(&mut writer, &result.ids)?;
    }
    writer.finish()
}

/// Write plain id lists in groundtruth layout.
pub fn write_id_lists<P: AsRef<Path>>(path: P, lists: &[Vec<i32>]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = StructWriter::new(create_writer(path)?, path);
    for ids in lists {
        write_block(&mut writer, ids)?;
    }
    writer.finish()
}

fn write_block<W: std::io::Write>(writer: &mut StructWriter<W>, ids: &[i32]) -> Result<()> {
    let k = i32::try_from(ids.len()).map_err(|_| {
        GroundtruthError::format(format!("Neighbor list of {} ids exceeds i32", ids.len()))
    })?;
    writer.write_i32(k)?;
    writer.write_i32s(ids)
}

/// Read a groundtruth file into per-query id lists.
pub fn read_groundtruth<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<i32>>> {
    let path = path.as_ref();
    decode_groundtruth(open_reader(path)?, path)
}

/// Decode groundtruth blocks from any reader. `source` is used in error messages.
pub fn decode_groundtruth<R: Read, P: AsRef<Path>>(reader: R, source: P) -> Result<Vec<Vec<i32>>> {
    let source = source.as_ref();
    let mut reader = StructReader::new(reader, source);
    let mut lists = Vec::new();

    while let Some(k) = reader.try_read_i32()? {
        if k < 0 {
            return Err(GroundtruthError::format(format!(
                "{}: block {} declares negative neighbor count {k}",
                source.display(),
                lists.len()
            )));
        }
        let mut ids = Vec::with_capacity((k as usize).min(4096));
        for _ in 0..k {
            ids.push(reader.read_i32()?);
        }
        lists.push(ids);
    }

    Ok(lists)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode(blocks: &[&[i32]]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for ids in blocks {
            bytes.extend_from_slice(&(ids.len() as i32).to_le_bytes());
            for id in *ids {
                bytes.extend_from_slice(&id.to_le_bytes());
            }
        }
        bytes
    }

    #[test]
    fn test_decode_blocks() {
        let bytes = encode(&[&[0, 3][..], &[][..], &[7][..]]);
        let lists = decode_groundtruth(Cursor::new(bytes), "mem").unwrap();
        assert_eq!(lists, vec![vec![0, 3], vec![], vec![7]]);
    }

    #[test]
    fn test_empty_file_has_no_queries() {
        let lists = decode_groundtruth(Cursor::new(Vec::new()), "mem").unwrap();
        assert!(lists.is_empty());
    }

    #[test]
    fn test_truncated_block() {
        let mut bytes = encode(&[&[0, 3][..]]);
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            decode_groundtruth(Cursor::new(bytes), "mem"),
            Err(GroundtruthError::Format(_))
        ));
    }

    #[test]
    fn test_negative_count() {
        let bytes = (-1i32).to_le_bytes().to_vec();
        assert!(matches!(
            decode_groundtruth(Cursor::new(bytes), "mem"),
            Err(GroundtruthError::Format(_))
        ));
    }
}

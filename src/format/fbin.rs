//! Raw float vector files (`.fbin`): `i32 count, i32 dim, count × dim × f32`.
//!
//! These carry no ids. Conversion to shards assigns ids by position.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{GroundtruthError, Result};
use crate::format::binary::{StructReader, StructWriter};
use crate::format::shard::{HEADER_BYTES, ShardHeader};
use crate::format::{create_writer, file_len, open_reader};

/// Read every vector of an `.fbin` file. Returns the dimension and the rows.
pub fn read_fbin<P: AsRef<Path>>(path: P) -> Result<(usize, Vec<Vec<f32>>)> {
    read_fbin_chunk(path, 0, None)
}

/// Read the header of an `.fbin` file, checking it against the file length.
pub fn read_fbin_header<P: AsRef<Path>>(path: P) -> Result<ShardHeader> {
    open_checked(path.as_ref()).map(|(_, header)| header)
}

fn open_checked(path: &Path) -> Result<(BufReader<File>, ShardHeader)> {
    let actual = file_len(path)?;
    if actual < HEADER_BYTES {
        return Err(GroundtruthError::format(format!(
            "{}: truncated header ({actual} bytes)",
            path.display()
        )));
    }

    let mut file = open_reader(path)?;
    let (count, dim) = {
        let mut reader = StructReader::new((&mut file).take(HEADER_BYTES), path);
        (reader.read_i32()?, reader.read_i32()?)
    };
    if count < 0 || dim <= 0 {
        return Err(GroundtruthError::format(format!(
            "{}: invalid header count={count} dim={dim}",
            path.display()
        )));
    }
    let (count, dim) = (count as usize, dim as usize);

    let expected = (count as u64)
        .checked_mul(dim as u64 * 4)
        .and_then(|n| n.checked_add(HEADER_BYTES));
    if expected != Some(actual) {
        return Err(GroundtruthError::format(format!(
            "{}: expected {} bytes for count={count} dim={dim}, found {actual}",
            path.display(),
            expected.map_or_else(|| "overflowing".to_string(), |n| n.to_string())
        )));
    }

    Ok((
        file,
        ShardHeader {
            count,
            dimension: dim,
        },
    ))
}

/// Read `len` vectors starting at row `start`, or all remaining rows if `len` is `None`.
pub fn read_fbin_chunk<P: AsRef<Path>>(
    path: P,
    start: usize,
    len: Option<usize>,
) -> Result<(usize, Vec<Vec<f32>>)> {
    let path = path.as_ref();
    let (mut file, ShardHeader { count, dimension: dim }) = open_checked(path)?;

    if start > count {
        return Err(GroundtruthError::validation(format!(
            "{}: start row {start} beyond {count} rows",
            path.display()
        )));
    }
    let rows = len.unwrap_or(count - start);
    if start + rows > count {
        return Err(GroundtruthError::validation(format!(
            "{}: rows {start}..{} beyond {count} rows",
            path.display(),
            start + rows
        )));
    }

    file.seek(SeekFrom::Start(HEADER_BYTES + (start * dim * 4) as u64))
        .map_err(|e| GroundtruthError::io_at(path, e))?;

    let mut reader = StructReader::new(file, path);
    let mut vectors = Vec::with_capacity(rows);
    for _ in 0..rows {
        let mut row = vec![0.0f32; dim];
        reader.read_f32_into(&mut row)?;
        vectors.push(row);
    }

    Ok((dim, vectors))
}

/// Write vectors of a single dimension as an `.fbin` file.
pub fn write_fbin<P: AsRef<Path>>(path: P, dimension: usize, vectors: &[Vec<f32>]) -> Result<()> {
    let path = path.as_ref();
    if let Some((i, row)) = vectors.iter().enumerate().find(|(_, v)| v.len() != dimension) {
        return Err(GroundtruthError::validation(format!(
            "Row {i} has dimension {}, expected {dimension}",
            row.len()
        )));
    }
    let count = i32::try_from(vectors.len())
        .map_err(|_| GroundtruthError::format(format!("{} rows exceed i32", vectors.len())))?;
    let dim = i32::try_from(dimension)
        .map_err(|_| GroundtruthError::format(format!("Dimension {dimension} exceeds i32")))?;

    let mut writer = StructWriter::new(create_writer(path)?, path);
    writer.write_i32(count)?;
    writer.write_i32(dim)?;
    for row in vectors {
        writer.write_f32s(row)?;
    }
    writer.finish()
}

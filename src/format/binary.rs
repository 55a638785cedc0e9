//! Little-endian binary reading and writing with position tracking.
//!
//! Readers report a short read as a [`GroundtruthError::Format`] naming the
//! file and the byte offset, so a truncated shard is never mistaken for a
//! generic I/O failure.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{GroundtruthError, Result};

/// A structured reader for little-endian binary data.
pub struct StructReader<R: Read> {
    reader: R,
    source: PathBuf,
    position: u64,
}

impl<R: Read> StructReader<R> {
    /// Create a new structured reader. `source` is only used in error messages.
    pub fn new<P: AsRef<Path>>(reader: R, source: P) -> Self {
        StructReader {
            reader,
            source: source.as_ref().to_path_buf(),
            position: 0,
        }
    }

    /// Read an i32 value (little-endian).
    pub fn read_i32(&mut self) -> Result<i32> {
        let value = self
            .reader
            .read_i32::<LittleEndian>()
            .map_err(|e| self.map_err(e, 4))?;
        self.position += 4;
        Ok(value)
    }

    /// Fill `dst` with f32 values (little-endian), preserving bit patterns.
    pub fn read_f32_into(&mut self, dst: &mut [f32]) -> Result<()> {
        let bytes = dst.len() as u64 * 4;
        self.reader
            .read_f32_into::<LittleEndian>(dst)
            .map_err(|e| self.map_err(e, bytes))?;
        self.position += bytes;
        Ok(())
    }

    /// Read an i32 value, or `None` if the reader ends exactly here.
    ///
    /// A reader that ends partway through the value is a format error.
    pub fn try_read_i32(&mut self) -> Result<Option<i32>> {
        let mut buf = [0u8; 4];
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(GroundtruthError::io_at(&self.source, e)),
            }
        }

        match filled {
            0 => Ok(None),
            4 => {
                self.position += 4;
                Ok(Some(i32::from_le_bytes(buf)))
            }
            n => Err(self.map_err(io::ErrorKind::UnexpectedEof.into(), (4 - n) as u64)),
        }
    }

    /// Get current position in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn map_err(&self, error: io::Error, wanted: u64) -> GroundtruthError {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            GroundtruthError::format(format!(
                "{}: truncated at byte {} (needed {} more bytes)",
                self.source.display(),
                self.position,
                wanted
            ))
        } else {
            GroundtruthError::io_at(&self.source, error)
        }
    }
}

/// A structured writer for little-endian binary data.
pub struct StructWriter<W: Write> {
    writer: W,
    target: PathBuf,
    position: u64,
}

impl<W: Write> StructWriter<W> {
    /// Create a new structured writer. `target` is only used in error messages.
    pub fn new<P: AsRef<Path>>(writer: W, target: P) -> Self {
        StructWriter {
            writer,
            target: target.as_ref().to_path_buf(),
            position: 0,
        }
    }

    /// Write an i32 value (little-endian).
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer
            .write_i32::<LittleEndian>(value)
            .map_err(|e| GroundtruthError::io_at(&self.target, e))?;
        self.position += 4;
        Ok(())
    }

    /// Write a slice of i32 values (little-endian).
    pub fn write_i32s(&mut self, values: &[i32]) -> Result<()> {
        for &value in values {
            self.write_i32(value)?;
        }
        Ok(())
    }

    /// Write a slice of f32 values (little-endian), preserving bit patterns.
    pub fn write_f32s(&mut self, values: &[f32]) -> Result<()> {
        for &value in values {
            self.writer
                .write_f32::<LittleEndian>(value)
                .map_err(|e| GroundtruthError::io_at(&self.target, e))?;
        }
        self.position += values.len() as u64 * 4;
        Ok(())
    }

    /// Get current position in bytes.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Flush and release the writer.
    pub fn finish(mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| GroundtruthError::io_at(&self.target, e))
    }
}

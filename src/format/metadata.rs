//! Metadata files: the attribute records aligned with a vector shard.
//!
//! ```text
//! 3 2
//! color string value int
//! red 5120
//! blue 77
//! red 9001
//! ```
//!
//! Values are separated by runs of ASCII whitespace, so string values never
//! contain whitespace. Record `i` describes the vector at position `i` of the
//! shard with the same silo number.

use std::io::{BufRead, Write};
use std::path::Path;

use crate::error::{GroundtruthError, Result};
use crate::format::{create_writer, open_reader, read_text};
use crate::schema::{FieldType, FieldValue, MetadataRecord, Schema};

/// A schema and the records it governs.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataTable {
    schema: Schema,
    records: Vec<MetadataRecord>,
}

impl MetadataTable {
    /// Create an empty table with the given schema.
    pub fn new(schema: Schema) -> Self {
        MetadataTable {
            schema,
            records: Vec::new(),
        }
    }

    /// Create a table, validating every record against the schema.
    pub fn from_records(schema: Schema, records: Vec<MetadataRecord>) -> Result<Self> {
        for record in &records {
            schema.validate_record(record)?;
        }
        Ok(MetadataTable { schema, records })
    }

    /// Append a record after validating it.
    pub fn push(&mut self, record: MetadataRecord) -> Result<()> {
        self.schema.validate_record(&record)?;
        self.records.push(record);
        Ok(())
    }

    /// Get the schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Get all records in file order.
    pub fn records(&self) -> &[MetadataRecord] {
        &self.records
    }

    /// Get the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Split into schema and records.
    pub fn into_parts(self) -> (Schema, Vec<MetadataRecord>) {
        (self.schema, self.records)
    }
}

fn parse_count_line(line: Option<&str>, source: &str) -> Result<(usize, usize)> {
    let line = line.ok_or_else(|| {
        GroundtruthError::format(format!("{source}: missing '<count> <fieldPairCount>' line"))
    })?;
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    if tokens.len() != 2 {
        return Err(GroundtruthError::format(format!(
            "{source}: line 1 must hold '<count> <fieldPairCount>', found '{line}'"
        )));
    }

    let parse = |token: &str| {
        token.parse::<usize>().map_err(|e| {
            GroundtruthError::format(format!("{source}: invalid count '{token}' on line 1: {e}"))
        })
    };
    Ok((parse(tokens[0])?, parse(tokens[1])?))
}

fn parse_schema_line(line: Option<&str>, pairs: usize, source: &str) -> Result<Schema> {
    let line = line.ok_or_else(|| {
        GroundtruthError::format(format!("{source}: missing schema line"))
    })?;
    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    if tokens.len() != pairs * 2 {
        return Err(GroundtruthError::format(format!(
            "{source}: schema line declares {} tokens, header expects {pairs} (name type) pairs",
            tokens.len()
        )));
    }

    let mut schema = Schema::new();
    for pair in tokens.chunks(2) {
        let field_type = FieldType::parse_str(pair[1])
            .map_err(|e| GroundtruthError::schema(format!("{source}: {e}")))?;
        schema
            .add_field(pair[0], field_type)
            .map_err(|e| GroundtruthError::schema(format!("{source}: {e}")))?;
    }
    Ok(schema)
}

/// Parse metadata text. `source` names the input in error messages.
pub fn parse_metadata(text: &str, source: &str) -> Result<MetadataTable> {
    let mut lines = text.lines();
    let (count, pairs) = parse_count_line(lines.next(), source)?;
    let schema = parse_schema_line(lines.next(), pairs, source)?;

    let mut records = Vec::with_capacity(count);
    for (i, line) in lines.by_ref().take(count).enumerate() {
        let line_no = i + 3;
        let record = schema
            .parse_record(line.split_ascii_whitespace())
            .map_err(|e| match e {
                GroundtruthError::Format(msg) => {
                    GroundtruthError::format(format!("{source}:{line_no}: {msg}"))
                }
                GroundtruthError::Schema(msg) => {
                    GroundtruthError::schema(format!("{source}:{line_no}: {msg}"))
                }
                other => other,
            })?;
        records.push(record);
    }

    if records.len() != count {
        return Err(GroundtruthError::format(format!(
            "{source}: header declares {count} records, found {}",
            records.len()
        )));
    }

    if let Some(extra) = lines.find(|l| !l.trim().is_empty()) {
        return Err(GroundtruthError::format(format!(
            "{source}: header declares {count} records but more lines follow: '{extra}'"
        )));
    }

    Ok(MetadataTable { schema, records })
}

/// Read a metadata file.
pub fn read_metadata<P: AsRef<Path>>(path: P) -> Result<MetadataTable> {
    let path = path.as_ref();
    let text = read_text(path)?;
    parse_metadata(&text, &path.display().to_string())
}

/// Read only the record count and schema of a metadata file.
pub fn read_metadata_header<P: AsRef<Path>>(path: P) -> Result<(usize, Schema)> {
    let path = path.as_ref();
    let source = path.display().to_string();
    let reader = open_reader(path)?;

    let mut lines = Vec::with_capacity(2);
    for line in reader.lines().take(2) {
        lines.push(line.map_err(|e| GroundtruthError::io_at(path, e))?);
    }

    let (count, pairs) = parse_count_line(lines.first().map(String::as_str), &source)?;
    let schema = parse_schema_line(lines.get(1).map(String::as_str), pairs, &source)?;
    Ok((count, schema))
}

/// Write a metadata file with single-space separators.
pub fn write_metadata<P: AsRef<Path>>(path: P, table: &MetadataTable) -> Result<()> {
    let path = path.as_ref();

    for record in table.records() {
        for value in record.values() {
            if let FieldValue::Str(s) = value
                && (s.is_empty() || s.chars().any(|c| c.is_ascii_whitespace()))
            {
                return Err(GroundtruthError::schema(format!(
                    "String value '{s}' cannot be written: values must be non-empty and whitespace-free"
                )));
            }
        }
    }

    let mut writer = create_writer(path)?;
    let io = |e| GroundtruthError::io_at(path, e);

    writeln!(writer, "{} {}", table.len(), table.schema().len()).map_err(io)?;
    writeln!(writer, "{}", table.schema()).map_err(io)?;
    for record in table.records() {
        let line: Vec<String> = record.values().iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(" ")).map_err(io)?;
    }
    writer.flush().map_err(io)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "3 2\ncolor string value int\nred 5120\nblue 77\nred 9001\n";

    #[test]
    fn test_parse_sample() {
        let table = parse_metadata(SAMPLE, "sample").unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.schema().field_names(), vec!["color", "value"]);
        assert_eq!(
            table.records()[1].values(),
            &[FieldValue::from("blue"), FieldValue::Int(77)]
        );
    }

    #[test]
    fn test_trailing_blank_lines_are_ignored() {
        let text = format!("{SAMPLE}\n\n");
        assert_eq!(parse_metadata(&text, "sample").unwrap().len(), 3);
    }

    #[test]
    fn test_line_count_mismatch() {
        let short = "3 1\ncolor string\nred\nblue\n";
        assert!(matches!(
            parse_metadata(short, "short"),
            Err(GroundtruthError::Format(_))
        ));

        let long = "1 1\ncolor string\nred\nblue\n";
        assert!(matches!(
            parse_metadata(long, "long"),
            Err(GroundtruthError::Format(_))
        ));
    }

    #[test]
    fn test_field_count_mismatch() {
        let text = "1 2\ncolor string value int\nred\n";
        assert!(matches!(
            parse_metadata(text, "fields"),
            Err(GroundtruthError::Format(_))
        ));

        let text = "1 2\ncolor string\nred\n";
        assert!(matches!(
            parse_metadata(text, "pairs"),
            Err(GroundtruthError::Format(_))
        ));
    }

    #[test]
    fn test_unparseable_value_is_schema_error() {
        let text = "1 2\ncolor string value int\nred lots\n";
        match parse_metadata(text, "bad") {
            Err(GroundtruthError::Schema(msg)) => assert!(msg.contains("bad:3")),
            other => panic!("Expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_is_schema_error() {
        let text = "0 1\ncolor date\n";
        assert!(matches!(
            parse_metadata(text, "types"),
            Err(GroundtruthError::Schema(_))
        ));
    }
}

//! Query set files: query vectors with their predicate tokens.
//!
//! ```text
//! 2 3
//! 0.1 0.2 0.3 color="red" 120<=value<=4410
//! 1.5 -2 0 color="blue"
//! ```

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GroundtruthError, Result};
use crate::format::{create_writer, read_text};
use crate::query::{PredicateClause, compile_tokens};

/// One query: a vector and the predicate its neighbors must satisfy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub embedding: Vec<f32>,
    pub predicate: PredicateClause,
}

impl QueryRecord {
    /// Create a new query record.
    pub fn new(embedding: Vec<f32>, predicate: PredicateClause) -> Self {
        QueryRecord {
            embedding,
            predicate,
        }
    }
}

/// All queries of a workload, sharing one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySet {
    dimension: usize,
    queries: Vec<QueryRecord>,
}

impl QuerySet {
    /// Create an empty query set.
    pub fn new(dimension: usize) -> Self {
        QuerySet {
            dimension,
            queries: Vec::new(),
        }
    }

    /// Create a query set, checking every query's dimension.
    pub fn from_queries(dimension: usize, queries: Vec<QueryRecord>) -> Result<Self> {
        let mut set = QuerySet::new(dimension);
        for query in queries {
            set.push(query)?;
        }
        Ok(set)
    }

    /// Append a query.
    pub fn push(&mut self, query: QueryRecord) -> Result<()> {
        if query.embedding.len() != self.dimension {
            return Err(GroundtruthError::validation(format!(
                "Query {} has dimension {}, query set dimension is {}",
                self.queries.len(),
                query.embedding.len(),
                self.dimension
            )));
        }
        self.queries.push(query);
        Ok(())
    }

    /// Get the query dimension.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Get all queries in file order.
    pub fn queries(&self) -> &[QueryRecord] {
        &self.queries
    }

    /// Get the number of queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Parse query set text. `source` names the input in error messages.
pub fn parse_query_set(text: &str, source: &str) -> Result<QuerySet> {
    let mut lines = text.lines();

    let header = lines.next().ok_or_else(|| {
        GroundtruthError::format(format!("{source}: missing '<queryCount> <dim>' line"))
    })?;
    let tokens: Vec<&str> = header.split_ascii_whitespace().collect();
    if tokens.len() != 2 {
        return Err(GroundtruthError::format(format!(
            "{source}: line 1 must hold '<queryCount> <dim>', found '{header}'"
        )));
    }
    let count = tokens[0].parse::<usize>().map_err(|e| {
        GroundtruthError::format(format!("{source}: invalid query count '{}': {e}", tokens[0]))
    })?;
    let dimension = tokens[1].parse::<usize>().map_err(|e| {
        GroundtruthError::format(format!("{source}: invalid dimension '{}': {e}", tokens[1]))
    })?;
    if dimension == 0 {
        return Err(GroundtruthError::format(format!(
            "{source}: query dimension must be positive"
        )));
    }

    let mut set = QuerySet::new(dimension);
    set.queries.reserve(count);

    for (i, line) in lines.by_ref().take(count).enumerate() {
        let line_no = i + 2;
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        if tokens.len() < dimension {
            return Err(GroundtruthError::format(format!(
                "{source}:{line_no}: expected {dimension} vector components, found {} tokens",
                tokens.len()
            )));
        }

        let embedding = tokens[..dimension]
            .iter()
            .map(|t| {
                t.parse::<f32>().map_err(|_| {
                    GroundtruthError::format(format!(
                        "{source}:{line_no}: expected {dimension} vector components, '{t}' is not a number"
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let predicate = compile_tokens(tokens[dimension..].iter().copied()).map_err(|e| match e {
            GroundtruthError::Schema(msg) => {
                GroundtruthError::schema(format!("{source}:{line_no}: {msg}"))
            }
            other => other,
        })?;

        set.queries.push(QueryRecord {
            embedding,
            predicate,
        });
    }

    if set.len() != count {
        return Err(GroundtruthError::format(format!(
            "{source}: header declares {count} queries, found {}",
            set.len()
        )));
    }

    if let Some(extra) = lines.find(|l| !l.trim().is_empty()) {
        return Err(GroundtruthError::format(format!(
            "{source}: header declares {count} queries but more lines follow: '{extra}'"
        )));
    }

    Ok(set)
}

/// Read a query set file.
pub fn read_query_set<P: AsRef<Path>>(path: P) -> Result<QuerySet> {
    let path = path.as_ref();
    let text = read_text(path)?;
    parse_query_set(&text, &path.display().to_string())
}

/// Write a query set file.
///
/// Components are written in shortest round-trip form, so reading the file
/// back reproduces every float exactly.
pub fn write_query_set<P: AsRef<Path>>(path: P, set: &QuerySet) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create_writer(path)?;
    let io = |e| GroundtruthError::io_at(path, e);

    writeln!(writer, "{} {}", set.len(), set.dimension()).map_err(io)?;
    for query in set.queries() {
        let mut line: Vec<String> = query.embedding.iter().map(|x| x.to_string()).collect();
        let predicate = query.predicate.to_string();
        if !predicate.is_empty() {
            line.push(predicate);
        }
        writeln!(writer, "{}", line.join(" ")).map_err(io)?;
    }
    writer.flush().map_err(io)
}

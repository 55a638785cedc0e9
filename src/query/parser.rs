//! Compiler from raw predicate tokens to [`PredicateClause`] values.
//!
//! Exactly two surface forms are recognized:
//! - `field="literal"` compiles to [`PredicateClause::Equality`]
//! - `lo<=field<=hi` compiles to [`PredicateClause::Range`]
//!
//! Tokens are matched structurally and never evaluated as code.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{GroundtruthError, Result};
use crate::query::predicate::PredicateClause;

const FIELD: &str = r#"[^=<>"\s]+"#;
const NUMBER: &str = r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][-+]?\d+)?";

static EQUALITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r#"^({FIELD})="([^"]*)"$"#)).unwrap());

static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^({NUMBER})<=({FIELD})<=({NUMBER})$")).unwrap());

/// Compile one predicate token.
pub fn compile_clause(token: &str) -> Result<PredicateClause> {
    let token = token.trim();

    if let Some(caps) = EQUALITY_PATTERN.captures(token) {
        return Ok(PredicateClause::equality(&caps[1], &caps[2]));
    }

    if let Some(caps) = RANGE_PATTERN.captures(token) {
        let lo = parse_bound(&caps[1], token)?;
        let hi = parse_bound(&caps[3], token)?;
        if lo > hi {
            return Err(GroundtruthError::schema(format!(
                "Range predicate '{token}' has lower bound above upper bound"
            )));
        }
        return Ok(PredicateClause::range(&caps[2], lo, hi));
    }

    Err(GroundtruthError::schema(format!(
        "Unrecognized predicate '{token}' (expected field=\"literal\" or lo<=field<=hi)"
    )))
}

/// Compile the predicate tokens of one query into a single clause.
///
/// No tokens yield the always-true clause, one token its clause, and several
/// tokens the conjunction of their clauses.
pub fn compile_tokens<'a, I>(tokens: I) -> Result<PredicateClause>
where
    I: IntoIterator<Item = &'a str>,
{
    let clauses = tokens
        .into_iter()
        .map(compile_clause)
        .collect::<Result<Vec<_>>>()?;
    Ok(PredicateClause::all(clauses))
}

fn parse_bound(text: &str, token: &str) -> Result<f64> {
    text.parse::<f64>().map_err(|e| {
        GroundtruthError::schema(format!("Invalid bound '{text}' in predicate '{token}': {e}"))
    })
}

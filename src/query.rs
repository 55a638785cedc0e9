//! Attribute predicates attached to benchmark queries.
//!
//! A predicate is compiled once from its textual token into a closed
//! [`PredicateClause`] tree, then bound to each shard's [`Schema`] as a
//! [`BoundPredicate`] that evaluates records by field position.
//!
//! [`Schema`]: crate::schema::Schema

pub mod parser;
pub mod predicate;

pub use parser::{compile_clause, compile_tokens};
pub use predicate::{BoundPredicate, PredicateClause};

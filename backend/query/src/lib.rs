//! Boolean word queries over recognized documents.
//!
//! A query is compiled once with [`Query::parse`] and can then be evaluated
//! against any number of documents. Queries are lowercased before parsing and
//! document word sets are lowercased at construction, so matching is
//! case-insensitive without runtime case comparison.
//!
//! ```text
//! water | (salt & dough)     either "water", or both "salt" and "dough"
//! !bake                      documents without "bake"
//! ```

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod parser;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, info, warn, Level};

use ocrgrep_core::Document;

pub use ast::{BinaryOp, QueryNode, UnaryOp};
pub use error::QuerySyntaxError;
pub use evaluator::evaluate;

/// A compiled query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    source: String,
    root: QueryNode,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self, QuerySyntaxError> {
        let root = parser::parse(&input.to_lowercase())?;
        Ok(Self {
            source: input.to_string(),
            root,
        })
    }

    /// The query text as the caller wrote it.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &QueryNode {
        &self.root
    }

    pub fn matches(&self, document: &Document) -> bool {
        evaluate(document, &self.root)
    }

    /// Documents that satisfy the query, in their original order.
    pub fn filter<'a, I>(&self, documents: I) -> Vec<&'a Document>
    where
        I: IntoIterator<Item = &'a Document>,
    {
        documents.into_iter().filter(|d| self.matches(d)).collect()
    }
}

impl FromStr for Query {
    type Err = QuerySyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.root.fmt(f)
    }
}

/// Parse `query` and return the documents matching it, preserving order.
///
/// An invalid query is an error, never an empty result.
pub fn search<'a>(documents: &'a [Document], query: &str) -> Result<Vec<&'a Document>, QuerySyntaxError> {
    let compiled = Query::parse(query).inspect_err(|e| {
        warn!(query, error = %e, "Query parsing failed");
    })?;

    if tracing::enabled!(Level::DEBUG) {
        if let Ok(tree) = serde_json::to_string(compiled.root()) {
            debug!(query, ast = %tree, "Parsed query");
        }
    }

    let matches = compiled.filter(documents);
    info!(query, matched = matches.len(), total = documents.len(), "Search complete");
    Ok(matches)
}

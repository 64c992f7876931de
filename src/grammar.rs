//! Grammar for the subset of Oracle SQL that LogMiner writes into `SQL_REDO`.
//!
//! This is intentionally limited compared to a full PL/SQL grammar: it only
//! accepts the single-row `INSERT` and `UPDATE` statements LogMiner emits for
//! captured row changes. Anything else (subqueries, arbitrary expressions,
//! DDL) is rejected with a syntax error.
//!
//! Parsing produces a [`ParseTree`] which is consumed as a depth-first stream
//! of [`Event`]s: an `Enter` event before a node's children and an `Exit`
//! event after them.

mod lexer;
mod parser;
mod tree;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

pub use lexer::{Lexer, Token, TokenKind};
pub use parser::Parser;
pub use tree::{Constant, Event, Node, NodeKind, ParseTree, Phase, Walk};

/// A single positional syntax problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// One-based line of the offending input.
    pub line: usize,
    /// Zero-based character column within the line.
    pub column: usize,
    /// Description of the problem.
    pub message: String,
}

impl SyntaxError {
    /// Build an error located at the given byte offset of `source`.
    #[must_use]
    pub fn at(source: &str, offset: usize, message: String) -> Self {
        let offset = offset.min(source.len());
        let prefix = source.get(..offset).unwrap_or(source);
        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map_or(0, |pos| pos + 1);
        let column = prefix[line_start..].chars().count();
        Self {
            line,
            column,
            message,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} {}", self.line, self.column, self.message)
    }
}

/// All syntax problems found in one statement.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Parse problem(s): {}", join(.0))]
pub struct SyntaxErrors(Vec<SyntaxError>);

impl SyntaxErrors {
    /// Number of problems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no problem was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The individual problems, in input order.
    #[must_use]
    pub fn as_slice(&self) -> &[SyntaxError] {
        &self.0
    }
}

impl From<Vec<SyntaxError>> for SyntaxErrors {
    fn from(errors: Vec<SyntaxError>) -> Self {
        Self(errors)
    }
}

impl From<SyntaxError> for SyntaxErrors {
    fn from(error: SyntaxError) -> Self {
        Self(alloc::vec![error])
    }
}

fn join(errors: &[SyntaxError]) -> String {
    use core::fmt::Write;

    let mut joined = String::new();
    for (position, error) in errors.iter().enumerate() {
        if position > 0 {
            joined.push_str("; ");
        }
        let _ = write!(joined, "{error}");
    }
    joined
}

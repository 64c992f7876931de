//! Submodule defining the errors used across the crate.

use alloc::string::String;
use alloc::vec::Vec;

use crate::grammar::SyntaxErrors;
use crate::reconstruct::InsertStage;
use crate::value::Value;

/// Errors that can occur while decoding a LogMiner record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The `SQL_REDO` text could not be parsed.
    #[error(transparent)]
    Syntax(#[from] SyntaxErrors),
    /// The statement parsed but could not be reconstructed.
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
    /// The record lacks fields every LogMiner row carries.
    #[error("Message doesn't contain required fields {0:?}")]
    MissingFields(Vec<String>),
    /// The `OPERATION` field holds a kind this crate does not decode.
    #[error("Unsupported operation kind '{0}'")]
    UnsupportedOperation(String),
}

/// Internal-consistency violations detected while replaying a parse tree.
///
/// These indicate either a statement outside the supported subset or a
/// statement whose structure does not match the grammar events seen so far.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconstructionError {
    /// An `INSERT` grammar event arrived in the wrong stage.
    #[error("Incorrect stage for {event}, expected: {expected:?}, actual: {actual:?}, text: {text}")]
    Stage {
        /// The offending event.
        event: String,
        /// Stage the event is valid in.
        expected: InsertStage,
        /// Stage the reconstructor was in.
        actual: InsertStage,
        /// Statement text covered by the event.
        text: String,
    },
    /// A value arrived while no expression was open.
    #[error("Expression stack is empty for {event}, text: {text}")]
    EmptyStack {
        /// The offending event.
        event: String,
        /// Statement text covered by the event.
        text: String,
    },
    /// No open unary expression started at the exiting token.
    #[error("Expression with {token_index} isn't found, text: {text}")]
    ExpressionNotFound {
        /// Token position of the exiting expression.
        token_index: usize,
        /// Statement text covered by the event.
        text: String,
    },
    /// The expression on top of the stack was opened by another token.
    #[error(
        "Internal problem during parse {expression} expression {text}: expected token {expected}, actual {actual}"
    )]
    TagMismatch {
        /// Kind of expression being closed.
        expression: &'static str,
        /// Token position of the exiting event.
        expected: usize,
        /// Token position the popped expression was opened at.
        actual: usize,
        /// Statement text covered by the event.
        text: String,
    },
    /// A unary expression collected more than one pending value.
    #[error("Expression {token_index} must contain only one value instead of {count}, text: {text}")]
    MultipleValues {
        /// Token position of the unary expression.
        token_index: usize,
        /// Number of pending values.
        count: usize,
        /// Statement text covered by the event.
        text: String,
    },
    /// A unary expression received a second value.
    #[error("Unary expression {token_index} can't be completed twice, value for complete: {value}, actual value: {actual}")]
    AlreadyCompleted {
        /// Token position of the unary expression.
        token_index: usize,
        /// The value that was offered.
        value: Value,
        /// The value already held.
        actual: Value,
    },
    /// A pending expression was read before it was completed.
    #[error("{expression} expression {token_index} isn't completed")]
    NotCompleted {
        /// Kind of the pending expression.
        expression: &'static str,
        /// Token position of the pending expression.
        token_index: usize,
    },
    /// Only `TO_DATE` and `TO_TIMESTAMP` are reconstructed.
    #[error("Unsupported function {0}")]
    UnsupportedFunction(String),
    /// `INSERT ALL` / `INSERT FIRST` statements are not reconstructed.
    #[error("Unsupported multiple table insert {0}")]
    UnsupportedMultiTableInsert(String),
    /// An `INSERT` produced more values than it declared columns.
    #[error("Column name isn't specified for {0} value")]
    MissingColumnName(Value),
    /// An `INSERT` declared more columns than it produced values.
    #[error("Incorrect stage for parsing insert statement, unused column names: {0:?}")]
    UnusedColumnNames(Vec<String>),
    /// Expressions were left open at the end of the statement.
    #[error("Incorrect stage for parsing {statement} statement, uncompleted values: {count}")]
    UncompletedValues {
        /// `insert` or `update`.
        statement: &'static str,
        /// Number of open expressions.
        count: usize,
    },
    /// A `SET` item event arrived while no row value was open.
    #[error("Incorrect state for {event}: row value isn't open, text: {text}")]
    RowValueNotOpen {
        /// The offending event.
        event: String,
        /// Statement text covered by the event.
        text: String,
    },
    /// A new `SET` item began before the previous one was flushed.
    #[error("Incorrect state for {event}: previous row value {token_index} isn't flushed, text: {text}")]
    RowValueNotFlushed {
        /// The offending event.
        event: String,
        /// Token position of the open row value.
        token_index: usize,
        /// Statement text covered by the event.
        text: String,
    },
    /// A `SET` item named its column twice.
    #[error("Row value {token_index} already has column, suggested: {suggested}, actual: {actual}")]
    ColumnAlreadySet {
        /// Token position of the row value.
        token_index: usize,
        /// The column that was offered.
        suggested: String,
        /// The column already held.
        actual: String,
    },
    /// A `SET` item received a second value.
    #[error("Row value {token_index} already has value, suggested: {suggested}, actual: {actual}")]
    ValueAlreadySet {
        /// Token position of the row value.
        token_index: usize,
        /// The value that was offered.
        suggested: Value,
        /// The value already held.
        actual: Value,
    },
    /// A `SET` item ended without both a column and a value.
    #[error("Row value {token_index} isn't completed, text: {text}")]
    RowValueIncomplete {
        /// Token position of the row value.
        token_index: usize,
        /// Statement text covered by the event.
        text: String,
    },
}

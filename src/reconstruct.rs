//! Reconstruction of column values from `SQL_REDO` statements.
//!
//! A statement is parsed with the statement-specific grammar root and its
//! tree is replayed, event by event, into a reconstructor for that statement
//! kind. Both reconstructors rebuild values with the same expression stack
//! and differ only in how they pair values with columns:
//!
//! - `INSERT` queues the declared column names and consumes one per
//!   top-level value, omitting columns whose value is `NULL`.
//! - `UPDATE` pairs each `SET` item's column with its value, emitting
//!   `NULL` assignments, and ignores every literal of the `WHERE` clause.
//!
//! # Example
//!
//! ```
//! use logminer_redo::reconstruct::{Options, reconstruct_update};
//! use logminer_redo::Value;
//!
//! let columns = reconstruct_update(
//!     r#"update "HR"."EMP" set "SAVINGS" = '10', "BONUS" = NULL where "ID" = '1';"#,
//!     &Options::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(columns.get("th2_SAVINGS"), Some(&Value::from("10")));
//! assert_eq!(columns.get("th2_BONUS"), Some(&Value::Null));
//! assert_eq!(columns.len(), 2);
//! ```

mod expression;
mod insert;
mod update;

use alloc::string::String;

use indexmap::IndexMap as IndexMapRaw;

use crate::config::{Configuration, DEFAULT_COLUMN_PREFIX};
use crate::errors::Error;
use crate::grammar::{Parser, ParseTree};
use crate::value::Value;

pub use insert::InsertStage;
use insert::InsertReconstructor;
use update::UpdateReconstructor;

/// `IndexMap` alias using hashbrown's default hasher for `no_std` compatibility.
type IndexMap<K, V> = IndexMapRaw<K, V, hashbrown::DefaultHashBuilder>;

/// Reconstructed `prefixed column name -> value` pairs, in statement order.
pub type Columns = IndexMap<String, Value>;

/// Settings shared by both reconstructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Prepended to every reconstructed column name.
    pub column_prefix: String,
    /// Whether string literals are stripped of surrounding whitespace.
    pub trim_content: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            column_prefix: DEFAULT_COLUMN_PREFIX.into(),
            trim_content: true,
        }
    }
}

impl From<&Configuration> for Options {
    fn from(config: &Configuration) -> Self {
        Self {
            column_prefix: config.column_prefix.clone(),
            trim_content: config.trim_parsed_content,
        }
    }
}

/// The statement kinds that carry column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// `INSERT INTO ... VALUES (...)`
    Insert,
    /// `UPDATE ... SET ... [WHERE ...]`
    Update,
}

/// Reconstruct the column values of a statement of the given kind.
///
/// # Errors
///
/// Returns [`Error::Syntax`] if the statement does not parse as `kind`, or
/// [`Error::Reconstruction`] if it parses but falls outside the supported
/// subset (unsupported function, multi-table insert, column/value mismatch).
pub fn reconstruct(kind: StatementKind, sql: &str, options: &Options) -> Result<Columns, Error> {
    match kind {
        StatementKind::Insert => reconstruct_insert(sql, options),
        StatementKind::Update => reconstruct_update(sql, options),
    }
}

/// Reconstruct the column values of an `INSERT` statement.
///
/// Columns whose value is `NULL` are omitted.
///
/// # Errors
///
/// See [`reconstruct`].
pub fn reconstruct_insert(sql: &str, options: &Options) -> Result<Columns, Error> {
    let tree = Parser::new(sql)?.parse_insert()?;
    Reconstructor::Insert(InsertReconstructor::new(options)).replay(&tree)
}

/// Reconstruct the `SET` column values of an `UPDATE` statement.
///
/// `NULL` assignments are kept; `WHERE` clause literals never contribute.
///
/// # Errors
///
/// See [`reconstruct`].
pub fn reconstruct_update(sql: &str, options: &Options) -> Result<Columns, Error> {
    let tree = Parser::new(sql)?.parse_update()?;
    Reconstructor::Update(UpdateReconstructor::new(options)).replay(&tree)
}

/// Statement-specific consumer of tree events.
enum Reconstructor<'o> {
    Insert(InsertReconstructor<'o>),
    Update(UpdateReconstructor<'o>),
}

impl Reconstructor<'_> {
    fn replay(mut self, tree: &ParseTree<'_>) -> Result<Columns, Error> {
        for event in tree.walk() {
            match &mut self {
                Reconstructor::Insert(insert) => insert.handle(&event)?,
                Reconstructor::Update(update) => update.handle(&event)?,
            }
        }
        Ok(self.into_columns())
    }

    fn into_columns(self) -> Columns {
        match self {
            Reconstructor::Insert(insert) => insert.into_columns(),
            Reconstructor::Update(update) => update.into_columns(),
        }
    }
}

/// Column name without one layer of surrounding double quotes.
fn unquote_identifier(text: &str) -> String {
    text.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(text)
        .into()
}

/// Insert a reconstructed pair under its prefixed name.
fn put(columns: &mut Columns, prefix: &str, column: &str, value: Value) {
    let mut key = String::with_capacity(prefix.len() + column.len());
    key.push_str(prefix);
    key.push_str(column);
    columns.insert(key, value);
}

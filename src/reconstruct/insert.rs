//! Reconstruction of `INSERT INTO ... (columns) VALUES (...)` statements.

use alloc::collections::VecDeque;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use super::expression::ExpressionStack;
use super::{Columns, Options, put, unquote_identifier};
use crate::errors::ReconstructionError;
use crate::grammar::{Event, NodeKind, Phase};

/// Progress of an `INSERT` statement through its clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InsertStage {
    /// Nothing seen yet.
    #[default]
    Begin,
    /// Inside the column list.
    ParsingNames,
    /// Column list closed, `VALUES` not yet opened.
    ParsedNames,
    /// Inside the `VALUES` clause.
    ParsingValues,
    /// `VALUES` clause closed.
    ParsedValues,
}

/// Pairs queued column names with top-level values, in declaration order.
pub(super) struct InsertReconstructor<'o> {
    options: &'o Options,
    stage: InsertStage,
    column_names: VecDeque<String>,
    expressions: ExpressionStack,
    columns: Columns,
}

impl<'o> InsertReconstructor<'o> {
    pub(super) fn new(options: &'o Options) -> Self {
        Self {
            options,
            stage: InsertStage::Begin,
            column_names: VecDeque::new(),
            expressions: ExpressionStack::new(options.trim_content),
            columns: Columns::default(),
        }
    }

    pub(super) fn into_columns(self) -> Columns {
        self.columns
    }

    pub(super) fn handle(&mut self, event: &Event<'_>) -> Result<(), ReconstructionError> {
        match (event.phase, &event.node.kind) {
            (Phase::Enter, NodeKind::InsertStatement) => {
                self.check_stage(event, InsertStage::Begin)?;
            }
            (Phase::Enter, NodeKind::MultiTableInsert) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "multi table insert");
                return Err(ReconstructionError::UnsupportedMultiTableInsert(
                    event.text.to_string(),
                ));
            }
            (Phase::Enter, NodeKind::InsertIntoClause) => {
                self.check_stage(event, InsertStage::Begin)?;
                self.stage = InsertStage::ParsingNames;
            }
            (Phase::Enter, NodeKind::ColumnName) => {
                self.check_stage(event, InsertStage::ParsingNames)?;
                self.column_names.push_back(unquote_identifier(event.text));
            }
            (Phase::Exit, NodeKind::InsertIntoClause) => {
                self.check_stage(event, InsertStage::ParsingNames)?;
                self.stage = InsertStage::ParsedNames;
            }
            (Phase::Enter, NodeKind::ValuesClause) => {
                self.check_stage(event, InsertStage::ParsedNames)?;
                self.stage = InsertStage::ParsingValues;
            }
            (Phase::Exit, NodeKind::ValuesClause) => {
                self.check_stage(event, InsertStage::ParsingValues)?;
                self.stage = InsertStage::ParsedValues;
            }
            (Phase::Exit, NodeKind::InsertStatement) => {
                self.check_stage(event, InsertStage::ParsedValues)?;
                self.check_drained()?;
            }
            _ if ExpressionStack::accepts(event) => {
                self.check_stage(event, InsertStage::ParsingValues)?;
                if let Some(value) = self.expressions.handle(event)? {
                    let column = self
                        .column_names
                        .pop_front()
                        .ok_or_else(|| ReconstructionError::MissingColumnName(value.clone()))?;
                    tracing::trace!(column = %column, value = %value, "handled pair");
                    if !value.is_null() {
                        put(&mut self.columns, &self.options.column_prefix, &column, value);
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn check_stage(&self, event: &Event<'_>, expected: InsertStage) -> Result<(), ReconstructionError> {
        tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
        if self.stage == expected {
            Ok(())
        } else {
            Err(ReconstructionError::Stage {
                event: event.to_string(),
                expected,
                actual: self.stage,
                text: event.text.to_string(),
            })
        }
    }

    fn check_drained(&self) -> Result<(), ReconstructionError> {
        if !self.column_names.is_empty() {
            return Err(ReconstructionError::UnusedColumnNames(
                self.column_names.iter().cloned().collect::<Vec<_>>(),
            ));
        }
        if !self.expressions.is_empty() {
            return Err(ReconstructionError::UncompletedValues {
                statement: "insert",
                count: self.expressions.len(),
            });
        }
        Ok(())
    }
}

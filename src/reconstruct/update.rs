//! Reconstruction of `UPDATE ... SET ... [WHERE ...]` statements.
//!
//! The `WHERE` clause reuses the constant, string and function productions
//! of the `SET` clause. Value events are therefore only honoured while a
//! `SET` item is open; everything else is skipped.

use alloc::string::{String, ToString};

use super::expression::ExpressionStack;
use super::{Columns, Options, put, unquote_identifier};
use crate::errors::ReconstructionError;
use crate::grammar::{Event, NodeKind, Phase};
use crate::value::Value;

/// The column and value of the `SET` item being replayed.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RowValue {
    token_index: usize,
    column: Option<String>,
    value: Option<Value>,
}

impl RowValue {
    fn new(token_index: usize) -> Self {
        Self {
            token_index,
            column: None,
            value: None,
        }
    }

    fn set_column(&mut self, column: String) -> Result<(), ReconstructionError> {
        if let Some(actual) = &self.column {
            return Err(ReconstructionError::ColumnAlreadySet {
                token_index: self.token_index,
                suggested: column,
                actual: actual.clone(),
            });
        }
        self.column = Some(column);
        Ok(())
    }

    fn set_value(&mut self, value: Value) -> Result<(), ReconstructionError> {
        if let Some(actual) = &self.value {
            return Err(ReconstructionError::ValueAlreadySet {
                token_index: self.token_index,
                suggested: value,
                actual: actual.clone(),
            });
        }
        self.value = Some(value);
        Ok(())
    }

    fn complete(self, text: &str) -> Result<(String, Value), ReconstructionError> {
        match (self.column, self.value) {
            (Some(column), Some(value)) => Ok((column, value)),
            _ => Err(ReconstructionError::RowValueIncomplete {
                token_index: self.token_index,
                text: text.to_string(),
            }),
        }
    }
}

/// Pairs each `SET` column with its value.
pub(super) struct UpdateReconstructor<'o> {
    options: &'o Options,
    row_value: Option<RowValue>,
    expressions: ExpressionStack,
    columns: Columns,
}

impl<'o> UpdateReconstructor<'o> {
    pub(super) fn new(options: &'o Options) -> Self {
        Self {
            options,
            row_value: None,
            expressions: ExpressionStack::new(options.trim_content),
            columns: Columns::default(),
        }
    }

    pub(super) fn into_columns(self) -> Columns {
        self.columns
    }

    pub(super) fn handle(&mut self, event: &Event<'_>) -> Result<(), ReconstructionError> {
        match (event.phase, &event.node.kind) {
            (Phase::Enter, NodeKind::UpdateStatement) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                self.expressions.clear();
            }
            (Phase::Enter, NodeKind::SetItem) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                if let Some(open) = &self.row_value {
                    return Err(ReconstructionError::RowValueNotFlushed {
                        event: event.to_string(),
                        token_index: open.token_index,
                        text: event.text.to_string(),
                    });
                }
                self.row_value = Some(RowValue::new(event.token_index()));
            }
            (Phase::Enter, NodeKind::ColumnName) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                self.open_row_value(event)?
                    .set_column(unquote_identifier(event.text))?;
            }
            (Phase::Exit, NodeKind::SetItem) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                let row_value = self.row_value.take().ok_or_else(|| not_open(event))?;
                let (column, value) = row_value.complete(event.text)?;
                tracing::trace!(column = %column, value = %value, "handled pair");
                put(&mut self.columns, &self.options.column_prefix, &column, value);
            }
            (Phase::Exit, NodeKind::UpdateStatement) => {
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                if let Some(open) = &self.row_value {
                    return Err(ReconstructionError::RowValueIncomplete {
                        token_index: open.token_index,
                        text: event.text.to_string(),
                    });
                }
                if !self.expressions.is_empty() {
                    return Err(ReconstructionError::UncompletedValues {
                        statement: "update",
                        count: self.expressions.len(),
                    });
                }
            }
            _ if ExpressionStack::accepts(event) => {
                if self.row_value.is_none() {
                    tracing::trace!(
                        token_index = event.token_index(),
                        text = event.text,
                        "{event}, SKIPPED"
                    );
                    return Ok(());
                }
                tracing::trace!(token_index = event.token_index(), text = event.text, "{event}");
                if let Some(value) = self.expressions.handle(event)? {
                    self.open_row_value(event)?.set_value(value)?;
                    self.expressions.clear();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn open_row_value(&mut self, event: &Event<'_>) -> Result<&mut RowValue, ReconstructionError> {
        self.row_value.as_mut().ok_or_else(|| not_open(event))
    }
}

fn not_open(event: &Event<'_>) -> ReconstructionError {
    ReconstructionError::RowValueNotOpen {
        event: event.to_string(),
        text: event.text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::grammar::{Node, Parser};
    use crate::reconstruct::reconstruct_update;
    use crate::value::FunctionCall;
    use alloc::vec;
    use alloc::vec::Vec;

    fn update(sql: &str) -> Result<Columns, Error> {
        reconstruct_update(sql, &Options::default())
    }

    fn pairs(columns: &Columns) -> Vec<(&str, &Value)> {
        columns.iter().map(|(k, v)| (k.as_str(), v)).collect()
    }

    fn node(kind: NodeKind, token_index: usize) -> Node {
        Node {
            kind,
            token_index,
            span: 0..0,
            children: Vec::new(),
        }
    }

    #[test]
    fn test_update_with_where() {
        let columns = update(
            r#"update "OWNER"."EMP" set "SAVINGS" = '10', "NAME" = 'Bob' where "SAVINGS" = '1' and "NAME" = 'Alice' and ROWID = 'AAAR';"#,
        )
        .unwrap();
        assert_eq!(
            pairs(&columns),
            vec![
                ("th2_SAVINGS", &Value::from("10")),
                ("th2_NAME", &Value::from("Bob")),
            ]
        );
    }

    #[test]
    fn test_null_assignment_is_emitted() {
        let columns = update(r#"update "T" set "A" = NULL, "B" = 1.1;"#).unwrap();
        assert_eq!(
            pairs(&columns),
            vec![("th2_A", &Value::Null), ("th2_B", &Value::Real(1.1))]
        );
    }

    #[test]
    fn test_where_functions_are_skipped() {
        let columns = update(
            r#"update "T" set "TS" = TO_TIMESTAMP(TO_TIMESTAMP('12-DEC-23 02.55.01 PM')) where "D" = TO_DATE('x') and "E" = UPPER('y');"#,
        )
        .unwrap();
        assert_eq!(
            pairs(&columns),
            vec![(
                "th2_TS",
                &Value::from(
                    FunctionCall::new("TO_TIMESTAMP")
                        .with(FunctionCall::new("TO_TIMESTAMP").with("12-DEC-23 02.55.01 PM"))
                )
            )]
        );
    }

    #[test]
    fn test_unsupported_function_in_set_is_rejected() {
        let error = update(r#"update "T" set "A" = UPPER('y')"#).unwrap_err();
        assert!(matches!(
            error,
            Error::Reconstruction(ReconstructionError::UnsupportedFunction(_))
        ));
    }

    #[test]
    fn test_repeated_column_keeps_first_position_last_value() {
        let columns = update(r#"update "T" set "A" = 1, "B" = 2, "A" = 3"#).unwrap();
        assert_eq!(
            pairs(&columns),
            vec![("th2_A", &Value::Integer(3)), ("th2_B", &Value::Integer(2))]
        );
    }

    #[test]
    fn test_unflushed_row_value() {
        let options = Options::default();
        let mut reconstructor = UpdateReconstructor::new(&options);
        let item = node(NodeKind::SetItem, 3);
        let enter = Event {
            phase: Phase::Enter,
            node: &item,
            text: "A = 1",
        };
        reconstructor.handle(&enter).unwrap();
        let error = reconstructor.handle(&enter).unwrap_err();
        assert!(matches!(
            error,
            ReconstructionError::RowValueNotFlushed { token_index: 3, .. }
        ));
    }

    #[test]
    fn test_column_without_row_value() {
        let options = Options::default();
        let mut reconstructor = UpdateReconstructor::new(&options);
        let column = node(NodeKind::ColumnName, 3);
        let error = reconstructor
            .handle(&Event {
                phase: Phase::Enter,
                node: &column,
                text: "\"A\"",
            })
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "Incorrect state for enter column_name (token index 3): row value isn't open, text: \"A\""
        );
    }

    #[test]
    fn test_row_value_set_twice() {
        let mut row = RowValue::new(1);
        row.set_column("A".into()).unwrap();
        row.set_value(Value::Integer(1)).unwrap();
        assert_eq!(
            row.clone().set_column("B".into()).unwrap_err(),
            ReconstructionError::ColumnAlreadySet {
                token_index: 1,
                suggested: "B".into(),
                actual: "A".into()
            }
        );
        assert!(matches!(
            row.set_value(Value::Null).unwrap_err(),
            ReconstructionError::ValueAlreadySet { token_index: 1, .. }
        ));
    }

    #[test]
    fn test_incomplete_row_value() {
        let options = Options::default();
        let mut reconstructor = UpdateReconstructor::new(&options);
        let item = node(NodeKind::SetItem, 3);
        reconstructor
            .handle(&Event {
                phase: Phase::Enter,
                node: &item,
                text: "A",
            })
            .unwrap();
        let error = reconstructor
            .handle(&Event {
                phase: Phase::Exit,
                node: &item,
                text: "A",
            })
            .unwrap_err();
        assert_eq!(
            error,
            ReconstructionError::RowValueIncomplete {
                token_index: 3,
                text: "A".into()
            }
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let sql = r#"update "T" set "A" = 'x', "B" = 8 where "C" = 'y';"#;
        let tree = Parser::new(sql).unwrap().parse_update().unwrap();
        let options = Options::default();
        let replay = || {
            let mut reconstructor = UpdateReconstructor::new(&options);
            for event in tree.walk() {
                reconstructor.handle(&event).unwrap();
            }
            reconstructor.into_columns()
        };
        assert_eq!(replay(), replay());
    }
}

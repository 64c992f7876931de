//! Stack machine rebuilding literal and function values from tree events.
//!
//! Every slot on the stack is tagged with the index of the token its grammar
//! node starts at. A slot is only ever closed by an exit event carrying the
//! same index, which keeps sibling sub-expressions from completing each
//! other.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::errors::ReconstructionError;
use crate::grammar::{Constant, Event, NodeKind, Phase};
use crate::value::{FunctionCall, Value};

/// Functions whose calls are reconstructed, by canonical name.
const SUPPORTED_FUNCTIONS: &[&str] = &["TO_DATE", "TO_TIMESTAMP"];

/// A value under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    /// Holds at most one value; a unary expression closed without one is null.
    Unary {
        token_index: usize,
        value: Option<Value>,
    },
    /// Accumulates positional parameters until the function node exits.
    Function {
        token_index: usize,
        call: FunctionCall,
    },
}

impl Slot {
    fn token_index(&self) -> usize {
        match self {
            Slot::Unary { token_index, .. } | Slot::Function { token_index, .. } => *token_index,
        }
    }

    fn append(&mut self, value: Value) -> Result<(), ReconstructionError> {
        match self {
            Slot::Unary {
                token_index,
                value: Some(actual),
            } => Err(ReconstructionError::AlreadyCompleted {
                token_index: *token_index,
                value,
                actual: actual.clone(),
            }),
            Slot::Unary { value: slot, .. } => {
                *slot = Some(value);
                Ok(())
            }
            Slot::Function { call, .. } => {
                call.parameters.push(value);
                Ok(())
            }
        }
    }

    /// Value of a slot left above its parent when the parent closed.
    fn into_value(self) -> Result<Value, ReconstructionError> {
        match self {
            Slot::Unary { value, .. } => Ok(value.unwrap_or_default()),
            Slot::Function { token_index, .. } => Err(ReconstructionError::NotCompleted {
                expression: "function",
                token_index,
            }),
        }
    }
}

/// Stack of expressions open while a statement is replayed.
#[derive(Debug, Clone)]
pub(crate) struct ExpressionStack {
    slots: Vec<Slot>,
    trim_content: bool,
}

impl ExpressionStack {
    pub(crate) fn new(trim_content: bool) -> Self {
        Self {
            slots: Vec::new(),
            trim_content,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
    }

    /// Whether the event is one the stack machine reacts to.
    pub(crate) fn accepts(event: &Event<'_>) -> bool {
        matches!(
            (event.phase, &event.node.kind),
            (_, NodeKind::UnaryExpression | NodeKind::Function { .. })
                | (Phase::Enter, NodeKind::Constant(_) | NodeKind::QuotedString)
        )
    }

    /// Feed one event to the machine.
    ///
    /// Returns the value of a top-level expression once it is complete.
    pub(crate) fn handle(&mut self, event: &Event<'_>) -> Result<Option<Value>, ReconstructionError> {
        match (event.phase, &event.node.kind) {
            (Phase::Enter, NodeKind::UnaryExpression) => self.enter_unary(event.token_index()),
            (Phase::Exit, NodeKind::UnaryExpression) => return self.exit_unary(event),
            (Phase::Enter, NodeKind::Constant(constant)) => self.enter_constant(event, constant)?,
            (Phase::Enter, NodeKind::QuotedString) => self.enter_quoted_string(event)?,
            (Phase::Enter, NodeKind::Function { name }) => self.enter_function(event, name)?,
            (Phase::Exit, NodeKind::Function { .. }) => self.exit_function(event)?,
            _ => {}
        }
        Ok(None)
    }

    pub(crate) fn enter_unary(&mut self, token_index: usize) {
        self.slots.push(Slot::Unary {
            token_index,
            value: None,
        });
    }

    pub(crate) fn enter_constant(
        &mut self,
        event: &Event<'_>,
        constant: &Constant,
    ) -> Result<(), ReconstructionError> {
        let value = match constant {
            Constant::Null => Value::Null,
            Constant::Numeric { text, integer } => parse_numeric(text, *integer),
            // Carried by the quoted string child.
            Constant::Quoted => return Ok(()),
            Constant::Keyword => Value::Text(event.text.to_string()),
        };
        self.attach(event, value)
    }

    pub(crate) fn enter_quoted_string(&mut self, event: &Event<'_>) -> Result<(), ReconstructionError> {
        let mut content = unquote_literal(event.text);
        if self.trim_content {
            let trimmed = content.trim();
            if trimmed.len() != content.len() {
                content = trimmed.to_string();
            }
        }
        self.attach(event, Value::Text(content))
    }

    pub(crate) fn enter_function(
        &mut self,
        event: &Event<'_>,
        name: &str,
    ) -> Result<(), ReconstructionError> {
        let function = SUPPORTED_FUNCTIONS
            .iter()
            .find(|supported| supported.eq_ignore_ascii_case(name))
            .ok_or_else(|| ReconstructionError::UnsupportedFunction(event.text.to_string()))?;
        self.slots.push(Slot::Function {
            token_index: event.token_index(),
            call: FunctionCall::new(*function),
        });
        Ok(())
    }

    pub(crate) fn exit_function(&mut self, event: &Event<'_>) -> Result<(), ReconstructionError> {
        let token_index = event.token_index();
        match self.slots.pop() {
            Some(Slot::Function {
                token_index: actual,
                call,
            }) if actual == token_index => self.attach(event, Value::Function(call)),
            Some(slot) => Err(ReconstructionError::TagMismatch {
                expression: "function",
                expected: token_index,
                actual: slot.token_index(),
                text: event.text.to_string(),
            }),
            None => Err(empty_stack(event)),
        }
    }

    /// Close the unary expression opened at the event's token.
    ///
    /// Returns `Some` when the closed expression was the outermost one.
    pub(crate) fn exit_unary(
        &mut self,
        event: &Event<'_>,
    ) -> Result<Option<Value>, ReconstructionError> {
        let token_index = event.token_index();
        let position = self
            .slots
            .iter()
            .rposition(|slot| {
                matches!(slot, Slot::Unary { token_index: tag, .. } if *tag == token_index)
            })
            .ok_or_else(|| ReconstructionError::ExpressionNotFound {
                token_index,
                text: event.text.to_string(),
            })?;

        let mut pending = self.slots.split_off(position + 1);
        if pending.len() > 1 {
            return Err(ReconstructionError::MultipleValues {
                token_index,
                count: pending.len(),
                text: event.text.to_string(),
            });
        }
        let Some(mut unary) = self.slots.pop() else {
            return Err(empty_stack(event));
        };
        if let Some(child) = pending.pop() {
            unary.append(child.into_value()?)?;
        }
        let value = unary.into_value()?;

        match self.slots.last_mut() {
            Some(parent) => {
                parent.append(value)?;
                Ok(None)
            }
            None => Ok(Some(value)),
        }
    }

    fn attach(&mut self, event: &Event<'_>, value: Value) -> Result<(), ReconstructionError> {
        match self.slots.last_mut() {
            Some(top) => top.append(value),
            None => Err(empty_stack(event)),
        }
    }
}

fn empty_stack(event: &Event<'_>) -> ReconstructionError {
    ReconstructionError::EmptyStack {
        event: event.to_string(),
        text: event.text.to_string(),
    }
}

/// Integers that overflow `i64` fall back to floating point, as do literals
/// with a fraction or exponent. Unparseable text is kept verbatim.
fn parse_numeric(text: &str, integer: bool) -> Value {
    if integer {
        if let Ok(value) = text.parse::<i64>() {
            return Value::Integer(value);
        }
    }
    match text.parse::<f64>() {
        Ok(value) => Value::Real(value),
        Err(_) => Value::Text(text.to_string()),
    }
}

/// Strip one layer of single quotes and collapse doubled quotes.
fn unquote_literal(text: &str) -> String {
    let inner = text
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
        .unwrap_or(text);
    inner.replace("''", "'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Node, Parser};
    use alloc::vec;

    fn leaf(kind: NodeKind, token_index: usize) -> Node {
        Node {
            kind,
            token_index,
            span: 0..0,
            children: Vec::new(),
        }
    }

    fn event<'t>(phase: Phase, node: &'t Node, text: &'t str) -> Event<'t> {
        Event { phase, node, text }
    }

    /// Replay every value expression of an INSERT and collect top-level values.
    fn values(sql: &str, trim_content: bool) -> Result<Vec<Value>, ReconstructionError> {
        let tree = Parser::new(sql).unwrap().parse_insert().unwrap();
        let mut stack = ExpressionStack::new(trim_content);
        let mut values = Vec::new();
        for event in tree.walk() {
            if let Some(value) = stack.handle(&event)? {
                values.push(value);
            }
        }
        assert!(stack.is_empty());
        Ok(values)
    }

    #[test]
    fn test_literals() {
        let values = values(
            "INSERT INTO t (a, b, c, d, e) VALUES ('x', 8, 1.1, NULL, DEFAULT)",
            true,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Text("x".into()),
                Value::Integer(8),
                Value::Real(1.1),
                Value::Null,
                Value::Text("DEFAULT".into()),
            ]
        );
    }

    #[test]
    fn test_signed_and_overflowing_numbers() {
        let values = values(
            "INSERT INTO t (a, b, c) VALUES (-8, 99999999999999999999, 1e3)",
            true,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Integer(-8),
                Value::Real(1e20),
                Value::Real(1000.0),
            ]
        );
    }

    #[test]
    fn test_nested_functions() {
        let values = values(
            "INSERT INTO t (a) VALUES (TO_TIMESTAMP(TO_TIMESTAMP('12-DEC-23 02.55.01 PM')))",
            true,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![Value::from(
                FunctionCall::new("TO_TIMESTAMP")
                    .with(FunctionCall::new("TO_TIMESTAMP").with("12-DEC-23 02.55.01 PM"))
            )]
        );
    }

    #[test]
    fn test_function_names_are_canonical() {
        let values = values(
            "INSERT INTO t (a) VALUES (to_date('01-JAN-24', 'DD-MON-RR'))",
            true,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![Value::from(
                FunctionCall::new("TO_DATE")
                    .with("01-JAN-24")
                    .with("DD-MON-RR")
            )]
        );
    }

    #[test]
    fn test_unsupported_function() {
        let error = values("INSERT INTO t (a) VALUES (HEXTORAW('00'))", true).unwrap_err();
        assert_eq!(
            error,
            ReconstructionError::UnsupportedFunction("HEXTORAW('00')".into())
        );
    }

    #[test]
    fn test_trim_is_configurable() {
        let sql = "INSERT INTO t (a, b) VALUES ('  padded ', 'it''s')";
        assert_eq!(
            values(sql, true).unwrap(),
            vec![Value::Text("padded".into()), Value::Text("it's".into())]
        );
        assert_eq!(
            values(sql, false).unwrap(),
            vec![Value::Text("  padded ".into()), Value::Text("it's".into())]
        );
    }

    #[test]
    fn test_parenthesised_and_typed_literals() {
        let values = values(
            "INSERT INTO t (a, b) VALUES (((7)), TIMESTAMP '2024-01-31 10:00:00')",
            true,
        )
        .unwrap();
        assert_eq!(
            values,
            vec![
                Value::Integer(7),
                Value::Text("2024-01-31 10:00:00".into())
            ]
        );
    }

    #[test]
    fn test_empty_unary_is_null() {
        let node = leaf(NodeKind::UnaryExpression, 3);
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(3);
        let value = stack.exit_unary(&event(Phase::Exit, &node, "")).unwrap();
        assert_eq!(value, Some(Value::Null));
    }

    #[test]
    fn test_value_without_open_expression() {
        let node = leaf(NodeKind::QuotedString, 1);
        let mut stack = ExpressionStack::new(true);
        let error = stack
            .enter_quoted_string(&event(Phase::Enter, &node, "'x'"))
            .unwrap_err();
        assert!(matches!(error, ReconstructionError::EmptyStack { .. }));
    }

    #[test]
    fn test_unary_completed_twice() {
        let node = leaf(NodeKind::Constant(Constant::Null), 1);
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(1);
        let null = event(Phase::Enter, &node, "NULL");
        stack.enter_constant(&null, &Constant::Null).unwrap();
        let error = stack.enter_constant(&null, &Constant::Null).unwrap_err();
        assert!(matches!(
            error,
            ReconstructionError::AlreadyCompleted { token_index: 1, .. }
        ));
    }

    #[test]
    fn test_exit_unary_requires_matching_tag() {
        let node = leaf(NodeKind::UnaryExpression, 5);
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(4);
        let error = stack
            .exit_unary(&event(Phase::Exit, &node, "x"))
            .unwrap_err();
        assert_eq!(
            error,
            ReconstructionError::ExpressionNotFound {
                token_index: 5,
                text: "x".into()
            }
        );
    }

    #[test]
    fn test_exit_function_requires_matching_tag() {
        let function = leaf(
            NodeKind::Function {
                name: "TO_DATE".into(),
            },
            2,
        );
        let other = leaf(
            NodeKind::Function {
                name: "TO_DATE".into(),
            },
            6,
        );
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(2);
        stack
            .enter_function(&event(Phase::Enter, &function, "TO_DATE()"), "TO_DATE")
            .unwrap();
        let error = stack
            .exit_function(&event(Phase::Exit, &other, "TO_DATE()"))
            .unwrap_err();
        assert!(matches!(
            error,
            ReconstructionError::TagMismatch {
                expected: 6,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_pending_function_is_not_completed() {
        let function = leaf(
            NodeKind::Function {
                name: "TO_DATE".into(),
            },
            2,
        );
        let unary = leaf(NodeKind::UnaryExpression, 1);
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(1);
        stack
            .enter_function(&event(Phase::Enter, &function, "TO_DATE()"), "TO_DATE")
            .unwrap();
        let error = stack
            .exit_unary(&event(Phase::Exit, &unary, "TO_DATE()"))
            .unwrap_err();
        assert_eq!(
            error,
            ReconstructionError::NotCompleted {
                expression: "function",
                token_index: 2
            }
        );
    }

    #[test]
    fn test_multiple_pending_values() {
        let unary = leaf(NodeKind::UnaryExpression, 1);
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(1);
        stack.enter_unary(2);
        stack.enter_unary(3);
        let error = stack
            .exit_unary(&event(Phase::Exit, &unary, "x"))
            .unwrap_err();
        assert!(matches!(
            error,
            ReconstructionError::MultipleValues {
                token_index: 1,
                count: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_clear() {
        let mut stack = ExpressionStack::new(true);
        stack.enter_unary(1);
        assert_eq!(stack.len(), 1);
        stack.clear();
        assert!(stack.is_empty());
    }
}

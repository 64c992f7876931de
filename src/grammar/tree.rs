//! Parse tree produced by the [`Parser`](super::Parser) and its event walk.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Range;

/// Literal constant flavours, as distinguished by the grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    /// The `NULL` keyword.
    Null,
    /// A numeric literal.
    Numeric {
        /// Literal text with any sign folded in, whitespace removed.
        text: String,
        /// Whether the digits form an unsigned integer (no fraction, no exponent).
        integer: bool,
    },
    /// A literal whose value is carried by a [`NodeKind::QuotedString`] child:
    /// a plain string or a `DATE '...'` / `TIMESTAMP '...'` typed literal.
    Quoted,
    /// A keyword constant such as `TRUE`, `DEFAULT` or `DBTIMEZONE`.
    Keyword,
}

/// Grammar productions that appear in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of an `INSERT` statement.
    InsertStatement,
    /// `INTO table (columns)`.
    InsertIntoClause,
    /// `INSERT ALL|FIRST ...`, kept opaque.
    MultiTableInsert,
    /// `VALUES (...)`.
    ValuesClause,
    /// Root of an `UPDATE` statement.
    UpdateStatement,
    /// `SET item, item, ...`.
    UpdateSetClause,
    /// One `column = value` item of a `SET` clause.
    SetItem,
    /// `WHERE condition`.
    WhereClause,
    /// A logical or relational condition in a `WHERE` clause.
    Condition,
    /// A possibly schema-qualified table name.
    TableName,
    /// A column name in an `INSERT` column list or on the left of a `SET` item.
    ColumnName,
    /// A column referenced from a `WHERE` condition.
    ColumnReference,
    /// A value expression.
    UnaryExpression,
    /// A literal constant.
    Constant(Constant),
    /// A quoted string literal, quotes included in the node text.
    QuotedString,
    /// A function call.
    Function {
        /// Function name as written in the statement.
        name: String,
    },
}

impl NodeKind {
    /// Grammar rule name used in diagnostics.
    #[must_use]
    pub fn rule_name(&self) -> &'static str {
        match self {
            NodeKind::InsertStatement => "insert_statement",
            NodeKind::InsertIntoClause => "insert_into_clause",
            NodeKind::MultiTableInsert => "multi_table_insert",
            NodeKind::ValuesClause => "values_clause",
            NodeKind::UpdateStatement => "update_statement",
            NodeKind::UpdateSetClause => "update_set_clause",
            NodeKind::SetItem => "column_based_update_set_clause",
            NodeKind::WhereClause => "where_clause",
            NodeKind::Condition => "condition",
            NodeKind::TableName => "tableview_name",
            NodeKind::ColumnName => "column_name",
            NodeKind::ColumnReference => "column_reference",
            NodeKind::UnaryExpression => "unary_expression",
            NodeKind::Constant(_) => "constant",
            NodeKind::QuotedString => "quoted_string",
            NodeKind::Function { .. } => "function",
        }
    }
}

/// A node of the parse tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// The grammar production.
    pub kind: NodeKind,
    /// Index of the first token covered by the node.
    pub token_index: usize,
    /// Byte range covered by the node in the source.
    pub span: Range<usize>,
    /// Child nodes, in source order.
    pub children: Vec<Node>,
}

/// A parsed statement together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree<'a> {
    source: &'a str,
    root: Node,
}

impl<'a> ParseTree<'a> {
    pub(crate) fn new(source: &'a str, root: Node) -> Self {
        Self { source, root }
    }

    /// The root node of the statement.
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Source text covered by `node`.
    #[must_use]
    pub fn text(&self, node: &Node) -> &'a str {
        self.source.get(node.span.clone()).unwrap_or_default()
    }

    /// Walk the tree depth first.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            source: self.source,
            root: Some(&self.root),
            stack: Vec::new(),
        }
    }
}

/// Whether an event is emitted before or after a node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Pre-order: the node is about to be visited.
    Enter,
    /// Post-order: all children of the node have been visited.
    Exit,
}

/// One step of a tree walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event<'t> {
    /// Enter or exit.
    pub phase: Phase,
    /// The node being entered or exited.
    pub node: &'t Node,
    /// Source text covered by the node.
    pub text: &'t str,
}

impl Event<'_> {
    /// Token position the node starts at.
    #[must_use]
    pub fn token_index(&self) -> usize {
        self.node.token_index
    }
}

impl fmt::Display for Event<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.phase {
            Phase::Enter => "enter",
            Phase::Exit => "exit",
        };
        write!(
            f,
            "{phase} {} (token index {})",
            self.node.kind.rule_name(),
            self.node.token_index
        )
    }
}

/// Depth-first iterator over the [`Event`]s of a [`ParseTree`].
pub struct Walk<'t> {
    source: &'t str,
    root: Option<&'t Node>,
    stack: Vec<(&'t Node, usize)>,
}

impl<'t> Walk<'t> {
    fn event(&self, phase: Phase, node: &'t Node) -> Event<'t> {
        Event {
            phase,
            node,
            text: self.source.get(node.span.clone()).unwrap_or_default(),
        }
    }
}

impl<'t> Iterator for Walk<'t> {
    type Item = Event<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(root) = self.root.take() {
            self.stack.push((root, 0));
            return Some(self.event(Phase::Enter, root));
        }

        let &mut (node, ref mut next_child) = self.stack.last_mut()?;
        if let Some(child) = node.children.get(*next_child) {
            *next_child += 1;
            self.stack.push((child, 0));
            return Some(self.event(Phase::Enter, child));
        }

        self.stack.pop();
        Some(self.event(Phase::Exit, node))
    }
}

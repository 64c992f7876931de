//! Recursive-descent parser for LogMiner `INSERT` and `UPDATE` statements.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use super::lexer::{Lexer, Token, TokenKind};
use super::tree::{Constant, Node, NodeKind, ParseTree};
use super::{SyntaxError, SyntaxErrors};

/// Bare words accepted as constants in value position.
const KEYWORD_CONSTANTS: &[&str] = &[
    "TRUE",
    "FALSE",
    "DEFAULT",
    "DBTIMEZONE",
    "SESSIONTIMEZONE",
    "MINVALUE",
    "MAXVALUE",
];

/// Deepest nesting of parentheses, function calls and `NOT`s accepted.
const MAX_DEPTH: usize = 128;

/// Start of a node that is still being parsed.
#[derive(Clone, Copy)]
struct Mark {
    token_index: usize,
    start: usize,
}

/// SQL parser.
pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    last_end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given statement.
    ///
    /// # Errors
    ///
    /// Returns the lexing problems of the statement, if any.
    pub fn new(source: &'a str) -> Result<Self, SyntaxErrors> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            source,
            tokens,
            pos: 0,
            last_end: 0,
            depth: 0,
        })
    }

    /// Parse the statement as an `INSERT`.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if the statement is not a supported `INSERT`.
    pub fn parse_insert(mut self) -> Result<ParseTree<'a>, SyntaxErrors> {
        let root = self.insert_statement()?;
        Ok(ParseTree::new(self.source, root))
    }

    /// Parse the statement as an `UPDATE`.
    ///
    /// # Errors
    ///
    /// Returns a syntax error if the statement is not a supported `UPDATE`.
    pub fn parse_update(mut self) -> Result<ParseTree<'a>, SyntaxErrors> {
        let root = self.update_statement()?;
        Ok(ParseTree::new(self.source, root))
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn insert_statement(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Insert, "INSERT")?;

        let children = if matches!(self.peek().kind, TokenKind::All | TokenKind::First) {
            vec![self.multi_table_insert()]
        } else {
            vec![self.insert_into_clause()?, self.values_clause()?]
        };

        let node = self.finish(mark, NodeKind::InsertStatement, children);
        self.statement_end()?;
        Ok(node)
    }

    /// `INSERT ALL|FIRST ...` is never reconstructed, so its body is not
    /// parsed: the node simply covers the rest of the statement.
    fn multi_table_insert(&mut self) -> Node {
        let mark = self.mark();
        while self.peek().kind != TokenKind::Eof {
            self.advance();
        }
        self.finish(mark, NodeKind::MultiTableInsert, Vec::new())
    }

    fn insert_into_clause(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Into, "INTO")?;

        let mut children = vec![self.table_name()?];
        if self.eat(TokenKind::LParen) {
            loop {
                children.push(self.column_name()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen, "{',', ')'}")?;
        }

        Ok(self.finish(mark, NodeKind::InsertIntoClause, children))
    }

    fn values_clause(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Values, "VALUES")?;
        self.expect(TokenKind::LParen, "'('")?;

        let mut children = Vec::new();
        loop {
            children.push(self.expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, "{',', ')'}")?;

        Ok(self.finish(mark, NodeKind::ValuesClause, children))
    }

    fn update_statement(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Update, "UPDATE")?;

        let mut children = vec![self.table_name()?];
        // Optional table alias
        if is_identifier(self.peek().kind) {
            self.advance();
        }
        children.push(self.update_set_clause()?);
        if self.peek().kind == TokenKind::Where {
            children.push(self.where_clause()?);
        }

        let node = self.finish(mark, NodeKind::UpdateStatement, children);
        self.statement_end()?;
        Ok(node)
    }

    fn update_set_clause(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Set, "SET")?;

        let mut children = Vec::new();
        loop {
            children.push(self.set_item()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        Ok(self.finish(mark, NodeKind::UpdateSetClause, children))
    }

    fn set_item(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        let column = self.column_name()?;
        self.expect(TokenKind::Equals, "'='")?;
        let value = self.expression()?;
        Ok(self.finish(mark, NodeKind::SetItem, vec![column, value]))
    }

    fn where_clause(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.expect(TokenKind::Where, "WHERE")?;
        let condition = self.condition()?;
        Ok(self.finish(mark, NodeKind::WhereClause, vec![condition]))
    }

    fn statement_end(&mut self) -> Result<(), SyntaxError> {
        self.eat(TokenKind::Semicolon);
        let token = self.peek();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            let message = alloc::format!(
                "extraneous input '{}' expecting <EOF>",
                self.token_text(token)
            );
            Err(SyntaxError::at(self.source, token.span.start, message))
        }
    }

    // ------------------------------------------------------------------
    // Names
    // ------------------------------------------------------------------

    fn table_name(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.identifier()?;
        while self.eat(TokenKind::Dot) {
            self.identifier()?;
        }
        Ok(self.finish(mark, NodeKind::TableName, Vec::new()))
    }

    fn column_name(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.identifier()?;
        Ok(self.finish(mark, NodeKind::ColumnName, Vec::new()))
    }

    fn identifier(&mut self) -> Result<Token, SyntaxError> {
        if is_identifier(self.peek().kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    // ------------------------------------------------------------------
    // Conditions
    // ------------------------------------------------------------------

    fn condition(&mut self) -> Result<Node, SyntaxError> {
        self.nested(|parser| parser.logical(TokenKind::Or, Self::and_condition))
    }

    fn and_condition(&mut self) -> Result<Node, SyntaxError> {
        self.logical(TokenKind::And, Self::not_condition)
    }

    /// Parse `operand (op operand)*`, collapsing to the single operand when
    /// the operator does not appear.
    fn logical(
        &mut self,
        operator: TokenKind,
        operand: fn(&mut Self) -> Result<Node, SyntaxError>,
    ) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        let first = operand(self)?;
        if self.peek().kind != operator {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.eat(operator) {
            children.push(operand(self)?);
        }
        Ok(self.finish(mark, NodeKind::Condition, children))
    }

    fn not_condition(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        if self.eat(TokenKind::Not) {
            let inner = self.nested(Self::not_condition)?;
            return Ok(self.finish(mark, NodeKind::Condition, vec![inner]));
        }
        self.predicate()
    }

    fn predicate(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        let left = if self.eat(TokenKind::LParen) {
            let inner = self.condition()?;
            self.expect(TokenKind::RParen, "')'")?;
            self.finish(mark, NodeKind::Condition, vec![inner])
        } else {
            self.operand()?
        };

        match self.peek().kind {
            TokenKind::Equals
            | TokenKind::NotEquals
            | TokenKind::Less
            | TokenKind::Greater
            | TokenKind::LessEquals
            | TokenKind::GreaterEquals => {
                self.advance();
                let right = self.operand()?;
                Ok(self.finish(mark, NodeKind::Condition, vec![left, right]))
            }
            TokenKind::Is => {
                self.advance();
                self.eat(TokenKind::Not);
                self.expect(TokenKind::Null, "NULL")?;
                Ok(self.finish(mark, NodeKind::Condition, vec![left]))
            }
            _ => Ok(left),
        }
    }

    /// A condition operand: a column reference or a value expression.
    fn operand(&mut self) -> Result<Node, SyntaxError> {
        let token = self.peek();
        let is_column = is_identifier(token.kind)
            && self.peek_at(1).kind != TokenKind::LParen
            && !self.is_keyword_constant(token);
        if !is_column {
            return self.expression();
        }

        let mark = self.mark();
        let reference_mark = self.mark();
        self.identifier()?;
        while self.eat(TokenKind::Dot) {
            self.identifier()?;
        }
        let reference = self.finish(reference_mark, NodeKind::ColumnReference, Vec::new());
        Ok(self.finish(mark, NodeKind::UnaryExpression, vec![reference]))
    }

    // ------------------------------------------------------------------
    // Value expressions
    // ------------------------------------------------------------------

    fn expression(&mut self) -> Result<Node, SyntaxError> {
        self.nested(Self::value_expression)
    }

    fn value_expression(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        let token = self.peek();

        let child = match token.kind {
            TokenKind::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(TokenKind::RParen, "')'")?;
                inner
            }
            TokenKind::Minus | TokenKind::Plus
                if self.peek_at(1).kind == TokenKind::NumericLiteral =>
            {
                self.numeric()
            }
            TokenKind::NumericLiteral => self.numeric(),
            TokenKind::StringLiteral => self.quoted_constant(),
            TokenKind::Date | TokenKind::Timestamp
                if self.peek_at(1).kind == TokenKind::StringLiteral =>
            {
                self.quoted_constant()
            }
            TokenKind::Null => {
                self.advance();
                self.finish(mark, NodeKind::Constant(Constant::Null), Vec::new())
            }
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::LParen => {
                self.function()?
            }
            TokenKind::Identifier if self.is_keyword_constant(token) => {
                self.advance();
                self.finish(mark, NodeKind::Constant(Constant::Keyword), Vec::new())
            }
            _ => return Err(self.unexpected("value expression")),
        };

        Ok(self.finish(mark, NodeKind::UnaryExpression, vec![child]))
    }

    fn numeric(&mut self) -> Node {
        let mark = self.mark();
        let mut text = String::new();
        match self.advance().kind {
            TokenKind::Minus => {
                text.push('-');
                self.advance_text(&mut text);
            }
            TokenKind::Plus => self.advance_text(&mut text),
            _ => text.push_str(self.text_before()),
        }

        let digits = text.trim_start_matches('-');
        let integer = !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit());
        self.finish(
            mark,
            NodeKind::Constant(Constant::Numeric { text, integer }),
            Vec::new(),
        )
    }

    fn quoted_constant(&mut self) -> Node {
        let mark = self.mark();
        if matches!(self.peek().kind, TokenKind::Date | TokenKind::Timestamp) {
            self.advance();
        }
        let string_mark = self.mark();
        self.advance();
        let quoted = self.finish(string_mark, NodeKind::QuotedString, Vec::new());
        self.finish(mark, NodeKind::Constant(Constant::Quoted), vec![quoted])
    }

    fn function(&mut self) -> Result<Node, SyntaxError> {
        let mark = self.mark();
        self.advance();
        let name = String::from(self.text_before());
        self.expect(TokenKind::LParen, "'('")?;

        let mut children = vec![self.expression()?];
        while self.eat(TokenKind::Comma) {
            children.push(self.expression()?);
        }
        self.expect(TokenKind::RParen, "{',', ')'}")?;

        Ok(self.finish(mark, NodeKind::Function { name }, children))
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_DEPTH {
            let start = self.peek().span.start;
            let message = alloc::format!("maximum nesting depth of {MAX_DEPTH} exceeded");
            return Err(SyntaxError::at(self.source, start, message));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        self.peek_at(0)
    }

    /// Look ahead without consuming; past the end this is the EOF token.
    fn peek_at(&self, offset: usize) -> &Token {
        let last = self.tokens.len() - 1;
        &self.tokens[(self.pos + offset).min(last)]
    }

    /// Consume the current token. The EOF token is never consumed.
    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
            self.last_end = token.span.end;
        }
        token
    }

    /// Consume the current token and append its text to `text`.
    fn advance_text(&mut self, text: &mut String) {
        self.advance();
        text.push_str(self.text_before());
    }

    /// Text of the most recently consumed token.
    fn text_before(&self) -> &'a str {
        let source: &'a str = self.source;
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .and_then(|token| source.get(token.span.clone()))
            .unwrap_or_default()
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expecting: &str) -> Result<Token, SyntaxError> {
        if self.peek().kind == kind {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expecting))
        }
    }

    fn unexpected(&self, expecting: &str) -> SyntaxError {
        let token = self.peek();
        let message = alloc::format!(
            "mismatched input '{}' expecting {expecting}",
            self.token_text(token)
        );
        SyntaxError::at(self.source, token.span.start, message)
    }

    fn token_text(&self, token: &Token) -> &'a str {
        let source: &'a str = self.source;
        match token.kind {
            TokenKind::Eof => TokenKind::Eof.describe(),
            _ => source.get(token.span.clone()).unwrap_or_default(),
        }
    }

    fn is_keyword_constant(&self, token: &Token) -> bool {
        let text = self.token_text(token);
        token.kind == TokenKind::Identifier
            && KEYWORD_CONSTANTS
                .iter()
                .any(|keyword| keyword.eq_ignore_ascii_case(text))
    }

    fn mark(&self) -> Mark {
        let token = self.peek();
        Mark {
            token_index: token.index,
            start: token.span.start,
        }
    }

    fn finish(&self, mark: Mark, kind: NodeKind, children: Vec<Node>) -> Node {
        Node {
            kind,
            token_index: mark.token_index,
            span: mark.start..self.last_end.max(mark.start),
            children,
        }
    }
}

fn is_identifier(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Identifier | TokenKind::QuotedIdentifier)
}

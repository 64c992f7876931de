//! SQL lexer for the LogMiner statement subset.
//!
//! Tokens do not own their text: each one records the byte span it covers in
//! the source, so the parser and the reconstructors can slice the original
//! statement (quotes and escapes included) whenever they need it.

use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Range;

use super::SyntaxError;
use super::SyntaxErrors;

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// Position of the token in the token stream.
    pub index: usize,
    /// Byte range of the token in the source text.
    pub span: Range<usize>,
}

/// The different kinds of tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    /// INSERT keyword
    Insert,
    /// INTO keyword
    Into,
    /// VALUES keyword
    Values,
    /// UPDATE keyword
    Update,
    /// SET keyword
    Set,
    /// WHERE keyword
    Where,
    /// AND keyword
    And,
    /// OR keyword
    Or,
    /// NOT keyword
    Not,
    /// IS keyword
    Is,
    /// NULL keyword
    Null,
    /// ALL keyword (multi-table insert)
    All,
    /// FIRST keyword (multi-table insert)
    First,
    /// DATE keyword (typed literal prefix)
    Date,
    /// TIMESTAMP keyword (typed literal prefix)
    Timestamp,

    // Literals
    /// String literal, quotes included in the span.
    StringLiteral,
    /// Unsigned numeric literal.
    NumericLiteral,

    // Identifiers
    /// A bare identifier.
    Identifier,
    /// A double-quoted identifier, quotes included in the span.
    QuotedIdentifier,

    // Symbols
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Comma
    Comma,
    /// Semicolon
    Semicolon,
    /// Period
    Dot,
    /// `=`
    Equals,
    /// `<>`, `!=` or `^=`
    NotEquals,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEquals,
    /// `>=`
    GreaterEquals,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `||`
    Concat,

    // Special
    /// End of input
    Eof,
}

impl TokenKind {
    /// Human readable name used in syntax error messages.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Insert => "INSERT",
            TokenKind::Into => "INTO",
            TokenKind::Values => "VALUES",
            TokenKind::Update => "UPDATE",
            TokenKind::Set => "SET",
            TokenKind::Where => "WHERE",
            TokenKind::And => "AND",
            TokenKind::Or => "OR",
            TokenKind::Not => "NOT",
            TokenKind::Is => "IS",
            TokenKind::Null => "NULL",
            TokenKind::All => "ALL",
            TokenKind::First => "FIRST",
            TokenKind::Date => "DATE",
            TokenKind::Timestamp => "TIMESTAMP",
            TokenKind::StringLiteral => "string literal",
            TokenKind::NumericLiteral => "numeric literal",
            TokenKind::Identifier | TokenKind::QuotedIdentifier => "identifier",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Equals => "'='",
            TokenKind::NotEquals => "'<>'",
            TokenKind::Less => "'<'",
            TokenKind::Greater => "'>'",
            TokenKind::LessEquals => "'<='",
            TokenKind::GreaterEquals => "'>='",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Concat => "'||'",
            TokenKind::Eof => "<EOF>",
        }
    }
}

/// SQL lexer that splits a statement into tokens.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    errors: Vec<SyntaxError>,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input.
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            tokens: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole input.
    ///
    /// The returned vector always ends with an [`TokenKind::Eof`] token.
    ///
    /// # Errors
    ///
    /// Returns every lexing problem found in the input. Lexing continues
    /// past an unexpected character so that all of them are reported at once.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxErrors> {
        loop {
            self.skip_whitespace();
            let start = self.pos;
            match self.next_kind() {
                Some(TokenKind::Eof) => {
                    self.push(TokenKind::Eof, start);
                    break;
                }
                Some(kind) => self.push(kind, start),
                None => {}
            }
        }

        if self.errors.is_empty() {
            Ok(self.tokens)
        } else {
            Err(SyntaxErrors::from(self.errors))
        }
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        let index = self.tokens.len();
        self.tokens.push(Token {
            kind,
            index,
            span: start..self.pos,
        });
    }

    fn error(&mut self, pos: usize, message: String) {
        self.errors.push(SyntaxError::at(self.input, pos, message));
    }

    /// Skip whitespace and comments.
    fn skip_whitespace(&mut self) {
        let bytes = self.input.as_bytes();
        while self.pos < bytes.len() {
            let b = bytes[self.pos];
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'-' && bytes.get(self.pos + 1) == Some(&b'-') {
                // Line comment
                self.pos += 2;
                while self.pos < bytes.len() && bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
            } else if b == b'/' && bytes.get(self.pos + 1) == Some(&b'*') {
                // Block comment
                self.pos += 2;
                while self.pos + 1 < bytes.len()
                    && !(bytes[self.pos] == b'*' && bytes[self.pos + 1] == b'/')
                {
                    self.pos += 1;
                }
                self.pos = (self.pos + 2).min(bytes.len());
            } else {
                break;
            }
        }
    }

    /// Scan the next token kind, or `None` when the input at the current
    /// position could not be tokenized (the problem is recorded).
    fn next_kind(&mut self) -> Option<TokenKind> {
        let bytes = self.input.as_bytes();
        let start = self.pos;

        let Some(&b) = bytes.get(self.pos) else {
            return Some(TokenKind::Eof);
        };
        let next = bytes.get(self.pos + 1).copied();

        let (kind, len) = match (b, next) {
            (b'(', _) => (TokenKind::LParen, 1),
            (b')', _) => (TokenKind::RParen, 1),
            (b',', _) => (TokenKind::Comma, 1),
            (b';', _) => (TokenKind::Semicolon, 1),
            (b'=', _) => (TokenKind::Equals, 1),
            (b'+', _) => (TokenKind::Plus, 1),
            (b'-', _) => (TokenKind::Minus, 1),
            (b'<', Some(b'>')) | (b'!' | b'^', Some(b'=')) => (TokenKind::NotEquals, 2),
            (b'<', Some(b'=')) => (TokenKind::LessEquals, 2),
            (b'>', Some(b'=')) => (TokenKind::GreaterEquals, 2),
            (b'<', _) => (TokenKind::Less, 1),
            (b'>', _) => (TokenKind::Greater, 1),
            (b'|', Some(b'|')) => (TokenKind::Concat, 2),
            (b'.', Some(d)) if d.is_ascii_digit() => return Some(self.read_number()),
            (b'.', _) => (TokenKind::Dot, 1),
            (b'\'', _) => return self.read_quoted(b'\'', TokenKind::StringLiteral),
            (b'"', _) => return self.read_quoted(b'"', TokenKind::QuotedIdentifier),
            _ if b.is_ascii_digit() => return Some(self.read_number()),
            _ if is_ident_start(b) => return Some(self.read_identifier()),
            _ => {
                let ch = self.input[start..].chars().next().unwrap_or('\u{fffd}');
                self.pos += ch.len_utf8();
                self.error(start, alloc::format!("token recognition error at: '{ch}'"));
                return None;
            }
        };

        self.pos += len;
        Some(kind)
    }

    /// Read a quoted literal or identifier. A doubled quote character is an
    /// escaped quote and does not terminate the token.
    fn read_quoted(&mut self, quote: u8, kind: TokenKind) -> Option<TokenKind> {
        let bytes = self.input.as_bytes();
        let start = self.pos;
        self.pos += 1;

        while self.pos < bytes.len() {
            if bytes[self.pos] == quote {
                if bytes.get(self.pos + 1) == Some(&quote) {
                    self.pos += 2;
                    continue;
                }
                self.pos += 1;
                return Some(kind);
            }
            self.pos += 1;
        }

        let what = match kind {
            TokenKind::QuotedIdentifier => "quoted identifier",
            _ => "string literal",
        };
        self.error(start, alloc::format!("unterminated {what}"));
        None
    }

    fn read_number(&mut self) -> TokenKind {
        let bytes = self.input.as_bytes();
        let digits = |pos: &mut usize| {
            while *pos < bytes.len() && bytes[*pos].is_ascii_digit() {
                *pos += 1;
            }
        };

        digits(&mut self.pos);

        if bytes.get(self.pos) == Some(&b'.') {
            self.pos += 1;
            digits(&mut self.pos);
        }

        if matches!(bytes.get(self.pos), Some(b'e' | b'E')) {
            let mut lookahead = self.pos + 1;
            if matches!(bytes.get(lookahead), Some(b'+' | b'-')) {
                lookahead += 1;
            }
            if bytes.get(lookahead).is_some_and(u8::is_ascii_digit) {
                self.pos = lookahead;
                digits(&mut self.pos);
            }
        }

        TokenKind::NumericLiteral
    }

    fn read_identifier(&mut self) -> TokenKind {
        let bytes = self.input.as_bytes();
        let ident_start = self.pos;

        while self.pos < bytes.len() && is_ident_cont(bytes[self.pos]) {
            self.pos += 1;
        }

        keyword(&self.input[ident_start..self.pos]).unwrap_or(TokenKind::Identifier)
    }
}

/// Resolve a bare word to its keyword token, if it is one.
fn keyword(word: &str) -> Option<TokenKind> {
    const KEYWORDS: &[(&str, TokenKind)] = &[
        ("INSERT", TokenKind::Insert),
        ("INTO", TokenKind::Into),
        ("VALUES", TokenKind::Values),
        ("UPDATE", TokenKind::Update),
        ("SET", TokenKind::Set),
        ("WHERE", TokenKind::Where),
        ("AND", TokenKind::And),
        ("OR", TokenKind::Or),
        ("NOT", TokenKind::Not),
        ("IS", TokenKind::Is),
        ("NULL", TokenKind::Null),
        ("ALL", TokenKind::All),
        ("FIRST", TokenKind::First),
        ("DATE", TokenKind::Date),
        ("TIMESTAMP", TokenKind::Timestamp),
    ];

    KEYWORDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(word))
        .map(|&(_, kind)| kind)
}

/// Check if a byte can start an identifier.
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

/// Check if a byte can continue an identifier.
fn is_ident_cont(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'#')
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|token| token.kind)
            .collect()
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        assert_eq!(
            kinds("insert INTO Values update set where and"),
            vec![
                TokenKind::Insert,
                TokenKind::Into,
                TokenKind::Values,
                TokenKind::Update,
                TokenKind::Set,
                TokenKind::Where,
                TokenKind::And,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers_keep_their_quotes() {
        let input = r#""OWNER"."test-table""#;
        let tokens = Lexer::new(input).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::QuotedIdentifier);
        assert_eq!(&input[tokens[0].span.clone()], "\"OWNER\"");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
        assert_eq!(&input[tokens[2].span.clone()], "\"test-table\"");
    }

    #[test]
    fn test_string_with_escaped_quote() {
        let input = "'it''s' 'x'";
        let tokens = Lexer::new(input).tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(&input[tokens[0].span.clone()], "'it''s'");
        assert_eq!(&input[tokens[1].span.clone()], "'x'");
    }

    #[test]
    fn test_numbers() {
        let input = "8 1.1 .5 1e10 2E-3";
        let tokens = Lexer::new(input).tokenize().unwrap();
        let texts: Vec<&str> = tokens[..5]
            .iter()
            .map(|token| &input[token.span.clone()])
            .collect();
        assert_eq!(texts, vec!["8", "1.1", ".5", "1e10", "2E-3"]);
        assert!(
            tokens[..5]
                .iter()
                .all(|token| token.kind == TokenKind::NumericLiteral)
        );
    }

    #[test]
    fn test_token_indices_are_sequential() {
        let tokens = Lexer::new("TO_DATE('a', 'b')").tokenize().unwrap();
        for (position, token) in tokens.iter().enumerate() {
            assert_eq!(token.index, position);
        }
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_comparison_symbols() {
        assert_eq!(
            kinds("<> != ^= <= >= < > ||"),
            vec![
                TokenKind::NotEquals,
                TokenKind::NotEquals,
                TokenKind::NotEquals,
                TokenKind::LessEquals,
                TokenKind::GreaterEquals,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Concat,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("SET -- trailing\n /* block */ WHERE"),
            vec![TokenKind::Set, TokenKind::Where, TokenKind::Eof]
        );
    }

    #[test]
    fn test_all_unexpected_characters_are_reported() {
        let errors = Lexer::new("a @ b ~").tokenize().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.as_slice()[0].column, 2);
        assert_eq!(errors.as_slice()[1].column, 6);
    }

    #[test]
    fn test_unterminated_string() {
        let errors = Lexer::new("VALUES ('abc").tokenize().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.as_slice()[0].message.contains("unterminated"));
    }
}

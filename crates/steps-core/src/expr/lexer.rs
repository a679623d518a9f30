//! Lexer: convierte una condición en una secuencia de tokens.
use super::errors::{ExprError, ExprResult};

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Texto del token; para strings ya sin comillas y con escapes resueltos.
    pub text: String,
    /// Columna (1-based).
    pub col: usize,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, col: usize) -> Self {
        Self { kind,
               text: text.into(),
               col }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    StringLiteral,
    IntLiteral,
    FloatLiteral,
    True,
    False,
    Null,

    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Minus,
    OpenParen,
    CloseParen,
    Dot,

    Eof,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Identifier => "identifier",
            Self::StringLiteral => "string literal",
            Self::IntLiteral => "integer",
            Self::FloatLiteral => "float",
            Self::True => "true",
            Self::False => "false",
            Self::Null => "null",
            Self::EqEq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::AndAnd => "&&",
            Self::OrOr => "||",
            Self::Bang => "!",
            Self::Minus => "-",
            Self::OpenParen => "(",
            Self::CloseParen => ")",
            Self::Dot => ".",
            Self::Eof => "end of input",
        };
        f.write_str(s)
    }
}

pub struct Lexer {
    input: Vec<char>,
    pos: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self { input: input.chars().collect(),
               pos: 0 }
    }

    /// Tokeniza toda la entrada; el último token siempre es `Eof`.
    pub fn tokenize(&mut self) -> ExprResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            while self.peek_at(0).is_some_and(char::is_whitespace) {
                self.pos += 1;
            }
            if self.pos >= self.input.len() {
                tokens.push(Token::new(TokenKind::Eof, "", self.col()));
                break;
            }
            let after_dot = tokens.last().is_some_and(|t: &Token| t.kind == TokenKind::Dot);
            tokens.push(self.next_token(after_dot)?);
        }
        Ok(tokens)
    }

    fn col(&self) -> usize {
        self.pos + 1
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn symbol(&mut self, kind: TokenKind, len: usize) -> Token {
        let col = self.col();
        let text: String = self.input[self.pos..self.pos + len].iter().collect();
        self.pos += len;
        Token::new(kind, text, col)
    }

    fn next_token(&mut self, after_dot: bool) -> ExprResult<Token> {
        let ch = self.input[self.pos];
        let next = self.peek_at(1);
        let token = match (ch, next) {
            ('=', Some('=')) => self.symbol(TokenKind::EqEq, 2),
            ('!', Some('=')) => self.symbol(TokenKind::NotEq, 2),
            ('<', Some('=')) => self.symbol(TokenKind::Le, 2),
            ('>', Some('=')) => self.symbol(TokenKind::Ge, 2),
            ('&', Some('&')) => self.symbol(TokenKind::AndAnd, 2),
            ('|', Some('|')) => self.symbol(TokenKind::OrOr, 2),
            ('<', _) => self.symbol(TokenKind::Lt, 1),
            ('>', _) => self.symbol(TokenKind::Gt, 1),
            ('!', _) => self.symbol(TokenKind::Bang, 1),
            ('-', _) => self.symbol(TokenKind::Minus, 1),
            ('(', _) => self.symbol(TokenKind::OpenParen, 1),
            (')', _) => self.symbol(TokenKind::CloseParen, 1),
            ('.', _) => self.symbol(TokenKind::Dot, 1),
            ('"' | '\'', _) => self.read_string(ch)?,
            (c, _) if c.is_ascii_digit() => self.read_number(after_dot),
            (c, _) if c.is_alphabetic() || c == '_' => self.read_word(),
            _ => return Err(ExprError::syntax(self.col(), format!("unexpected character '{ch}'"))),
        };
        Ok(token)
    }

    fn read_string(&mut self, quote: char) -> ExprResult<Token> {
        let col = self.col();
        self.pos += 1;
        let mut text = String::new();
        loop {
            match self.peek_at(0) {
                None => return Err(ExprError::syntax(col, "unterminated string literal")),
                Some(c) if c == quote => {
                    self.pos += 1;
                    break;
                }
                Some('\\') => {
                    let escaped = self.peek_at(1)
                                      .ok_or_else(|| ExprError::syntax(col, "unterminated string literal"))?;
                    text.push(match escaped {
                                  'n' => '\n',
                                  't' => '\t',
                                  other => other,
                              });
                    self.pos += 2;
                }
                Some(c) => {
                    text.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(Token::new(TokenKind::StringLiteral, text, col))
    }

    /// Tras un `.` los dígitos son un índice de path: `items.1.2` no contiene floats.
    fn read_number(&mut self, after_dot: bool) -> Token {
        let start = self.pos;
        let col = self.col();
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        // Sólo es float si tras el punto viene al menos un dígito (`a.0.b` sigue siendo un path).
        let mut kind = TokenKind::IntLiteral;
        if !after_dot && self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            kind = TokenKind::FloatLiteral;
            self.pos += 1;
            while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        let text: String = self.input[start..self.pos].iter().collect();
        Token::new(kind, text, col)
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        let col = self.col();
        while self.peek_at(0).is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.pos += 1;
        }
        let text: String = self.input[start..self.pos].iter().collect();
        let kind = match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, text, col)
    }
}

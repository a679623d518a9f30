//! Parser descendente recursivo para guards.
//!
//! Gramática (de menor a mayor precedencia):
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := cmp ( "&&" cmp )*
//! cmp     := unary ( ( "==" | "!=" | "<" | "<=" | ">" | ">=" ) unary )?
//! unary   := ( "!" | "-" ) unary | primary
//! primary := literal | path | "(" or ")"
//! path    := IDENT ( "." ( IDENT | INT ) )*
//! ```
//!
//! Las comparaciones no son asociativas: `a < b < c` es un error de sintaxis.
use super::errors::{ExprError, ExprResult};
use super::lexer::{Lexer, Token, TokenKind};

/// Anidamiento máximo de paréntesis y operadores unarios.
pub const MAX_DEPTH: usize = 64;
/// Operadores binarios máximos por expresión; acota la profundidad del AST
/// en cadenas largas de `&&`/`||`.
pub const MAX_OPERATORS: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    fn from_token(kind: TokenKind) -> Option<Self> {
        Some(match kind {
                 TokenKind::EqEq => Self::Eq,
                 TokenKind::NotEq => Self::Ne,
                 TokenKind::Lt => Self::Lt,
                 TokenKind::Le => Self::Le,
                 TokenKind::Gt => Self::Gt,
                 TokenKind::Ge => Self::Ge,
                 _ => return None,
             })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// Acceso por campos: `claim.amount` -> `["claim", "amount"]`.
    Path(Vec<String>),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    /// Parsea una condición completa. No acepta entrada vacía: el llamador
    /// debe tratar las condiciones en blanco antes de llegar aquí.
    pub fn parse(input: &str) -> ExprResult<Expr> {
        let tokens = Lexer::new(input).tokenize()?;
        let mut parser = Self { tokens,
                                pos: 0,
                                depth: 0,
                                operators: 0 };
        let expr = parser.parse_or()?;
        if !parser.check(TokenKind::Eof) {
            let tok = parser.peek();
            return Err(ExprError::syntax(tok.col, format!("unexpected '{}' after expression", tok.text)));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.check(TokenKind::OrOr) {
            self.count_operator()?;
            self.advance();
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.check(TokenKind::AndAnd) {
            self.count_operator()?;
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let lhs = self.parse_unary()?;
        let Some(op) = BinaryOp::from_token(self.peek().kind) else {
            return Ok(lhs);
        };
        self.count_operator()?;
        self.advance();
        let rhs = self.parse_unary()?;
        if BinaryOp::from_token(self.peek().kind).is_some() {
            return Err(ExprError::syntax(self.peek().col, "comparison operators cannot be chained"));
        }
        Ok(binary(op, lhs, rhs))
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        match self.peek().kind {
            TokenKind::Bang => {
                self.enter()?;
                self.advance();
                let inner = self.parse_unary();
                self.depth -= 1;
                Ok(Expr::Not(Box::new(inner?)))
            }
            TokenKind::Minus => {
                self.enter()?;
                self.advance();
                let inner = self.parse_unary();
                self.depth -= 1;
                Ok(Expr::Neg(Box::new(inner?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        if self.check(TokenKind::OpenParen) {
            self.enter()?;
        }
        let tok = self.advance().clone();
        let literal = match tok.kind {
            TokenKind::True => Literal::Bool(true),
            TokenKind::False => Literal::Bool(false),
            TokenKind::Null => Literal::Null,
            TokenKind::StringLiteral => Literal::Str(tok.text),
            TokenKind::IntLiteral => {
                let n = tok.text
                           .parse::<i64>()
                           .map_err(|_| ExprError::syntax(tok.col, format!("integer out of range: {}", tok.text)))?;
                Literal::Int(n)
            }
            TokenKind::FloatLiteral => {
                let f = tok.text
                           .parse::<f64>()
                           .ok()
                           .filter(|f| f.is_finite())
                           .ok_or_else(|| ExprError::syntax(tok.col, format!("invalid float: {}", tok.text)))?;
                Literal::Float(f)
            }
            TokenKind::Identifier => return self.parse_path(tok.text),
            TokenKind::OpenParen => {
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                self.expect(TokenKind::CloseParen)?;
                return Ok(inner);
            }
            TokenKind::Eof => return Err(ExprError::syntax(tok.col, "unexpected end of input")),
            other => return Err(ExprError::syntax(tok.col, format!("unexpected '{other}'"))),
        };
        Ok(Expr::Literal(literal))
    }

    fn parse_path(&mut self, head: String) -> ExprResult<Expr> {
        let mut segments = vec![head];
        while self.check(TokenKind::Dot) {
            self.advance();
            let tok = self.advance().clone();
            match tok.kind {
                TokenKind::Identifier | TokenKind::IntLiteral => segments.push(tok.text),
                // Palabras reservadas valen como nombre de campo tras un punto.
                TokenKind::True | TokenKind::False | TokenKind::Null => segments.push(tok.text),
                other => return Err(ExprError::syntax(tok.col, format!("expected field name after '.', found '{other}'"))),
            }
        }
        Ok(Expr::Path(segments))
    }

    fn enter(&mut self) -> ExprResult<()> {
        if self.depth >= MAX_DEPTH {
            return Err(ExprError::syntax(self.peek().col, "expression nested too deeply"));
        }
        self.depth += 1;
        Ok(())
    }

    fn count_operator(&mut self) -> ExprResult<()> {
        if self.operators >= MAX_OPERATORS {
            return Err(ExprError::syntax(self.peek().col, "expression has too many operators"));
        }
        self.operators += 1;
        Ok(())
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn expect(&mut self, kind: TokenKind) -> ExprResult<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(ExprError::syntax(tok.col, format!("expected '{kind}', found '{}'", tok.kind)))
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op,
                   lhs: Box::new(lhs),
                   rhs: Box::new(rhs) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> Expr {
        Expr::Path(p.split('.').map(str::to_string).collect())
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = Parser::parse("a || b && c").unwrap();
        assert_eq!(expr, binary(BinaryOp::Or, path("a"), binary(BinaryOp::And, path("b"), path("c"))));
    }

    #[test]
    fn comparison_with_literals() {
        let expr = Parser::parse("claim.amount_approved > 0.0").unwrap();
        assert_eq!(expr,
                   binary(BinaryOp::Gt, path("claim.amount_approved"), Expr::Literal(Literal::Float(0.0))));
        let expr = Parser::parse("x.status == 'open'").unwrap();
        assert_eq!(expr,
                   binary(BinaryOp::Eq, path("x.status"), Expr::Literal(Literal::Str("open".into()))));
    }

    #[test]
    fn unary_and_parentheses() {
        let expr = Parser::parse("!(a == -1)").unwrap();
        assert_eq!(expr,
                   Expr::Not(Box::new(binary(BinaryOp::Eq,
                                             path("a"),
                                             Expr::Neg(Box::new(Expr::Literal(Literal::Int(1))))))));
    }

    #[test]
    fn chained_comparison_is_rejected() {
        let err = Parser::parse("1 < 2 < 3").unwrap_err();
        assert!(matches!(err, ExprError::Syntax { col: 7, .. }));
    }

    #[test]
    fn dangling_operator_and_trailing_tokens() {
        assert!(matches!(Parser::parse("a &&"), Err(ExprError::Syntax { .. })));
        assert!(matches!(Parser::parse("a b"), Err(ExprError::Syntax { col: 3, .. })));
        assert!(matches!(Parser::parse("(a == 1"), Err(ExprError::Syntax { .. })));
        assert!(matches!(Parser::parse(""), Err(ExprError::Syntax { col: 1, .. })));
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let parens = format!("{}true{}", "(".repeat(1_000), ")".repeat(1_000));
        let err = Parser::parse(&parens).unwrap_err();
        assert_eq!(err, ExprError::syntax(MAX_DEPTH + 1, "expression nested too deeply"));

        let bangs = format!("{}true", "!".repeat(100_000));
        assert!(matches!(Parser::parse(&bangs), Err(ExprError::Syntax { .. })));

        let ok = format!("{}true{}", "(".repeat(MAX_DEPTH), ")".repeat(MAX_DEPTH));
        assert_eq!(Parser::parse(&ok), Ok(Expr::Literal(Literal::Bool(true))));
    }

    #[test]
    fn long_boolean_chains_are_capped() {
        let chain = vec!["true"; 10_000].join(" && ");
        let err = Parser::parse(&chain).unwrap_err();
        assert!(matches!(err, ExprError::Syntax { .. }));
        assert!(err.to_string().contains("too many operators"));

        let short = vec!["a"; MAX_OPERATORS + 1].join(" || ");
        assert!(Parser::parse(&short).is_ok());
    }

    #[test]
    fn numeric_path_segments_after_dot() {
        assert_eq!(Parser::parse("items.1.2").unwrap(), path("items.1.2"));
    }
}

//! Derivation expression templates.
//!
//! A derivation expression combines the units of its signature through
//! positional placeholders, e.g. `{0} / {1}` or `sqrt({0} * {1})`. This
//! module tokenizes with logos and parses by recursive descent into a
//! small [`Expr`] tree, which is then used for two checks:
//!
//! - which placeholders occur ([`Expr::placeholders`])
//! - what dimension the expression produces ([`Expr::dimension`])
//!
//! # Grammar
//!
//! ```text
//! sum     := product (("+" | "-") product)*
//! product := unary (("*" | "/") unary)*
//! unary   := "-" unary | power
//! power   := primary ("^" exponent)?
//! primary := NUMBER | "{" INDEX "}" | FUNC "(" sum ")" | "(" sum ")"
//! exponent:= "-"? INTEGER | "(" "-"? INTEGER ")"
//! FUNC    := "sqrt" | "cbrt"
//! ```
//!
//! Nesting is capped at [`MAX_DEPTH`] levels, counting parentheses, function
//! calls, negations and chained operators alike.

use logos::Logos;
use metrology_decl::Dimension;
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,

    #[regex(r"\{[0-9]+\}", |lex| {
        let s = lex.slice();
        s[1..s.len() - 1].parse::<usize>().ok()
    })]
    Placeholder(usize),

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Star => write!(f, "'*'"),
            Token::Slash => write!(f, "'/'"),
            Token::Caret => write!(f, "'^'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Placeholder(i) => write!(f, "placeholder {{{i}}}"),
            Token::Number(n) => write!(f, "number {n}"),
            Token::Ident(name) => write!(f, "identifier '{name}'"),
        }
    }
}

/// Deepest expression tree the parser builds.
pub const MAX_DEPTH: usize = 256;

/// Binary operator of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// Root function of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sqrt,
    Cbrt,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "sqrt" => Some(Function::Sqrt),
            "cbrt" => Some(Function::Cbrt),
            _ => None,
        }
    }

    fn degree(self) -> i8 {
        match self {
            Function::Sqrt => 2,
            Function::Cbrt => 3,
        }
    }
}

/// Parsed derivation expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Placeholder(usize),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Pow {
        base: Box<Expr>,
        exponent: i32,
    },
    Call {
        function: Function,
        arg: Box<Expr>,
    },
}

/// Expression that failed to tokenize or parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionError {
    /// Byte offset in the expression text
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for ExpressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at offset {}", self.message, self.offset)
    }
}

impl std::error::Error for ExpressionError {}

/// Dimension evaluation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    /// `+`/`-` over operands of different dimensions
    IncompatibleTerms { lhs: Dimension, rhs: Dimension },
    /// Exponent left the representable range
    Overflow,
    /// `sqrt`/`cbrt` of a dimension whose exponents do not divide
    InexactRoot { dimension: Dimension, degree: i8 },
    /// Placeholder without a bound dimension
    Unbound(usize),
}

impl fmt::Display for DimensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionError::IncompatibleTerms { lhs, rhs } => {
                write!(f, "cannot add or subtract '{lhs}' and '{rhs}'")
            }
            DimensionError::Overflow => write!(f, "dimension exponent out of range"),
            DimensionError::InexactRoot { dimension, degree } => {
                write!(f, "'{dimension}' has no exact root of degree {degree}")
            }
            DimensionError::Unbound(i) => write!(f, "placeholder {{{i}}} is not bound"),
        }
    }
}

impl std::error::Error for DimensionError {}

/// Parses an expression template.
pub fn parse(source: &str) -> Result<Expr, ExpressionError> {
    let mut tokens = Vec::new();
    for (token, range) in Token::lexer(source).spanned() {
        match token {
            Ok(token) => tokens.push((token, range)),
            Err(()) => {
                return Err(ExpressionError {
                    offset: range.start,
                    message: format!("unexpected character(s) '{}'", &source[range]),
                })
            }
        }
    }

    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        end: source.len(),
        depth: 0,
    };
    let expr = parser.sum()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parser.error(format!("unexpected {token} after expression"))),
    }
}

struct Parser<'a> {
    tokens: &'a [(Token, Range<usize>)],
    pos: usize,
    end: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.end, |(_, range)| range.start)
    }

    fn error(&self, message: String) -> ExpressionError {
        ExpressionError {
            offset: self.offset(),
            message,
        }
    }

    /// Enters one more level of the tree being built.
    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error(format!("expression nests deeper than {MAX_DEPTH} levels")));
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        if self.eat(&expected) {
            return Ok(());
        }
        Err(match self.peek() {
            Some(found) => self.error(format!("expected {expected}, found {found}")),
            None => self.error(format!("expected {expected}, found end of expression")),
        })
    }

    fn sum(&mut self) -> Result<Expr, ExpressionError> {
        let depth = self.depth;
        let mut lhs = self.product()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Sub,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.advance();
            self.descend()?;
            let rhs = self.product()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn product(&mut self) -> Result<Expr, ExpressionError> {
        let depth = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Mul,
                Some(Token::Slash) => BinaryOp::Div,
                _ => {
                    self.depth = depth;
                    return Ok(lhs);
                }
            };
            self.advance();
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }

    fn unary(&mut self) -> Result<Expr, ExpressionError> {
        if self.eat(&Token::Minus) {
            self.descend()?;
            let inner = self.unary()?;
            self.depth -= 1;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ExpressionError> {
        let base = self.primary()?;
        if !self.eat(&Token::Caret) {
            return Ok(base);
        }
        let exponent = self.exponent()?;
        Ok(Expr::Pow {
            base: Box::new(base),
            exponent,
        })
    }

    fn exponent(&mut self) -> Result<i32, ExpressionError> {
        let parenthesized = self.eat(&Token::LParen);
        let negative = self.eat(&Token::Minus);
        let value = match self.advance() {
            Some(Token::Number(n)) if n.fract() == 0.0 && n.abs() <= f64::from(i8::MAX) => *n as i32,
            Some(found) => {
                self.pos -= 1;
                return Err(self.error(format!("expected integer exponent, found {found}")));
            }
            None => return Err(self.error("expected integer exponent".to_string())),
        };
        if parenthesized {
            self.expect(Token::RParen)?;
        }
        Ok(if negative { -value } else { value })
    }

    fn primary(&mut self) -> Result<Expr, ExpressionError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(Expr::Number(*n)),
            Some(Token::Placeholder(i)) => Ok(Expr::Placeholder(*i)),
            Some(Token::LParen) => {
                self.descend()?;
                let inner = self.sum()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(inner)
            }
            Some(Token::Ident(name)) => {
                let Some(function) = Function::from_name(name) else {
                    self.pos -= 1;
                    return Err(self.error(format!("unknown function '{name}'")));
                };
                self.expect(Token::LParen)?;
                self.descend()?;
                let arg = self.sum()?;
                self.expect(Token::RParen)?;
                self.depth -= 1;
                Ok(Expr::Call {
                    function,
                    arg: Box::new(arg),
                })
            }
            Some(found) => {
                self.pos -= 1;
                Err(self.error(format!("unexpected {found}")))
            }
            None => Err(self.error("unexpected end of expression".to_string())),
        }
    }
}

impl Expr {
    /// Placeholder indices referenced anywhere in the expression.
    pub fn placeholders(&self) -> BTreeSet<usize> {
        let mut found = BTreeSet::new();
        self.collect_placeholders(&mut found);
        found
    }

    fn collect_placeholders(&self, found: &mut BTreeSet<usize>) {
        match self {
            Expr::Number(_) => {}
            Expr::Placeholder(i) => {
                found.insert(*i);
            }
            Expr::Neg(inner) => inner.collect_placeholders(found),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_placeholders(found);
                rhs.collect_placeholders(found);
            }
            Expr::Pow { base, .. } => base.collect_placeholders(found),
            Expr::Call { arg, .. } => arg.collect_placeholders(found),
        }
    }

    /// Dimension produced when placeholder `i` has dimension `bindings[i]`.
    pub fn dimension(&self, bindings: &[Dimension]) -> Result<Dimension, DimensionError> {
        match self {
            Expr::Number(_) => Ok(Dimension::DIMENSIONLESS),
            Expr::Placeholder(i) => bindings
                .get(*i)
                .copied()
                .ok_or(DimensionError::Unbound(*i)),
            Expr::Neg(inner) => inner.dimension(bindings),
            Expr::Binary { op, lhs, rhs } => {
                let lhs = lhs.dimension(bindings)?;
                let rhs = rhs.dimension(bindings)?;
                match op {
                    BinaryOp::Add | BinaryOp::Sub if lhs == rhs => Ok(lhs),
                    BinaryOp::Add | BinaryOp::Sub => {
                        Err(DimensionError::IncompatibleTerms { lhs, rhs })
                    }
                    BinaryOp::Mul => lhs.multiply(&rhs).ok_or(DimensionError::Overflow),
                    BinaryOp::Div => lhs.divide(&rhs).ok_or(DimensionError::Overflow),
                }
            }
            Expr::Pow { base, exponent } => base
                .dimension(bindings)?
                .pow(*exponent)
                .ok_or(DimensionError::Overflow),
            Expr::Call { function, arg } => {
                let dimension = arg.dimension(bindings)?;
                let degree = function.degree();
                dimension
                    .root(degree)
                    .ok_or(DimensionError::InexactRoot { dimension, degree })
            }
        }
    }
}

//! Tokenizer, recursive-descent parser, and evaluator for calculator
//! expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr    = term  (("+" | "-") term)*
//! term    = unary (("*" | "/") unary)*
//! unary   = ("-" | "+") unary | primary
//! primary = NUMBER | IDENT | IDENT "(" expr ("," expr)* ")" | "(" expr ")"
//! ```
//!
//! Identifiers resolve against a fixed function table and two constants at
//! parse time, so evaluation itself is infallible over `f64`.

use super::EvalError;
use std::fmt;
use std::iter::Peekable;
use std::str::CharIndices;

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Comma,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number(value) => write!(f, "{value}"),
            TokenKind::Ident(name) => write!(f, "{name}"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Byte offset into the source expression.
    pos: usize,
}

struct Tokenizer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn tokenize(input: &'a str) -> Result<Vec<Token>, EvalError> {
        let mut tokenizer = Self {
            input,
            chars: input.char_indices().peekable(),
        };
        let mut tokens = Vec::new();
        loop {
            let token = tokenizer.next_token()?;
            let done = matches!(token.kind, TokenKind::Eof);
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, EvalError> {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
        let pos = self.current_pos();
        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some('+') => self.single(TokenKind::Plus),
            Some('-') => self.single(TokenKind::Minus),
            Some('*') => self.single(TokenKind::Star),
            Some('/') => self.single(TokenKind::Slash),
            Some('(') => self.single(TokenKind::LParen),
            Some(')') => self.single(TokenKind::RParen),
            Some(',') => self.single(TokenKind::Comma),
            Some(c) if c.is_ascii_digit() || c == '.' => self.read_number(pos)?,
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.read_ident(pos),
            Some(c) => {
                return Err(EvalError::Syntax(format!(
                    "unexpected character `{c}` at offset {pos}"
                )));
            }
        };
        Ok(Token { kind, pos })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// Integer or decimal literal, with optional exponent. The `e` is only
    /// consumed as an exponent marker when digits actually follow, so `2e`
    /// lexes as the number `2` and the identifier `e`.
    fn read_number(&mut self, start: usize) -> Result<TokenKind, EvalError> {
        while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek_char() == Some('.') {
            self.advance();
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.peek_char(), Some('e' | 'E')) && self.exponent_follows() {
            self.advance();
            if matches!(self.peek_char(), Some('+' | '-')) {
                self.advance();
            }
            while matches!(self.peek_char(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let end = self.current_pos();
        let text = &self.input[start..end];
        let value: f64 = text
            .parse()
            .map_err(|_| EvalError::Syntax(format!("invalid number `{text}` at offset {start}")))?;
        Ok(TokenKind::Number(value))
    }

    fn exponent_follows(&self) -> bool {
        let mut lookahead = self.chars.clone();
        lookahead.next();
        match lookahead.next() {
            Some((_, c)) if c.is_ascii_digit() => true,
            Some((_, '+' | '-')) => lookahead.next().is_some_and(|(_, c)| c.is_ascii_digit()),
            _ => false,
        }
    }

    fn read_ident(&mut self, start: usize) -> TokenKind {
        while matches!(self.peek_char(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let end = self.current_pos();
        TokenKind::Ident(self.input[start..end].to_string())
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn advance(&mut self) {
        self.chars.next();
    }

    fn current_pos(&mut self) -> usize {
        self.chars
            .peek()
            .map_or(self.input.len(), |&(pos, _)| pos)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

/// The closed function table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Func {
    Sqrt,
    Abs,
    Round,
    Floor,
    Ceil,
    Sin,
    Cos,
    Tan,
    Log,
    Exp,
    Pow,
}

impl Func {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqrt" => Some(Func::Sqrt),
            "abs" => Some(Func::Abs),
            "round" => Some(Func::Round),
            "floor" => Some(Func::Floor),
            "ceil" => Some(Func::Ceil),
            "sin" => Some(Func::Sin),
            "cos" => Some(Func::Cos),
            "tan" => Some(Func::Tan),
            "log" => Some(Func::Log),
            "exp" => Some(Func::Exp),
            "pow" => Some(Func::Pow),
            _ => None,
        }
    }

    fn arity(self) -> usize {
        match self {
            Func::Pow => 2,
            _ => 1,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Func::Sqrt => "sqrt",
            Func::Abs => "abs",
            Func::Round => "round",
            Func::Floor => "floor",
            Func::Ceil => "ceil",
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Tan => "tan",
            Func::Log => "log",
            Func::Exp => "exp",
            Func::Pow => "pow",
        }
    }
}

/// Named constants, matched case-insensitively like the function table.
fn constant(name: &str) -> Option<f64> {
    match name.to_ascii_lowercase().as_str() {
        "pi" => Some(std::f64::consts::PI),
        "e" => Some(std::f64::consts::E),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Number(f64),
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Func,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Infallible over f64: division by zero and domain errors surface as
    /// infinities or NaN, which the caller screens out.
    fn eval(&self) -> f64 {
        match self {
            Expr::Number(value) => *value,
            Expr::Neg(inner) => -inner.eval(),
            Expr::Binary { op, lhs, rhs } => {
                let (lhs, rhs) = (lhs.eval(), rhs.eval());
                match op {
                    BinOp::Add => lhs + rhs,
                    BinOp::Sub => lhs - rhs,
                    BinOp::Mul => lhs * rhs,
                    BinOp::Div => lhs / rhs,
                }
            }
            Expr::Call { func, args } => {
                let x = args[0].eval();
                match func {
                    Func::Sqrt => x.sqrt(),
                    Func::Abs => x.abs(),
                    Func::Round => x.round(),
                    Func::Floor => x.floor(),
                    Func::Ceil => x.ceil(),
                    Func::Sin => x.sin(),
                    Func::Cos => x.cos(),
                    Func::Tan => x.tan(),
                    Func::Log => x.ln(),
                    Func::Exp => x.exp(),
                    Func::Pow => x.powf(args[1].eval()),
                }
            }
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if !matches!(token.kind, TokenKind::Eof) {
            self.pos += 1;
        }
        token
    }

    fn expect_rparen(&mut self) -> Result<(), EvalError> {
        let token = self.bump();
        if matches!(token.kind, TokenKind::RParen) {
            Ok(())
        } else {
            Err(unexpected(&token, "`)`"))
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_term()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            self.bump();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        match self.peek().kind {
            TokenKind::Minus => {
                self.bump();
                Ok(Expr::Neg(Box::new(self.parse_unary()?)))
            }
            TokenKind::Plus => {
                self.bump();
                self.parse_unary()
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        let token = self.bump();
        match token.kind {
            TokenKind::Number(value) => Ok(Expr::Number(value)),
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek().kind, TokenKind::LParen) {
                    self.parse_call(&name)
                } else {
                    constant(&name)
                        .map(Expr::Number)
                        .ok_or(EvalError::UnknownIdentifier(name))
                }
            }
            _ => Err(unexpected(&token, "a number, identifier, or `(`")),
        }
    }

    fn parse_call(&mut self, name: &str) -> Result<Expr, EvalError> {
        let func =
            Func::from_name(name).ok_or_else(|| EvalError::UnknownIdentifier(name.to_string()))?;
        self.bump();
        let mut args = vec![self.parse_expr()?];
        while matches!(self.peek().kind, TokenKind::Comma) {
            self.bump();
            args.push(self.parse_expr()?);
        }
        self.expect_rparen()?;
        if args.len() != func.arity() {
            return Err(EvalError::Syntax(format!(
                "{} takes {} argument(s), got {}",
                func.name(),
                func.arity(),
                args.len()
            )));
        }
        Ok(Expr::Call { func, args })
    }
}

fn unexpected(token: &Token, wanted: &str) -> EvalError {
    EvalError::Syntax(format!(
        "expected {wanted}, found `{}` at offset {}",
        token.kind, token.pos
    ))
}

/// Parse and evaluate `input` to a raw f64.
pub(super) fn evaluate_expression(input: &str) -> Result<f64, EvalError> {
    let tokens = Tokenizer::tokenize(input)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_expr()?;
    let trailing = parser.bump();
    if !matches!(trailing.kind, TokenKind::Eof) {
        return Err(unexpected(&trailing, "end of input"));
    }
    Ok(expr.eval())
}

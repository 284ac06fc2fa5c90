// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Expression trees, and a small infix parser that produces them.
//!
//! The parser knows nothing about the catalog.  It turns `2z^3 - sin(z)`
//! into calls named after catalog entries (`add`, `multiply`, `pow`,
//! ...), and leaves it to the compiler to decide whether those names,
//! and the symbols in the tree, mean anything.

use std::fmt;

use crate::error::CompileError;

/// A parsed expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A variable or a named constant.
    Symbol(String),
    /// A real literal.
    Constant(f64),
    /// An operator or function application.
    Call {
        /// Catalog name of the operation.
        op: String,
        /// Operands, in order.
        args: Vec<Node>,
    },
    /// A parenthesised subexpression.
    Group(Box<Node>),
}

impl Node {
    /// Shorthand for a symbol.
    pub fn symbol(name: &str) -> Node {
        Node::Symbol(name.to_string())
    }

    /// Shorthand for a call.
    pub fn call(op: &str, args: Vec<Node>) -> Node {
        Node::Call {
            op: op.to_string(),
            args,
        }
    }

    /// Parses infix text.
    pub fn parse(source: &str) -> Result<Node, CompileError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let node = parser.expression()?;
        match parser.peek() {
            (Token::End, _) => Ok(node),
            (_, at) => Err(parse_error(at, "unexpected trailing input")),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Node::Symbol(name) => write!(f, "{}", name),
            Node::Constant(v) => write!(f, "{}", v),
            Node::Group(inner) => write!(f, "({})", inner),
            Node::Call { op, args } => {
                write!(f, "{}(", op)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    Open,
    Close,
    Comma,
    End,
}

fn parse_error(position: usize, message: &str) -> CompileError {
    CompileError::Parse {
        position,
        message: message.to_string(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, CompileError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = vec![];
    let mut i = 0;
    while i < chars.len() {
        let (at, ch) = chars[i];
        if ch.is_whitespace() {
            i += 1;
            continue;
        }
        if ch.is_ascii_digit() || ch == '.' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_ascii_digit() || chars[i].1 == '.') {
                i += 1;
            }
            // An exponent only counts when digits follow; otherwise `2e`
            // is two times Euler's number.
            if i < chars.len() && (chars[i].1 == 'e' || chars[i].1 == 'E') {
                let mut j = i + 1;
                if j < chars.len() && (chars[j].1 == '+' || chars[j].1 == '-') {
                    j += 1;
                }
                if j < chars.len() && chars[j].1.is_ascii_digit() {
                    i = j;
                    while i < chars.len() && chars[i].1.is_ascii_digit() {
                        i += 1;
                    }
                }
            }
            let end = if i < chars.len() { chars[i].0 } else { source.len() };
            let text = &source[chars[start].0..end];
            let value = text
                .parse::<f64>()
                .map_err(|_| parse_error(at, "malformed number"))?;
            if !value.is_finite() {
                return Err(parse_error(at, "number out of range"));
            }
            tokens.push((Token::Number(value), at));
            continue;
        }
        if ch.is_alphabetic() || ch == '_' {
            let start = i;
            while i < chars.len() && (chars[i].1.is_alphanumeric() || chars[i].1 == '_') {
                i += 1;
            }
            let end = if i < chars.len() { chars[i].0 } else { source.len() };
            tokens.push((Token::Ident(source[chars[start].0..end].to_string()), at));
            continue;
        }
        let token = match ch {
            '+' | '-' | '*' | '/' | '^' => Token::Op(ch),
            '(' => Token::Open,
            ')' => Token::Close,
            ',' => Token::Comma,
            _ => return Err(parse_error(at, &format!("unexpected character '{}'", ch))),
        };
        tokens.push((token, at));
        i += 1;
    }
    tokens.push((Token::End, source.len()));
    Ok(tokens)
}

/// Deepest tree the parser will build.  Later passes walk the tree
/// recursively.
const MAX_NESTING: usize = 256;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> (Token, usize) {
        self.tokens[self.pos].clone()
    }

    fn bump(&mut self) -> (Token, usize) {
        let t = self.peek();
        if t.0 != Token::End {
            self.pos += 1;
        }
        t
    }

    fn descend(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(parse_error(self.peek().1, "expression nested too deeply"));
        }
        Ok(())
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<Node, CompileError> {
        let outer = self.depth;
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek().0 {
                Token::Op('+') => "add",
                Token::Op('-') => "subtract",
                _ => {
                    self.depth = outer;
                    return Ok(lhs);
                }
            };
            self.bump();
            self.descend()?;
            let rhs = self.term()?;
            lhs = Node::call(op, vec![lhs, rhs]);
        }
    }

    // term := unary (('*' | '/')? unary)*
    fn term(&mut self) -> Result<Node, CompileError> {
        let outer = self.depth;
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek().0 {
                Token::Op('*') => {
                    self.bump();
                    "multiply"
                }
                Token::Op('/') => {
                    self.bump();
                    "divide"
                }
                Token::Number(_) | Token::Ident(_) | Token::Open => "multiply",
                _ => {
                    self.depth = outer;
                    return Ok(lhs);
                }
            };
            self.descend()?;
            let rhs = self.unary()?;
            lhs = Node::call(op, vec![lhs, rhs]);
        }
    }

    // unary := ('-' | '+') unary | power
    //
    // Every recursive path through the grammar passes here, so this is
    // where nesting is counted.
    fn unary(&mut self) -> Result<Node, CompileError> {
        self.descend()?;
        let node = match self.peek().0 {
            Token::Op('-') => {
                self.bump();
                Node::call("negate", vec![self.unary()?])
            }
            Token::Op('+') => {
                self.bump();
                self.unary()?
            }
            _ => self.power()?,
        };
        self.depth -= 1;
        Ok(node)
    }

    // power := primary ('^' unary)?
    fn power(&mut self) -> Result<Node, CompileError> {
        let base = self.primary()?;
        if let Token::Op('^') = self.peek().0 {
            self.bump();
            let exponent = self.unary()?;
            return Ok(Node::call("pow", vec![base, exponent]));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Node, CompileError> {
        match self.bump() {
            (Token::Number(v), _) => Ok(Node::Constant(v)),
            (Token::Ident(name), _) => {
                if let Token::Open = self.peek().0 {
                    self.bump();
                    let args = self.arguments()?;
                    Ok(Node::Call { op: name, args })
                } else {
                    Ok(Node::Symbol(name))
                }
            }
            (Token::Open, _) => {
                let inner = self.expression()?;
                match self.bump() {
                    (Token::Close, _) => Ok(Node::Group(Box::new(inner))),
                    (_, at) => Err(parse_error(at, "expected ')'")),
                }
            }
            (Token::End, at) => Err(parse_error(at, "unexpected end of expression")),
            (_, at) => Err(parse_error(at, "expected a number, name or '('")),
        }
    }

    fn arguments(&mut self) -> Result<Vec<Node>, CompileError> {
        let mut args = vec![];
        if let Token::Close = self.peek().0 {
            self.bump();
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            match self.bump() {
                (Token::Comma, _) => continue,
                (Token::Close, _) => return Ok(args),
                (_, at) => return Err(parse_error(at, "expected ',' or ')'")),
            }
        }
    }
}

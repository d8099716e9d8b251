//! Parser for the Go-style type expressions used in type universe documents.
//!
//! ```text
//! type   = "*" type | "[" [digits] "]" type | "map" "[" type "]" type
//!        | "func" params [result] | ident ["." ident]
//! ```
//!
//! `interface{...}`, `struct{...}`, `chan` types, `error` and `any` parse to
//! [`TypeShape::Unsupported`] so lowering can fall back on them.

use crate::error::TypeExprError;
use crate::types::{ScalarKind, TypeName, TypeShape};

/// Parse a type expression.
///
/// # Errors
///
/// Returns `TypeExprError` on malformed input or trailing text.
pub fn parse_type_expr(expr: &str) -> Result<TypeShape, TypeExprError> {
    let mut parser = Parser { src: expr, pos: 0 };
    let shape = parser.parse_type()?;
    parser.skip_ws();
    if parser.pos != expr.len() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(shape)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.src.len() - trimmed.len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    /// Eat `word` only when it is not the prefix of a longer identifier.
    fn eat_keyword(&mut self, word: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        let boundary = rest[word.len()..]
            .chars()
            .next()
            .map_or(true, |c| !is_ident_char(c));
        if boundary {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &str) -> Result<(), TypeExprError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(&format!("expected `{}`", token)))
        }
    }

    fn error(&self, message: &str) -> TypeExprError {
        TypeExprError {
            expr: self.src.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn parse_type(&mut self) -> Result<TypeShape, TypeExprError> {
        self.skip_ws();
        let start = self.pos;

        if self.eat("*") {
            return Ok(self.parse_type()?.pointer());
        }
        if self.eat("<-") {
            self.eat_keyword("chan");
            self.parse_type()?;
            return Ok(self.unsupported_from(start));
        }
        if self.eat("[") {
            self.skip_ws();
            let digits = self.rest().chars().take_while(char::is_ascii_digit).count();
            self.pos += digits;
            self.expect("]")?;
            return Ok(TypeShape::Sequence(Box::new(self.parse_type()?)));
        }
        if self.eat_keyword("map") {
            self.expect("[")?;
            let key = self.parse_type()?;
            self.expect("]")?;
            let value = self.parse_type()?;
            return Ok(TypeShape::Mapping(Box::new(key), Box::new(value)));
        }
        if self.eat_keyword("func") {
            self.skip_balanced('(', ')')?;
            self.skip_ws();
            match self.peek() {
                Some('(') => self.skip_balanced('(', ')')?,
                Some(c) if is_type_start(c) => {
                    self.parse_type()?;
                }
                _ => {}
            }
            return Ok(TypeShape::Callable);
        }
        if self.eat_keyword("chan") {
            self.eat("<-");
            self.parse_type()?;
            return Ok(self.unsupported_from(start));
        }
        if self.eat_keyword("interface") || self.eat_keyword("struct") {
            self.skip_balanced('{', '}')?;
            return Ok(self.unsupported_from(start));
        }

        let ident = self.parse_ident()?;
        if self.rest().starts_with('.') {
            self.pos += 1;
            let name = self.parse_ident()?;
            return Ok(TypeShape::Named(TypeName::new(&format!("{}.{}", ident, name))));
        }

        match ident {
            "error" | "any" => Ok(TypeShape::Unsupported(ident.to_string())),
            _ => Ok(ScalarKind::parse(ident)
                .map(TypeShape::Scalar)
                .unwrap_or_else(|| TypeShape::Named(TypeName::new(ident)))),
        }
    }

    fn parse_ident(&mut self) -> Result<&'a str, TypeExprError> {
        self.skip_ws();
        let rest = self.rest();
        match rest.chars().next() {
            Some(c) if c.is_alphabetic() || c == '_' => {}
            _ => return Err(self.error("expected a type")),
        }
        let len = rest
            .char_indices()
            .find(|(_, c)| !is_ident_char(*c))
            .map_or(rest.len(), |(i, _)| i);
        self.pos += len;
        Ok(&rest[..len])
    }

    fn skip_balanced(&mut self, open: char, close: char) -> Result<(), TypeExprError> {
        self.skip_ws();
        if self.peek() != Some(open) {
            return Err(self.error(&format!("expected `{}`", open)));
        }
        let mut depth = 0usize;
        for (i, c) in self.rest().char_indices() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    self.pos += i + c.len_utf8();
                    return Ok(());
                }
            }
        }
        self.pos = self.src.len();
        Err(self.error(&format!("unbalanced `{}`", open)))
    }

    fn unsupported_from(&self, start: usize) -> TypeShape {
        TypeShape::Unsupported(self.src[start..self.pos].trim().to_string())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_type_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '*' || c == '['
}

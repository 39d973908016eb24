//! Parser for the compact textual type form produced by `Display`.
//!
//! ```text
//! type    := base '*'*
//! base    := '<' [element (',' element)*] '>' | dtype ['[' [dim (',' dim)*] ']']
//! element := [ident '='] type
//! dim     := digits | '?'
//! ```

use std::str::FromStr;

use super::Type;
use crate::error::{Error, Result};
use crate::tensor::{DType, Dimension, Shape};

impl FromStr for Type {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self> {
        let mut parser = Parser::new(src);
        let ty = parser.parse_type()?;
        parser.skip_ws();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn skip_ws(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.source.len() - trimmed.len();
    }

    fn eat(&mut self, expected: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: &str) -> Error {
        Error::type_mismatch(format!(
            "cannot parse type `{}` at offset {}: {msg}",
            self.source, self.pos
        ))
    }

    fn ident(&mut self) -> Option<&'a str> {
        self.skip_ws();
        let rest = self.rest();
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, ch)) if ch.is_ascii_alphabetic() || ch == '_' => {}
            _ => return None,
        }
        let end = chars
            .find(|(_, ch)| !(ch.is_ascii_alphanumeric() || *ch == '_'))
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        self.pos += end;
        Some(&rest[..end])
    }

    fn parse_type(&mut self) -> Result<Type> {
        let mut ty = if self.eat('<') {
            self.parse_tuple()?
        } else {
            self.parse_tensor()?
        };
        while self.eat('*') {
            ty = Type::sequence(ty);
        }
        Ok(ty)
    }

    fn parse_tuple(&mut self) -> Result<Type> {
        let mut elements = Vec::new();
        if self.eat('>') {
            return Type::named_tuple(elements);
        }
        loop {
            elements.push(self.parse_element()?);
            if self.eat(',') {
                continue;
            }
            if self.eat('>') {
                break;
            }
            return Err(self.error("expected `,` or `>`"));
        }
        Type::named_tuple(elements)
    }

    fn parse_element(&mut self) -> Result<(Option<String>, Type)> {
        let start = self.pos;
        if let Some(name) = self.ident() {
            if self.eat('=') {
                return Ok((Some(name.to_string()), self.parse_type()?));
            }
        }
        self.pos = start;
        Ok((None, self.parse_type()?))
    }

    fn parse_tensor(&mut self) -> Result<Type> {
        let name = self
            .ident()
            .ok_or_else(|| self.error("expected a dtype or `<`"))?;
        let dtype = DType::from_name(name)
            .ok_or_else(|| self.error(&format!("`{name}` is not a recognized dtype")))?;
        let mut dims = Vec::new();
        if self.eat('[') {
            if !self.eat(']') {
                loop {
                    dims.push(self.parse_dim()?);
                    if self.eat(',') {
                        continue;
                    }
                    if self.eat(']') {
                        break;
                    }
                    return Err(self.error("expected `,` or `]`"));
                }
            }
        }
        Ok(Type::tensor(dtype, Shape::new(dims)))
    }

    fn parse_dim(&mut self) -> Result<Dimension> {
        if self.eat('?') {
            return Ok(Dimension::Dynamic);
        }
        self.skip_ws();
        let rest = self.rest();
        let end = rest
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(self.error("expected a dimension"));
        }
        let value = rest[..end]
            .parse::<usize>()
            .map_err(|_| self.error("dimension out of range"))?;
        self.pos += end;
        Ok(Dimension::Static(value))
    }
}

//! Extended-JSON — standard JSON plus elision markers, and its parser.
//!
//! The udiff body, split into its two channels, is written in a superset of
//! JSON where the bare token `...` stands for omitted content:
//!
//! - as an object entry, `...` means "one or more omitted properties"
//!   (recovered later by set difference against a reference value);
//! - as an array element, `...` or `...(N)` means "N omitted elements"
//!   (default 1; the count is needed to keep later indices aligned).
//!
//! Parsing produces a [`SparseValue`], which mirrors the concrete value tree
//! but can carry elisions. The canonical value type structurally cannot hold
//! a placeholder, so elisions never leak past reconciliation.
//!
//! The parser is a hand-written recursive descent over bytes with strict
//! JSON lexical rules (no trailing commas, no comments, `\uXXXX` escapes
//! with surrogate pairs). Errors carry the byte offset where parsing
//! stopped.

use crate::error::{DeltaError, Result};
use serde_json::{Map, Number, Value};

/// A JSON value that may contain elided regions.
#[derive(Debug, Clone, PartialEq)]
pub enum SparseValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// Array slots in order: concrete elements interleaved with elisions.
    Array(Vec<SparseSlot>),
    Object(SparseObject),
}

/// One element position in a sparse array.
#[derive(Debug, Clone, PartialEq)]
pub enum SparseSlot {
    Value(SparseValue),
    /// `...(N)` — N omitted elements.
    Elision(usize),
}

/// The entries of a sparse object, plus whether a `...` marker stood in for
/// an unknown set of additional properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseObject {
    pub entries: Vec<(String, SparseValue)>,
    pub elided: bool,
}

impl SparseValue {
    /// Convert to a concrete value. `None` if any elision remains.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            SparseValue::Null => Some(Value::Null),
            SparseValue::Bool(b) => Some(Value::Bool(*b)),
            SparseValue::Number(n) => Some(Value::Number(n.clone())),
            SparseValue::String(s) => Some(Value::String(s.clone())),
            SparseValue::Array(slots) => {
                let mut items = Vec::with_capacity(slots.len());
                for slot in slots {
                    match slot {
                        SparseSlot::Value(value) => items.push(value.to_value()?),
                        SparseSlot::Elision(_) => return None,
                    }
                }
                Some(Value::Array(items))
            }
            SparseValue::Object(object) => {
                if object.elided {
                    return None;
                }
                let mut map = Map::new();
                for (key, value) in &object.entries {
                    map.insert(key.clone(), value.to_value()?);
                }
                Some(Value::Object(map))
            }
        }
    }

    /// True if no elision appears anywhere in the tree.
    pub fn is_concrete(&self) -> bool {
        match self {
            SparseValue::Null
            | SparseValue::Bool(_)
            | SparseValue::Number(_)
            | SparseValue::String(_) => true,
            SparseValue::Array(slots) => slots
                .iter()
                .all(|slot| matches!(slot, SparseSlot::Value(value) if value.is_concrete())),
            SparseValue::Object(object) => {
                !object.elided && object.entries.iter().all(|(_, value)| value.is_concrete())
            }
        }
    }
}

/// Parse extended-JSON text into a sparse value tree.
pub fn parse(text: &str) -> Result<SparseValue> {
    let mut parser = Parser {
        bytes: text.as_bytes(),
        pos: 0,
    };
    parser.skip_ws();
    let value = parser.parse_value()?;
    parser.skip_ws();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("trailing characters after value"));
    }
    Ok(value)
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> DeltaError {
        DeltaError::Parse {
            position: self.pos,
            message: message.to_owned(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek();
        if byte.is_some() {
            self.pos += 1;
        }
        byte
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, byte: u8) -> Result<()> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", byte as char)))
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if self.bytes[self.pos..].starts_with(word.as_bytes()) {
            self.pos += word.len();
            true
        } else {
            false
        }
    }

    fn parse_value(&mut self) -> Result<SparseValue> {
        match self.peek() {
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => Ok(SparseValue::String(self.parse_string()?)),
            Some(b't') if self.eat_keyword("true") => Ok(SparseValue::Bool(true)),
            Some(b'f') if self.eat_keyword("false") => Ok(SparseValue::Bool(false)),
            Some(b'n') if self.eat_keyword("null") => Ok(SparseValue::Null),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            _ => Err(self.error("expected a JSON value")),
        }
    }

    fn parse_object(&mut self) -> Result<SparseValue> {
        self.expect(b'{')?;
        let mut object = SparseObject::default();
        self.skip_ws();
        if self.eat(b'}') {
            return Ok(SparseValue::Object(object));
        }
        loop {
            self.skip_ws();
            if self.peek() == Some(b'.') {
                // Object elisions carry no count; the omitted key set is
                // recovered by set difference during reconciliation.
                self.parse_dots()?;
                object.elided = true;
            } else {
                let key = self.parse_string()?;
                self.skip_ws();
                self.expect(b':')?;
                self.skip_ws();
                let value = self.parse_value()?;
                object.entries.push((key, value));
            }
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            self.expect(b'}')?;
            return Ok(SparseValue::Object(object));
        }
    }

    fn parse_array(&mut self) -> Result<SparseValue> {
        self.expect(b'[')?;
        let mut slots = Vec::new();
        self.skip_ws();
        if self.eat(b']') {
            return Ok(SparseValue::Array(slots));
        }
        loop {
            self.skip_ws();
            if self.peek() == Some(b'.') {
                let count = self.parse_array_elision()?;
                slots.push(SparseSlot::Elision(count));
            } else {
                slots.push(SparseSlot::Value(self.parse_value()?));
            }
            self.skip_ws();
            if self.eat(b',') {
                continue;
            }
            self.expect(b']')?;
            return Ok(SparseValue::Array(slots));
        }
    }

    fn parse_dots(&mut self) -> Result<()> {
        if self.eat_keyword("...") {
            Ok(())
        } else {
            Err(self.error("expected '...'"))
        }
    }

    /// `...` or `...(N)`; the count defaults to 1.
    fn parse_array_elision(&mut self) -> Result<usize> {
        self.parse_dots()?;
        if !self.eat(b'(') {
            return Ok(1);
        }
        let start = self.pos;
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("expected a count after '...('"));
        }
        let digits = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8"))?;
        let count: usize = digits
            .parse()
            .map_err(|_| self.error("elision count out of range"))?;
        self.expect(b')')?;
        Ok(count)
    }

    fn parse_string(&mut self) -> Result<String> {
        self.expect(b'"')?;
        let mut out = String::new();
        loop {
            let start = self.pos;
            while let Some(byte) = self.peek() {
                if byte == b'"' || byte == b'\\' || byte < 0x20 {
                    break;
                }
                self.pos += 1;
            }
            // The run boundaries are ASCII, so the slice stays on char
            // boundaries of the original UTF-8 input.
            out.push_str(
                std::str::from_utf8(&self.bytes[start..self.pos])
                    .map_err(|_| self.error("invalid UTF-8 in string"))?,
            );
            match self.bump() {
                Some(b'"') => return Ok(out),
                Some(b'\\') => match self.bump() {
                    Some(b'"') => out.push('"'),
                    Some(b'\\') => out.push('\\'),
                    Some(b'/') => out.push('/'),
                    Some(b'b') => out.push('\u{8}'),
                    Some(b'f') => out.push('\u{c}'),
                    Some(b'n') => out.push('\n'),
                    Some(b'r') => out.push('\r'),
                    Some(b't') => out.push('\t'),
                    Some(b'u') => out.push(self.parse_unicode_escape()?),
                    _ => return Err(self.error("invalid escape sequence")),
                },
                Some(_) => return Err(self.error("control character in string")),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn parse_unicode_escape(&mut self) -> Result<char> {
        let high = self.parse_hex4()?;
        if (0xD800..0xDC00).contains(&high) {
            if !(self.eat(b'\\') && self.eat(b'u')) {
                return Err(self.error("unpaired surrogate escape"));
            }
            let low = self.parse_hex4()?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error("invalid low surrogate"));
            }
            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
            char::from_u32(code).ok_or_else(|| self.error("invalid unicode escape"))
        } else {
            char::from_u32(high).ok_or_else(|| self.error("unpaired surrogate escape"))
        }
    }

    fn parse_hex4(&mut self) -> Result<u32> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = match self.bump() {
                Some(byte @ b'0'..=b'9') => u32::from(byte - b'0'),
                Some(byte @ b'a'..=b'f') => u32::from(byte - b'a') + 10,
                Some(byte @ b'A'..=b'F') => u32::from(byte - b'A') + 10,
                _ => return Err(self.error("invalid \\u escape")),
            };
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn parse_number(&mut self) -> Result<SparseValue> {
        let start = self.pos;
        self.eat(b'-');
        match self.bump() {
            Some(b'0') => {}
            Some(b'1'..=b'9') => {
                while matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.pos += 1;
                }
            }
            _ => return Err(self.error("malformed number")),
        }
        let mut is_float = false;
        if self.peek() == Some(b'.') {
            is_float = true;
            self.pos += 1;
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("malformed number"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            is_float = true;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(self.error("malformed number"));
            }
            while matches!(self.peek(), Some(b'0'..=b'9')) {
                self.pos += 1;
            }
        }

        let text = std::str::from_utf8(&self.bytes[start..self.pos])
            .map_err(|_| self.error("invalid UTF-8"))?;
        let number = if is_float {
            let parsed: f64 = text.parse().map_err(|_| self.error("malformed number"))?;
            Number::from_f64(parsed).ok_or_else(|| self.error("number out of range"))?
        } else if let Ok(n) = text.parse::<i64>() {
            Number::from(n)
        } else if let Ok(n) = text.parse::<u64>() {
            Number::from(n)
        } else {
            // Integer magnitude beyond u64: degrade to f64, the same way the
            // standard parser does without arbitrary-precision support.
            let parsed: f64 = text.parse().map_err(|_| self.error("malformed number"))?;
            Number::from_f64(parsed).ok_or_else(|| self.error("number out of range"))?
        };
        Ok(SparseValue::Number(number))
    }
}

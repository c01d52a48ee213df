//! Recursive-descent parser for possibly-truncated JSON
//!
//! Every `parse_*` function reports whether its value closed normally or ran
//! into the end of input. Once input runs out nothing further is read, so a
//! truncation travels straight back up the call stack, and each container
//! keeps whatever it had fully (or usefully partially) parsed by then.
//!
//! A nested container cut off inside its first member still yields the empty
//! container, so a key never disappears once its value has been opened. Only
//! the outermost value reports "nothing yet".

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PartialJsonError {
    #[error("empty input")]
    Empty,

    #[error("input ends before any value is available")]
    Incomplete,

    #[error("unexpected character '{found}' at position {pos}")]
    Unexpected { pos: usize, found: char },

    #[error("unexpected trailing characters at position {pos}")]
    TrailingCharacters { pos: usize },

    #[error("nesting too deep at position {pos}")]
    DepthLimit { pos: usize },
}

/// Deepest container nesting accepted, matching `serde_json`
pub const MAX_DEPTH: usize = 128;

type ParseResult = Result<Fragment, PartialJsonError>;

/// Outcome of parsing one value
#[derive(Debug, PartialEq)]
enum Fragment {
    /// The value closed normally
    Complete(Value),
    /// Input ended inside the value; carries the best-effort value, if any
    Truncated(Option<Value>),
}

/// Parse `input`, returning the largest structurally valid value it describes
pub fn parse(input: &str) -> Result<Value, PartialJsonError> {
    let mut parser = Parser::new(input);
    parser.skip_whitespace();
    if parser.at_end() {
        return Err(PartialJsonError::Empty);
    }

    match parser.parse_value()? {
        Fragment::Complete(value) => {
            parser.skip_whitespace();
            if parser.at_end() {
                Ok(value)
            } else {
                Err(PartialJsonError::TrailingCharacters { pos: parser.pos })
            }
        }
        Fragment::Truncated(Some(value)) => Ok(value),
        Fragment::Truncated(None) => Err(PartialJsonError::Incomplete),
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
    /// Containers currently open
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0, depth: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn unexpected(&self) -> PartialJsonError {
        PartialJsonError::Unexpected {
            pos: self.pos,
            found: self.peek().unwrap_or('\0'),
        }
    }

    fn parse_value(&mut self) -> ParseResult {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(Fragment::Truncated(None)),
            Some('{') => self.nested(Self::parse_object),
            Some('[') => self.nested(Self::parse_array),
            Some('"') => self.parse_string(),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number(),
            Some('t') => self.parse_literal("true", Value::Bool(true)),
            Some('f') => self.parse_literal("false", Value::Bool(false)),
            Some('n') => self.parse_literal("null", Value::Null),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> ParseResult) -> ParseResult {
        if self.depth >= MAX_DEPTH {
            return Err(PartialJsonError::DepthLimit { pos: self.pos });
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn parse_object(&mut self) -> ParseResult {
        self.pos += 1;
        let mut map = Map::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Fragment::Truncated(Some(Value::Object(map)))),
                Some('}') => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Object(map)));
                }
                Some('"') => {}
                Some(_) => return Err(self.unexpected()),
            }

            // A key is only usable once its closing quote has arrived
            let key = match self.parse_string()? {
                Fragment::Complete(Value::String(key)) => key,
                _ => return Ok(self.truncated_object(map)),
            };

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(self.truncated_object(map)),
                Some(':') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }

            match self.parse_value()? {
                Fragment::Complete(value) => {
                    map.insert(key, value);
                }
                Fragment::Truncated(Some(value)) => {
                    map.insert(key, value);
                    return Ok(Fragment::Truncated(Some(Value::Object(map))));
                }
                Fragment::Truncated(None) => return Ok(self.truncated_object(map)),
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Fragment::Truncated(Some(Value::Object(map)))),
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Object(map)));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_array(&mut self) -> ParseResult {
        self.pos += 1;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Fragment::Truncated(Some(Value::Array(items)))),
                Some(']') => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Array(items)));
                }
                Some(_) => {}
            }

            match self.parse_value()? {
                Fragment::Complete(value) => items.push(value),
                Fragment::Truncated(Some(value)) => {
                    items.push(value);
                    return Ok(Fragment::Truncated(Some(Value::Array(items))));
                }
                Fragment::Truncated(None) => return Ok(self.truncated_array(items)),
            }

            self.skip_whitespace();
            match self.peek() {
                None => return Ok(Fragment::Truncated(Some(Value::Array(items)))),
                Some(',') => self.pos += 1,
                Some(']') => {
                    self.pos += 1;
                    return Ok(Fragment::Complete(Value::Array(items)));
                }
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn parse_string(&mut self) -> ParseResult {
        self.pos += 1;
        let mut out = String::new();

        loop {
            let Some(c) = self.bump() else {
                return Ok(Fragment::Truncated(Some(Value::String(out))));
            };
            match c {
                '"' => return Ok(Fragment::Complete(Value::String(out))),
                '\\' => {
                    let escape_pos = self.pos;
                    let Some(escaped) = self.bump() else {
                        return Ok(Fragment::Truncated(Some(Value::String(out))));
                    };
                    match escaped {
                        '"' => out.push('"'),
                        '\\' => out.push('\\'),
                        '/' => out.push('/'),
                        'b' => out.push('\u{0008}'),
                        'f' => out.push('\u{000C}'),
                        'n' => out.push('\n'),
                        'r' => out.push('\r'),
                        't' => out.push('\t'),
                        'u' => match self.parse_unicode_escape()? {
                            Some(decoded) => out.push(decoded),
                            None => return Ok(Fragment::Truncated(Some(Value::String(out)))),
                        },
                        other => {
                            return Err(PartialJsonError::Unexpected {
                                pos: escape_pos,
                                found: other,
                            })
                        }
                    }
                }
                other => out.push(other),
            }
        }
    }

    /// Decode the hex part of a `\u` escape. `None` means input ended mid-escape.
    fn parse_unicode_escape(&mut self) -> Result<Option<char>, PartialJsonError> {
        let Some(high) = self.read_hex4()? else {
            return Ok(None);
        };

        if !(0xD800..0xDC00).contains(&high) {
            return Ok(Some(char::from_u32(high).unwrap_or(char::REPLACEMENT_CHARACTER)));
        }

        // High surrogate: the low half must follow as another \u escape
        let rest = &self.src[self.pos..];
        if rest.is_empty() || "\\u".starts_with(rest) {
            self.pos = self.src.len();
            return Ok(None);
        }
        if !rest.starts_with("\\u") {
            return Ok(Some(char::REPLACEMENT_CHARACTER));
        }
        self.pos += 2;
        let Some(low) = self.read_hex4()? else {
            return Ok(None);
        };
        if !(0xDC00..0xE000).contains(&low) {
            return Ok(Some(char::REPLACEMENT_CHARACTER));
        }
        let combined = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
        Ok(Some(char::from_u32(combined).unwrap_or(char::REPLACEMENT_CHARACTER)))
    }

    fn read_hex4(&mut self) -> Result<Option<u32>, PartialJsonError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let Some(c) = self.peek() else {
                return Ok(None);
            };
            let digit = c.to_digit(16).ok_or_else(|| self.unexpected())?;
            code = code * 16 + digit;
            self.pos += 1;
        }
        Ok(Some(code))
    }

    fn parse_number(&mut self) -> ParseResult {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = &self.src[start..self.pos];

        if self.at_end() {
            // More digits may still be coming; keep the longest numeric prefix
            let trimmed = text.trim_end_matches(['.', 'e', 'E', '+', '-']);
            return Ok(Fragment::Truncated(number_value(trimmed)));
        }

        number_value(text)
            .map(Fragment::Complete)
            .ok_or(PartialJsonError::Unexpected {
                pos: start,
                found: text.chars().next().unwrap_or('\0'),
            })
    }

    fn parse_literal(&mut self, word: &str, value: Value) -> ParseResult {
        let rest = &self.src[self.pos..];
        if rest.starts_with(word) {
            self.pos += word.len();
            Ok(Fragment::Complete(value))
        } else if word.starts_with(rest) {
            self.pos = self.src.len();
            Ok(Fragment::Truncated(None))
        } else {
            let matched = rest
                .chars()
                .zip(word.chars())
                .take_while(|(a, b)| a == b)
                .count();
            self.pos += matched;
            Err(self.unexpected())
        }
    }

    /// An object cut off inside a member. Empty and outermost means no value yet.
    fn truncated_object(&self, map: Map<String, Value>) -> Fragment {
        if map.is_empty() && self.depth == 1 {
            Fragment::Truncated(None)
        } else {
            Fragment::Truncated(Some(Value::Object(map)))
        }
    }

    fn truncated_array(&self, items: Vec<Value>) -> Fragment {
        if items.is_empty() && self.depth == 1 {
            Fragment::Truncated(None)
        } else {
            Fragment::Truncated(Some(Value::Array(items)))
        }
    }
}

fn number_value(text: &str) -> Option<Value> {
    if text.is_empty() || text == "-" {
        return None;
    }
    if let Ok(n) = text.parse::<i64>() {
        return Some(Value::Number(n.into()));
    }
    if let Ok(n) = text.parse::<u64>() {
        return Some(Value::Number(n.into()));
    }
    // Reject forms Rust accepts but JSON does not
    if text.starts_with('+') || text.starts_with('.') || text.contains("inf") {
        return None;
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

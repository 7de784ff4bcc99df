//! Call expression parsing.
//!
//! Models that cannot emit structured tool-call payloads produce textual
//! call expressions instead, e.g. `get_weather(location="Paris", days=3)`.
//! This module decodes that surface form into a [`ParsedCall`] holding pure
//! data. The grammar admits literals only — strings, numbers, booleans,
//! null, and nested lists and string-keyed maps. A bare identifier in
//! argument position is a syntax error, never a lookup, so no expression a
//! model produces can be evaluated.
//!
//! Errors carry the byte offset where decoding failed, for diagnostics that
//! point into the original expression.

use crate::{Error, Result};
use serde_json::{Map, Number, Value};

/// A decoded call expression: tool name plus raw positional and keyword
/// argument values, exactly as written. No validation happens here; the
/// materializer checks the values against the tool's parameters.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ParsedCall {
    /// The called tool's name
    pub name: String,
    /// Positional argument values, in order
    pub positional: Vec<Value>,
    /// Keyword argument values, in order of appearance
    pub keyword: Map<String, Value>,
}

/// Parse a textual call expression.
///
/// Grammar: `name '(' [arg (',' arg)* [',']] ')'` where
/// `arg := literal | identifier '=' literal`. Positional arguments must all
/// precede keyword arguments; violations fail with
/// [`Error::MixedArgumentOrder`](crate::Error::MixedArgumentOrder).
///
/// ```rust
/// use toolspec::parse_call;
///
/// let call = parse_call(r#"get_weather(location="Paris", days=3)"#).unwrap();
/// assert_eq!(call.name, "get_weather");
/// assert_eq!(call.keyword["days"], 3);
/// ```
pub fn parse_call(input: &str) -> Result<ParsedCall> {
    let mut parser = Parser { src: input, pos: 0 };
    let call = parser.call()?;
    parser.skip_ws();
    if parser.pos < parser.src.len() {
        return Err(Error::syntax(
            parser.pos,
            "unexpected trailing characters after call expression",
        ));
    }
    Ok(call)
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(Error::syntax(
                self.pos,
                format!("expected '{expected}', found '{c}'"),
            )),
            None => Err(Error::syntax(
                self.pos,
                format!("expected '{expected}', found end of input"),
            )),
        }
    }

    fn call(&mut self) -> Result<ParsedCall> {
        self.skip_ws();
        let name = self.identifier("tool name")?;
        self.skip_ws();
        self.expect('(')?;

        let mut positional = Vec::new();
        let mut keyword = Map::new();

        loop {
            self.skip_ws();
            match self.peek() {
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(_) => {}
                None => {
                    return Err(Error::syntax(self.pos, "unclosed argument list"));
                }
            }

            self.argument(&mut positional, &mut keyword)?;

            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                    // Trailing comma before ')' is tolerated.
                }
                Some(')') => {
                    self.bump();
                    break;
                }
                Some(c) => {
                    return Err(Error::syntax(
                        self.pos,
                        format!("expected ',' or ')', found '{c}'"),
                    ));
                }
                None => {
                    return Err(Error::syntax(self.pos, "unclosed argument list"));
                }
            }
        }

        Ok(ParsedCall {
            name,
            positional,
            keyword,
        })
    }

    fn argument(
        &mut self,
        positional: &mut Vec<Value>,
        keyword: &mut Map<String, Value>,
    ) -> Result<()> {
        let start = self.pos;

        // An identifier here is either `name = literal` or a literal keyword
        // (true/false/null and their Python spellings).
        if self.peek().is_some_and(|c| c.is_alphabetic() || c == '_') {
            let ident = self.identifier("argument")?;
            self.skip_ws();
            if self.peek() == Some('=') {
                self.bump();
                self.skip_ws();
                let value = self.literal()?;
                if keyword.contains_key(&ident) {
                    return Err(Error::syntax(
                        start,
                        format!("keyword argument '{ident}' repeated"),
                    ));
                }
                keyword.insert(ident, value);
                return Ok(());
            }
            let value = keyword_literal(&ident).ok_or_else(|| {
                Error::syntax(
                    start,
                    format!("'{ident}' is not a literal; identifiers are not evaluated"),
                )
            })?;
            if !keyword.is_empty() {
                return Err(Error::MixedArgumentOrder { offset: start });
            }
            positional.push(value);
            return Ok(());
        }

        let value = self.literal()?;
        if !keyword.is_empty() {
            return Err(Error::MixedArgumentOrder { offset: start });
        }
        positional.push(value);
        Ok(())
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        let start = self.pos;
        match self.peek() {
            Some(c) if c.is_alphabetic() || c == '_' => {
                self.bump();
            }
            _ => {
                return Err(Error::syntax(start, format!("expected {what}")));
            }
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn literal(&mut self) -> Result<Value> {
        self.skip_ws();
        let start = self.pos;
        match self.peek() {
            Some('"') | Some('\'') => self.string_literal(),
            Some('[') => self.list_literal(),
            Some('{') => self.map_literal(),
            Some(c) if c.is_ascii_digit() || c == '-' || c == '.' => self.number_literal(),
            Some(c) if c.is_alphabetic() || c == '_' => {
                let ident = self.identifier("literal")?;
                keyword_literal(&ident).ok_or_else(|| {
                    Error::syntax(
                        start,
                        format!("'{ident}' is not a literal; identifiers are not evaluated"),
                    )
                })
            }
            Some(c) => Err(Error::syntax(start, format!("expected a literal, found '{c}'"))),
            None => Err(Error::syntax(start, "expected a literal, found end of input")),
        }
    }

    fn string_literal(&mut self) -> Result<Value> {
        let start = self.pos;
        let quote = self.bump().expect("BUG: string_literal entered without an opening quote");
        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => return Ok(Value::String(out)),
                Some('\\') => {
                    let escape_at = self.pos - 1;
                    match self.bump() {
                        Some('n') => out.push('\n'),
                        Some('t') => out.push('\t'),
                        Some('r') => out.push('\r'),
                        Some('0') => out.push('\0'),
                        Some('\\') => out.push('\\'),
                        Some('\'') => out.push('\''),
                        Some('"') => out.push('"'),
                        Some('u') => out.push(self.unicode_escape(escape_at)?),
                        Some(c) => {
                            return Err(Error::syntax(
                                escape_at,
                                format!("unknown escape sequence '\\{c}'"),
                            ));
                        }
                        None => {
                            return Err(Error::syntax(start, "unterminated string literal"));
                        }
                    }
                }
                Some(c) => out.push(c),
                None => return Err(Error::syntax(start, "unterminated string literal")),
            }
        }
    }

    /// `\uXXXX` with exactly four hex digits.
    fn unicode_escape(&mut self, escape_at: usize) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| Error::syntax(escape_at, "invalid \\u escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| Error::syntax(escape_at, "invalid \\u escape"))
    }

    fn number_literal(&mut self) -> Result<Value> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        let mut saw_digit = false;
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {
                    saw_digit = true;
                    self.bump();
                }
                '.' if !is_float => {
                    is_float = true;
                    self.bump();
                }
                'e' | 'E' => {
                    if !saw_digit {
                        break;
                    }
                    is_float = true;
                    self.bump();
                    if matches!(self.peek(), Some('+') | Some('-')) {
                        self.bump();
                    }
                    let mut exp_digits = false;
                    while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                        exp_digits = true;
                        self.bump();
                    }
                    if !exp_digits {
                        return Err(Error::syntax(start, "malformed number literal"));
                    }
                    break;
                }
                _ => break,
            }
        }
        if !saw_digit {
            return Err(Error::syntax(start, "malformed number literal"));
        }

        let text = &self.src[start..self.pos];
        if !is_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(Value::from(i));
            }
        }
        let f: f64 = text
            .parse()
            .map_err(|_| Error::syntax(start, "malformed number literal"))?;
        Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| Error::syntax(start, "number literal out of range"))
    }

    fn list_literal(&mut self) -> Result<Value> {
        self.expect('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(_) => {}
                None => return Err(Error::syntax(self.pos, "unclosed list literal")),
            }
            items.push(self.literal()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some(']') => {
                    self.bump();
                    return Ok(Value::Array(items));
                }
                Some(c) => {
                    return Err(Error::syntax(
                        self.pos,
                        format!("expected ',' or ']', found '{c}'"),
                    ));
                }
                None => return Err(Error::syntax(self.pos, "unclosed list literal")),
            }
        }
    }

    fn map_literal(&mut self) -> Result<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some('"') | Some('\'') => {}
                Some(c) => {
                    return Err(Error::syntax(
                        self.pos,
                        format!("map keys must be string literals, found '{c}'"),
                    ));
                }
                None => return Err(Error::syntax(self.pos, "unclosed map literal")),
            }
            let key = match self.string_literal()? {
                Value::String(s) => s,
                _ => unreachable!("string_literal always yields a string"),
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.literal()?;
            map.insert(key, value);
            self.skip_ws();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                Some(c) => {
                    return Err(Error::syntax(
                        self.pos,
                        format!("expected ',' or '}}', found '{c}'"),
                    ));
                }
                None => return Err(Error::syntax(self.pos, "unclosed map literal")),
            }
        }
    }
}

/// The identifier spellings that are literals, covering both JSON and
/// Python conventions (models emit either).
fn keyword_literal(ident: &str) -> Option<Value> {
    match ident {
        "true" | "True" => Some(Value::Bool(true)),
        "false" | "False" => Some(Value::Bool(false)),
        "null" | "None" => Some(Value::Null),
        _ => None,
    }
}

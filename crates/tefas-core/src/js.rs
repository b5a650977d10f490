//! Reader for the JavaScript object literals embedded in chart scripts.
//!
//! Chart configuration on the analysis page is emitted as inline JavaScript,
//! not JSON: keys may be bare identifiers, strings may use single quotes and
//! trailing commas occur. [`parse_literal`] accepts that superset and stops at
//! the end of the first complete value.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsValue>),
    Object(Vec<(String, JsValue)>),
}

impl JsValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&JsValue> {
        match self {
            Self::Object(fields) => fields
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message} at offset {offset}")]
pub struct JsError {
    pub offset: usize,
    pub message: String,
}

/// Parses the literal starting at the beginning of `input` (leading whitespace allowed).
pub fn parse_literal(input: &str) -> Result<JsValue, JsError> {
    let mut parser = Parser { input, offset: 0 };
    parser.value()
}

/// Locates the first `[` after each marker in turn has been found, in order.
///
/// `array_after(script, &["chartX", "series", "data"])` returns the script
/// starting at the first array following `data` following `series` following
/// `chartX`.
pub fn array_after<'a>(script: &'a str, markers: &[&str]) -> Option<&'a str> {
    let mut position = 0;
    for marker in markers {
        position += script[position..].find(marker)? + marker.len();
    }
    let start = position + script[position..].find('[')?;
    Some(&script[start..])
}

struct Parser<'a> {
    input: &'a str,
    offset: usize,
}

impl Parser<'_> {
    fn rest(&self) -> &str {
        &self.input[self.offset..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.offset += ch.len_utf8();
        Some(ch)
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError {
            offset: self.offset,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), JsError> {
        match self.bump() {
            Some(ch) if ch == expected => Ok(()),
            Some(ch) => Err(self.error(format!("expected '{expected}', found '{ch}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn value(&mut self) -> Result<JsValue, JsError> {
        self.skip_whitespace();
        match self.peek() {
            Some('[') => self.array(),
            Some('{') => self.object(),
            Some(quote @ ('"' | '\'')) => self.string(quote).map(JsValue::String),
            Some(ch) if ch == '-' || ch == '+' || ch == '.' || ch.is_ascii_digit() => self.number(),
            Some(ch) if is_identifier_start(ch) => match self.identifier().as_str() {
                "null" | "undefined" => Ok(JsValue::Null),
                "true" => Ok(JsValue::Bool(true)),
                "false" => Ok(JsValue::Bool(false)),
                "NaN" => Ok(JsValue::Number(f64::NAN)),
                other => Err(self.error(format!("unsupported expression '{other}'"))),
            },
            Some(ch) => Err(self.error(format!("unexpected character '{ch}'"))),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn array(&mut self) -> Result<JsValue, JsError> {
        self.expect_char('[')?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(']') {
                self.bump();
                return Ok(JsValue::Array(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some(']') => return Ok(JsValue::Array(items)),
                Some(ch) => return Err(self.error(format!("expected ',' or ']', found '{ch}'"))),
                None => return Err(self.error("unterminated array")),
            }
        }
    }

    fn object(&mut self) -> Result<JsValue, JsError> {
        self.expect_char('{')?;
        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            let key = match self.peek() {
                Some('}') => {
                    self.bump();
                    return Ok(JsValue::Object(fields));
                }
                Some(quote @ ('"' | '\'')) => self.string(quote)?,
                Some(ch) if is_identifier_start(ch) => self.identifier(),
                Some(ch) => return Err(self.error(format!("invalid object key start '{ch}'"))),
                None => return Err(self.error("unterminated object")),
            };
            self.skip_whitespace();
            self.expect_char(':')?;
            let value = self.value()?;
            fields.push((key, value));
            self.skip_whitespace();
            match self.bump() {
                Some(',') => {}
                Some('}') => return Ok(JsValue::Object(fields)),
                Some(ch) => return Err(self.error(format!("expected ',' or '}}', found '{ch}'"))),
                None => return Err(self.error("unterminated object")),
            }
        }
    }

    fn string(&mut self, quote: char) -> Result<String, JsError> {
        self.expect_char(quote)?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some(ch) if ch == quote => return Ok(value),
                Some('\\') => value.push(self.escape()?),
                Some(ch) => value.push(ch),
                None => return Err(self.error("unterminated string")),
            }
        }
    }

    fn escape(&mut self) -> Result<char, JsError> {
        match self.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('b') => Ok('\u{8}'),
            Some('f') => Ok('\u{c}'),
            Some('u') => {
                let digits: String = self.rest().chars().take(4).collect();
                let code = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == 4)
                    .ok_or_else(|| self.error("invalid unicode escape"))?;
                self.offset += digits.len();
                Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
            Some(other) => Ok(other),
            None => Err(self.error("unterminated escape")),
        }
    }

    fn number(&mut self) -> Result<JsValue, JsError> {
        let start = self.offset;
        while self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E'))
        {
            self.bump();
        }
        let literal = &self.input[start..self.offset];
        literal
            .parse::<f64>()
            .map(JsValue::Number)
            .map_err(|_| JsError {
                offset: start,
                message: format!("invalid number '{literal}'"),
            })
    }

    fn identifier(&mut self) -> String {
        let start = self.offset;
        while self
            .peek()
            .is_some_and(|ch| is_identifier_start(ch) || ch.is_ascii_digit())
        {
            self.bump();
        }
        self.input[start..self.offset].to_owned()
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

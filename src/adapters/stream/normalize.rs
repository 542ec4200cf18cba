//! Loose-to-strict conversion of payload blocks.
//!
//! Blocks arrive in a relaxed object notation:
//!
//! ```text
//! {latitude: 39.9, name: 'alpha', ok: TRUE, note: free text, }
//! ```
//!
//! The normalizer rewrites them into strict JSON: bare keys are quoted,
//! single-quoted strings become double-quoted, trailing commas before a
//! closing bracket are dropped, and every unquoted value is classified
//! lexically. A value is a number only when it is an optional `-`, digits,
//! and optionally `.` followed by digits; `true`, `false` and `null` are
//! matched case-insensitively and lowered; anything else becomes a string
//! that ends at the first unescaped comma or closing bracket at its own
//! nesting depth.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").expect("numeric pattern is valid"));

/// Why a block could not be turned into a field map.
#[derive(Debug, thiserror::Error)]
pub enum BlockError {
    #[error("block ends before its closing bracket")]
    Unterminated,

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("missing value at offset {offset}")]
    EmptyValue { offset: usize },

    #[error("invalid key at offset {offset}")]
    InvalidKey { offset: usize },

    #[error("trailing text after block at offset {offset}")]
    TrailingText { offset: usize },

    #[error("decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Rewrites a loose block (`{` .. `}`) into strict JSON text.
pub fn normalize_block(block: &str) -> Result<String, BlockError> {
    let mut normalizer = Normalizer {
        chars: block.chars().collect(),
        pos: 0,
        out: String::with_capacity(block.len() + block.len() / 4),
    };
    normalizer.skip_ws();
    normalizer.object()?;
    normalizer.skip_ws();
    if normalizer.pos < normalizer.chars.len() {
        return Err(BlockError::TrailingText {
            offset: normalizer.pos,
        });
    }
    Ok(normalizer.out)
}

/// Normalizes and decodes a block into an ordered field map.
pub fn decode_block(block: &str) -> Result<Map<String, Value>, BlockError> {
    let strict = normalize_block(block)?;
    Ok(serde_json::from_str(&strict)?)
}

struct Normalizer {
    chars: Vec<char>,
    pos: usize,
    out: String,
}

impl Normalizer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> Result<(), BlockError> {
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(found) => Err(BlockError::Unexpected {
                found,
                offset: self.pos - 1,
            }),
            None => Err(BlockError::Unterminated),
        }
    }

    fn object(&mut self) -> Result<(), BlockError> {
        self.expect('{')?;
        self.out.push('{');
        self.skip_ws();
        if self.peek() == Some('}') {
            self.pos += 1;
            self.out.push('}');
            return Ok(());
        }
        loop {
            self.key()?;
            self.skip_ws();
            self.expect(':')?;
            self.out.push(':');
            self.value('}')?;
            if self.separator('}')? {
                return Ok(());
            }
        }
    }

    fn array(&mut self) -> Result<(), BlockError> {
        self.expect('[')?;
        self.out.push('[');
        self.skip_ws();
        if self.peek() == Some(']') {
            self.pos += 1;
            self.out.push(']');
            return Ok(());
        }
        loop {
            self.value(']')?;
            if self.separator(']')? {
                return Ok(());
            }
        }
    }

    /// Consumes `,` or `closer` after a member. Returns true once closed.
    fn separator(&mut self, closer: char) -> Result<bool, BlockError> {
        self.skip_ws();
        match self.bump() {
            Some(',') => {
                self.skip_ws();
                if self.peek() == Some(closer) {
                    self.pos += 1;
                    self.out.push(closer);
                    return Ok(true);
                }
                self.out.push(',');
                Ok(false)
            }
            Some(c) if c == closer => {
                self.out.push(closer);
                Ok(true)
            }
            Some(found) => Err(BlockError::Unexpected {
                found,
                offset: self.pos - 1,
            }),
            None => Err(BlockError::Unterminated),
        }
    }

    fn key(&mut self) -> Result<(), BlockError> {
        match self.peek() {
            Some('"') => self.double_quoted(),
            Some('\'') => self.single_quoted(),
            Some(c) if c.is_alphanumeric() || c == '_' => {
                let start = self.pos;
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
                {
                    self.pos += 1;
                }
                let key: String = self.chars[start..self.pos].iter().collect();
                self.out.push_str(&serde_json::to_string(&key)?);
                Ok(())
            }
            Some(_) => Err(BlockError::InvalidKey { offset: self.pos }),
            None => Err(BlockError::Unterminated),
        }
    }

    fn value(&mut self, closer: char) -> Result<(), BlockError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => self.object(),
            Some('[') => self.array(),
            Some('"') => self.double_quoted(),
            Some('\'') => self.single_quoted(),
            Some(_) => self.bare(closer),
            None => Err(BlockError::Unterminated),
        }
    }

    /// Unquoted scalar running to the next unescaped `,` or `closer` at
    /// depth zero.
    fn bare(&mut self, closer: char) -> Result<(), BlockError> {
        let start = self.pos;
        let mut token = String::new();
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    self.pos += 1;
                    if let Some(escaped) = self.bump() {
                        token.push(escaped);
                    }
                    continue;
                }
                '{' | '[' => depth += 1,
                '}' | ']' if depth > 0 => depth -= 1,
                ',' if depth == 0 => break,
                c if depth == 0 && (c == closer || c == '}' || c == ']') => break,
                _ => {}
            }
            token.push(c);
            self.pos += 1;
        }

        let token = token.trim();
        if token.is_empty() {
            return Err(BlockError::EmptyValue { offset: start });
        }
        self.out.push_str(&classify(token)?);
        Ok(())
    }

    fn double_quoted(&mut self) -> Result<(), BlockError> {
        self.expect('"')?;
        self.out.push('"');
        loop {
            match self.bump().ok_or(BlockError::Unterminated)? {
                '\\' => {
                    let escaped = self.bump().ok_or(BlockError::Unterminated)?;
                    self.out.push('\\');
                    self.out.push(escaped);
                }
                '"' => {
                    self.out.push('"');
                    return Ok(());
                }
                c => push_json_char(&mut self.out, c),
            }
        }
    }

    fn single_quoted(&mut self) -> Result<(), BlockError> {
        self.expect('\'')?;
        self.out.push('"');
        loop {
            match self.bump().ok_or(BlockError::Unterminated)? {
                '\\' => match self.bump().ok_or(BlockError::Unterminated)? {
                    '\'' => self.out.push('\''),
                    escaped => {
                        self.out.push('\\');
                        self.out.push(escaped);
                    }
                },
                '\'' => {
                    self.out.push('"');
                    return Ok(());
                }
                '"' => self.out.push_str("\\\""),
                c => push_json_char(&mut self.out, c),
            }
        }
    }
}

fn push_json_char(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}

fn classify(token: &str) -> Result<String, BlockError> {
    if NUMERIC.is_match(token) {
        return Ok(token.to_string());
    }
    for literal in ["true", "false", "null"] {
        if token.eq_ignore_ascii_case(literal) {
            return Ok(literal.to_string());
        }
    }
    Ok(serde_json::to_string(token)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_keys_are_quoted_and_numbers_pass_through() {
        let strict = normalize_block("{latitude: 39.9, longitude: 32.8, altitude: 1500.0}").unwrap();
        assert_eq!(strict, r#"{"latitude":39.9,"longitude":32.8,"altitude":1500.0}"#);
    }

    #[test]
    fn literals_are_lowered() {
        let map = decode_block("{a: TRUE, b: False, c: NULL}").unwrap();
        assert_eq!(Value::Object(map), json!({"a": true, "b": false, "c": null}));
    }

    #[test]
    fn single_quotes_become_double_quotes() {
        let map = decode_block(r#"{'name': 'say "hi"', note: 'it\'s'}"#).unwrap();
        assert_eq!(map["name"], json!("say \"hi\""));
        assert_eq!(map["note"], json!("it's"));
    }

    #[test]
    fn classification_is_lexical() {
        let map = decode_block("{a: 1e5, b: .5, c: 12abc, d: -7, e: 3.}").unwrap();
        assert_eq!(map["a"], json!("1e5"));
        assert_eq!(map["b"], json!(".5"));
        assert_eq!(map["c"], json!("12abc"));
        assert_eq!(map["d"], json!(-7));
        assert_eq!(map["e"], json!("3."));
    }

    #[test]
    fn bare_strings_end_at_comma_or_closing_brace() {
        let map = decode_block("{cmd: hold position, next: go}").unwrap();
        assert_eq!(map["cmd"], json!("hold position"));
        assert_eq!(map["next"], json!("go"));
    }

    #[test]
    fn bare_string_keeps_nested_delimiters_at_inner_depth() {
        let map = decode_block("{raw: f{x, y}, ok: 1}").unwrap();
        assert_eq!(map["raw"], json!("f{x, y}"));
        assert_eq!(map["ok"], json!(1));
    }

    #[test]
    fn trailing_comma_is_removed() {
        let strict = normalize_block("{a: 1, b: [1, 2,], }").unwrap();
        assert_eq!(strict, r#"{"a":1,"b":[1,2]}"#);
    }

    #[test]
    fn nested_objects_are_normalized() {
        let map = decode_block("{loc: {lat: 1.5, lon: -2}, tags: ['x', y]}").unwrap();
        assert_eq!(Value::Object(map), json!({"loc": {"lat": 1.5, "lon": -2}, "tags": ["x", "y"]}));
    }

    #[test]
    fn empty_block_is_an_empty_map() {
        assert!(decode_block("{}").unwrap().is_empty());
        assert!(decode_block("{ }").unwrap().is_empty());
    }

    #[test]
    fn missing_value_is_rejected() {
        let err = decode_block("{latitude: 39.9, longitude: }").unwrap_err();
        assert!(matches!(err, BlockError::EmptyValue { .. }));
    }

    #[test]
    fn unterminated_and_trailing_text_are_rejected() {
        assert!(matches!(decode_block("{a: 'open}"), Err(BlockError::Unterminated)));
        assert!(matches!(decode_block("{a: 1} extra"), Err(BlockError::TrailingText { .. })));
    }

    #[test]
    fn leading_zero_numbers_fail_to_decode() {
        assert!(matches!(decode_block("{a: 007}"), Err(BlockError::Decode(_))));
    }

    #[test]
    fn key_order_is_preserved() {
        let map = decode_block("{z: 1, a: 2, m: 3}").unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn escaped_strings_from_records_decode() {
        let map = decode_block(r#"{td_description: "say \"hi\"\nbye", x: "a\\b"}"#).unwrap();
        assert_eq!(map["td_description"], json!("say \"hi\"\nbye"));
        assert_eq!(map["x"], json!("a\\b"));
    }
}

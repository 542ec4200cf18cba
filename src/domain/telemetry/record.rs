//! Raw Record wire format.
//!
//! ```text
//! [domain=<int>] TOPIC: <category> <subtype>
//! Sample '<n>' RECEIVED
//!  - {field1: value1, field2: value2, ...}
//! ```
//!
//! Strings are double-quoted with `\`, `"` and control characters escaped,
//! booleans are `true`/`false`, numbers are bare. The parser side accepts a
//! looser grammar than this module emits.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt::Write as _;

use crate::domain::foundation::DomainId;

use super::category::TopicKind;

/// Marker that opens the payload block of a record.
pub const PAYLOAD_MARKER: &str = " - {";

/// Prefix every header line starts with.
pub const HEADER_PREFIX: &str = "[domain=";

static HEADER_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[domain=(\d+)\]\s+TOPIC:\s+([A-Za-z_]+)(?:\s+([A-Za-z0-9_]+))?\s*$")
        .expect("header pattern is valid")
});

/// Header line identifying the domain and topic of the record that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHeader {
    pub domain: DomainId,
    pub topic: TopicKind,
}

impl RecordHeader {
    pub fn new(domain: DomainId, topic: TopicKind) -> Self {
        Self { domain, topic }
    }

    /// Header line without its terminating newline.
    pub fn render(&self) -> String {
        format!("{}{}] TOPIC: {}", HEADER_PREFIX, self.domain, self.topic)
    }

    /// Parses one header line (without its newline).
    ///
    /// Returns `None` for anything that is not a well-formed header naming a
    /// known category.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = HEADER_LINE.captures(line.trim_end_matches('\r'))?;
        let domain: DomainId = captures.get(1)?.as_str().parse().ok()?;
        let category = captures.get(2)?.as_str();
        let subtype = captures.get(3).map(|m| m.as_str());
        let topic = TopicKind::from_tokens(category, subtype)?;
        Some(Self { domain, topic })
    }
}

/// One formatted sample ready to be written to the shared stream.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub header: RecordHeader,
    /// Per-reader sample counter, starting at 1.
    pub sequence: u64,
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(header: RecordHeader, sequence: u64, fields: Map<String, Value>) -> Self {
        Self {
            header,
            sequence,
            fields,
        }
    }

    /// Full record text including the trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(64 + self.fields.len() * 24);
        out.push_str(&self.header.render());
        out.push('\n');
        let _ = writeln!(out, "Sample '{}' RECEIVED", self.sequence);
        out.push_str(" - ");
        render_object(&mut out, &self.fields);
        out.push('\n');
        out
    }
}

fn render_object(out: &mut String, fields: &Map<String, Value>) {
    out.push('{');
    for (index, (key, value)) in fields.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(key);
        out.push_str(": ");
        render_value(out, value);
    }
    out.push('}');
}

fn render_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(flag) => out.push_str(if *flag { "true" } else { "false" }),
        Value::Number(number) => {
            let _ = write!(out, "{}", number);
        }
        Value::String(text) => render_string(out, text),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                render_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => render_object(out, map),
    }
}

fn render_string(out: &mut String, text: &str) {
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            // Block boundaries are found by counting braces.
            '{' => out.push_str("\\u007b"),
            '}' => out.push_str("\\u007d"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::telemetry::AircraftSource;
    use serde_json::json;

    fn aircraft2() -> RecordHeader {
        RecordHeader::new(DomainId::new(2), TopicKind::Aircraft(AircraftSource::CoreData2))
    }

    #[test]
    fn header_renders_bit_exact() {
        assert_eq!(aircraft2().render(), "[domain=2] TOPIC: aircraft coredata2");
        let intel = RecordHeader::new(DomainId::new(0), TopicKind::Intelligence);
        assert_eq!(intel.render(), "[domain=0] TOPIC: intelligence");
    }

    #[test]
    fn header_parses_what_it_renders() {
        for topic in TopicKind::ALL {
            let header = RecordHeader::new(DomainId::new(7), topic);
            assert_eq!(RecordHeader::parse(&header.render()), Some(header));
        }
    }

    #[test]
    fn header_parse_rejects_unknown_category_and_garbage() {
        assert_eq!(RecordHeader::parse("[domain=1] TOPIC: weather"), None);
        assert_eq!(RecordHeader::parse("[domain=x] TOPIC: aircraft coredata"), None);
        assert_eq!(RecordHeader::parse("[monitor] CoreData matched change"), None);
        assert!(RecordHeader::parse("[domain=1] TOPIC: messaging\r").is_some());
    }

    #[test]
    fn record_renders_full_grammar() {
        let fields = json!({"latitude": 39.9, "longitude": 32.8, "altitude": 1500.0});
        let record = RawRecord::new(aircraft2(), 1, fields.as_object().unwrap().clone());
        assert_eq!(
            record.render(),
            "[domain=2] TOPIC: aircraft coredata2\nSample '1' RECEIVED\n - {latitude: 39.9, longitude: 32.8, altitude: 1500.0}\n"
        );
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        let fields = json!({"td_description": "say \"hi\"\nbye", "vs_system_error": false});
        let header = RecordHeader::new(DomainId::new(1), TopicKind::Intelligence);
        let record = RawRecord::new(header, 3, fields.as_object().unwrap().clone());
        let text = record.render();
        assert!(text.contains(r#"td_description: "say \"hi\"\nbye""#));
        assert!(text.contains("vs_system_error: false}"));
        assert_eq!(text.matches('\n').count(), 3);
    }

    #[test]
    fn braces_inside_strings_are_escaped() {
        let fields = json!({"td_description": "target near {ridge", "ta_command": "}"});
        let header = RecordHeader::new(DomainId::new(1), TopicKind::Intelligence);
        let text = RawRecord::new(header, 1, fields.as_object().unwrap().clone()).render();
        assert!(text.contains(r#"td_description: "target near \u007bridge""#));
        assert!(text.contains(r#"ta_command: "\u007d""#));
        assert_eq!(text.matches('{').count(), 1);
        assert_eq!(text.matches('}').count(), 1);
    }

    #[test]
    fn empty_field_map_renders_empty_braces() {
        let record = RawRecord::new(aircraft2(), 9, Map::new());
        assert!(record.render().ends_with(" - {}\n"));
    }
}

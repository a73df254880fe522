//! Ordered data tree shared by every generated document, with a
//! Python-literal renderer for the model importer and a JSON `Serialize`.

use chrono::{Datelike, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt::Write;

const INDENT: &str = "  ";

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Bool(bool),
    Decimal(Decimal),
    DateTime(NaiveDateTime),
    List(Vec<Literal>),
    /// Keys keep insertion order.
    Map(Vec<(String, Literal)>),
}

pub trait ToLiteral {
    fn to_literal(&self) -> Literal;
}

impl Literal {
    pub fn str(value: impl Into<String>) -> Self {
        Literal::Str(value.into())
    }

    pub fn map() -> MapBuilder {
        MapBuilder(Vec::new())
    }

    pub fn get(&self, key: &str) -> Option<&Literal> {
        match self {
            Literal::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the tree as a pretty-printed Python data literal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out.push('\n');
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        match self {
            Literal::Str(s) => out.push_str(&quote(s)),
            Literal::Bool(true) => out.push_str("True"),
            Literal::Bool(false) => out.push_str("False"),
            Literal::Decimal(d) => {
                let _ = write!(out, "Decimal('{d}')");
            }
            Literal::DateTime(dt) => {
                let _ = write!(
                    out,
                    "datetime.datetime({}, {}, {}, {}, {})",
                    dt.year(),
                    dt.month(),
                    dt.day(),
                    dt.hour(),
                    dt.minute()
                );
            }
            Literal::List(items) if items.is_empty() => out.push_str("[]"),
            Literal::List(items) => {
                out.push_str("[\n");
                for item in items {
                    push_indent(out, depth + 1);
                    item.render_into(out, depth + 1);
                    out.push_str(",\n");
                }
                push_indent(out, depth);
                out.push(']');
            }
            Literal::Map(entries) if entries.is_empty() => out.push_str("{}"),
            Literal::Map(entries) => {
                out.push_str("{\n");
                for (key, value) in entries {
                    push_indent(out, depth + 1);
                    out.push_str(&quote(key));
                    out.push_str(": ");
                    value.render_into(out, depth + 1);
                    out.push_str(",\n");
                }
                push_indent(out, depth);
                out.push('}');
            }
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('\'');
    for c in s.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}

impl Serialize for Literal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Literal::Str(s) => serializer.serialize_str(s),
            Literal::Bool(b) => serializer.serialize_bool(*b),
            // as a string so no digits are lost
            Literal::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Literal::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S").to_string())
            }
            Literal::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Literal::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<T: ToLiteral> ToLiteral for [T] {
    fn to_literal(&self) -> Literal {
        Literal::List(self.iter().map(ToLiteral::to_literal).collect())
    }
}

/// Builds a `Literal::Map`, skipping `None` values.
pub struct MapBuilder(Vec<(String, Literal)>);

impl MapBuilder {
    pub fn entry(mut self, key: impl Into<String>, value: Literal) -> Self {
        self.0.push((key.into(), value));
        self
    }

    pub fn opt(self, key: impl Into<String>, value: Option<Literal>) -> Self {
        match value {
            Some(value) => self.entry(key, value),
            None => self,
        }
    }

    pub fn build(self) -> Literal {
        Literal::Map(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn renders_nested_literal() {
        let doc = Literal::map()
            .entry("class", Literal::str("developers"))
            .entry("sibling_split", Literal::Decimal(Decimal::new(65, 2)))
            .entry("requires-bta", Literal::Bool(true))
            .entry("subsplit", Literal::List(vec![Literal::str("a")]))
            .entry("empty", Literal::List(vec![]))
            .build();

        let expected = "\
{
  'class': 'developers',
  'sibling_split': Decimal('0.65'),
  'requires-bta': True,
  'subsplit': [
    'a',
  ],
  'empty': [],
}
";
        assert_eq!(doc.render(), expected);
    }

    #[test]
    fn escapes_quotes() {
        assert_eq!(
            Literal::str("Pay $5 or more, it's\nfine").render(),
            "'Pay $5 or more, it\\'s\\nfine'\n"
        );
    }

    #[test]
    fn renders_datetime() {
        let dt = NaiveDate::from_ymd_opt(2016, 7, 5)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        assert_eq!(
            Literal::DateTime(dt).render(),
            "datetime.datetime(2016, 7, 5, 11, 0)\n"
        );
    }

    #[test]
    fn json_keeps_key_order_and_decimal_digits() {
        let doc = Literal::map()
            .entry("z", Literal::Decimal("0.333333333334".parse().unwrap()))
            .entry("a", Literal::Bool(false))
            .opt("skipped", None)
            .build();

        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"z":"0.333333333334","a":false}"#);
    }

    #[test]
    fn get_finds_map_entries() {
        let doc = Literal::map().entry("name", Literal::str("Charity")).build();
        assert_eq!(doc.get("name").and_then(Literal::as_str), Some("Charity"));
        assert_eq!(doc.get("missing"), None);
    }
}

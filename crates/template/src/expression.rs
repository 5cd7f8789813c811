//! Restricted expression evaluation
//!
//! Expressions are a root name followed by attribute, key or index steps:
//! - `records[0].name` - first record, `name` attribute
//! - `data['name']` / `data["name"]` / `data.name` - data map key
//! - `user.company.name` - ambient variable walked as JSON
//! - `records[1].lines[2].amount` - mixed chaining
//!
//! Nothing else is evaluated: no calls, operators or filters.

use crate::context::{ExecutionContext, Record, DATA_ROOT, RECORDS_ROOT};
use crate::{Result, TemplateError};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// One lookup step after the root
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `.name` or `['name']`
    Key(String),
    /// `[n]`
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A parsed lookup expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    source: String,
    root: String,
    segments: Vec<Segment>,
}

/// Current position while walking an expression
enum Cursor<'a> {
    Records,
    Record(&'a dyn Record),
    Data,
    Value(Cow<'a, Value>),
}

impl Expression {
    /// Parse an expression
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_on_line(source, 1)
    }

    /// Parse an expression found on `line` of a template (for error messages)
    pub(crate) fn parse_on_line(source: &str, line: usize) -> Result<Self> {
        let trimmed = source.trim();
        let bytes = trimmed.as_bytes();
        let err = |message: String| TemplateError::syntax(line, message);

        let root_len = ident_len(bytes);
        if root_len == 0 {
            return Err(err(format!("expected a name in `{}`", trimmed)));
        }

        let root = trimmed[..root_len].to_string();
        let mut segments = Vec::new();
        let mut pos = root_len;

        while pos < bytes.len() {
            match bytes[pos] {
                b'.' => {
                    let len = ident_len(&bytes[pos + 1..]);
                    if len == 0 {
                        return Err(err(format!("expected a name after `.` in `{}`", trimmed)));
                    }
                    segments.push(Segment::Key(trimmed[pos + 1..pos + 1 + len].to_string()));
                    pos += 1 + len;
                }
                b'[' => {
                    let close = find_unquoted(&trimmed[pos..], "]")
                        .map(|i| pos + i)
                        .ok_or_else(|| err(format!("unclosed `[` in `{}`", trimmed)))?;
                    let inner = trimmed[pos + 1..close].trim();
                    segments.push(parse_subscript(inner).ok_or_else(|| {
                        err(format!("invalid subscript `[{}]` in `{}`", inner, trimmed))
                    })?);
                    pos = close + 1;
                }
                _ => {
                    return Err(err(format!(
                        "unexpected `{}` in `{}`",
                        trimmed[pos..].chars().next().unwrap_or_default(),
                        trimmed
                    )));
                }
            }
        }

        Ok(Self {
            source: trimmed.to_string(),
            root,
            segments,
        })
    }

    /// The expression text as written (trimmed)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Root variable name
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Lookup steps after the root
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Resolve the expression against a context
    ///
    /// Every missing root, attribute, key or index is an
    /// [`TemplateError::UnresolvedReference`]; nothing defaults to blank.
    pub fn resolve(&self, ctx: &ExecutionContext) -> Result<Value> {
        let mut cursor = match self.root.as_str() {
            RECORDS_ROOT => Cursor::Records,
            DATA_ROOT => Cursor::Data,
            name => Cursor::Value(Cow::Borrowed(
                ctx.ambient(name).ok_or_else(|| self.unresolved(name))?,
            )),
        };

        for segment in &self.segments {
            cursor = match (cursor, segment) {
                (Cursor::Records, Segment::Index(index)) => {
                    Cursor::Record(ctx.record(*index).ok_or_else(|| self.unresolved(segment))?)
                }
                (Cursor::Record(record), Segment::Key(name)) => Cursor::Value(Cow::Owned(
                    record.attribute(name).ok_or_else(|| self.unresolved(segment))?,
                )),
                (Cursor::Data, Segment::Key(key)) => Cursor::Value(Cow::Borrowed(
                    ctx.data().get(key).ok_or_else(|| self.unresolved(segment))?,
                )),
                (Cursor::Value(value), _) => {
                    Cursor::Value(step_value(value, segment).ok_or_else(|| self.unresolved(segment))?)
                }
                _ => return Err(self.unresolved(segment)),
            };
        }

        Ok(match cursor {
            Cursor::Records => Value::Array(
                ctx.records()
                    .iter()
                    .map(|r| Value::String(r.display_name()))
                    .collect(),
            ),
            Cursor::Record(record) => Value::String(record.display_name()),
            Cursor::Data => Value::Object(ctx.data().clone()),
            Cursor::Value(value) => value.into_owned(),
        })
    }

    fn unresolved(&self, segment: impl fmt::Display) -> TemplateError {
        TemplateError::UnresolvedReference {
            expression: self.source.clone(),
            segment: segment.to_string(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Length of the identifier at the start of `bytes` (0 if none)
fn ident_len(bytes: &[u8]) -> usize {
    match bytes.first() {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => bytes
            .iter()
            .take_while(|b| b.is_ascii_alphanumeric() || **b == b'_')
            .count(),
        _ => 0,
    }
}

/// Byte offset of the first `needle` in `text` outside a quoted string
pub(crate) fn find_unquoted(text: &str, needle: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if text[i..].starts_with(needle) => return Some(i),
            None => {}
        }
    }
    None
}

/// Parse the inside of `[...]`: an index or a quoted key
fn parse_subscript(inner: &str) -> Option<Segment> {
    if let Ok(index) = inner.parse::<usize>() {
        return Some(Segment::Index(index));
    }

    let quote = inner.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let key = inner.strip_prefix(quote)?.strip_suffix(quote)?;
    if key.contains(quote) {
        return None;
    }
    Some(Segment::Key(key.to_string()))
}

fn step_value<'a>(value: Cow<'a, Value>, segment: &Segment) -> Option<Cow<'a, Value>> {
    match value {
        Cow::Borrowed(v) => child(v, segment).map(Cow::Borrowed),
        Cow::Owned(v) => child(&v, segment).cloned().map(Cow::Owned),
    }
}

fn child<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match segment {
        Segment::Key(key) => value.as_object()?.get(key),
        Segment::Index(index) => value.as_array()?.get(*index),
    }
}

/// Convert a JSON value to string for rendering
///
/// An explicit `null` renders as an empty string; a missing value never
/// reaches this point because resolution fails first.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

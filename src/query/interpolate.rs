//! Client-side substitution of `?` placeholders.
//!
//! The remote API takes finished SQL text, so bound parameters are rendered
//! as MySQL literals before the request is sent. Question marks inside quoted
//! strings, quoted identifiers and comments are left alone.

use crate::error::InterpolationError;
use crate::types::conversion::format_datetime;
use chrono::{DateTime, Utc};

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// A value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for Parameter {
    fn from(v: bool) -> Self {
        Parameter::Bool(v)
    }
}

impl From<i32> for Parameter {
    fn from(v: i32) -> Self {
        Parameter::Int(v.into())
    }
}

impl From<i64> for Parameter {
    fn from(v: i64) -> Self {
        Parameter::Int(v)
    }
}

impl From<u32> for Parameter {
    fn from(v: u32) -> Self {
        Parameter::UInt(v.into())
    }
}

impl From<u64> for Parameter {
    fn from(v: u64) -> Self {
        Parameter::UInt(v)
    }
}

impl From<f64> for Parameter {
    fn from(v: f64) -> Self {
        Parameter::Float(v)
    }
}

impl From<&str> for Parameter {
    fn from(v: &str) -> Self {
        Parameter::String(v.to_string())
    }
}

impl From<String> for Parameter {
    fn from(v: String) -> Self {
        Parameter::String(v)
    }
}

impl From<Vec<u8>> for Parameter {
    fn from(v: Vec<u8>) -> Self {
        Parameter::Bytes(v)
    }
}

impl From<&[u8]> for Parameter {
    fn from(v: &[u8]) -> Self {
        Parameter::Bytes(v.to_vec())
    }
}

impl From<DateTime<Utc>> for Parameter {
    fn from(v: DateTime<Utc>) -> Self {
        Parameter::Timestamp(v)
    }
}

impl<T: Into<Parameter>> From<Option<T>> for Parameter {
    fn from(v: Option<T>) -> Self {
        v.map_or(Parameter::Null, Into::into)
    }
}

/// Counts the `?` placeholders in `sql`.
pub fn placeholder_count(sql: &str) -> usize {
    segments(sql)
        .iter()
        .filter(|segment| matches!(segment, Segment::Placeholder))
        .count()
}

/// Replaces each `?` placeholder in `template` with the next parameter
/// rendered as a MySQL literal.
///
/// # Errors
///
/// - `InterpolationError::ArityMismatch` if the number of placeholders and
///   parameters differ
/// - `InterpolationError::UnsupportedParameter` for NaN or infinite floats
pub fn interpolate(template: &str, params: &[Parameter]) -> Result<String, InterpolationError> {
    let mut out = String::with_capacity(template.len() + params.len() * 8);
    let mut placeholders = 0;

    for segment in segments(template) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Placeholder => {
                if let Some(param) = params.get(placeholders) {
                    write_literal(&mut out, param, placeholders)?;
                }
                placeholders += 1;
            }
        }
    }

    if placeholders != params.len() {
        return Err(InterpolationError::ArityMismatch {
            placeholders,
            parameters: params.len(),
        });
    }

    Ok(out)
}

enum Segment<'a> {
    Text(&'a str),
    Placeholder,
}

/// Splits `sql` into verbatim text and placeholders.
fn segments(sql: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let bytes = sql.as_bytes();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, quote),
            b'-' if bytes.get(i + 1) == Some(&b'-')
                && bytes.get(i + 2).map_or(true, |c| c.is_ascii_whitespace()) =>
            {
                i = skip_line(bytes, i)
            }
            b'#' => i = skip_line(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i),
            b'?' => {
                out.push(Segment::Text(&sql[start..i]));
                out.push(Segment::Placeholder);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }

    out.push(Segment::Text(&sql[start..]));
    out
}

/// Returns the index just past the closing quote. Backslash escapes apply
/// inside string literals but not inside backtick identifiers.
fn skip_quoted(bytes: &[u8], open: usize, quote: u8) -> usize {
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote != b'`' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

fn skip_line(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|&c| c == b'\n')
        .map_or(bytes.len(), |offset| from + offset + 1)
}

fn skip_block_comment(bytes: &[u8], from: usize) -> usize {
    bytes[from + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map_or(bytes.len(), |offset| from + 2 + offset + 2)
}

fn write_literal(out: &mut String, param: &Parameter, index: usize) -> Result<(), InterpolationError> {
    match param {
        Parameter::Null => out.push_str("NULL"),
        Parameter::Bool(true) => out.push_str("TRUE"),
        Parameter::Bool(false) => out.push_str("FALSE"),
        Parameter::Int(v) => out.push_str(&v.to_string()),
        Parameter::UInt(v) => out.push_str(&v.to_string()),
        Parameter::Float(v) => {
            if !v.is_finite() {
                return Err(InterpolationError::UnsupportedParameter {
                    index,
                    message: format!("{v} has no SQL literal"),
                });
            }
            out.push_str(&v.to_string());
        }
        Parameter::String(s) => push_quoted(out, s),
        Parameter::Bytes(b) => {
            out.push_str("X'");
            for byte in b {
                out.push(char::from(HEX_DIGITS[usize::from(byte >> 4)]));
                out.push(char::from(HEX_DIGITS[usize::from(byte & 0x0F)]));
            }
            out.push('\'');
        }
        Parameter::Timestamp(ts) => push_quoted(out, &format_datetime(ts)),
    }
    Ok(())
}

fn push_quoted(out: &mut String, value: &str) {
    out.push('\'');
    for c in value.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\x1a' => out.push_str("\\Z"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

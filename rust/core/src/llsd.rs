// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Binary LLSD codec using nom
//!
//! LLSD is a self-describing tree of scalars, arrays and string-keyed maps.
//! The binary form tags every value with a one-byte marker; multi-byte
//! numbers are big-endian except dates.
//!
//! | marker | value                                  |
//! |--------|----------------------------------------|
//! | `!`    | undefined                              |
//! | `1`/`0`| true / false                           |
//! | `i`    | i32, big-endian                        |
//! | `r`    | f64, big-endian                        |
//! | `u`    | 16-byte UUID                           |
//! | `s`    | u32 length + UTF-8 bytes               |
//! | `l`    | u32 length + URI bytes                 |
//! | `d`    | f64 seconds since epoch, little-endian |
//! | `b`    | u32 length + raw bytes                 |
//! | `[`    | u32 count, values, `]`                 |
//! | `{`    | u32 count, (`k` key, value) pairs, `}` |

use std::collections::BTreeMap;

use nom::{
    bytes::complete::{tag, take},
    combinator::{map, opt},
    error::{ErrorKind, ParseError},
    number::complete::{be_f64, be_i32, be_u32, le_f64, u8 as marker},
    IResult,
};

use crate::error::{Error, Result};

/// Optional document prefix written by most producers
pub const BINARY_HEADER: &[u8] = b"<? LLSD/Binary ?>\n";

/// Containers nested deeper than this are rejected
pub const MAX_DEPTH: usize = 64;

/// A decoded LLSD value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LlsdValue {
    #[default]
    Undefined,
    Boolean(bool),
    Integer(i32),
    Real(f64),
    Uuid([u8; 16]),
    String(String),
    Uri(String),
    /// Seconds since the Unix epoch
    Date(f64),
    Binary(Vec<u8>),
    Array(Vec<LlsdValue>),
    Map(BTreeMap<String, LlsdValue>),
}

#[derive(Debug)]
struct Failure<'a> {
    input: &'a [u8],
    message: String,
}

impl<'a> Failure<'a> {
    fn new(input: &'a [u8], message: impl Into<String>) -> Self {
        Self {
            input,
            message: message.into(),
        }
    }
}

impl<'a> ParseError<&'a [u8]> for Failure<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::Eof => "unexpected end of data".to_string(),
            other => format!("{other:?}"),
        };
        Self { input, message }
    }

    fn append(_input: &'a [u8], _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

type ParseResult<'a, T> = IResult<&'a [u8], T, Failure<'a>>;

fn fail<'a, T>(input: &'a [u8], message: impl Into<String>) -> ParseResult<'a, T> {
    Err(nom::Err::Failure(Failure::new(input, message)))
}

/// u32 length followed by that many bytes
fn sized(input: &[u8]) -> ParseResult<'_, &[u8]> {
    let (rest, len) = be_u32(input)?;
    take(len as usize)(rest)
}

fn text(input: &[u8]) -> ParseResult<'_, String> {
    let (rest, raw) = sized(input)?;
    match std::str::from_utf8(raw) {
        Ok(s) => Ok((rest, s.to_owned())),
        Err(_) => fail(input, "string is not valid UTF-8"),
    }
}

fn uuid(input: &[u8]) -> ParseResult<'_, [u8; 16]> {
    let (rest, raw) = take(16usize)(input)?;
    let mut id = [0u8; 16];
    id.copy_from_slice(raw);
    Ok((rest, id))
}

fn close<'a>(input: &'a [u8], mark: u8, what: &str) -> ParseResult<'a, ()> {
    match input.split_first() {
        Some((&b, rest)) if b == mark => Ok((rest, ())),
        _ => fail(input, format!("missing {what} terminator '{}'", mark as char)),
    }
}

// Counts come from the data itself, so containers grow as items actually
// parse instead of reserving `count` slots up front.
fn array(input: &[u8], depth: usize) -> ParseResult<'_, LlsdValue> {
    let (mut rest, count) = be_u32(input)?;
    let mut items = Vec::with_capacity((count as usize).min(rest.len()));
    for _ in 0..count {
        let (next, item) = value(rest, depth + 1)?;
        items.push(item);
        rest = next;
    }
    let (rest, ()) = close(rest, b']', "array")?;
    Ok((rest, LlsdValue::Array(items)))
}

fn map_key(input: &[u8]) -> ParseResult<'_, String> {
    let (rest, m) = marker(input)?;
    match m {
        b'k' | b's' => text(rest),
        other => fail(input, format!("expected map key, found marker {:?}", other as char)),
    }
}

fn map_body(input: &[u8], depth: usize) -> ParseResult<'_, LlsdValue> {
    let (mut rest, count) = be_u32(input)?;
    let mut entries = BTreeMap::new();
    for _ in 0..count {
        let (next, key) = map_key(rest)?;
        let (next, item) = value(next, depth + 1)?;
        entries.insert(key, item);
        rest = next;
    }
    let (rest, ()) = close(rest, b'}', "map")?;
    Ok((rest, LlsdValue::Map(entries)))
}

fn value(input: &[u8], depth: usize) -> ParseResult<'_, LlsdValue> {
    if depth > MAX_DEPTH {
        return fail(input, format!("containers nested deeper than {MAX_DEPTH}"));
    }

    let (rest, m) = marker(input)?;
    match m {
        b'!' => Ok((rest, LlsdValue::Undefined)),
        b'1' => Ok((rest, LlsdValue::Boolean(true))),
        b'0' => Ok((rest, LlsdValue::Boolean(false))),
        b'i' => map(be_i32, LlsdValue::Integer)(rest),
        b'r' => map(be_f64, LlsdValue::Real)(rest),
        b'd' => map(le_f64, LlsdValue::Date)(rest),
        b'u' => map(uuid, LlsdValue::Uuid)(rest),
        b's' => map(text, LlsdValue::String)(rest),
        b'l' => map(text, LlsdValue::Uri)(rest),
        b'b' => map(sized, |raw: &[u8]| LlsdValue::Binary(raw.to_vec()))(rest),
        b'[' => array(rest, depth),
        b'{' => map_body(rest, depth),
        other => fail(input, format!("unknown type marker {:?}", other as char)),
    }
}

fn document(input: &[u8]) -> ParseResult<'_, LlsdValue> {
    let (rest, _) = opt(tag(BINARY_HEADER))(input)?;
    value(rest, 0)
}

fn to_error(data: &[u8], err: nom::Err<Failure<'_>>) -> Error {
    match err {
        nom::Err::Error(f) | nom::Err::Failure(f) => Error::Llsd {
            offset: data.len() - f.input.len(),
            message: f.message,
        },
        nom::Err::Incomplete(_) => Error::Llsd {
            offset: data.len(),
            message: "unexpected end of data".to_string(),
        },
    }
}

/// Parse one value from the front of `data`
///
/// Returns the value and the number of bytes consumed (including the
/// optional `<? LLSD/Binary ?>` line). Bytes after the value are left alone,
/// which is how containers that append raw payloads after an LLSD header
/// are read.
pub fn parse_binary_prefix(data: &[u8]) -> Result<(LlsdValue, usize)> {
    match document(data) {
        Ok((rest, value)) => Ok((value, data.len() - rest.len())),
        Err(err) => Err(to_error(data, err)),
    }
}

/// Parse a complete binary LLSD document
pub fn parse_binary(data: &[u8]) -> Result<LlsdValue> {
    let (value, consumed) = parse_binary_prefix(data)?;
    if consumed != data.len() {
        return Err(Error::Llsd {
            offset: consumed,
            message: format!("{} trailing bytes after document", data.len() - consumed),
        });
    }
    Ok(value)
}

fn put_len(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| Error::Llsd {
        offset: out.len(),
        message: format!("length {len} does not fit in 32 bits"),
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

impl LlsdValue {
    /// Encode without the document prefix
    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_binary(&mut out)?;
        Ok(out)
    }

    /// Append the binary encoding of this value to `out`
    pub fn write_binary(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            LlsdValue::Undefined => out.push(b'!'),
            LlsdValue::Boolean(true) => out.push(b'1'),
            LlsdValue::Boolean(false) => out.push(b'0'),
            LlsdValue::Integer(v) => {
                out.push(b'i');
                out.extend_from_slice(&v.to_be_bytes());
            }
            LlsdValue::Real(v) => {
                out.push(b'r');
                out.extend_from_slice(&v.to_be_bytes());
            }
            LlsdValue::Date(v) => {
                out.push(b'd');
                out.extend_from_slice(&v.to_le_bytes());
            }
            LlsdValue::Uuid(id) => {
                out.push(b'u');
                out.extend_from_slice(id);
            }
            LlsdValue::String(s) => {
                out.push(b's');
                put_len(out, s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
            LlsdValue::Uri(s) => {
                out.push(b'l');
                put_len(out, s.len())?;
                out.extend_from_slice(s.as_bytes());
            }
            LlsdValue::Binary(raw) => {
                out.push(b'b');
                put_len(out, raw.len())?;
                out.extend_from_slice(raw);
            }
            LlsdValue::Array(items) => {
                out.push(b'[');
                put_len(out, items.len())?;
                for item in items {
                    item.write_binary(out)?;
                }
                out.push(b']');
            }
            LlsdValue::Map(entries) => {
                out.push(b'{');
                put_len(out, entries.len())?;
                for (key, item) in entries {
                    out.push(b'k');
                    put_len(out, key.len())?;
                    out.extend_from_slice(key.as_bytes());
                    item.write_binary(out)?;
                }
                out.push(b'}');
            }
        }
        Ok(())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LlsdValue::Undefined => "undefined",
            LlsdValue::Boolean(_) => "boolean",
            LlsdValue::Integer(_) => "integer",
            LlsdValue::Real(_) => "real",
            LlsdValue::Uuid(_) => "uuid",
            LlsdValue::String(_) => "string",
            LlsdValue::Uri(_) => "uri",
            LlsdValue::Date(_) => "date",
            LlsdValue::Binary(_) => "binary",
            LlsdValue::Array(_) => "array",
            LlsdValue::Map(_) => "map",
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, LlsdValue::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LlsdValue::Boolean(v) => Some(*v),
            LlsdValue::Integer(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            LlsdValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Get a real, promoting integers
    pub fn as_real(&self) -> Option<f64> {
        match self {
            LlsdValue::Real(v) => Some(*v),
            LlsdValue::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LlsdValue::String(s) | LlsdValue::Uri(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            LlsdValue::Binary(raw) => Some(raw),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[LlsdValue]> {
        match self {
            LlsdValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, LlsdValue>> {
        match self {
            LlsdValue::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key when this value is a map
    pub fn get(&self, key: &str) -> Option<&LlsdValue> {
        self.as_map().and_then(|m| m.get(key))
    }

    fn mismatch(&self, expected: &'static str) -> Error {
        Error::UnexpectedType {
            expected,
            found: self.type_name(),
        }
    }

    pub fn require_integer(&self) -> Result<i32> {
        self.as_integer().ok_or_else(|| self.mismatch("integer"))
    }

    pub fn require_real(&self) -> Result<f64> {
        self.as_real().ok_or_else(|| self.mismatch("real"))
    }

    pub fn require_binary(&self) -> Result<&[u8]> {
        self.as_binary().ok_or_else(|| self.mismatch("binary"))
    }

    pub fn require_array(&self) -> Result<&[LlsdValue]> {
        self.as_array().ok_or_else(|| self.mismatch("array"))
    }

    pub fn require_map(&self) -> Result<&BTreeMap<String, LlsdValue>> {
        self.as_map().ok_or_else(|| self.mismatch("map"))
    }
}

impl From<bool> for LlsdValue {
    fn from(v: bool) -> Self {
        LlsdValue::Boolean(v)
    }
}

impl From<i32> for LlsdValue {
    fn from(v: i32) -> Self {
        LlsdValue::Integer(v)
    }
}

impl From<f64> for LlsdValue {
    fn from(v: f64) -> Self {
        LlsdValue::Real(v)
    }
}

impl From<&str> for LlsdValue {
    fn from(v: &str) -> Self {
        LlsdValue::String(v.to_string())
    }
}

impl From<String> for LlsdValue {
    fn from(v: String) -> Self {
        LlsdValue::String(v)
    }
}

impl From<Vec<u8>> for LlsdValue {
    fn from(v: Vec<u8>) -> Self {
        LlsdValue::Binary(v)
    }
}

impl From<Vec<LlsdValue>> for LlsdValue {
    fn from(v: Vec<LlsdValue>) -> Self {
        LlsdValue::Array(v)
    }
}

impl From<BTreeMap<String, LlsdValue>> for LlsdValue {
    fn from(v: BTreeMap<String, LlsdValue>) -> Self {
        LlsdValue::Map(v)
    }
}

impl<K: Into<String>, V: Into<LlsdValue>> FromIterator<(K, V)> for LlsdValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        LlsdValue::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::{Serialize, Serializer};

use crate::date::Date;
use crate::error::{ConvertError, Result};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Raw bytes, shown as lowercase hex.
    Bytes(#[serde(serialize_with = "bytes_as_hex")] Bytes),
    /// Text, including hex/BCD digits.
    Str(String),
    Uint(u64),
    Int(i64),
    /// Enum code with its label, when the code is known.
    Enum { code: u8, label: Option<String> },
    /// Two signed axes.
    Point { x: i64, y: i64 },
    Date(#[serde(serialize_with = "as_display")] Date),
}

impl Value {
    /// Variant name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Str(_) => "string",
            Self::Uint(_) => "unsigned",
            Self::Int(_) => "integer",
            Self::Enum { .. } => "enum",
            Self::Point { .. } => "point",
            Self::Date(_) => "date",
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Uint(v) => Some(*v),
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::Enum { code, .. } => Some(u64::from(*code)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_str()),
            Self::Enum { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_ref()),
            Self::Str(s) => Some(s.as_bytes()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(b) => f.write_str(&hex::encode(b)),
            Self::Str(s) => f.write_str(s),
            Self::Uint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Enum {
                label: Some(label),
                ..
            } => f.write_str(label),
            Self::Enum { code, label: None } => write!(f, "#{code}"),
            Self::Point { x, y } => write!(f, "({x}, {y})"),
            Self::Date(d) => write!(f, "{d}"),
        }
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::Uint(v)
    }
}

impl From<u8> for Value {
    fn from(v: u8) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Uint(u64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(v))
    }
}

impl From<Date> for Value {
    fn from(v: Date) -> Self {
        Self::Date(v)
    }
}

fn bytes_as_hex<S: Serializer>(bytes: &Bytes, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

fn as_display<T: fmt::Display, S: Serializer>(
    value: &T,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

/// Code/label table of an enum field, kept sorted by code.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Options {
    codes: Vec<u8>,
    labels: Vec<String>,
}

impl Options {
    /// Labels numbered from zero in the given order.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).take(256).collect();
        let codes = (0..labels.len()).map(|i| i as u8).collect();
        Self { codes, labels }
    }

    /// Explicit code/label pairs. A repeated code keeps its last label.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u8, S)>,
        S: Into<String>,
    {
        let sorted: BTreeMap<u8, String> = pairs
            .into_iter()
            .map(|(code, label)| (code, label.into()))
            .collect();
        let (codes, labels) = sorted.into_iter().unzip();
        Self { codes, labels }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code and label at `index`.
    pub fn item(&self, index: usize) -> Option<(u8, &str)> {
        Some((*self.codes.get(index)?, self.labels.get(index)?.as_str()))
    }

    /// Index of `code`.
    pub fn by_code(&self, code: u8) -> Option<usize> {
        self.codes.binary_search(&code).ok()
    }

    /// Index of the first option labelled `label`.
    pub fn by_label(&self, label: &str, case_sensitive: bool) -> Option<usize> {
        self.labels.iter().position(|candidate| {
            if case_sensitive {
                candidate == label
            } else {
                candidate.eq_ignore_ascii_case(label)
            }
        })
    }

    /// Label of `code`.
    pub fn label(&self, code: u8) -> Option<&str> {
        self.by_code(code).map(|i| self.labels[i].as_str())
    }

    /// Options in code order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.codes
            .iter()
            .copied()
            .zip(self.labels.iter().map(String::as_str))
    }

    fn value(&self, code: u8) -> Value {
        Value::Enum {
            code,
            label: self.label(code).map(str::to_owned),
        }
    }
}

/// Plane quadrant carrying the signs of a [`Scalar::TwoDim`] value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quadrant {
    /// x and y positive.
    #[default]
    First,
    /// x negative, y positive.
    Second,
    /// x and y negative.
    Third,
    /// x positive, y negative.
    Fourth,
}

impl Quadrant {
    /// Quadrant from its number, 1 to 4.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            4 => Some(Self::Fourth),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
        }
    }

    /// Quadrant holding the point `(x, y)`.
    pub fn of(x: i64, y: i64) -> Self {
        match (x < 0, y < 0) {
            (false, false) => Self::First,
            (true, false) => Self::Second,
            (true, true) => Self::Third,
            (false, true) => Self::Fourth,
        }
    }

    fn signs(self) -> (bool, bool) {
        match self {
            Self::First => (false, false),
            Self::Second => (true, false),
            Self::Third => (true, true),
            Self::Fourth => (false, true),
        }
    }
}

/// Codec for one fixed-width field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scalar {
    /// Raw bytes.
    Bytes { size: usize },
    /// UTF-8 text; NUL padding is trimmed on decode and invalid
    /// sequences become U+FFFD.
    Str { size: usize },
    /// Hex/BCD digits, two per byte.
    Hex { size: usize },
    /// Big-endian unsigned integer of 1 to 8 bytes.
    Uint { size: usize },
    /// Big-endian two's complement integer of 1 to 8 bytes.
    Int { size: usize },
    /// One byte. Decoding a longer chunk takes its last byte.
    Byte,
    /// One-byte code looked up in an option table.
    Enum(Options),
    /// Two unsigned axes of `size` bytes each; signs come from `quadrant`.
    TwoDim { size: usize, quadrant: Quadrant },
    /// Unix seconds, 8-byte signed.
    Timestamp,
    /// `YYYYMMDD` as 4 BCD bytes.
    Date,
}

impl Scalar {
    /// Codec name, as used in layout files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes { .. } => "bytes",
            Self::Str { .. } => "string",
            Self::Hex { .. } => "hex",
            Self::Uint { .. } => "uint",
            Self::Int { .. } => "int",
            Self::Byte => "byte",
            Self::Enum(_) => "enum",
            Self::TwoDim { .. } => "twodim",
            Self::Timestamp => "timestamp",
            Self::Date => "date",
        }
    }

    /// Bytes occupied in a message.
    pub fn width(&self) -> usize {
        match self {
            Self::Bytes { size }
            | Self::Str { size }
            | Self::Hex { size }
            | Self::Uint { size }
            | Self::Int { size } => *size,
            Self::Byte | Self::Enum(_) => 1,
            Self::TwoDim { size, .. } => size * 2,
            Self::Timestamp => 8,
            Self::Date => 4,
        }
    }

    /// Reject widths the codec cannot represent.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Uint { size } | Self::Int { size } | Self::TwoDim { size, .. }
                if !(1..=8).contains(size) =>
            {
                Err(ConvertError::Width {
                    kind: self.kind(),
                    size: *size,
                })
            }
            _ => Ok(()),
        }
    }

    /// Encode `value` into field bytes.
    ///
    /// Variable text and byte values are returned as given; the field layout
    /// pads or truncates them to the field width.
    pub fn encode(&self, value: &Value) -> Result<Bytes> {
        let mismatch = || ConvertError::Mismatch {
            kind: self.kind(),
            value: value.type_name(),
        };
        match (self, value) {
            (Self::Bytes { .. } | Self::Str { .. }, _) => value
                .as_bytes()
                .map(Bytes::copy_from_slice)
                .ok_or_else(mismatch),
            (Self::Hex { .. }, Value::Str(digits)) => Ok(Bytes::from(hex::decode(digits)?)),
            (Self::Hex { .. }, Value::Bytes(raw)) => Ok(raw.clone()),
            (Self::Uint { size }, _) => put_uint(value.as_u64().ok_or_else(mismatch)?, *size),
            (Self::Int { size }, _) => put_int(value.as_i64().ok_or_else(mismatch)?, *size),
            (Self::Byte, _) => put_uint(value.as_u64().ok_or_else(mismatch)?, 1),
            (Self::Enum(_), Value::Enum { code, .. }) => Ok(Bytes::copy_from_slice(&[*code])),
            (Self::Enum(options), Value::Str(label)) => {
                let index = options
                    .by_label(label, false)
                    .ok_or_else(|| ConvertError::UnknownLabel(label.clone()))?;
                Ok(Bytes::copy_from_slice(&[options.codes[index]]))
            }
            (Self::Enum(_), Value::Uint(code)) => put_uint(*code, 1),
            (Self::TwoDim { size, .. }, Value::Point { x, y }) => {
                let mut out = put_uint(x.unsigned_abs(), *size)?.to_vec();
                out.extend_from_slice(&put_uint(y.unsigned_abs(), *size)?);
                Ok(Bytes::from(out))
            }
            (Self::Timestamp, Value::Int(secs)) => put_int(*secs, 8),
            (Self::Timestamp, Value::Date(date)) => put_int(date.to_timestamp(), 8),
            (Self::Date, Value::Date(date)) => encode_date(date),
            (Self::Date, Value::Int(secs)) => encode_date(&Date::from_timestamp(*secs)),
            (Self::Date, Value::Str(text)) => encode_date(&text.parse()?),
            _ => Err(mismatch()),
        }
    }

    /// Decode field bytes. An absent field decodes to the codec's zero value.
    ///
    /// Content never fails a decode: bad text is replaced lossily and an
    /// unreadable date becomes the zero date.
    pub fn decode(&self, chunk: Option<&[u8]>) -> Result<Value> {
        let Some(chunk) = chunk else {
            return Ok(self.zero());
        };
        Ok(match self {
            Self::Bytes { .. } => Value::Bytes(Bytes::copy_from_slice(chunk)),
            Self::Str { .. } => Value::Str(String::from_utf8_lossy(trim_nul(chunk)).into_owned()),
            Self::Hex { .. } => Value::Str(hex::encode(chunk)),
            Self::Uint { .. } => Value::Uint(be_uint(chunk)),
            Self::Int { .. } => Value::Int(be_int(chunk)),
            Self::Byte => Value::Uint(u64::from(chunk.last().copied().unwrap_or(0))),
            Self::Enum(options) => options.value(chunk.last().copied().unwrap_or(0)),
            Self::TwoDim { size, quadrant } => {
                let (x, y) = chunk.split_at((*size).min(chunk.len()));
                let (neg_x, neg_y) = quadrant.signs();
                Value::Point {
                    x: signed_axis(be_uint(x), neg_x)?,
                    y: signed_axis(be_uint(y), neg_y)?,
                }
            }
            Self::Timestamp => Value::Int(be_int(chunk)),
            // Zero fill and malformed digits both read as the zero date.
            Self::Date => {
                Value::Date(Date::parse_compact(&hex::encode(chunk)).unwrap_or_default())
            }
        })
    }

    fn zero(&self) -> Value {
        match self {
            Self::Bytes { .. } => Value::Bytes(Bytes::new()),
            Self::Str { .. } | Self::Hex { .. } => Value::Str(String::new()),
            Self::Uint { .. } | Self::Byte => Value::Uint(0),
            Self::Int { .. } | Self::Timestamp => Value::Int(0),
            Self::Enum(options) => options.value(0),
            Self::TwoDim { .. } => Value::Point { x: 0, y: 0 },
            Self::Date => Value::Date(Date::default()),
        }
    }
}

fn put_uint(value: u64, size: usize) -> Result<Bytes> {
    if !(1..=8).contains(&size) {
        return Err(ConvertError::Width { kind: "uint", size });
    }
    if size < 8 && value >> (8 * size) != 0 {
        return Err(ConvertError::Overflow {
            value: i128::from(value),
            size,
        });
    }
    Ok(Bytes::copy_from_slice(&value.to_be_bytes()[8 - size..]))
}

fn put_int(value: i64, size: usize) -> Result<Bytes> {
    if !(1..=8).contains(&size) {
        return Err(ConvertError::Width { kind: "int", size });
    }
    if size < 8 {
        let bits = 8 * size as u32 - 1;
        let (min, max) = (-(1i64 << bits), (1i64 << bits) - 1);
        if value < min || value > max {
            return Err(ConvertError::Overflow {
                value: i128::from(value),
                size,
            });
        }
    }
    Ok(Bytes::copy_from_slice(&value.to_be_bytes()[8 - size..]))
}

/// Big-endian unsigned value of the last (at most 8) bytes.
fn be_uint(chunk: &[u8]) -> u64 {
    let tail = &chunk[chunk.len().saturating_sub(8)..];
    tail.iter().fold(0, |acc, b| (acc << 8) | u64::from(*b))
}

/// Like [`be_uint`], sign-extended from the top bit of the bytes read.
fn be_int(chunk: &[u8]) -> i64 {
    let n = chunk.len().min(8);
    if n == 0 {
        return 0;
    }
    let shift = 64 - 8 * n as u32;
    ((be_uint(chunk) << shift) as i64) >> shift
}

fn signed_axis(magnitude: u64, negative: bool) -> Result<i64> {
    let value = i64::try_from(magnitude).map_err(|_| ConvertError::Overflow {
        value: i128::from(magnitude),
        size: 8,
    })?;
    Ok(if negative { -value } else { value })
}

fn encode_date(date: &Date) -> Result<Bytes> {
    if !(0..=9999).contains(&date.year()) {
        return Err(ConvertError::InvalidDate(date.to_string()));
    }
    Ok(Bytes::from(hex::decode(date.to_compact())?))
}

fn trim_nul(chunk: &[u8]) -> &[u8] {
    let start = chunk.iter().position(|b| *b != 0).unwrap_or(chunk.len());
    let end = chunk.iter().rposition(|b| *b != 0).map_or(start, |i| i + 1);
    &chunk[start..end]
}

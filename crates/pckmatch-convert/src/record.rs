use std::collections::HashMap;

use bytes::Bytes;
use pckmatch_field::{Field, FieldId, FieldMatcher, REST};
use tracing::trace;

use crate::date::Date;
use crate::error::{ConvertError, Result};
use crate::scalar::{Options, Quadrant, Scalar, Value};

/// A field layout with one codec per named field and a value table.
///
/// `encode` packs the table into a message; `decode` fills it from one.
/// The remainder is available under `"rest"` as [`Value::Bytes`].
#[derive(Debug, Clone, Default)]
pub struct Record {
    matcher: FieldMatcher,
    codecs: HashMap<String, Scalar>,
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a field decoded with `codec`, at the front or the back.
    pub fn add_field(&mut self, name: &str, codec: Scalar, back: bool) -> Result<FieldId> {
        self.register(name, codec, back, false)
    }

    /// Register a field that overlays the layout without narrowing `rest`.
    ///
    /// Optional fields are decoded when the message is long enough and are
    /// never written by `encode`.
    pub fn add_optional_field(&mut self, name: &str, codec: Scalar, back: bool) -> Result<FieldId> {
        self.register(name, codec, back, true)
    }

    fn register(&mut self, name: &str, codec: Scalar, back: bool, optional: bool) -> Result<FieldId> {
        codec.validate()?;
        let width = codec.width() as isize;
        let field = Field::new(if back { -width } else { width }, optional);
        let id = self.matcher.add_field(name, field)?;
        if let Some(name) = self.matcher.name(id) {
            self.codecs.insert(name.to_owned(), codec);
        }
        Ok(id)
    }

    /// Register an unnamed placeholder. Negative sizes anchor at the back.
    pub fn add_span(&mut self, size: isize) -> Result<FieldId> {
        Ok(self.matcher.add_span(size)?)
    }

    pub fn add_bytes_field(&mut self, name: &str, size: usize, back: bool) -> Result<FieldId> {
        self.add_field(name, Scalar::Bytes { size }, back)
    }

    pub fn add_str_field(&mut self, name: &str, size: usize) -> Result<FieldId> {
        self.add_field(name, Scalar::Str { size }, false)
    }

    pub fn add_hex_field(&mut self, name: &str, size: usize) -> Result<FieldId> {
        self.add_field(name, Scalar::Hex { size }, false)
    }

    pub fn add_uint_field(&mut self, name: &str, size: usize, back: bool) -> Result<FieldId> {
        self.add_field(name, Scalar::Uint { size }, back)
    }

    pub fn add_int_field(&mut self, name: &str, size: usize) -> Result<FieldId> {
        self.add_field(name, Scalar::Int { size }, false)
    }

    pub fn add_byte_field(&mut self, name: &str, back: bool) -> Result<FieldId> {
        self.add_field(name, Scalar::Byte, back)
    }

    pub fn add_enum_field(&mut self, name: &str, options: Options) -> Result<FieldId> {
        self.add_field(name, Scalar::Enum(options), false)
    }

    pub fn add_two_dim_field(
        &mut self,
        name: &str,
        size: usize,
        quadrant: Quadrant,
    ) -> Result<FieldId> {
        self.add_field(name, Scalar::TwoDim { size, quadrant }, false)
    }

    pub fn add_timestamp_field(&mut self, name: &str) -> Result<FieldId> {
        self.add_field(name, Scalar::Timestamp, false)
    }

    pub fn add_date_field(&mut self, name: &str) -> Result<FieldId> {
        self.add_field(name, Scalar::Date, false)
    }

    /// The underlying layout.
    pub fn matcher(&self) -> &FieldMatcher {
        &self.matcher
    }

    /// Codec registered under `name`.
    pub fn codec(&self, name: &str) -> Option<&Scalar> {
        self.codecs.get(name)
    }

    /// Store a value for a named field or for `"rest"`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        if name != REST && !self.codecs.contains_key(name) {
            return Err(ConvertError::UnknownField(name.to_owned()));
        }
        self.values.insert(name.to_owned(), value.into());
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_u64(&self, name: &str) -> Result<u64> {
        let value = self.require(name)?;
        value.as_u64().ok_or_else(|| self.mismatch(name, value))
    }

    pub fn get_i64(&self, name: &str) -> Result<i64> {
        let value = self.require(name)?;
        value.as_i64().ok_or_else(|| self.mismatch(name, value))
    }

    pub fn get_str(&self, name: &str) -> Result<&str> {
        let value = self.require(name)?;
        value.as_str().ok_or_else(|| self.mismatch(name, value))
    }

    pub fn get_bytes(&self, name: &str) -> Result<&[u8]> {
        let value = self.require(name)?;
        value.as_bytes().ok_or_else(|| self.mismatch(name, value))
    }

    pub fn get_date(&self, name: &str) -> Result<Date> {
        match self.require(name)? {
            Value::Date(date) => Ok(*date),
            other => Err(self.mismatch(name, other)),
        }
    }

    fn require(&self, name: &str) -> Result<&Value> {
        self.values
            .get(name)
            .ok_or_else(|| ConvertError::UnknownField(name.to_owned()))
    }

    fn mismatch(&self, name: &str, value: &Value) -> ConvertError {
        ConvertError::Mismatch {
            kind: self.codecs.get(name).map_or("bytes", Scalar::kind),
            value: value.type_name(),
        }
    }

    /// Drop every stored value.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Pack the stored values into one message.
    ///
    /// Fields without a value are written as zeros.
    pub fn encode(&self) -> Result<Bytes> {
        let mut raw: HashMap<&str, Bytes> = HashMap::with_capacity(self.values.len());
        for (name, value) in &self.values {
            let bytes = match self.codecs.get(name) {
                Some(codec) => codec.encode(value)?,
                None => value
                    .as_bytes()
                    .map(Bytes::copy_from_slice)
                    .ok_or_else(|| self.mismatch(name, value))?,
            };
            raw.insert(name.as_str(), bytes);
        }
        Ok(self.matcher.build(&raw))
    }

    /// Replace the stored values with those decoded from `chunk`.
    ///
    /// Absent fields take their codec's zero value; a remainder that does not
    /// fit is left out.
    pub fn decode(&mut self, chunk: &[u8]) -> Result<()> {
        let matched = self.matcher.match_bytes(chunk, true);
        let mut values = HashMap::with_capacity(self.codecs.len() + 1);
        for (name, codec) in &self.codecs {
            let bytes = matched.get(name);
            if bytes.is_none() {
                trace!(field = %name, len = chunk.len(), "field absent");
            }
            values.insert(name.clone(), codec.decode(bytes)?);
        }
        if let Some(rest) = matched.rest() {
            values.insert(REST.to_owned(), Value::Bytes(Bytes::copy_from_slice(rest)));
        }
        self.values = values;
        Ok(())
    }

    /// Named values in buffer order: front fields, `rest`, back fields.
    ///
    /// Anonymous spans and fields without a value are skipped.
    pub fn entries(&self) -> Vec<(&str, &Value)> {
        let matcher = &self.matcher;
        let named = |id: &FieldId| matcher.name(*id);
        matcher
            .sequence()
            .iter()
            .filter_map(named)
            .chain(std::iter::once(REST))
            .chain(matcher.reverse().iter().rev().filter_map(named))
            .filter_map(|name| self.values.get(name).map(|value| (name, value)))
            .collect()
    }
}

/// Explicit binding between a plain struct and a [`Record`].
pub trait Packable {
    /// The record layout shared by every instance.
    fn layout() -> Result<Record>;

    /// Copy this value's fields into `record`.
    fn store(&self, record: &mut Record) -> Result<()>;

    /// Read this value's fields back from a decoded `record`.
    fn load(&mut self, record: &Record) -> Result<()>;
}

/// Pack `item` into a message.
pub fn serialize<T: Packable>(item: &T) -> Result<Bytes> {
    let mut record = T::layout()?;
    item.store(&mut record)?;
    record.encode()
}

/// Fill `item` from a message.
pub fn unserialize<T: Packable>(chunk: &[u8], item: &mut T) -> Result<()> {
    let mut record = T::layout()?;
    record.decode(chunk)?;
    item.load(&record)
}

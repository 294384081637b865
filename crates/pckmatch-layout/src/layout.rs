use std::io::Read;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use pckmatch_convert::{Escaper, Options, Quadrant, Record, Scalar};
use pckmatch_field::FieldMatcher;
use pckmatch_split::{Direction, Framing, Splitter, Trailing};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::LayoutLimits;
use crate::error::{LayoutError, Result};
use crate::schema::validate_document;

/// How framing tokens are written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenEncoding {
    /// Hex digits, e.g. `"7e"`.
    Hex,
    /// The token's bytes as a UTF-8 string, e.g. `"\r\n"`.
    #[default]
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndDirection {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingSpec {
    Deliver,
    Discard,
}

/// The `framing` section.
///
/// Either `end` (with an optional `start`) or `size` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FramingSpec {
    #[serde(default)]
    pub encoding: TokenEncoding,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_direction: Option<EndDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing: Option<TrailingSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapePreset {
    Jt808,
}

/// One byte-stuffing rule, both sides in hex.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EscapeRule {
    pub raw: String,
    pub escaped: String,
}

/// The `escape` section: a named preset or explicit rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum EscapeSpec {
    Preset(EscapePreset),
    Rules(Vec<EscapeRule>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Bytes,
    String,
    Hex,
    Uint,
    Int,
    Byte,
    Enum,
    TwoDim,
    Timestamp,
    Date,
    /// Unnamed placeholder of `size` bytes.
    Span,
}

/// One entry of `fields`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    #[serde(default)]
    pub name: String,
    pub kind: FieldKind,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub back: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrant: Option<u8>,
}

impl FieldSpec {
    /// Codec for this entry, `None` for spans.
    pub fn scalar(&self) -> Result<Option<Scalar>> {
        let sized = |build: fn(usize) -> Scalar| {
            if self.size == 0 {
                Err(self.invalid("size is required"))
            } else {
                Ok(Some(build(self.size)))
            }
        };
        match self.kind {
            FieldKind::Bytes => sized(|size| Scalar::Bytes { size }),
            FieldKind::String => sized(|size| Scalar::Str { size }),
            FieldKind::Hex => sized(|size| Scalar::Hex { size }),
            FieldKind::Uint => sized(|size| Scalar::Uint { size }),
            FieldKind::Int => sized(|size| Scalar::Int { size }),
            FieldKind::Byte => Ok(Some(Scalar::Byte)),
            FieldKind::Enum => Ok(Some(Scalar::Enum(Options::from_labels(
                self.labels.iter().cloned(),
            )))),
            FieldKind::TwoDim => {
                let quadrant = match self.quadrant {
                    None => Quadrant::First,
                    Some(n) => {
                        Quadrant::from_number(n).ok_or_else(|| self.invalid("quadrant must be 1 to 4"))?
                    }
                };
                if self.size == 0 {
                    return Err(self.invalid("size is required"));
                }
                Ok(Some(Scalar::TwoDim {
                    size: self.size,
                    quadrant,
                }))
            }
            FieldKind::Timestamp => Ok(Some(Scalar::Timestamp)),
            FieldKind::Date => Ok(Some(Scalar::Date)),
            FieldKind::Span => {
                if self.size == 0 {
                    Err(self.invalid("size is required"))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn invalid(&self, reason: &str) -> LayoutError {
        LayoutError::InvalidField {
            name: self.name.clone(),
            reason: reason.to_owned(),
        }
    }
}

/// A parsed layout document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub framing: FramingSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escape: Option<EscapeSpec>,
    pub fields: Vec<FieldSpec>,
}

impl Layout {
    /// Parse a layout from JSON text with default limits.
    pub fn from_json(text: &str) -> Result<Self> {
        Self::from_json_with_limits(text, &LayoutLimits::default())
    }

    /// Parse a layout from JSON text.
    pub fn from_json_with_limits(text: &str, limits: &LayoutLimits) -> Result<Self> {
        if text.len() > limits.max_file_size {
            return Err(LayoutError::LoadFailed(format!(
                "layout too large ({} bytes)",
                text.len()
            )));
        }
        let document: Value = serde_json::from_str(text)?;
        Self::from_value(document, limits)
    }

    /// Validate and deserialize an already parsed document.
    pub fn from_value(document: Value, limits: &LayoutLimits) -> Result<Self> {
        validate_document(&document)?;
        let layout: Self = serde_json::from_value(document)?;
        if layout.fields.len() > limits.max_fields {
            return Err(LayoutError::TooManyFields {
                count: layout.fields.len(),
                max: limits.max_fields,
            });
        }
        debug!(
            name = layout.name.as_deref().unwrap_or(""),
            fields = layout.fields.len(),
            "layout loaded"
        );
        Ok(layout)
    }

    /// Load a layout file with default limits.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_file_with_limits(path, &LayoutLimits::default())
    }

    /// Load a layout file, refusing files above `limits.max_file_size`.
    pub fn from_file_with_limits(path: &Path, limits: &LayoutLimits) -> Result<Self> {
        let file = std::fs::File::open(path).map_err(|err| {
            LayoutError::LoadFailed(format!("failed opening layout {}: {err}", path.display()))
        })?;
        let metadata = file
            .metadata()
            .map_err(|err| LayoutError::LoadFailed(err.to_string()))?;
        if !metadata.is_file() {
            return Err(LayoutError::LoadFailed(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        if metadata.len() > limits.max_file_size as u64 {
            return Err(LayoutError::LoadFailed(format!(
                "layout file too large ({} bytes): {}",
                metadata.len(),
                path.display()
            )));
        }

        let read_limit = u64::try_from(limits.max_file_size.saturating_add(1)).unwrap_or(u64::MAX);
        let mut content = String::new();
        file.take(read_limit)
            .read_to_string(&mut content)
            .map_err(|err| {
                LayoutError::LoadFailed(format!("failed reading layout {}: {err}", path.display()))
            })?;
        Self::from_json_with_limits(&content, limits)
    }

    /// The framing rule.
    pub fn framing(&self) -> Result<Framing> {
        let spec = &self.framing;
        if let Some(size) = spec.size {
            return Ok(Framing::fixed(
                size,
                spec.interval_ms.map(Duration::from_millis),
            )?);
        }

        let end = spec
            .end
            .as_deref()
            .ok_or_else(|| LayoutError::ValidationFailed("framing needs `end` or `size`".into()))?;
        let end = self.token("end", end)?;
        let start = spec
            .start
            .as_deref()
            .map(|start| self.token("start", start))
            .transpose()?;
        let framing = Framing::from_tokens(start.as_deref(), &end)?;
        Ok(match spec.end_direction {
            Some(EndDirection::Forward) => framing.with_end_direction(Direction::Forward),
            Some(EndDirection::Backward) => framing.with_end_direction(Direction::Backward),
            None => framing,
        })
    }

    /// A splitter for the framing rule, with the trailing policy applied.
    pub fn splitter(&self) -> Result<Splitter> {
        let splitter = self.framing()?.splitter();
        Ok(match self.framing.trailing {
            Some(TrailingSpec::Deliver) => splitter.with_trailing(Trailing::Deliver),
            Some(TrailingSpec::Discard) => splitter.with_trailing(Trailing::Discard),
            None => splitter,
        })
    }

    /// Byte-stuffing rules; empty when the layout declares none.
    pub fn escaper(&self) -> Result<Escaper> {
        match &self.escape {
            None => Ok(Escaper::new()),
            Some(EscapeSpec::Preset(EscapePreset::Jt808)) => Ok(Escaper::jt808()),
            Some(EscapeSpec::Rules(rules)) => rules.iter().try_fold(Escaper::new(), |escaper, rule| {
                let raw = decode_hex("escape", &rule.raw)?;
                let escaped = decode_hex("escape", &rule.escaped)?;
                match (raw.as_slice(), escaped.as_slice()) {
                    ([raw], [first, second]) => Ok(escaper.with_rule(*raw, [*first, *second])),
                    _ => Err(LayoutError::InvalidToken {
                        role: "escape",
                        value: format!("{} -> {}", rule.raw, rule.escaped),
                        reason: "rules map one byte to two".into(),
                    }),
                }
            }),
        }
    }

    /// Message body of a frame: delimiters stripped, escapes undone.
    pub fn body(&self, frame: &[u8]) -> Result<Bytes> {
        let start = match &self.framing.start {
            Some(start) => self.token("start", start)?,
            None => Bytes::new(),
        };
        let end = match &self.framing.end {
            Some(end) => self.token("end", end)?,
            None => Bytes::new(),
        };
        Ok(self.escaper()?.unwrap_frame(frame, &start, &end))
    }

    /// A record with one codec per named field.
    pub fn record(&self) -> Result<Record> {
        let mut record = Record::new();
        for spec in &self.fields {
            match spec.scalar()? {
                None => {
                    let size = spec.size as isize;
                    record.add_span(if spec.back { -size } else { size })?;
                }
                Some(codec) if spec.optional => {
                    record.add_optional_field(&spec.name, codec, spec.back)?;
                }
                Some(codec) => {
                    record.add_field(&spec.name, codec, spec.back)?;
                }
            }
        }
        Ok(record)
    }

    /// The bare field layout, without codecs.
    pub fn matcher(&self) -> Result<FieldMatcher> {
        Ok(self.record()?.matcher().clone())
    }

    fn token(&self, role: &'static str, text: &str) -> Result<Bytes> {
        match self.framing.encoding {
            TokenEncoding::Text => Ok(Bytes::copy_from_slice(text.as_bytes())),
            TokenEncoding::Hex => decode_hex(role, text).map(Bytes::from),
        }
    }
}

fn decode_hex(role: &'static str, text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|err| LayoutError::InvalidToken {
        role,
        value: text.to_owned(),
        reason: err.to_string(),
    })
}

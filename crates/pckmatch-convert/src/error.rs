use pckmatch_field::FieldError;

/// Errors raised by codecs and records.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// Field registration failed.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// A hex-coded field held something other than hex digits.
    #[error("invalid hex value: {0}")]
    Hex(#[from] hex::FromHexError),

    /// The codec does not support the declared width.
    #[error("{kind} field cannot be {size} bytes wide")]
    Width { kind: &'static str, size: usize },

    /// A number does not fit the declared width.
    #[error("value {value} does not fit in {size} bytes")]
    Overflow { value: i128, size: usize },

    /// The value variant does not match the codec.
    #[error("{kind} codec cannot encode a {value} value")]
    Mismatch {
        kind: &'static str,
        value: &'static str,
    },

    /// No option of an enum field carries this label.
    #[error("unknown enum label: {0}")]
    UnknownLabel(String),

    /// A date could not be parsed or is out of range.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A record has no field of this name.
    #[error("unknown field: {0}")]
    UnknownField(String),
}

pub type Result<T> = std::result::Result<T, ConvertError>;

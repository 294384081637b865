use pckmatch_convert::ConvertError;
use pckmatch_split::SplitError;

/// Errors raised while loading or applying a layout.
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    /// The layout file could not be read.
    #[error("failed to load layout: {0}")]
    LoadFailed(String),

    /// The document is not valid JSON or does not deserialize.
    #[error("layout is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The embedded schema could not be compiled.
    #[error("failed to compile layout schema: {0}")]
    CompileFailed(String),

    /// The document does not satisfy the layout schema.
    #[error("layout rejected: {0}")]
    ValidationFailed(String),

    /// The document declares more fields than allowed.
    #[error("layout declares {count} fields, limit is {max}")]
    TooManyFields { count: usize, max: usize },

    /// A framing token is not valid for its encoding.
    #[error("invalid {role} token {value:?}: {reason}")]
    InvalidToken {
        role: &'static str,
        value: String,
        reason: String,
    },

    /// A field entry is incomplete or inconsistent.
    #[error("invalid field {name:?}: {reason}")]
    InvalidField { name: String, reason: String },

    /// The framing rule was rejected.
    #[error(transparent)]
    Split(#[from] SplitError),

    /// A field could not be registered.
    #[error(transparent)]
    Convert(#[from] ConvertError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

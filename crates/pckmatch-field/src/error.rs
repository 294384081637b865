/// Errors raised while declaring fields.
///
/// Matching and building never fail; only registration does.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    /// A field with this name is already registered on the matcher.
    #[error("field name already registered: {0}")]
    DuplicateName(String),

    /// The name has the `+N`/`-N` shape kept for anonymous spans.
    #[error("field name is reserved for anonymous spans: {0}")]
    ReservedName(String),

    /// The start/stop pair mixes front and back anchors, or is inverted.
    #[error("invalid field bounds (start {start}, stop {stop})")]
    InvalidBounds { start: isize, stop: isize },
}

pub type Result<T> = std::result::Result<T, FieldError>;

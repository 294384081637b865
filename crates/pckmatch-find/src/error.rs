use pckmatch_convert::ConvertError;
use pckmatch_field::FieldError;

/// Errors raised while building or reading an index file.
#[derive(Debug, thiserror::Error)]
pub enum FindError {
    /// Reading or writing the file failed.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header or entry encoding failed.
    #[error("index encoding error: {0}")]
    Convert(#[from] ConvertError),

    /// The entry layout could not be declared.
    #[error("index entry layout error: {0}")]
    Field(#[from] FieldError),

    /// Key or position width outside the supported range.
    #[error("unsupported index sizes (key {key_size} bytes, position {pos_size} bytes)")]
    InvalidSizes { key_size: usize, pos_size: usize },

    /// A record offset does not fit the position width.
    #[error("record offset {offset} does not fit in {pos_size} bytes")]
    PositionOverflow { offset: u64, pos_size: usize },

    /// A record contains the NUL terminator.
    #[error("record {0} contains a NUL byte")]
    NulInRecord(usize),

    /// The header describes an index that cannot be in the file.
    #[error("corrupt index (begin {begin}, end {end}, {count} keys)")]
    CorruptIndex { begin: u32, end: u32, count: u32 },
}

pub type Result<T> = std::result::Result<T, FindError>;

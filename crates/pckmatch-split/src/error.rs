/// Errors that can occur while splitting a stream.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// A framing token was configured with no bytes.
    #[error("{role} token must not be empty")]
    EmptyToken { role: &'static str },

    /// Fixed-size framing was configured with a zero size.
    #[error("fixed frame size must be greater than zero")]
    ZeroFrameSize,

    /// The buffered bytes grew past the limit without producing a message.
    #[error("buffer overflow ({size} bytes buffered, max {max})")]
    BufferOverflow { size: usize, max: usize },

    /// An I/O error occurred while reading the source.
    #[error("split I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SplitError>;

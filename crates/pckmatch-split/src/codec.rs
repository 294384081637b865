use bytes::{Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::warn;

use crate::error::SplitError;
use crate::scanner::{next_message, ScanConfig, Step};
use crate::strategy::{Framing, Splitter};

/// Tokio decoder yielding one message per boundary.
///
/// Use with `tokio_util::codec::FramedRead` over any `AsyncRead`.
#[derive(Debug, Clone)]
pub struct SplitCodec {
    splitter: Splitter,
    max_buffer_size: usize,
}

impl SplitCodec {
    /// Decoder with default limits.
    pub fn new(framing: &Framing) -> Self {
        Self::with_splitter(framing.splitter(), ScanConfig::default())
    }

    /// Decoder around a pre-configured splitter.
    pub fn with_splitter(splitter: Splitter, config: ScanConfig) -> Self {
        Self {
            splitter,
            max_buffer_size: config.max_buffer_size,
        }
    }
}

impl Decoder for SplitCodec {
    type Item = Bytes;
    type Error = SplitError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match next_message(&mut self.splitter, src, false) {
            Step::Message(message) => Ok(Some(message)),
            Step::NeedMoreData | Step::Terminated => {
                if src.len() >= self.max_buffer_size {
                    warn!(
                        buffered = src.len(),
                        max = self.max_buffer_size,
                        "split buffer overflow"
                    );
                    return Err(SplitError::BufferOverflow {
                        size: src.len(),
                        max: self.max_buffer_size,
                    });
                }
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match next_message(&mut self.splitter, src, true) {
            Step::Message(message) => Ok(Some(message)),
            Step::NeedMoreData | Step::Terminated => {
                src.clear();
                Ok(None)
            }
        }
    }
}

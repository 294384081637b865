use std::io::{ErrorKind, Read};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use bytes::{Bytes, BytesMut};
use tracing::{debug, trace, warn};

use crate::error::{Result, SplitError};
use crate::strategy::{FrameResult, Framing, Splitter};

/// Default cap on bytes buffered without producing a message (1 MiB).
pub const DEFAULT_MAX_BUFFER: usize = 1024 * 1024;

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Scanner limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanConfig {
    /// Fail with [`SplitError::BufferOverflow`] once this many bytes are
    /// buffered and the rule still needs more.
    pub max_buffer_size: usize,
    /// Bytes requested from the source per read.
    pub read_chunk_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER,
            read_chunk_size: READ_CHUNK_SIZE,
        }
    }
}

pub(crate) enum Step {
    Message(Bytes),
    NeedMoreData,
    Terminated,
}

/// Run `splitter` over `buf` until it yields a non-empty message or stalls.
///
/// Consumed bytes are removed from `buf`; messages are zero-copy slices of
/// the consumed prefix.
pub(crate) fn next_message(splitter: &mut Splitter, buf: &mut BytesMut, at_eof: bool) -> Step {
    loop {
        match splitter.split(buf, at_eof) {
            FrameResult::NeedMoreData => return Step::NeedMoreData,
            FrameResult::Terminate => return Step::Terminated,
            FrameResult::Frame { consumed: 0, .. } if at_eof => return Step::Terminated,
            FrameResult::Frame { consumed: 0, .. } => return Step::NeedMoreData,
            FrameResult::Frame { consumed, message } => {
                let consumed = consumed.min(buf.len());
                let taken = buf.split_to(consumed).freeze();
                match message {
                    Some(range) if !range.is_empty() && range.end <= taken.len() => {
                        trace!(len = range.len(), consumed, "frame");
                        return Step::Message(taken.slice(range));
                    }
                    _ => debug!(discarded = consumed, "skipped unframed bytes"),
                }
            }
        }
    }
}

/// Split a complete in-memory buffer into messages.
pub fn split_buffer(framing: &Framing, input: &[u8]) -> Vec<Bytes> {
    let mut splitter = framing.splitter();
    let mut buf = BytesMut::from(input);
    let mut messages = Vec::new();
    while let Step::Message(message) = next_message(&mut splitter, &mut buf, true) {
        messages.push(message);
    }
    messages
}

/// Reads complete messages from any `Read` source.
///
/// Handles partial reads internally; callers only ever see whole messages.
/// Once the source is exhausted or fails, the scanner stays finished.
pub struct FrameScanner<R> {
    inner: R,
    buf: BytesMut,
    splitter: Splitter,
    config: ScanConfig,
    eof: bool,
    done: bool,
}

impl<R: Read> FrameScanner<R> {
    /// Create a scanner with default limits.
    pub fn new(inner: R, framing: &Framing) -> Self {
        Self::with_config(inner, framing, ScanConfig::default())
    }

    /// Create a scanner with explicit limits.
    pub fn with_config(inner: R, framing: &Framing, config: ScanConfig) -> Self {
        Self::with_splitter(inner, framing.splitter(), config)
    }

    /// Create a scanner around a pre-configured splitter.
    pub fn with_splitter(inner: R, splitter: Splitter, config: ScanConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            splitter,
            config,
            eof: false,
            done: false,
        }
    }

    /// Read the next complete message (blocking).
    ///
    /// Returns `Ok(None)` once the stream is finished.
    pub fn next_frame(&mut self) -> Result<Option<Bytes>> {
        if self.done {
            return Ok(None);
        }
        loop {
            match next_message(&mut self.splitter, &mut self.buf, self.eof) {
                Step::Message(message) => return Ok(Some(message)),
                Step::Terminated => return self.finish(),
                Step::NeedMoreData if self.eof => return self.finish(),
                Step::NeedMoreData => {}
            }

            if self.buf.len() >= self.config.max_buffer_size {
                warn!(
                    buffered = self.buf.len(),
                    max = self.config.max_buffer_size,
                    "split buffer overflow"
                );
                self.done = true;
                return Err(SplitError::BufferOverflow {
                    size: self.buf.len(),
                    max: self.config.max_buffer_size,
                });
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let start = self.buf.len();
        let chunk = self.config.read_chunk_size.max(1);
        self.buf.resize(start + chunk, 0);
        loop {
            match self.inner.read(&mut self.buf[start..]) {
                Ok(read) => {
                    self.buf.truncate(start + read);
                    if read == 0 {
                        self.eof = true;
                    }
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    self.done = true;
                    return Err(SplitError::Io(err));
                }
            }
        }
    }

    fn finish(&mut self) -> Result<Option<Bytes>> {
        if !self.buf.is_empty() {
            debug!(discarded = self.buf.len(), "dropping unframed tail");
            self.buf.clear();
        }
        self.done = true;
        Ok(None)
    }

    /// Deliver every message into `tx`, then drop it.
    ///
    /// At most one `Err` is sent and it is always the last item. Stops early
    /// when the receiving side hangs up.
    pub fn scan_into(mut self, tx: SyncSender<Result<Bytes>>) {
        loop {
            let item = match self.next_frame() {
                Ok(Some(message)) => Ok(message),
                Ok(None) => return,
                Err(err) => Err(err),
            };
            let failed = item.is_err();
            if tx.send(item).is_err() || failed {
                return;
            }
        }
    }

    /// Scan on a worker thread, delivering into a bounded channel.
    ///
    /// The channel closes when the stream is complete.
    pub fn spawn(self, capacity: usize) -> Receiver<Result<Bytes>>
    where
        R: Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(capacity);
        thread::spawn(move || self.scan_into(tx));
        rx
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the scanner and return the inner source.
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Current scanner limits.
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }
}

impl<R: Read> Iterator for FrameScanner<R> {
    type Item = Result<Bytes>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::strategy::Trailing;

    fn lines() -> Framing {
        Framing::end_only(&b"\r\n"[..]).unwrap()
    }

    #[test]
    fn read_multiple_messages() {
        let mut scanner = FrameScanner::new(Cursor::new(b"SET\r\nGET\r\n".to_vec()), &lines());

        assert_eq!(scanner.next_frame().unwrap().unwrap().as_ref(), b"SET\r\n");
        assert_eq!(scanner.next_frame().unwrap().unwrap().as_ref(), b"GET\r\n");
        assert!(scanner.next_frame().unwrap().is_none());
        assert!(scanner.next_frame().unwrap().is_none());
    }

    #[test]
    fn partial_read_handling() {
        let byte_reader = ByteByByteReader {
            bytes: b"*3\r\n**SET*".to_vec(),
            pos: 0,
        };
        let framing = Framing::same_token(&b"*"[..]).unwrap();
        let frames: Vec<_> = FrameScanner::new(byte_reader, &framing)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames, vec![Bytes::from_static(b"*3\r\n*"), Bytes::from_static(b"*SET*")]);
    }

    #[test]
    fn same_token_withholds_unterminated_fragment() {
        let framing = Framing::same_token(&b"*"[..]).unwrap();
        let frames: Vec<_> = FrameScanner::new(Cursor::new(b"*a*\n*b*\n*c".to_vec()), &framing)
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames, vec![Bytes::from_static(b"*a*"), Bytes::from_static(b"*b*")]);
    }

    #[test]
    fn trailing_fragment_delivered_at_eof() {
        let mut scanner = FrameScanner::new(Cursor::new(b"one\r\ntwo".to_vec()), &lines());
        assert_eq!(scanner.next_frame().unwrap().unwrap().as_ref(), b"one\r\n");
        assert_eq!(scanner.next_frame().unwrap().unwrap().as_ref(), b"two");
        assert!(scanner.next_frame().unwrap().is_none());
    }

    #[test]
    fn trailing_fragment_discarded_when_configured() {
        let splitter = lines().splitter().with_trailing(Trailing::Discard);
        let scanner = FrameScanner::with_splitter(
            Cursor::new(b"one\r\ntwo".to_vec()),
            splitter,
            ScanConfig::default(),
        );
        let frames: Vec<_> = scanner.collect::<Result<_>>().unwrap();
        assert_eq!(frames, vec![Bytes::from_static(b"one\r\n")]);
    }

    #[test]
    fn empty_source_finishes_cleanly() {
        let mut scanner = FrameScanner::new(Cursor::new(Vec::<u8>::new()), &lines());
        assert!(scanner.next_frame().unwrap().is_none());
    }

    #[test]
    fn small_read_chunks() {
        let config = ScanConfig {
            read_chunk_size: 3,
            ..ScanConfig::default()
        };
        let framing = Framing::fixed(4, None).unwrap();
        let scanner = FrameScanner::with_config(Cursor::new(b"abcdefghij".to_vec()), &framing, config);
        let frames: Vec<_> = scanner.collect::<Result<_>>().unwrap();
        assert_eq!(
            frames,
            vec![
                Bytes::from_static(b"abcd"),
                Bytes::from_static(b"efgh"),
                Bytes::from_static(b"ij"),
            ]
        );
    }

    #[test]
    fn buffer_overflow_is_fatal() {
        let config = ScanConfig {
            max_buffer_size: 8,
            read_chunk_size: 4,
        };
        let mut scanner =
            FrameScanner::with_config(Cursor::new(vec![b'a'; 32]), &lines(), config);
        let err = scanner.next_frame().unwrap_err();
        assert!(matches!(err, SplitError::BufferOverflow { size: 8, max: 8 }));
        assert!(scanner.next_frame().unwrap().is_none());
    }

    #[test]
    fn read_would_block_propagates_io_error() {
        let reader = FailFirst {
            kind: ErrorKind::WouldBlock,
            failed: false,
            bytes: b"ok\r\n".to_vec(),
            pos: 0,
        };
        let mut scanner = FrameScanner::new(reader, &lines());
        let err = scanner.next_frame().unwrap_err();
        assert!(matches!(err, SplitError::Io(e) if e.kind() == ErrorKind::WouldBlock));
        assert!(scanner.next().is_none());
    }

    #[test]
    fn interrupted_read_retries() {
        let reader = FailFirst {
            kind: ErrorKind::Interrupted,
            failed: false,
            bytes: b"ok\r\n".to_vec(),
            pos: 0,
        };
        let mut scanner = FrameScanner::new(reader, &lines());
        assert_eq!(scanner.next_frame().unwrap().unwrap().as_ref(), b"ok\r\n");
    }

    #[test]
    fn spawn_delivers_then_closes() {
        let input = b"a\r\nb\r\nc\r\n".to_vec();
        let rx = FrameScanner::new(Cursor::new(input), &lines()).spawn(1);

        let frames: Vec<_> = rx.iter().map(|item| item.unwrap()).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[2].as_ref(), b"c\r\n");
    }

    #[test]
    fn spawn_sends_error_last() {
        let reader = FailFirst {
            kind: ErrorKind::BrokenPipe,
            failed: false,
            bytes: Vec::new(),
            pos: 0,
        };
        let rx = FrameScanner::new(reader, &lines()).spawn(4);
        let items: Vec<_> = rx.iter().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(SplitError::Io(_))));
    }

    #[test]
    fn split_buffer_matches_scanner() {
        let framing = Framing::distinct(&b"*"[..], &b"\r\n"[..]).unwrap();
        let input = b"*1\r\n$4\r\nPING\r\n*1\r\n$4\r\nPING\r\n";
        let frames = split_buffer(&framing, input);
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_ref(), b"*1\r\n$4\r\nPING\r\n");

        let scanned: Vec<_> = FrameScanner::new(Cursor::new(input.to_vec()), &framing)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(scanned, frames);
    }

    #[test]
    fn accessors_and_into_inner() {
        let mut scanner = FrameScanner::new(Cursor::new(Vec::<u8>::new()), &lines());

        let _ = scanner.get_ref();
        let _ = scanner.get_mut();
        assert_eq!(scanner.config().max_buffer_size, DEFAULT_MAX_BUFFER);
        let _inner = scanner.into_inner();
    }

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct FailFirst {
        kind: ErrorKind,
        failed: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for FailFirst {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.failed {
                self.failed = true;
                return Err(std::io::Error::from(self.kind));
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}

use std::ops::Range;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::trace;

use crate::error::{Result, SplitError};
use crate::locate::{Direction, Location, TokenLocator};

/// Outcome of one split attempt over the bytes buffered so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameResult {
    /// No boundary yet; keep the buffer and supply more bytes.
    NeedMoreData,
    /// Nothing more will be produced from this stream.
    Terminate,
    /// Drop `consumed` bytes from the front of the buffer.
    ///
    /// `message` is the range of the input holding a complete message, or
    /// `None` when the consumed bytes were unmatched garbage.
    Frame {
        consumed: usize,
        message: Option<Range<usize>>,
    },
}

impl FrameResult {
    fn message(consumed: usize, message: Range<usize>) -> Self {
        Self::Frame {
            consumed,
            message: Some(message),
        }
    }

    fn discard(consumed: usize) -> Self {
        Self::Frame {
            consumed,
            message: None,
        }
    }
}

/// What happens to an unterminated fragment left when the stream ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trailing {
    /// Hand the fragment out as a final message.
    Deliver,
    /// Drop the fragment.
    Discard,
}

/// Message boundary rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// Messages end with a token and have no start marker.
    EndOnly { end: TokenLocator },
    /// Every message starts and ends with the same token.
    SameToken { token: TokenLocator },
    /// Messages open with `start` and close with `end`.
    ///
    /// The candidate region runs up to the next `start`; `end` is searched
    /// inside it in its own direction (backward by default).
    DistinctTokens {
        start: TokenLocator,
        end: TokenLocator,
    },
    /// Messages of `size` bytes. With an `interval`, a shorter message is
    /// emitted once that much time passed since the previous one.
    FixedInterval {
        size: usize,
        interval: Option<Duration>,
    },
}

impl Framing {
    /// Split after every `end` token.
    pub fn end_only(end: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::EndOnly {
            end: TokenLocator::with_role(end, Direction::Forward, "end")?,
        })
    }

    /// Split on pairs of one shared delimiter.
    pub fn same_token(token: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::SameToken {
            token: TokenLocator::with_role(token, Direction::Forward, "start")?,
        })
    }

    /// Split between a `start` and the last `end` before the next `start`.
    pub fn distinct(start: impl Into<Bytes>, end: impl Into<Bytes>) -> Result<Self> {
        Ok(Self::DistinctTokens {
            start: TokenLocator::with_role(start, Direction::Forward, "start")?,
            end: TokenLocator::with_role(end, Direction::Backward, "end")?,
        })
    }

    /// Pick the rule from a start/end token pair.
    ///
    /// No start token gives [`Framing::EndOnly`], identical tokens give
    /// [`Framing::SameToken`], anything else [`Framing::DistinctTokens`].
    pub fn from_tokens(start: Option<&[u8]>, end: &[u8]) -> Result<Self> {
        match start {
            None => Self::end_only(end.to_vec()),
            Some(start) if start == end => Self::same_token(start.to_vec()),
            Some(start) => Self::distinct(start.to_vec(), end.to_vec()),
        }
    }

    /// Fixed-size messages, optionally flushed on a timer.
    pub fn fixed(size: usize, interval: Option<Duration>) -> Result<Self> {
        if size == 0 {
            return Err(SplitError::ZeroFrameSize);
        }
        Ok(Self::FixedInterval { size, interval })
    }

    /// Change the end-token search direction of [`Framing::DistinctTokens`].
    ///
    /// `Forward` ends a message at the first end token after its start
    /// token. Other rules are returned unchanged.
    pub fn with_end_direction(self, direction: Direction) -> Self {
        match self {
            Self::DistinctTokens { start, end } if end.direction() != direction => {
                Self::DistinctTokens {
                    start,
                    end: end.reversed(),
                }
            }
            other => other,
        }
    }

    /// End-of-stream policy used unless overridden.
    ///
    /// Only [`Framing::EndOnly`] and [`Framing::FixedInterval`] deliver a
    /// trailing fragment.
    pub fn default_trailing(&self) -> Trailing {
        match self {
            Self::EndOnly { .. } | Self::FixedInterval { .. } => Trailing::Deliver,
            Self::SameToken { .. } | Self::DistinctTokens { .. } => Trailing::Discard,
        }
    }

    /// Fresh per-stream splitter for this rule.
    pub fn splitter(&self) -> Splitter {
        Splitter::new(self.clone())
    }
}

/// Applies a [`Framing`] rule to one stream.
///
/// Holds the only mutable state a rule needs (the timer of
/// [`Framing::FixedInterval`]), so each stream gets its own splitter.
#[derive(Debug, Clone)]
pub struct Splitter {
    framing: Framing,
    trailing: Trailing,
    last_emit: Instant,
}

impl Splitter {
    /// Create a splitter with the rule's default trailing policy.
    pub fn new(framing: Framing) -> Self {
        let trailing = framing.default_trailing();
        Self {
            framing,
            trailing,
            last_emit: Instant::now(),
        }
    }

    /// Override the end-of-stream policy.
    pub fn with_trailing(mut self, trailing: Trailing) -> Self {
        self.trailing = trailing;
        self
    }

    /// The boundary rule.
    pub fn framing(&self) -> &Framing {
        &self.framing
    }

    /// The end-of-stream policy.
    pub fn trailing(&self) -> Trailing {
        self.trailing
    }

    /// Find the next boundary in `data`.
    ///
    /// `at_eof` tells the rule that no more bytes will follow. A result that
    /// consumes nothing always means "need more data".
    pub fn split(&mut self, data: &[u8], at_eof: bool) -> FrameResult {
        match &self.framing {
            Framing::EndOnly { end } => split_after(end, data, at_eof, self.trailing),
            Framing::SameToken { token } => split_both(token, data, at_eof, self.trailing),
            Framing::DistinctTokens { start, end } => {
                split_between(start, end, data, at_eof, self.trailing)
            }
            Framing::FixedInterval { size, interval } => split_fixed(
                *size,
                *interval,
                &mut self.last_emit,
                data,
                at_eof,
                self.trailing,
            ),
        }
    }
}

/// Locate `locator` once, then again in what follows it.
///
/// Returns the first location and the absolute offset of the second one.
pub fn locate_twice(locator: &TokenLocator, data: &[u8]) -> Option<(Location, Option<usize>)> {
    let first = locator.locate(data)?;
    let next = locator
        .locate(&data[first.end()..])
        .map(|loc| first.end() + loc.position);
    Some((first, next))
}

fn split_after(end: &TokenLocator, data: &[u8], at_eof: bool, trailing: Trailing) -> FrameResult {
    if data.is_empty() {
        return if at_eof {
            FrameResult::Terminate
        } else {
            FrameResult::NeedMoreData
        };
    }
    match end.locate(data) {
        Some(loc) => FrameResult::message(loc.end(), 0..loc.end()),
        None if at_eof => match trailing {
            Trailing::Deliver => FrameResult::message(data.len(), 0..data.len()),
            Trailing::Discard => FrameResult::Terminate,
        },
        None => FrameResult::NeedMoreData,
    }
}

fn split_both(token: &TokenLocator, data: &[u8], at_eof: bool, trailing: Trailing) -> FrameResult {
    let Some((first, next)) = locate_twice(token, data) else {
        return if at_eof {
            FrameResult::Terminate
        } else {
            FrameResult::NeedMoreData
        };
    };
    match next {
        Some(next) => {
            let stop = next + first.len;
            FrameResult::message(stop, first.position..stop)
        }
        None if first.position > 0 => {
            trace!(discarded = first.position, "bytes before first delimiter");
            FrameResult::discard(first.position)
        }
        None if at_eof => match trailing {
            Trailing::Deliver => FrameResult::message(data.len(), 0..data.len()),
            Trailing::Discard => FrameResult::Terminate,
        },
        None => FrameResult::NeedMoreData,
    }
}

fn split_between(
    start: &TokenLocator,
    end: &TokenLocator,
    data: &[u8],
    at_eof: bool,
    trailing: Trailing,
) -> FrameResult {
    let Some((first, next)) = locate_twice(start, data) else {
        return if at_eof {
            FrameResult::Terminate
        } else {
            FrameResult::NeedMoreData
        };
    };
    let bound = match next {
        Some(next) => next,
        None if at_eof => data.len(),
        None => return FrameResult::NeedMoreData,
    };

    let body = first.end()..bound;
    match end.locate(&data[body.clone()]) {
        Some(loc) => {
            let stop = body.start + loc.end();
            FrameResult::message(stop, first.position..stop)
        }
        None if next.is_none() && trailing == Trailing::Deliver => {
            FrameResult::message(bound, first.position..bound)
        }
        None => {
            trace!(discarded = bound, "start token without end token");
            FrameResult::discard(bound)
        }
    }
}

fn split_fixed(
    size: usize,
    interval: Option<Duration>,
    last_emit: &mut Instant,
    data: &[u8],
    at_eof: bool,
    trailing: Trailing,
) -> FrameResult {
    if data.is_empty() {
        return if at_eof {
            FrameResult::Terminate
        } else {
            FrameResult::NeedMoreData
        };
    }
    let take = if data.len() >= size {
        size
    } else if at_eof {
        match trailing {
            Trailing::Deliver => data.len(),
            Trailing::Discard => return FrameResult::Terminate,
        }
    } else if interval.is_some_and(|interval| last_emit.elapsed() >= interval) {
        data.len()
    } else {
        return FrameResult::NeedMoreData;
    };
    *last_emit = Instant::now();
    FrameResult::message(take, 0..take)
}

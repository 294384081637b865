use std::ops::Range;

use crate::error::{FieldError, Result};

/// A byte range inside a message, anchored at the front or at the back.
///
/// Offsets follow slice conventions: `start` is inclusive, `stop` exclusive.
/// Non-negative offsets count from the front of the buffer, negative offsets
/// count back from its end. A `stop` of `0` means "end of buffer".
///
/// ```text
///  front field        rest             back field
/// ┌──────────┬───────────────────────┬──────────┐
/// │ start=0  │ start=4, stop=-2      │ start=-2 │
/// │ stop=4   │                       │ stop=0   │
/// └──────────┴───────────────────────┴──────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Field {
    /// Declared width in bytes. `0` marks a variable-length field.
    pub size: usize,
    /// Optional fields reserve a range without narrowing `rest`.
    pub optional: bool,
    /// Inclusive start offset, negative when back-anchored.
    pub start: isize,
    /// Exclusive stop offset, `0` or negative when back-anchored.
    pub stop: isize,
}

impl Field {
    /// Create a field of `size` bytes.
    ///
    /// A negative `size` declares a back-anchored field of `|size|` bytes.
    pub fn new(size: isize, optional: bool) -> Self {
        let start = if size < 0 { size } else { 0 };
        Self {
            size: size.unsigned_abs(),
            optional,
            start,
            stop: 0,
        }
    }

    /// Front-anchored fixed field.
    pub fn fixed(size: usize) -> Self {
        Self::new(to_offset(size), false)
    }

    /// Back-anchored fixed field.
    pub fn rev(size: usize) -> Self {
        Self::new(-to_offset(size), false)
    }

    /// Front-anchored field with no declared width.
    pub fn variable() -> Self {
        Self::new(0, false)
    }

    /// Create a field from explicit bounds.
    ///
    /// Both offsets must share one anchor: `start >= 0` requires `stop >= 0`,
    /// `start < 0` requires `stop <= 0`.
    pub fn with_bounds(start: isize, stop: isize, optional: bool) -> Result<Self> {
        let invalid = FieldError::InvalidBounds { start, stop };
        let size = if start >= 0 {
            match stop {
                0 => 0,
                s if s >= start => s - start,
                _ => return Err(invalid),
            }
        } else {
            match stop {
                0 => -start,
                s if s < 0 && s >= start => s - start,
                _ => return Err(invalid),
            }
        };
        Ok(Self {
            size: size.unsigned_abs(),
            optional,
            start,
            stop,
        })
    }

    /// True when the field is measured from the end of the buffer.
    pub fn is_reversed(&self) -> bool {
        self.start < 0
    }

    /// Start/stop after applying `correction`.
    ///
    /// The correction moves `start` only when both share a strict sign. It
    /// moves `stop` when both share a sign or `stop` is the `0` sentinel.
    pub fn get_range(&self, correction: isize) -> (isize, isize) {
        let (mut start, mut stop) = (self.start, self.stop);
        if start.signum() * correction.signum() > 0 {
            start += correction;
        }
        if stop.signum() * correction.signum() >= 0 {
            stop += correction;
        }
        (start, stop)
    }

    /// Resolve to an absolute range inside a buffer of `len` bytes.
    ///
    /// Returns `None` when the range does not fit, which callers treat as an
    /// absent field.
    pub fn resolve(&self, correction: isize, len: usize) -> Option<Range<usize>> {
        let (mut start, mut stop) = self.get_range(correction);
        let size = isize::try_from(len).ok()?;
        if start < 0 {
            start += size;
        }
        if stop <= 0 {
            stop += size;
        }
        if 0 <= start && start <= stop && stop <= size {
            Some(start.unsigned_abs()..stop.unsigned_abs())
        } else {
            None
        }
    }

    /// Borrow this field's bytes out of `chunk`.
    pub fn slice<'a>(&self, chunk: &'a [u8]) -> Option<&'a [u8]> {
        self.resolve(0, chunk.len()).map(|range| &chunk[range])
    }
}

pub(crate) fn to_offset(size: usize) -> isize {
    isize::try_from(size).unwrap_or(isize::MAX)
}

use bytes::Bytes;

use crate::error::{Result, SplitError};

/// Search direction of a [`TokenLocator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// First occurrence.
    #[default]
    Forward,
    /// Last occurrence.
    Backward,
}

/// Position and length of a located token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub position: usize,
    pub len: usize,
}

impl Location {
    /// Offset just past the token.
    pub fn end(&self) -> usize {
        self.position + self.len
    }
}

/// Finds a literal byte marker inside a buffer.
///
/// This is the only place that searches for tokens; every framing rule is
/// expressed in terms of [`TokenLocator::locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocator {
    token: Bytes,
    direction: Direction,
}

impl TokenLocator {
    /// Create a locator. The token must not be empty.
    pub fn new(token: impl Into<Bytes>, direction: Direction) -> Result<Self> {
        Self::with_role(token, direction, "search")
    }

    /// Locator for the first occurrence of `token`.
    pub fn forward(token: impl Into<Bytes>) -> Result<Self> {
        Self::new(token, Direction::Forward)
    }

    /// Locator for the last occurrence of `token`.
    pub fn backward(token: impl Into<Bytes>) -> Result<Self> {
        Self::new(token, Direction::Backward)
    }

    pub(crate) fn with_role(
        token: impl Into<Bytes>,
        direction: Direction,
        role: &'static str,
    ) -> Result<Self> {
        let token = token.into();
        if token.is_empty() {
            return Err(SplitError::EmptyToken { role });
        }
        Ok(Self { token, direction })
    }

    /// The same token searched the other way.
    pub fn reversed(&self) -> Self {
        let direction = match self.direction {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        };
        Self {
            token: self.token.clone(),
            direction,
        }
    }

    /// The marker bytes.
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Search direction.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Token length in bytes.
    pub fn len(&self) -> usize {
        self.token.len()
    }

    /// Always false: empty tokens are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.token.is_empty()
    }

    /// Locate the token in `data`.
    pub fn locate(&self, data: &[u8]) -> Option<Location> {
        let position = match self.direction {
            Direction::Forward => find_forward(data, &self.token),
            Direction::Backward => find_backward(data, &self.token),
        }?;
        Some(Location {
            position,
            len: self.token.len(),
        })
    }
}

/// Offset of the first occurrence of `token` in `data`.
pub fn find_forward(data: &[u8], token: &[u8]) -> Option<usize> {
    match token {
        [] => None,
        [byte] => data.iter().position(|b| b == byte),
        _ => data.windows(token.len()).position(|window| window == token),
    }
}

/// Offset of the last occurrence of `token` in `data`.
pub fn find_backward(data: &[u8], token: &[u8]) -> Option<usize> {
    match token {
        [] => None,
        [byte] => data.iter().rposition(|b| b == byte),
        _ => data.windows(token.len()).rposition(|window| window == token),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_finds_first_occurrence() {
        let locator = TokenLocator::forward(&b"\r\n"[..]).unwrap();
        let loc = locator.locate(b"SET\r\nGET\r\n").unwrap();
        assert_eq!(loc, Location { position: 3, len: 2 });
        assert_eq!(loc.end(), 5);
    }

    #[test]
    fn backward_finds_last_occurrence() {
        let locator = TokenLocator::backward(&b"\r\n"[..]).unwrap();
        let loc = locator.locate(b"SET\r\nGET\r\n").unwrap();
        assert_eq!(loc.position, 8);
    }

    #[test]
    fn single_byte_tokens() {
        let fwd = TokenLocator::forward(vec![0x7e]).unwrap();
        let back = fwd.reversed();
        let data = [0x00, 0x7e, 0x01, 0x7e, 0x02];
        assert_eq!(fwd.locate(&data).map(|l| l.position), Some(1));
        assert_eq!(back.locate(&data).map(|l| l.position), Some(3));
        assert_eq!(back.direction(), Direction::Backward);
    }

    #[test]
    fn missing_token_is_none() {
        let locator = TokenLocator::forward(&b"END"[..]).unwrap();
        assert_eq!(locator.locate(b"EN"), None);
        assert_eq!(locator.locate(b""), None);
        assert_eq!(locator.locate(b"no marker here"), None);
    }

    #[test]
    fn empty_token_rejected() {
        let err = TokenLocator::forward(Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, SplitError::EmptyToken { role: "search" }));
    }

    #[test]
    fn raw_search_helpers() {
        assert_eq!(find_forward(b"abcabc", b"bc"), Some(1));
        assert_eq!(find_backward(b"abcabc", b"bc"), Some(4));
        assert_eq!(find_forward(b"abc", b""), None);
        assert_eq!(find_backward(b"a", b"abc"), None);
    }
}

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};

/// Which end of a value receives padding, and loses bytes on truncation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Pad and truncate at the front (big-endian numbers).
    Left,
    /// Pad and truncate at the back (text, raw payloads).
    Right,
}

/// Append `n` zero bytes on `side` of `data`.
pub fn extend_bytes(data: &[u8], side: Side, n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + n);
    match side {
        Side::Left => {
            out.resize(n, 0);
            out.extend_from_slice(data);
        }
        Side::Right => {
            out.extend_from_slice(data);
            out.resize(data.len() + n, 0);
        }
    }
    out
}

/// Resize `data` to exactly `n` bytes.
///
/// Shorter input is zero-padded on `side`; longer input loses bytes on
/// `side`. Input that already has the right length is borrowed as-is.
pub fn resize_bytes(data: &[u8], side: Side, n: usize) -> Cow<'_, [u8]> {
    let len = data.len();
    if len == n {
        return Cow::Borrowed(data);
    }
    if len < n {
        return Cow::Owned(extend_bytes(data, side, n - len));
    }
    match side {
        Side::Left => Cow::Borrowed(&data[len - n..]),
        Side::Right => Cow::Borrowed(&data[..n]),
    }
}

/// Write `data` into `dst` as a fixed field of `size` bytes.
///
/// Uses the left-side rule: short values gain leading zeros, long values
/// keep their trailing bytes. A `size` of `0` writes `data` unchanged.
pub fn put_resized(dst: &mut BytesMut, data: &[u8], size: usize) {
    if size == 0 {
        dst.put_slice(data);
        return;
    }
    let len = data.len();
    if len >= size {
        dst.put_slice(&data[len - size..]);
    } else {
        dst.put_bytes(0, size - len);
        dst.put_slice(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_on_either_side() {
        assert_eq!(extend_bytes(b"\x01\x02", Side::Left, 2), vec![0, 0, 1, 2]);
        assert_eq!(extend_bytes(b"\x01\x02", Side::Right, 1), vec![1, 2, 0]);
        assert_eq!(extend_bytes(b"", Side::Left, 0), Vec::<u8>::new());
    }

    #[test]
    fn resize_pads_and_truncates() {
        assert_eq!(resize_bytes(b"\x07", Side::Left, 3).as_ref(), &[0, 0, 7]);
        assert_eq!(resize_bytes(b"\x01\x02\x03", Side::Left, 2).as_ref(), &[2, 3]);
        assert_eq!(resize_bytes(b"abc", Side::Right, 5).as_ref(), b"abc\0\0");
        assert_eq!(resize_bytes(b"abcdef", Side::Right, 2).as_ref(), b"ab");
    }

    #[test]
    fn resize_borrows_when_possible() {
        assert!(matches!(resize_bytes(b"abc", Side::Left, 3), Cow::Borrowed(_)));
        assert!(matches!(resize_bytes(b"abcd", Side::Left, 3), Cow::Borrowed(_)));
        assert!(matches!(resize_bytes(b"ab", Side::Left, 3), Cow::Owned(_)));
    }

    #[test]
    fn put_resized_uses_left_rule() {
        let mut dst = BytesMut::new();
        put_resized(&mut dst, b"\x12\x34\x56", 2);
        put_resized(&mut dst, b"\x01", 3);
        put_resized(&mut dst, b"", 2);
        put_resized(&mut dst, b"free", 0);
        assert_eq!(dst.as_ref(), b"\x34\x56\x00\x00\x01\x00\x00free");
    }
}

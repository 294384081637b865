use bytes::{BufMut, Bytes, BytesMut};

/// Byte-stuffing rules applied to whole frames.
///
/// Each rule replaces one raw byte with a two-byte sequence on the wire.
/// Unescaping is a single left-to-right pass, so a replacement is never
/// re-examined.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Escaper {
    rules: Vec<(u8, [u8; 2])>,
}

impl Escaper {
    /// An escaper with no rules; both directions copy their input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule. A later rule for the same raw byte wins.
    pub fn with_rule(mut self, raw: u8, replacement: [u8; 2]) -> Self {
        self.rules.retain(|(existing, _)| *existing != raw);
        self.rules.push((raw, replacement));
        self
    }

    /// JT/T 808: `0x7e` is sent as `0x7d 0x02`, `0x7d` as `0x7d 0x01`.
    pub fn jt808() -> Self {
        Self::new()
            .with_rule(0x7d, [0x7d, 0x01])
            .with_rule(0x7e, [0x7d, 0x02])
    }

    pub fn rules(&self) -> &[(u8, [u8; 2])] {
        &self.rules
    }

    /// Replace every raw byte that has a rule.
    pub fn escape(&self, data: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(data.len() + data.len() / 8);
        for &byte in data {
            match self.replacement(byte) {
                Some(pair) => out.put_slice(&pair),
                None => out.put_u8(byte),
            }
        }
        out.freeze()
    }

    /// Turn every known two-byte sequence back into its raw byte.
    pub fn unescape(&self, data: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(data.len());
        let mut i = 0;
        while i < data.len() {
            let raw = data
                .get(i..i + 2)
                .and_then(|pair| self.raw(pair[0], pair[1]));
            match raw {
                Some(raw) => {
                    out.put_u8(raw);
                    i += 2;
                }
                None => {
                    out.put_u8(data[i]);
                    i += 1;
                }
            }
        }
        out.freeze()
    }

    /// Strip the frame delimiters, when present, then unescape the body.
    pub fn unwrap_frame(&self, frame: &[u8], start: &[u8], end: &[u8]) -> Bytes {
        let body = frame.strip_prefix(start).unwrap_or(frame);
        let body = body.strip_suffix(end).unwrap_or(body);
        self.unescape(body)
    }

    /// Escape `body` and surround it with the frame delimiters.
    pub fn wrap_frame(&self, body: &[u8], start: &[u8], end: &[u8]) -> Bytes {
        let escaped = self.escape(body);
        let mut out = BytesMut::with_capacity(start.len() + escaped.len() + end.len());
        out.put_slice(start);
        out.put_slice(&escaped);
        out.put_slice(end);
        out.freeze()
    }

    fn replacement(&self, byte: u8) -> Option<[u8; 2]> {
        self.rules
            .iter()
            .find(|(raw, _)| *raw == byte)
            .map(|(_, pair)| *pair)
    }

    fn raw(&self, first: u8, second: u8) -> Option<u8> {
        self.rules
            .iter()
            .find(|(_, pair)| *pair == [first, second])
            .map(|(raw, _)| *raw)
    }
}

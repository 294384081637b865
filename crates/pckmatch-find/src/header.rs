use bytes::Bytes;
use pckmatch_convert::{serialize, unserialize, Packable, Record};

use crate::error::{FindError, Result};

/// Encoded header length.
pub const HEADER_SIZE: usize = 18;

/// Longest record a lookup returns, terminator excluded.
pub const ITEM_SIZE_MAX: usize = 256;

const KEY_SIZE_MAX: usize = 31;

/// Fixed-size file header.
///
/// `size_props` packs the entry geometry into 16 bits: position width in
/// bits 13-15, key width in bits 8-12, record size in bits 0-7 (`0` for
/// variable-length records).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexHeader {
    /// Offset of the first index entry.
    pub idx_begin: u32,
    /// Offset just past the last index entry.
    pub idx_end: u32,
    pub key_count: u32,
    pub key_size: usize,
    pub pos_size: usize,
    pub item_size: u8,
    /// Eight decimal digits, `YYMMDDNN`.
    pub version: String,
}

impl IndexHeader {
    pub fn size_props(&self) -> u16 {
        let pos = (self.pos_size as u16 & 0x7) << 13;
        let key = (self.key_size as u16 & 0x1f) << 8;
        pos | key | u16::from(self.item_size)
    }

    pub fn set_size_props(&mut self, props: u16) {
        self.pos_size = usize::from(props >> 13);
        self.key_size = usize::from((props >> 8) & 0x1f);
        self.item_size = (props & 0xff) as u8;
    }

    /// Bytes per index entry.
    pub fn entry_size(&self) -> usize {
        self.key_size + self.pos_size
    }

    /// Check the geometry and that the index range holds whole entries.
    pub fn validate(&self) -> Result<()> {
        check_sizes(self.key_size, self.pos_size)?;
        let corrupt = || FindError::CorruptIndex {
            begin: self.idx_begin,
            end: self.idx_end,
            count: self.key_count,
        };
        let span = self.idx_end.checked_sub(self.idx_begin).ok_or_else(corrupt)?;
        if (self.idx_begin as usize) < HEADER_SIZE
            || span as usize != self.key_count as usize * self.entry_size()
        {
            return Err(corrupt());
        }
        Ok(())
    }

    pub fn encode(&self) -> Result<Bytes> {
        Ok(serialize(self)?)
    }

    pub fn decode(chunk: &[u8]) -> Result<Self> {
        let mut header = Self::default();
        unserialize(chunk, &mut header)?;
        Ok(header)
    }
}

impl Packable for IndexHeader {
    fn layout() -> pckmatch_convert::Result<Record> {
        let mut record = Record::new();
        record.add_uint_field("idx_begin", 4, false)?;
        record.add_uint_field("idx_end", 4, false)?;
        record.add_uint_field("key_count", 4, false)?;
        record.add_uint_field("size_props", 2, false)?;
        record.add_hex_field("version", 4)?;
        Ok(record)
    }

    fn store(&self, record: &mut Record) -> pckmatch_convert::Result<()> {
        record.set("idx_begin", self.idx_begin)?;
        record.set("idx_end", self.idx_end)?;
        record.set("key_count", self.key_count)?;
        record.set("size_props", self.size_props())?;
        record.set("version", self.version.as_str())
    }

    fn load(&mut self, record: &Record) -> pckmatch_convert::Result<()> {
        self.idx_begin = record.get_u64("idx_begin")? as u32;
        self.idx_end = record.get_u64("idx_end")? as u32;
        self.key_count = record.get_u64("key_count")? as u32;
        self.set_size_props(record.get_u64("size_props")? as u16);
        self.version = record.get_str("version")?.to_owned();
        Ok(())
    }
}

pub(crate) fn check_sizes(key_size: usize, pos_size: usize) -> Result<()> {
    if !(1..=KEY_SIZE_MAX).contains(&key_size) || !(2..=4).contains(&pos_size) {
        return Err(FindError::InvalidSizes { key_size, pos_size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> IndexHeader {
        IndexHeader {
            idx_begin: 30,
            idx_end: 42,
            key_count: 2,
            key_size: 4,
            pos_size: 2,
            item_size: 0,
            version: "24010200".to_owned(),
        }
    }

    #[test]
    fn size_props_packing() {
        let header = sample();
        assert_eq!(header.size_props(), (2 << 13) | (4 << 8));

        let mut unpacked = IndexHeader::default();
        unpacked.set_size_props(0x8f20);
        assert_eq!((unpacked.pos_size, unpacked.key_size, unpacked.item_size), (4, 15, 0x20));
    }

    #[test]
    fn encode_then_decode() {
        let header = sample();
        let raw = header.encode().unwrap();
        assert_eq!(raw.len(), HEADER_SIZE);
        assert_eq!(&raw[..4], &[0, 0, 0, 30]);
        assert_eq!(&raw[14..], &[0x24, 0x01, 0x02, 0x00]);
        assert_eq!(IndexHeader::decode(&raw).unwrap(), header);
    }

    #[test]
    fn validation() {
        assert!(sample().validate().is_ok());

        let mut bad = sample();
        bad.idx_end = 41;
        assert!(matches!(bad.validate(), Err(FindError::CorruptIndex { .. })));

        bad = sample();
        bad.idx_end = 10;
        assert!(bad.validate().is_err());

        bad = sample();
        bad.pos_size = 5;
        assert!(matches!(bad.validate(), Err(FindError::InvalidSizes { .. })));
    }
}

use std::collections::HashMap;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{BufMut, Bytes, BytesMut};
use pckmatch_convert::Date;
use pckmatch_field::{resize_bytes, Field, FieldMatcher, Side};
use tracing::{debug, warn};

use crate::error::{FindError, Result};
use crate::header::{check_sizes, IndexHeader, HEADER_SIZE};

/// A search key and the record it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    pub key: Bytes,
    /// Position of the record in the list passed to [`Builder::build`].
    pub record: usize,
}

impl KeyPair {
    pub fn new(key: impl Into<Bytes>, record: usize) -> Self {
        Self {
            key: key.into(),
            record,
        }
    }
}

/// Index geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderConfig {
    /// Key width, 1 to 31 bytes. Shorter keys gain leading zeros.
    pub key_size: usize,
    /// Record offset width, 2 to 4 bytes.
    pub pos_size: usize,
    /// Version stamp; defaults to today's date as `YYMMDD00`.
    pub version: Option<String>,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            key_size: 4,
            pos_size: 4,
            version: None,
        }
    }
}

/// Writes index files.
#[derive(Debug, Clone)]
pub struct Builder {
    config: BuilderConfig,
    entry: FieldMatcher,
}

impl Builder {
    pub fn new(config: BuilderConfig) -> Result<Self> {
        check_sizes(config.key_size, config.pos_size)?;
        let entry = entry_layout(config.key_size, config.pos_size)?;
        Ok(Self { config, entry })
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Write header, records and the sorted index to `writer`.
    ///
    /// A key naming a record that does not exist points at offset `0`.
    pub fn build<W, S>(&self, writer: &mut W, records: &[S], keys: &[KeyPair]) -> Result<IndexHeader>
    where
        W: Write,
        S: AsRef<[u8]>,
    {
        let key_size = self.config.key_size;
        let pos_size = self.config.pos_size;

        let mut body = BytesMut::new();
        let mut offsets = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            let record = record.as_ref();
            if record.contains(&0) {
                return Err(FindError::NulInRecord(i));
            }
            offsets.push((HEADER_SIZE + body.len()) as u64);
            body.put_slice(record);
            body.put_u8(0);
        }

        let mut sorted: Vec<_> = keys
            .iter()
            .map(|pair| {
                let offset = offsets.get(pair.record).copied().unwrap_or_else(|| {
                    warn!(record = pair.record, "key points past the last record");
                    0
                });
                (resize_bytes(&pair.key, Side::Left, key_size), offset)
            })
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let max_offset = (1u64 << (8 * pos_size)) - 1;
        let mut index = BytesMut::with_capacity(sorted.len() * (key_size + pos_size));
        for (key, offset) in &sorted {
            if *offset > max_offset {
                return Err(FindError::PositionOverflow {
                    offset: *offset,
                    pos_size,
                });
            }
            let pos = offset.to_be_bytes();
            let values: HashMap<&str, &[u8]> =
                HashMap::from([("key", &key[..]), ("pos", &pos[8 - pos_size..])]);
            index.put_slice(&self.entry.build(&values));
        }

        let idx_begin = HEADER_SIZE + body.len();
        let idx_end = idx_begin + index.len();
        let overflow = |offset: usize| FindError::PositionOverflow {
            offset: offset as u64,
            pos_size: 4,
        };
        let header = IndexHeader {
            idx_begin: u32::try_from(idx_begin).map_err(|_| overflow(idx_begin))?,
            idx_end: u32::try_from(idx_end).map_err(|_| overflow(idx_end))?,
            key_count: sorted.len() as u32,
            key_size,
            pos_size,
            item_size: 0,
            version: self.config.version.clone().unwrap_or_else(today_version),
        };

        writer.write_all(&header.encode()?)?;
        writer.write_all(&body)?;
        writer.write_all(&index)?;

        debug!(
            records = records.len(),
            keys = header.key_count,
            idx_begin,
            idx_end,
            "index written"
        );
        Ok(header)
    }
}

/// Entry layout: the key followed by the record offset.
pub(crate) fn entry_layout(key_size: usize, pos_size: usize) -> Result<FieldMatcher> {
    let mut entry = FieldMatcher::new();
    entry.add_field("key", Field::fixed(key_size))?;
    entry.add_field("pos", Field::fixed(pos_size))?;
    Ok(entry)
}

fn today_version() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default();
    let date = Date::from_timestamp(secs);
    format!(
        "{:02}{:02}{:02}00",
        date.year().rem_euclid(100),
        date.month(),
        date.day()
    )
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn rejects_unsupported_sizes() {
        let config = BuilderConfig {
            pos_size: 1,
            ..BuilderConfig::default()
        };
        assert!(matches!(
            Builder::new(config),
            Err(FindError::InvalidSizes { pos_size: 1, .. })
        ));
    }

    #[test]
    fn layout_of_written_file() {
        let builder = Builder::new(BuilderConfig {
            key_size: 2,
            pos_size: 2,
            version: Some("24010200".to_owned()),
        })
        .unwrap();
        let mut out = Cursor::new(Vec::new());
        let header = builder
            .build(
                &mut out,
                &["ab", "c"],
                &[KeyPair::new(vec![0x20, 0x00], 1), KeyPair::new(vec![0x10], 0)],
            )
            .unwrap();

        let file = out.into_inner();
        assert_eq!(header.idx_begin, 23);
        assert_eq!(header.idx_end, 31);
        assert_eq!(&file[18..23], b"ab\0c\0");
        // sorted, left-padded keys with big-endian offsets
        assert_eq!(&file[23..], &[0x00, 0x10, 0x00, 18, 0x20, 0x00, 0x00, 21]);
    }

    #[test]
    fn rejects_nul_in_records() {
        let builder = Builder::new(BuilderConfig::default()).unwrap();
        let err = builder
            .build(&mut Vec::new(), &["ok", "bad\0"], &[])
            .unwrap_err();
        assert!(matches!(err, FindError::NulInRecord(1)));
    }

    #[test]
    fn default_version_is_a_date_stamp() {
        let version = today_version();
        assert_eq!(version.len(), 8);
        assert!(version.ends_with("00"));
        assert!(version.bytes().all(|b| b.is_ascii_digit()));
    }
}

use std::cmp::Ordering;
use std::io::{Read, Seek, SeekFrom};

use bytes::Bytes;
use pckmatch_field::FieldMatcher;
use tracing::{debug, trace};

use crate::builder::entry_layout;
use crate::error::{FindError, Result};
use crate::header::{IndexHeader, HEADER_SIZE, ITEM_SIZE_MAX};

/// One decoded index entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    /// Position in the sorted index.
    pub index: usize,
    pub key: Bytes,
    /// File offset of the record.
    pub position: u64,
}

/// Outcome of [`Finder::search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The last entry whose key does not exceed the target.
    Hit(IndexEntry),
    /// The target sorts before the first key.
    BelowFirst,
    /// The target is not below the last key, which only closes the range.
    AtOrAboveLast,
    /// The index has no entries.
    Empty,
}

impl Lookup {
    pub fn entry(&self) -> Option<&IndexEntry> {
        match self {
            Self::Hit(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn into_entry(self) -> Option<IndexEntry> {
        match self {
            Self::Hit(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Read side of an index file.
///
/// The index section is loaded once on [`open`](Self::open); records are
/// read on demand.
#[derive(Debug)]
pub struct Finder<R> {
    reader: R,
    header: IndexHeader,
    index: Bytes,
    entry: FieldMatcher,
}

impl<R: Read + Seek> Finder<R> {
    /// Read and validate the header, then load the index section.
    pub fn open(mut reader: R) -> Result<Self> {
        let mut head = [0u8; HEADER_SIZE];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut head)?;
        let header = IndexHeader::decode(&head)?;
        header.validate()?;

        let file_len = reader.seek(SeekFrom::End(0))?;
        if u64::from(header.idx_end) > file_len {
            return Err(FindError::CorruptIndex {
                begin: header.idx_begin,
                end: header.idx_end,
                count: header.key_count,
            });
        }
        let mut index = vec![0u8; (header.idx_end - header.idx_begin) as usize];
        reader.seek(SeekFrom::Start(u64::from(header.idx_begin)))?;
        reader.read_exact(&mut index)?;

        let entry = entry_layout(header.key_size, header.pos_size)?;
        debug!(
            keys = header.key_count,
            key_size = header.key_size,
            pos_size = header.pos_size,
            version = %header.version,
            "index opened"
        );
        Ok(Self {
            reader,
            header,
            index: Bytes::from(index),
            entry,
        })
    }

    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        self.header.key_count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode entry `i` of the sorted index.
    pub fn entry(&self, i: usize) -> Option<IndexEntry> {
        let chunk = self.entry_bytes(i)?;
        let fields = self.entry.match_bytes(&chunk, false);
        let key = chunk.slice_ref(fields.get("key")?);
        let position = fields
            .get("pos")?
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        Some(IndexEntry {
            index: i,
            key,
            position,
        })
    }

    /// Binary search for the entry covering `target`.
    ///
    /// Keys are compared against `target` over the shorter of the two
    /// lengths, so a short target matches by prefix.
    pub fn search(&self, target: &[u8]) -> Lookup {
        let count = self.len();
        if count == 0 {
            return Lookup::Empty;
        }
        let below = |i: usize| compare(target, self.key(i)) == Ordering::Less;
        if below(0) {
            return Lookup::BelowFirst;
        }
        if !below(count - 1) {
            return Lookup::AtOrAboveLast;
        }

        // first entry whose key exceeds the target
        let (mut lo, mut hi) = (0, count);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if below(mid) {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        trace!(index = lo - 1, "index search hit");
        self.entry(lo - 1).map_or(Lookup::Empty, Lookup::Hit)
    }

    /// Read the NUL-terminated record at `position`.
    ///
    /// At most [`ITEM_SIZE_MAX`] bytes are returned; a record cut short by
    /// the end of the file is returned as-is.
    pub fn record(&mut self, position: u64) -> Result<Bytes> {
        self.reader.seek(SeekFrom::Start(position))?;
        let mut buf = Vec::with_capacity(ITEM_SIZE_MAX);
        (&mut self.reader)
            .take(ITEM_SIZE_MAX as u64)
            .read_to_end(&mut buf)?;
        if let Some(nul) = buf.iter().position(|b| *b == 0) {
            buf.truncate(nul);
        }
        Ok(Bytes::from(buf))
    }

    /// Search for `target` and read the record it resolves to.
    pub fn find(&mut self, target: &[u8]) -> Result<Option<Bytes>> {
        match self.search(target) {
            Lookup::Hit(entry) => self.record(entry.position).map(Some),
            _ => Ok(None),
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn entry_bytes(&self, i: usize) -> Option<Bytes> {
        let size = self.header.entry_size();
        let start = i.checked_mul(size)?;
        let end = start + size;
        (end <= self.index.len()).then(|| self.index.slice(start..end))
    }

    fn key(&self, i: usize) -> &[u8] {
        let start = i * self.header.entry_size();
        &self.index[start..start + self.header.key_size]
    }
}

fn compare(target: &[u8], key: &[u8]) -> Ordering {
    let n = target.len().min(key.len());
    target.cmp(&key[..n])
}

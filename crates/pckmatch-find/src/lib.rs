//! Sorted key index files.
//!
//! File layout:
//!
//! ```text
//! +----------------+ 0
//! | header         | 18 bytes
//! +----------------+
//! | records        | NUL-terminated strings
//! +----------------+ idx_begin
//! | index          | key_count entries of key + record offset
//! +----------------+ idx_end
//! ```
//!
//! [`Builder`] writes a file from records and keys; [`Finder`] answers
//! "which record covers this key" with a binary search over the index.

pub mod builder;
pub mod error;
pub mod finder;
pub mod header;

pub use builder::{Builder, BuilderConfig, KeyPair};
pub use error::{FindError, Result};
pub use finder::{Finder, IndexEntry, Lookup};
pub use header::{IndexHeader, HEADER_SIZE, ITEM_SIZE_MAX};

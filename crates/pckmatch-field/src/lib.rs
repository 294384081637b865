//! Dual-anchored named byte ranges.
//!
//! A [`FieldMatcher`] decomposes one message buffer into named fields:
//! - front fields, measured from the start of the buffer
//! - back fields, measured from the end of the buffer (negative offsets)
//! - an implicit `rest` span covering whatever no fixed field claims
//!
//! Matching never fails on content. A field whose range falls outside the
//! buffer is simply absent. Building pads or truncates every fixed field to
//! its declared width.

pub mod error;
pub mod field;
pub mod matcher;
pub mod resize;

pub use error::{FieldError, Result};
pub use field::Field;
pub use matcher::{FieldId, FieldMatcher, FieldValues, MatchedFields, REST};
pub use resize::{extend_bytes, put_resized, resize_bytes, Side};

//! JSON layout files for pckmatch.
//!
//! A layout names the framing rule of a stream and the fields of each
//! message. Documents are checked against an embedded JSON Schema before
//! they are deserialized, then turned into a [`Framing`], a [`Splitter`]
//! or a [`Record`] on demand.
//!
//! ```json
//! {
//!   "framing": { "encoding": "hex", "start": "7e", "end": "7e" },
//!   "escape": "jt808",
//!   "fields": [
//!     { "name": "code", "kind": "hex", "size": 2 },
//!     { "name": "check", "kind": "byte", "back": true }
//!   ]
//! }
//! ```
//!
//! [`Framing`]: pckmatch_split::Framing
//! [`Splitter`]: pckmatch_split::Splitter
//! [`Record`]: pckmatch_convert::Record

pub mod config;
pub mod error;
pub mod layout;
pub mod schema;

pub use config::LayoutLimits;
pub use error::{LayoutError, Result};
pub use layout::{
    EndDirection, EscapePreset, EscapeRule, EscapeSpec, FieldKind, FieldSpec, FramingSpec,
    Layout, TokenEncoding, TrailingSpec,
};
pub use schema::LAYOUT_SCHEMA;

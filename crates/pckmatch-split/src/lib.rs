//! Token-delimited stream splitting.
//!
//! Turns a continuous byte stream into discrete messages:
//! - [`TokenLocator`] finds a literal marker, forward or backward
//! - [`Framing`] picks the boundary rule (end token, shared token, distinct
//!   start/end tokens, or fixed size)
//! - [`Splitter`] applies the rule to the bytes seen so far
//! - [`FrameScanner`] drives a splitter against any `Read` source
//!
//! Partial reads are handled internally; callers only see whole messages.

#[cfg(feature = "async")]
pub mod codec;
pub mod error;
pub mod locate;
pub mod scanner;
pub mod strategy;

#[cfg(feature = "async")]
pub use codec::SplitCodec;
pub use error::{Result, SplitError};
pub use locate::{Direction, Location, TokenLocator};
pub use scanner::{split_buffer, FrameScanner, ScanConfig, DEFAULT_MAX_BUFFER};
pub use strategy::{FrameResult, Framing, Splitter, Trailing};

//! Typed views over field layouts.
//!
//! - [`Scalar`] codecs turn field bytes into [`Value`]s and back
//! - [`Record`] pairs a field layout with one codec per field
//! - [`Packable`] binds a plain struct to a record without reflection
//! - [`Escaper`] applies byte-stuffing rules to whole frames

pub mod date;
pub mod error;
pub mod escape;
pub mod record;
pub mod scalar;

pub use date::Date;
pub use error::{ConvertError, Result};
pub use escape::Escaper;
pub use record::{serialize, unserialize, Packable, Record};
pub use scalar::{Options, Quadrant, Scalar, Value};

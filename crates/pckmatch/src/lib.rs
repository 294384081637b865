//! Cut byte streams into messages and messages into named, typed fields.
//!
//! # Crate Structure
//!
//! - [`field`]: Dual-anchored named byte ranges
//! - [`split`]: Token and size based stream framing
//! - [`convert`]: Scalar codecs, records and byte stuffing
//! - [`find`]: Sorted key index files
//! - [`layout`]: JSON layout files (behind `layout` feature)

/// Re-export field types.
pub mod field {
    pub use pckmatch_field::*;
}

/// Re-export framing types.
pub mod split {
    pub use pckmatch_split::*;
}

/// Re-export codec and record types.
pub mod convert {
    pub use pckmatch_convert::*;
}

/// Re-export index types.
pub mod find {
    pub use pckmatch_find::*;
}

/// Re-export layout types (requires `layout` feature).
#[cfg(feature = "layout")]
pub mod layout {
    pub use pckmatch_layout::*;
}

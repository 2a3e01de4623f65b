//! Manifest handling
//!
//! Parsing and writing of checksum lists, plus the rules for locating the
//! files a manifest refers to.

mod codec;
mod source;

pub use codec::*;
pub use source::*;

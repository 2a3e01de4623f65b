//! Progress reporting module

mod reporter;

pub use reporter::*;

//! File system enumeration
//!
//! Expands the command-line inputs of calculate mode into the files to hash.

mod scanner;

pub use scanner::*;

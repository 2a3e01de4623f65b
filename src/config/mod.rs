//! Configuration module for dirhasher
//!
//! Provides CLI arguments, value enums and the validated run configuration.

mod settings;

pub use settings::*;

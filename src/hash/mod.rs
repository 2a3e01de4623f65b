//! Digest computation module
//!
//! Provides SHA-256 and MD5 hashing of files through a digest engine that
//! reuses hash state and I/O buffers from explicitly owned pools.

mod engine;
mod integrity;
mod pool;

pub use engine::*;
pub use integrity::*;
pub use pool::*;

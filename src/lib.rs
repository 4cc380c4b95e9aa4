//! tinyjit - runtime x86-64 code generation
//!
//! This library encodes x86-64 instructions from a mnemonic table, places
//! the bytes in write-then-execute memory and calls them as functions.

pub mod config;
pub mod error;
pub mod jit;
pub mod programs;

// Re-export commonly used types
pub use config::{DumpFormat, JitConfig};
pub use error::{JitError, JitResult};
pub use programs::Program;

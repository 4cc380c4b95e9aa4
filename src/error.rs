//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::jit::{EncodeError, MemoryError};

/// Any failure while building, loading or running generated code.
///
/// Encoding errors (bad operand shapes) stay distinct from memory errors
/// (the OS refused a mapping or protection change).
#[derive(Debug, Error)]
pub enum JitError {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("constant {0} does not fit in a 32-bit immediate")]
    ImmediateOutOfRange(i64),
    #[error("generated code can only run on x86-64 hosts")]
    UnsupportedTarget,
    #[error("entry point type is not a function pointer")]
    EntryType,
}

pub type JitResult<T> = Result<T, JitError>;

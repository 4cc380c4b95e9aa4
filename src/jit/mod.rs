//! JIT code generation for x86-64.
//!
//! - Register/operand model and ModRM helpers (`x86_64`)
//! - Mnemonic table and table-driven encoder
//! - Code buffer and calling-convention fragments
//! - Executable memory (mapped RW, then switched to RX)

pub mod codebuf;
pub mod convention;
pub mod encoder;
pub mod function;
pub mod memory;
pub mod mnemonic;
pub mod x86_64;

pub use codebuf::CodeBuffer;
pub use encoder::{encode, EncodeError, Instruction};
pub use function::JitFunction;
pub use memory::{ExecutableMemory, MemoryError};
pub use mnemonic::Mnemonic;
pub use x86_64::{Operand, Reg};

//! Compiled functions: finalized executable memory plus its entry point.

use super::codebuf::CodeBuffer;
use super::memory::{ExecutableMemory, MemoryError};

/// A generated function ready to be called.
///
/// Owns the executable region; function pointers obtained from `entry`
/// must not outlive it.
pub struct JitFunction {
    memory: ExecutableMemory,
    code_len: usize,
}

impl JitFunction {
    /// Copy `buf` into a fresh region of at least `arena_size` bytes and
    /// make it executable.
    pub fn compile(buf: CodeBuffer, arena_size: usize) -> Result<Self, MemoryError> {
        let code_len = buf.len();
        let memory = buf.finalize(arena_size)?;
        log::debug!(
            target: "tinyjit::function",
            "compiled {} bytes into {}-byte region at {:p}",
            code_len,
            memory.size(),
            memory.as_ptr()
        );
        Ok(Self { memory, code_len })
    }

    /// The generated code bytes.
    pub fn code(&self) -> &[u8] {
        &self.memory.bytes()[..self.code_len]
    }

    /// Size of the backing region.
    pub fn size(&self) -> usize {
        self.memory.size()
    }

    /// Typed entry point. Returns None if `F` is not pointer-sized.
    ///
    /// # Safety
    /// `F` must be an `extern "C" fn` type matching the generated code, and
    /// the returned pointer must not be called after `self` is dropped.
    pub unsafe fn entry<F: Copy>(&self) -> Option<F> {
        unsafe { self.memory.as_fn::<F>() }
    }
}

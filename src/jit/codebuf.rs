//! Code buffer for building JIT code.
//!
//! Bytes are appended in order and copied into executable memory once the
//! function body is complete.

use super::encoder::{encode_into, EncodeError, Instruction};
use super::memory::{ExecutableMemory, MemoryError};

/// A buffer for building machine code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeBuffer {
    code: Vec<u8>,
}

impl CodeBuffer {
    /// Create a new empty code buffer.
    pub fn new() -> Self {
        Self { code: Vec::new() }
    }

    /// Create a new code buffer with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
        }
    }

    /// Get the current size of the code.
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Raw pointer to the first byte.
    pub fn as_ptr(&self) -> *const u8 {
        self.code.as_ptr()
    }

    /// Append raw bytes.
    pub fn append(&mut self, bytes: &[u8]) {
        self.code.extend_from_slice(bytes);
    }

    /// Encode an instruction and append it.
    /// On error nothing is appended.
    pub fn append_encoded(&mut self, inst: &Instruction) -> Result<(), EncodeError> {
        encode_into(inst, &mut self.code)
    }

    /// Encode a sequence of instructions, stopping at the first failure.
    pub fn append_all<'a, I>(&mut self, insts: I) -> Result<(), EncodeError>
    where
        I: IntoIterator<Item = &'a Instruction>,
    {
        insts.into_iter().try_for_each(|inst| self.append_encoded(inst))
    }

    /// Get the code bytes (for inspection).
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Consume the buffer and return the raw code bytes.
    pub fn into_code(self) -> Vec<u8> {
        self.code
    }

    /// Copy the code into executable memory that is still writable.
    pub fn copy_into(&self, mem: &mut ExecutableMemory) -> Result<(), MemoryError> {
        mem.write(0, &self.code)
    }

    /// Copy the code to a fresh region of at least `min_size` bytes and
    /// make it executable.
    pub fn finalize(self, min_size: usize) -> Result<ExecutableMemory, MemoryError> {
        let mut mem = ExecutableMemory::new(self.code.len().max(min_size))?;
        self.copy_into(&mut mem)?;
        mem.make_executable()?;
        Ok(mem)
    }
}

impl Extend<u8> for CodeBuffer {
    fn extend<T: IntoIterator<Item = u8>>(&mut self, iter: T) {
        self.code.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jit::mnemonic::{MOV, RET};
    use crate::jit::x86_64::{imm32, Reg};

    #[test]
    fn test_append_bytes() {
        let mut buf = CodeBuffer::new();
        buf.append(&[0x90]);
        buf.append(&[0x34, 0x12]);

        assert_eq!(buf.len(), 3);
        assert_eq!(buf.code(), &[0x90, 0x34, 0x12]);
    }

    #[test]
    fn test_append_encoded() {
        let mut buf = CodeBuffer::new();
        buf.append_encoded(&Instruction::binary(MOV, Reg::Rax, imm32(42)))
            .unwrap();
        buf.append_encoded(&Instruction::nullary(RET)).unwrap();

        assert_eq!(
            buf.code(),
            &[0x48, 0xC7, 0xC0, 0x2A, 0x00, 0x00, 0x00, 0xC3]
        );
    }

    #[test]
    fn test_failed_encode_appends_nothing() {
        let mut buf = CodeBuffer::new();
        buf.append(&[0xC3]);
        let bad = Instruction::binary(RET, Reg::Rax, Reg::Rax);
        assert!(buf.append_encoded(&bad).is_err());
        assert_eq!(buf.code(), &[0xC3]);
    }

    #[test]
    fn test_append_all_stops_at_error() {
        let mut buf = CodeBuffer::new();
        let insts = [
            Instruction::nullary(RET),
            Instruction::binary(MOV, imm32(0), Reg::Rax),
            Instruction::nullary(RET),
        ];
        assert!(buf.append_all(&insts).is_err());
        assert_eq!(buf.code(), &[0xC3]);
    }

    #[test]
    fn test_finalize_copies_code() {
        let mut buf = CodeBuffer::new();
        buf.append(&[0x90, 0xC3]);
        let mem = buf.finalize(0).unwrap();

        assert!(mem.is_executable());
        assert!(mem.size() >= 2);
        assert_eq!(&mem.bytes()[..2], &[0x90, 0xC3]);
    }
}

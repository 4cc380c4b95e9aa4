//! System V AMD64 calling-convention fragments.
//!
//! Each helper returns the bytes for one piece of a function body. They are
//! built from the encoder wherever the mnemonic table covers the
//! instruction; push/pop use their one-byte `50+r`/`58+r` forms directly.

use super::encoder::{encode, EncodeError, Instruction};
use super::mnemonic::{Mnemonic, ADD, MOV, RET, SUB};
use super::x86_64::{imm32, imm8, stack, Reg};

/// Integer/pointer argument registers, in argument order.
pub const ARG_REGS: [Reg; 4] = [Reg::Rdi, Reg::Rsi, Reg::Rdx, Reg::Rcx];

/// Integer return register.
pub const RETURN_REG: Reg = Reg::Rax;

/// Register holding the `index`th integer argument.
pub fn arg_reg(index: usize) -> Option<Reg> {
    ARG_REGS.get(index).copied()
}

/// PUSH r64
pub fn push(reg: Reg) -> [u8; 1] {
    [0x50 + reg.code()]
}

/// POP r64
pub fn pop(reg: Reg) -> [u8; 1] {
    [0x58 + reg.code()]
}

/// `push rbp; mov rbp, rsp`
pub fn prologue() -> Result<Vec<u8>, EncodeError> {
    let mut code = push(Reg::Rbp).to_vec();
    code.extend(encode(&Instruction::binary(MOV, Reg::Rbp, Reg::Rsp))?);
    Ok(code)
}

/// `pop rbp`
pub fn epilogue() -> Vec<u8> {
    pop(Reg::Rbp).to_vec()
}

/// `sub rsp, n`
pub fn reserve_stack(n: i8) -> Result<Vec<u8>, EncodeError> {
    encode(&Instruction::binary(SUB, Reg::Rsp, imm8(n)))
}

/// `add rsp, n`
pub fn restore_stack(n: i8) -> Result<Vec<u8>, EncodeError> {
    encode(&Instruction::binary(ADD, Reg::Rsp, imm8(n)))
}

/// `ret`
pub fn ret() -> Result<Vec<u8>, EncodeError> {
    encode(&Instruction::nullary(RET))
}

/// `mov [rsp + offset], arg` for the `index`th argument register.
/// Returns None if the argument is not passed in a register.
pub fn spill_arg(index: usize, offset: i32) -> Option<Instruction> {
    arg_reg(index).map(|reg| Instruction::binary(MOV, stack(offset), reg))
}

/// `sub`/`add rsp, size` using the short immediate form when it fits.
fn adjust_stack(mnemonic: Mnemonic, size: i32) -> Result<Vec<u8>, EncodeError> {
    let amount = match i8::try_from(size) {
        Ok(short) => imm8(short),
        Err(_) => imm32(size),
    };
    encode(&Instruction::binary(mnemonic, Reg::Rsp, amount))
}

/// A stack frame with `size` bytes of locals addressed off RSP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    size: i32,
}

impl Frame {
    /// Frame sizes are rounded up to 16 bytes so RSP stays aligned after
    /// the RBP push.
    pub fn new(locals: u16) -> Self {
        Self {
            size: (locals as i32 + 15) & !15,
        }
    }

    /// Bytes reserved below RBP, always a non-negative multiple of 16.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Prologue plus local reservation.
    pub fn enter(&self) -> Result<Vec<u8>, EncodeError> {
        let mut code = prologue()?;
        if self.size != 0 {
            code.extend(adjust_stack(SUB, self.size)?);
        }
        Ok(code)
    }

    /// Local release, epilogue and return.
    pub fn leave(&self) -> Result<Vec<u8>, EncodeError> {
        let mut code = Vec::new();
        if self.size != 0 {
            code.extend(adjust_stack(ADD, self.size)?);
        }
        code.extend(epilogue());
        code.extend(ret()?);
        Ok(code)
    }
}

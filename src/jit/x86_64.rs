//! x86-64 register and operand model.
//!
//! Only the eight base general-purpose registers are modelled, so a REX
//! prefix never needs the R/X/B extension bits. Operands are plain data:
//! constructors set the tag and payload and nothing else.

use std::fmt;

/// REX prefix with the W bit set (64-bit operand size).
pub const REX_W: u8 = 0x48;

/// SIB byte for `[rsp]`: scale=1, index=none (rsp), base=rsp.
pub const SIB_RSP: u8 = 0x24;

/// x86-64 general-purpose registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    Rax = 0, // Return value
    Rcx = 1, // 4th argument
    Rdx = 2, // 3rd argument
    Rbx = 3, // Callee-saved
    Rsp = 4, // Stack pointer
    Rbp = 5, // Frame pointer (callee-saved)
    Rsi = 6, // 2nd argument
    Rdi = 7, // 1st argument
}

impl Reg {
    /// Get the 3-bit register code used in ModRM/SIB/opcode fields.
    pub fn code(self) -> u8 {
        (self as u8) & 0x7
    }

    pub fn name(self) -> &'static str {
        match self {
            Reg::Rax => "rax",
            Reg::Rcx => "rcx",
            Reg::Rdx => "rdx",
            Reg::Rbx => "rbx",
            Reg::Rsp => "rsp",
            Reg::Rbp => "rbp",
            Reg::Rsi => "rsi",
            Reg::Rdi => "rdi",
        }
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// ModRM addressing mode (the `mod` field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    /// `[base]`, no displacement
    Disp0 = 0b00,
    /// `[base + disp8]`
    Disp8 = 0b01,
    /// `[base + disp32]`
    Disp32 = 0b10,
    /// Register-direct
    Register = 0b11,
}

impl Mode {
    /// Pick the memory addressing mode for a base register and displacement.
    ///
    /// `[rbp]` with `mod = 00` would mean RIP-relative, so a zero
    /// displacement off RBP is promoted to an explicit disp8 of zero.
    pub fn for_memory(base: Reg, disp: i32) -> Self {
        if disp == 0 && base != Reg::Rbp {
            Mode::Disp0
        } else if i8::try_from(disp).is_ok() {
            Mode::Disp8
        } else {
            Mode::Disp32
        }
    }
}

/// Encode a ModRM byte.
/// mode: 2 bits, reg: 3 bits, rm: 3 bits
pub fn modrm(mode: Mode, reg: u8, rm: u8) -> u8 {
    ((mode as u8) << 6) | ((reg & 0x7) << 3) | (rm & 0x7)
}

/// A single instruction operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Operand {
    #[default]
    None,
    Reg(Reg),
    Mem { base: Reg, disp: i32 },
    Imm8(i8),
    Imm32(i32),
}

impl Operand {
    /// Whether this operand names a register, directly or as a memory base.
    pub fn references_register(&self) -> bool {
        matches!(self, Operand::Reg(_) | Operand::Mem { .. })
    }

    /// Short name of the operand shape, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Operand::None => "none",
            Operand::Reg(_) => "reg",
            Operand::Mem { .. } => "mem",
            Operand::Imm8(_) => "imm8",
            Operand::Imm32(_) => "imm32",
        }
    }
}

impl From<Reg> for Operand {
    fn from(reg: Reg) -> Self {
        Operand::Reg(reg)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::None => Ok(()),
            Operand::Reg(reg) => write!(f, "{}", reg),
            Operand::Mem { base, disp: 0 } => write!(f, "qword ptr [{}]", base),
            Operand::Mem { base, disp } if disp < 0 => {
                write!(f, "qword ptr [{}-{:#x}]", base, (disp as i64).unsigned_abs())
            }
            Operand::Mem { base, disp } => write!(f, "qword ptr [{}+{:#x}]", base, disp),
            Operand::Imm8(imm) => write!(f, "{}", imm),
            Operand::Imm32(imm) => write!(f, "{}", imm),
        }
    }
}

/// Register operand.
pub fn reg(reg: Reg) -> Operand {
    Operand::Reg(reg)
}

/// `[base + disp]` memory operand.
pub fn mem(base: Reg, disp: i32) -> Operand {
    Operand::Mem { base, disp }
}

/// `[rsp + offset]` stack slot.
pub fn stack(offset: i32) -> Operand {
    mem(Reg::Rsp, offset)
}

/// 8-bit immediate, sign-extended by the CPU where the form requires it.
pub fn imm8(imm: i8) -> Operand {
    Operand::Imm8(imm)
}

/// 32-bit immediate, sign-extended to 64 bits by the CPU.
pub fn imm32(imm: i32) -> Operand {
    Operand::Imm32(imm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_codes() {
        assert_eq!(Reg::Rax.code(), 0);
        assert_eq!(Reg::Rsp.code(), 4);
        assert_eq!(Reg::Rbp.code(), 5);
        assert_eq!(Reg::Rdi.code(), 7);
    }

    #[test]
    fn test_modrm() {
        // mov rbp, rsp => ModRM E5
        assert_eq!(modrm(Mode::Register, Reg::Rsp.code(), Reg::Rbp.code()), 0xE5);
        // [rsp] with SIB, reg=rax => 04
        assert_eq!(modrm(Mode::Disp0, Reg::Rax.code(), Reg::Rsp.code()), 0x04);
    }

    #[test]
    fn test_mode_for_memory() {
        assert_eq!(Mode::for_memory(Reg::Rsp, 0), Mode::Disp0);
        assert_eq!(Mode::for_memory(Reg::Rsp, 127), Mode::Disp8);
        assert_eq!(Mode::for_memory(Reg::Rsp, -128), Mode::Disp8);
        assert_eq!(Mode::for_memory(Reg::Rsp, 128), Mode::Disp32);
        assert_eq!(Mode::for_memory(Reg::Rsp, -129), Mode::Disp32);
    }

    #[test]
    fn test_rbp_zero_displacement_uses_disp8() {
        assert_eq!(Mode::for_memory(Reg::Rbp, 0), Mode::Disp8);
        assert_eq!(Mode::for_memory(Reg::Rbx, 0), Mode::Disp0);
    }

    #[test]
    fn test_constructors_do_not_validate() {
        assert_eq!(stack(-8), Operand::Mem { base: Reg::Rsp, disp: -8 });
        assert_eq!(imm32(i32::MIN), Operand::Imm32(i32::MIN));
        assert_eq!(Operand::default(), Operand::None);
    }

    #[test]
    fn test_display() {
        assert_eq!(reg(Reg::Rax).to_string(), "rax");
        assert_eq!(stack(0).to_string(), "qword ptr [rsp]");
        assert_eq!(mem(Reg::Rbp, -16).to_string(), "qword ptr [rbp-0x10]");
        assert_eq!(stack(8).to_string(), "qword ptr [rsp+0x8]");
    }
}

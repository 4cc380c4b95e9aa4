//! Mnemonic table.
//!
//! Each mnemonic is an ordered list of encoding forms. The encoder tries
//! them in declared order and takes the first whose operand kinds all
//! match, so more specific forms (short immediates) come first.

use Extension::{Opcode, Register as R};
use OperandEncoding::{
    Immediate8 as I8, Immediate32 as I32, None as NA, Register as Gpr, RegisterOrMemory as Rm,
};

/// Where the ModRM `reg` field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extension {
    /// `/r`: the explicit register operand.
    Register,
    /// `/digit`: a fixed opcode extension.
    Opcode(u8),
}

/// Operand kind expected in one slot of an encoding form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandEncoding {
    None,
    Register,
    RegisterOrMemory,
    Immediate8,
    Immediate32,
}

/// One concrete byte encoding of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodingForm {
    pub opcode: u8,
    pub extension: Extension,
    pub operands: [OperandEncoding; 2],
}

impl EncodingForm {
    const fn new(opcode: u8, extension: Extension, operands: [OperandEncoding; 2]) -> Self {
        Self {
            opcode,
            extension,
            operands,
        }
    }

    /// Forms with an r/m slot carry a ModRM byte.
    pub fn has_modrm(&self) -> bool {
        self.operands.contains(&OperandEncoding::RegisterOrMemory)
    }
}

/// A logical instruction and its candidate encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mnemonic {
    pub name: &'static str,
    pub forms: &'static [EncodingForm],
}

/// Group-1 ALU layout shared by ADD/SUB/XOR: `83 /n ib`, `81 /n id`,
/// `op r/m64, r64`, `op r64, r/m64`.
const fn alu_forms(ext: u8, rm_reg: u8, reg_rm: u8) -> [EncodingForm; 4] {
    [
        EncodingForm::new(0x83, Opcode(ext), [Rm, I8]),
        EncodingForm::new(0x81, Opcode(ext), [Rm, I32]),
        EncodingForm::new(rm_reg, R, [Rm, Gpr]),
        EncodingForm::new(reg_rm, R, [Gpr, Rm]),
    ]
}

const MOV_FORMS: [EncodingForm; 3] = [
    EncodingForm::new(0x89, R, [Rm, Gpr]),
    EncodingForm::new(0x8B, R, [Gpr, Rm]),
    EncodingForm::new(0xC7, Opcode(0), [Rm, I32]),
];
const ADD_FORMS: [EncodingForm; 4] = alu_forms(0, 0x01, 0x03);
const SUB_FORMS: [EncodingForm; 4] = alu_forms(5, 0x29, 0x2B);
const XOR_FORMS: [EncodingForm; 4] = alu_forms(6, 0x31, 0x33);
const RET_FORMS: [EncodingForm; 1] = [EncodingForm::new(0xC3, R, [NA, NA])];

pub const MOV: Mnemonic = Mnemonic {
    name: "mov",
    forms: &MOV_FORMS,
};

pub const ADD: Mnemonic = Mnemonic {
    name: "add",
    forms: &ADD_FORMS,
};

pub const SUB: Mnemonic = Mnemonic {
    name: "sub",
    forms: &SUB_FORMS,
};

pub const XOR: Mnemonic = Mnemonic {
    name: "xor",
    forms: &XOR_FORMS,
};

pub const RET: Mnemonic = Mnemonic {
    name: "ret",
    forms: &RET_FORMS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_immediate_forms_come_first() {
        for mnemonic in [ADD, SUB, XOR] {
            assert_eq!(mnemonic.forms[0].operands[1], OperandEncoding::Immediate8);
            assert_eq!(mnemonic.forms[0].opcode, 0x83);
        }
    }

    #[test]
    fn test_opcode_extensions() {
        assert_eq!(ADD.forms[0].extension, Extension::Opcode(0));
        assert_eq!(SUB.forms[0].extension, Extension::Opcode(5));
        assert_eq!(XOR.forms[1].extension, Extension::Opcode(6));
        assert_eq!(MOV.forms[2].extension, Extension::Opcode(0));
    }

    #[test]
    fn test_has_modrm() {
        assert!(MOV.forms.iter().all(EncodingForm::has_modrm));
        assert!(!RET.forms[0].has_modrm());
    }
}

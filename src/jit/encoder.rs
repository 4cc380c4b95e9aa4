//! Table-driven instruction encoder.
//!
//! `encode` picks the first encoding form of a mnemonic whose operand
//! kinds match the instruction, then emits:
//! REX.W, opcode, ModRM, SIB, displacement, immediate.
//! Nothing is emitted for an instruction that matches no form.

use std::fmt;

use thiserror::Error;

use super::mnemonic::{EncodingForm, Extension, Mnemonic, OperandEncoding};
use super::x86_64::{modrm, Mode, Operand, Reg, REX_W, SIB_RSP};

/// Encoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("no encoding of `{mnemonic}` accepts operands ({first}, {second})")]
    NoMatchingForm {
        mnemonic: &'static str,
        first: &'static str,
        second: &'static str,
    },
}

/// A mnemonic with up to two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub mnemonic: Mnemonic,
    pub operands: [Operand; 2],
}

impl Instruction {
    pub fn new(mnemonic: Mnemonic, operands: [Operand; 2]) -> Self {
        Self { mnemonic, operands }
    }

    pub fn nullary(mnemonic: Mnemonic) -> Self {
        Self::new(mnemonic, [Operand::None, Operand::None])
    }

    pub fn binary(mnemonic: Mnemonic, dst: impl Into<Operand>, src: impl Into<Operand>) -> Self {
        Self::new(mnemonic, [dst.into(), src.into()])
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic.name)?;
        let mut sep = " ";
        for operand in self.operands.iter().filter(|op| **op != Operand::None) {
            write!(f, "{}{}", sep, operand)?;
            sep = ", ";
        }
        Ok(())
    }
}

/// Check whether an operand fits the kind a form expects.
fn matches(expected: OperandEncoding, actual: &Operand) -> bool {
    match (expected, actual) {
        (OperandEncoding::None, Operand::None) => true,
        (OperandEncoding::Register, Operand::Reg(_)) => true,
        (OperandEncoding::RegisterOrMemory, Operand::Reg(_) | Operand::Mem { .. }) => true,
        (OperandEncoding::Immediate8, Operand::Imm8(_)) => true,
        (OperandEncoding::Immediate32, Operand::Imm32(_)) => true,
        _ => false,
    }
}

/// Find the first form of the instruction's mnemonic that accepts its operands.
pub fn select_form(inst: &Instruction) -> Result<&'static EncodingForm, EncodeError> {
    inst.mnemonic
        .forms
        .iter()
        .find(|form| {
            form.operands
                .iter()
                .zip(inst.operands.iter())
                .all(|(expected, actual)| matches(*expected, actual))
        })
        .ok_or(EncodeError::NoMatchingForm {
            mnemonic: inst.mnemonic.name,
            first: inst.operands[0].kind(),
            second: inst.operands[1].kind(),
        })
}

/// Encode a single instruction to machine code.
pub fn encode(inst: &Instruction) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::with_capacity(8);
    encode_into(inst, &mut out)?;
    Ok(out)
}

/// Encode a single instruction, appending to `out`.
/// `out` is left untouched on error.
pub fn encode_into(inst: &Instruction, out: &mut Vec<u8>) -> Result<(), EncodeError> {
    let form = select_form(inst)?;
    let start = out.len();

    if inst.operands.iter().any(Operand::references_register) {
        out.push(REX_W);
    }

    out.push(form.opcode);

    if form.has_modrm() {
        emit_modrm(form, &inst.operands, out);
    }

    for operand in &inst.operands {
        match *operand {
            Operand::Imm8(imm) => out.push(imm as u8),
            Operand::Imm32(imm) => out.extend_from_slice(&imm.to_le_bytes()),
            Operand::None | Operand::Reg(_) | Operand::Mem { .. } => {}
        }
    }

    log::trace!(target: "tinyjit::encode", "{:<32} {:02X?}", inst.to_string(), &out[start..]);
    Ok(())
}

/// Emit ModRM, the optional SIB byte and the displacement.
fn emit_modrm(form: &EncodingForm, operands: &[Operand; 2], out: &mut Vec<u8>) {
    let mut reg_field = 0;
    let mut rm_operand = Operand::None;

    for (expected, operand) in form.operands.iter().zip(operands.iter()) {
        match (expected, operand) {
            (OperandEncoding::Register, Operand::Reg(r)) => reg_field = r.code(),
            (OperandEncoding::RegisterOrMemory, op) => rm_operand = *op,
            _ => {}
        }
    }

    if let Extension::Opcode(ext) = form.extension {
        reg_field = ext;
    }

    match rm_operand {
        Operand::Reg(r) => out.push(modrm(Mode::Register, reg_field, r.code())),
        Operand::Mem { base, disp } => {
            let mode = Mode::for_memory(base, disp);
            out.push(modrm(mode, reg_field, base.code()));
            if base.code() == Reg::Rsp.code() {
                out.push(SIB_RSP);
            }
            match mode {
                Mode::Disp8 => out.push(disp as i8 as u8),
                Mode::Disp32 => out.extend_from_slice(&disp.to_le_bytes()),
                Mode::Disp0 | Mode::Register => {}
            }
        }
        // select_form only hands out forms whose r/m slot matched a reg or mem
        Operand::None | Operand::Imm8(_) | Operand::Imm32(_) => {}
    }
}

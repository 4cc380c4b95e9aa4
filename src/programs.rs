//! Demonstration programs built on the encoder.
//!
//! Each program is assembled into a listing (offset, bytes, text per line)
//! whose concatenated bytes form the function body. The listing is what
//! `tinyjit dump` prints; the bytes are what `run` executes.

use serde::Serialize;

use crate::config::JitConfig;
use crate::error::{JitError, JitResult};
use crate::jit::convention::{self, ARG_REGS, RETURN_REG};
use crate::jit::mnemonic::{ADD, MOV, RET};
use crate::jit::x86_64::{imm32, stack};
use crate::jit::{CodeBuffer, EncodeError, Instruction, JitFunction};

/// Stack space reserved by the programs that use a local slot.
const FRAME_SIZE: i8 = 16;

/// The built-in programs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Program {
    /// `fn() -> i64 { value }`
    Constant,
    /// `fn(x: i64) -> i64 { x }`, round-tripping through a stack slot
    Identity,
    /// `fn(x: i64) -> i64 { let one = 1; x + one }`
    Increment,
}

impl Program {
    pub fn name(self) -> &'static str {
        match self {
            Program::Constant => "constant",
            Program::Identity => "identity",
            Program::Increment => "increment",
        }
    }

    /// Whether the generated function takes the argument at call time
    /// rather than baking it into the code.
    pub fn takes_argument(self) -> bool {
        !matches!(self, Program::Constant)
    }

    /// Assemble the program. `argument` is only used by `Constant`.
    pub fn listing(self, argument: i64) -> JitResult<Listing> {
        match self {
            Program::Constant => {
                let value =
                    i32::try_from(argument).map_err(|_| JitError::ImmediateOutOfRange(argument))?;
                Ok(constant(value)?)
            }
            Program::Identity => Ok(identity()?),
            Program::Increment => Ok(increment()?),
        }
    }

    /// Assemble the program into a code buffer.
    pub fn build(self, argument: i64) -> JitResult<CodeBuffer> {
        Ok(self.listing(argument)?.into_buffer())
    }
}

/// One line of an assembled program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Line {
    pub offset: usize,
    pub bytes: Vec<u8>,
    pub text: String,
}

/// An assembled program, line by line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub lines: Vec<Line>,
    #[serde(skip)]
    buf: CodeBuffer,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append pre-encoded bytes, such as a calling-convention fragment.
    pub fn raw(&mut self, text: impl Into<String>, bytes: &[u8]) -> &mut Self {
        self.lines.push(Line {
            offset: self.buf.len(),
            bytes: bytes.to_vec(),
            text: text.into(),
        });
        self.buf.append(bytes);
        self
    }

    /// Encode and append one instruction.
    pub fn inst(&mut self, inst: Instruction) -> Result<&mut Self, EncodeError> {
        let offset = self.buf.len();
        self.buf.append_encoded(&inst)?;
        self.lines.push(Line {
            offset,
            bytes: self.buf.code()[offset..].to_vec(),
            text: inst.to_string(),
        });
        Ok(self)
    }

    pub fn code(&self) -> &[u8] {
        self.buf.code()
    }

    pub fn into_buffer(self) -> CodeBuffer {
        self.buf
    }

    /// `push rbp; mov rbp, rsp; sub rsp, n`
    fn enter(&mut self, frame: i8) -> Result<&mut Self, EncodeError> {
        self.raw("push rbp; mov rbp, rsp", &convention::prologue()?);
        Ok(self.raw(format!("sub rsp, {}", frame), &convention::reserve_stack(frame)?))
    }

    /// `add rsp, n; pop rbp; ret`
    fn leave(&mut self, frame: i8) -> Result<&mut Self, EncodeError> {
        self.raw(format!("add rsp, {}", frame), &convention::restore_stack(frame)?);
        self.raw("pop rbp", &convention::epilogue());
        Ok(self.raw("ret", &convention::ret()?))
    }
}

/// `mov rax, value; ret`
pub fn constant(value: i32) -> Result<Listing, EncodeError> {
    let mut listing = Listing::new();
    listing
        .inst(Instruction::binary(MOV, RETURN_REG, imm32(value)))?
        .inst(Instruction::nullary(RET))?;
    Ok(listing)
}

/// Store the first argument to `[rsp]` and load it back into RAX.
pub fn identity() -> Result<Listing, EncodeError> {
    let mut listing = Listing::new();
    listing
        .enter(FRAME_SIZE)?
        .inst(Instruction::binary(MOV, stack(0), ARG_REGS[0]))?
        .inst(Instruction::binary(MOV, RETURN_REG, stack(0)))?
        .leave(FRAME_SIZE)?;
    Ok(listing)
}

/// Store 1 to `[rsp]`, move the first argument into RAX and add the slot.
pub fn increment() -> Result<Listing, EncodeError> {
    let mut listing = Listing::new();
    listing
        .enter(FRAME_SIZE)?
        .inst(Instruction::binary(MOV, stack(0), imm32(1)))?
        .inst(Instruction::binary(MOV, RETURN_REG, ARG_REGS[0]))?
        .inst(Instruction::binary(ADD, RETURN_REG, stack(0)))?
        .leave(FRAME_SIZE)?;
    Ok(listing)
}

/// Build, load and call a program.
///
/// `Constant` returns `argument` from code that has it baked in; the
/// others receive `argument` as their first parameter.
pub fn run(program: Program, argument: i64, config: &JitConfig) -> JitResult<i64> {
    if !cfg!(target_arch = "x86_64") {
        return Err(JitError::UnsupportedTarget);
    }

    let func = JitFunction::compile(program.build(argument)?, config.arena_size)?;
    log::debug!(
        target: "tinyjit::programs",
        "running {} ({} bytes) with argument {}",
        program.name(),
        func.code().len(),
        argument
    );

    // SAFETY: the listings above produce complete System V functions with
    // these signatures, and `func` outlives both calls.
    let result = if program.takes_argument() {
        let f: extern "C" fn(i64) -> i64 = unsafe { func.entry() }.ok_or(JitError::EntryType)?;
        f(argument)
    } else {
        let f: extern "C" fn() -> i64 = unsafe { func.entry() }.ok_or(JitError::EntryType)?;
        f()
    };
    Ok(result)
}

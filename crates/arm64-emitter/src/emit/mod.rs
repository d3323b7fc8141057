//! Integer instruction emitter.
//!
//! One method per mnemonic; each computes the exact 32-bit word from its
//! typed operands and appends it at the cursor. Operand contract
//! violations (width mismatches, out-of-range immediates, the wrong
//! register class) panic with the instruction name in the message.

mod abi;
mod arith;
mod branch;
pub(crate) mod load_store;
mod logic;
mod movi2r;
mod system;

pub use load_store::IndexType;
pub use logic::ShiftAmount;

pub(crate) use abi::frame_plan;

use crate::code_buffer::CodeBuffer;
use crate::float::FloatEmitter;
use crate::reg::Reg;

/// Low-level aarch64 instruction encoder.
///
/// Appends words to a [`CodeBuffer`]. The caller decides *what* to emit;
/// this struct only knows *how* to encode each instruction form.
pub struct Emitter<'a> {
    buf: CodeBuffer<'a>,
}

impl<'a> Emitter<'a> {
    pub fn new(buf: CodeBuffer<'a>) -> Self {
        Emitter { buf }
    }

    /// Emitter over a word slice, mostly for tests and scratch encoding.
    pub fn from_words(words: &'a mut [u32]) -> Self {
        Emitter::new(CodeBuffer::from_words(words))
    }

    pub fn buffer(&self) -> &CodeBuffer<'a> {
        &self.buf
    }

    pub fn buffer_mut(&mut self) -> &mut CodeBuffer<'a> {
        &mut self.buf
    }

    pub fn into_buffer(self) -> CodeBuffer<'a> {
        self.buf
    }

    /// Vector/FP instructions, written through this emitter.
    pub fn float(&mut self) -> FloatEmitter<'_, 'a> {
        FloatEmitter::new(self)
    }

    pub fn get_code_ptr(&self) -> *const u8 {
        self.buf.get_code_ptr()
    }

    pub fn get_writable_code_ptr(&mut self) -> *mut u8 {
        self.buf.get_writable_code_ptr()
    }

    pub fn set_code_ptr(&mut self, ptr: *const u8) {
        self.buf.set_code_ptr(ptr);
    }

    /// Current offset in bytes from the region start.
    pub fn offset(&self) -> usize {
        self.buf.offset()
    }

    pub fn reserve(&mut self, bytes: usize) {
        self.buf.reserve(bytes);
    }

    /// Append a raw instruction word.
    pub fn write32(&mut self, word: u32) {
        self.buf.write32(word);
    }

    pub fn align_code16(&mut self) -> *const u8 {
        self.buf.align_code16()
    }

    pub fn align_code_page(&mut self) -> *const u8 {
        self.buf.align_code_page()
    }

    pub fn flush_icache(&mut self) {
        self.buf.flush_icache();
    }

    pub fn flush_icache_range(&self, start: *const u8, end: *const u8) {
        self.buf.flush_icache_range(start, end);
    }

    /// Words emitted so far.
    pub fn code(&self) -> Vec<u32> {
        self.buf.words()
    }
}

/// Register field of a general-register operand.
pub(crate) fn gpr(r: Reg) -> u32 {
    assert!(r.is_gpr(), "expected a general register, got {r:?}");
    r.enc()
}

/// `sf` bit (bit 31) for a general-register operand.
pub(crate) fn sf(r: Reg) -> u32 {
    assert!(r.is_gpr(), "expected a general register, got {r:?}");
    (r.is_64bit() as u32) << 31
}

/// All general registers in `regs` must share one width.
pub(crate) fn same_width(op: &str, regs: &[Reg]) {
    let wide = regs[0].is_64bit();
    for &r in regs {
        assert!(r.is_gpr(), "{op}: expected a general register, got {r:?}");
        assert!(r.is_64bit() == wide, "{op}: operand width mismatch in {regs:?}");
    }
}

/// Width in bits of a general register.
pub(crate) fn width(r: Reg) -> u32 {
    if r.is_64bit() {
        64
    } else {
        32
    }
}

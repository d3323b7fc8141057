//! Runtime AArch64 machine-code emitter.
//!
//! Typed instruction requests go in (one [`Emitter`] method per mnemonic,
//! operands as [`Reg`], [`Cond`], [`ArithOption`] and immediates); exact
//! little-endian instruction words come out, written at the cursor of a
//! [`CodeBuffer`]. Forward branches hand back a [`FixupBranch`] that is
//! patched once the target is known. [`CodeBlock`] owns an executable
//! mapping to emit into.
//!
//! ```no_run
//! use arm64_emitter::{CodeBlock, Cond, Reg};
//!
//! let mut block = CodeBlock::new(4096)?;
//! {
//!     let mut e = block.emitter();
//!     e.cmp(Reg::X0, Reg::X1);
//!     let skip = e.b_cond(Cond::GE);
//!     e.mov(Reg::X0, Reg::X1);
//!     e.set_jump_target(skip);
//!     e.ret();
//! }
//! block.finalize()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod arith;
pub mod code_block;
pub mod code_buffer;
pub mod cond;
pub mod emit;
pub mod fixup;
pub mod float;
pub mod imm;
pub mod reg;
pub mod system;

pub use arith::{ArithOption, ExtendType, ShiftType};
pub use code_block::{CodeBlock, CodeBlockBuilder};
pub use code_buffer::{CodeBuffer, BRK_POISON};
pub use cond::Cond;
pub use emit::{Emitter, IndexType, ShiftAmount};
pub use fixup::{BranchKind, FixupBranch};
pub use float::FloatEmitter;
pub use imm::LogicalImm;
pub use reg::{Reg, RegClass, RegSet};
pub use system::{BarrierType, PStateField, PrefetchOp, SystemHint, SystemReg};

#[cfg(test)]
mod tests;

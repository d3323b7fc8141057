use super::{gpr, Emitter};
use crate::code_buffer::BRK_POISON;
use crate::cond::Cond;
use crate::fixup::{BranchKind, FixupBranch};
use crate::reg::Reg;

impl<'a> Emitter<'a> {
    // ---- Fixup bookkeeping ----

    fn fixup(&mut self, kind: BranchKind) -> FixupBranch {
        kind.validate();
        let offset = self.offset();
        self.write32(BRK_POISON);
        FixupBranch { offset, kind }
    }

    fn branch_to(&mut self, kind: BranchKind, target: *const u8) {
        kind.validate();
        let word = kind.encode(self.get_code_ptr() as usize, target as usize);
        self.write32(word);
    }

    /// Whether a `kind` branch emitted at the cursor could reach `target`.
    pub fn can_reach(&self, kind: BranchKind, target: *const u8) -> bool {
        let disp = target as i64 - self.get_code_ptr() as i64;
        let (min, max) = kind.range();
        disp & 3 == 0 && (min..=max).contains(&disp)
    }

    /// Resolve `fixup` to branch to the cursor.
    pub fn set_jump_target(&mut self, fixup: FixupBranch) {
        let target = self.get_code_ptr();
        self.set_jump_target_to(fixup, target);
    }

    /// Resolve `fixup` to branch to `target`.
    ///
    /// The word is rebuilt from the fixup, so it is identical to what the
    /// known-target form would have emitted at the same location.
    pub fn set_jump_target_to(&mut self, fixup: FixupBranch, target: *const u8) {
        assert!(
            fixup.offset + 4 <= self.buffer().capacity(),
            "fixup at {:#x} does not belong to this code region",
            fixup.offset
        );
        let source = self.buffer().base() as usize + fixup.offset;
        let word = fixup.kind.encode(source, target as usize);
        log::trace!("fixup {:?} at {source:#x} -> {target:p}", fixup.kind);
        self.buffer_mut().write32_at(fixup.offset, word);
    }

    // ---- Compare and branch ----

    /// `CBZ Rt, <label>`: branch if zero. Returns a fixup for the target.
    pub fn cbz(&mut self, rt: Reg) -> FixupBranch {
        self.fixup(BranchKind::Cbz(rt))
    }

    /// `CBZ Rt, target` to a known address.
    pub fn cbz_to(&mut self, rt: Reg, target: *const u8) {
        self.branch_to(BranchKind::Cbz(rt), target);
    }

    /// `CBNZ Rt, <label>`: branch if nonzero.
    pub fn cbnz(&mut self, rt: Reg) -> FixupBranch {
        self.fixup(BranchKind::Cbnz(rt))
    }

    /// `CBNZ Rt, target` to a known address.
    pub fn cbnz_to(&mut self, rt: Reg, target: *const u8) {
        self.branch_to(BranchKind::Cbnz(rt), target);
    }

    // ---- Conditional branch ----

    /// `B.cond <label>`.
    pub fn b_cond(&mut self, cond: Cond) -> FixupBranch {
        self.fixup(BranchKind::BCond(cond))
    }

    /// `B.cond target` to a known address.
    pub fn b_cond_to(&mut self, cond: Cond, target: *const u8) {
        self.branch_to(BranchKind::BCond(cond), target);
    }

    // ---- Test bit and branch ----

    /// `TBZ Rt, #bit, <label>`: branch if `bit` of `rt` is clear.
    pub fn tbz(&mut self, rt: Reg, bit: u8) -> FixupBranch {
        self.fixup(BranchKind::Tbz(rt, bit))
    }

    /// `TBZ Rt, #bit, target` to a known address.
    pub fn tbz_to(&mut self, rt: Reg, bit: u8, target: *const u8) {
        self.branch_to(BranchKind::Tbz(rt, bit), target);
    }

    /// `TBNZ Rt, #bit, <label>`: branch if `bit` of `rt` is set.
    pub fn tbnz(&mut self, rt: Reg, bit: u8) -> FixupBranch {
        self.fixup(BranchKind::Tbnz(rt, bit))
    }

    /// `TBNZ Rt, #bit, target` to a known address.
    pub fn tbnz_to(&mut self, rt: Reg, bit: u8, target: *const u8) {
        self.branch_to(BranchKind::Tbnz(rt, bit), target);
    }

    // ---- Unconditional branch (immediate) ----

    /// `B <label>`.
    pub fn b(&mut self) -> FixupBranch {
        self.fixup(BranchKind::B)
    }

    /// `B target` to a known address.
    pub fn b_to(&mut self, target: *const u8) {
        self.branch_to(BranchKind::B, target);
    }

    /// `BL <label>`: call.
    pub fn bl(&mut self) -> FixupBranch {
        self.fixup(BranchKind::Bl)
    }

    /// `BL target` to a known address.
    pub fn bl_to(&mut self, target: *const u8) {
        self.branch_to(BranchKind::Bl, target);
    }

    // ---- Unconditional branch (register) ----

    /// `BR Xn`.
    pub fn br(&mut self, rn: Reg) {
        self.write32(0xD61F_0000 | x_reg("BR", rn) << 5);
    }

    /// `BLR Xn`: indirect call.
    pub fn blr(&mut self, rn: Reg) {
        self.write32(0xD63F_0000 | x_reg("BLR", rn) << 5);
    }

    /// `RET`: return through X30.
    pub fn ret(&mut self) {
        self.ret_reg(Reg::LR);
    }

    /// `RET Xn`.
    pub fn ret_reg(&mut self, rn: Reg) {
        self.write32(0xD65F_0000 | x_reg("RET", rn) << 5);
    }

    /// `ERET`.
    pub fn eret(&mut self) {
        self.write32(0xD69F_03E0);
    }

    /// `DRPS`.
    pub fn drps(&mut self) {
        self.write32(0xD6BF_03E0);
    }
}

fn x_reg(op: &str, r: Reg) -> u32 {
    assert!(r.is_64bit(), "{op}: target must be a 64-bit register, got {r:?}");
    gpr(r)
}

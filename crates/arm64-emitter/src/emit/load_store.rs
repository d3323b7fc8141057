use super::{gpr, same_width, Emitter};
use crate::arith::{ArithOption, ExtendType, ShiftType};
use crate::imm::fits_signed;
use crate::reg::Reg;
use crate::system::PrefetchOp;

/// Addressing mode of an immediate-offset load or store.
///
/// For single-register accesses `Unsigned` is the scaled 12-bit offset
/// form; for pairs it is the signed scaled 7-bit offset form without
/// writeback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    Unsigned,
    /// `[Rn], #imm`: access at `Rn`, then `Rn += imm`.
    Post,
    /// `[Rn, #imm]!`: `Rn += imm`, then access.
    Pre,
}

/// Base register of an address: `Xn` or `SP`.
pub(crate) fn base(op: &str, rn: Reg) -> u32 {
    assert!(rn.is_64bit(), "{op}: base register must be 64-bit, got {rn:?}");
    gpr(rn)
}

/// Word for a single-register load/store with an immediate offset.
///
/// `size_log2` is log2 of the access size in bytes, `rt` the already
/// validated transfer register field.
#[allow(clippy::too_many_arguments)]
pub(crate) fn indexed_word(
    op: &str,
    size: u32,
    v: bool,
    opc: u32,
    index: IndexType,
    rt: u32,
    rn: Reg,
    imm: i32,
) -> u32 {
    let head = size << 30 | 0x3800_0000 | (v as u32) << 26 | opc << 22 | base(op, rn) << 5 | rt;
    let scale = 1i32 << (if v && opc & 2 != 0 { 4 } else { size });
    match index {
        IndexType::Unsigned => {
            assert!(
                imm >= 0 && imm % scale == 0 && imm / scale < 4096,
                "{op}: unsigned offset {imm} must be a multiple of {scale} below {}",
                4096 * scale
            );
            head | 1 << 24 | ((imm / scale) as u32) << 10
        }
        IndexType::Post | IndexType::Pre => {
            assert!(fits_signed(imm as i64, 9), "{op}: index offset {imm} out of range -256..=255");
            let idx = if index == IndexType::Pre { 0b11 } else { 0b01 };
            head | ((imm as u32) & 0x1FF) << 12 | idx << 10
        }
    }
}

/// Word for a load/store pair. `index == None` selects the no-allocate form.
#[allow(clippy::too_many_arguments)]
pub(crate) fn pair_word(
    op: &str,
    opc: u32,
    v: bool,
    load: bool,
    index: Option<IndexType>,
    rt: u32,
    rt2: u32,
    rn: Reg,
    imm: i32,
    scale: i32,
) -> u32 {
    assert!(imm % scale == 0, "{op}: offset {imm} is not a multiple of {scale}");
    let imm7 = imm / scale;
    assert!(
        fits_signed(imm7 as i64, 7),
        "{op}: offset {imm} out of range {}..={}",
        -64 * scale,
        63 * scale
    );
    let kind = match index {
        None => 0b000,
        Some(IndexType::Post) => 0b001,
        Some(IndexType::Unsigned) => 0b010,
        Some(IndexType::Pre) => 0b011,
    };
    opc << 30
        | 0x2800_0000
        | (v as u32) << 26
        | kind << 23
        | (load as u32) << 22
        | ((imm7 as u32) & 0x7F) << 15
        | rt2 << 10
        | base(op, rn) << 5
        | rt
}

/// Size (log2 bytes) of a plain `LDR`/`STR` of `rt`.
fn gpr_size(rt: Reg) -> u32 {
    if rt.is_64bit() {
        3
    } else {
        2
    }
}

impl<'a> Emitter<'a> {
    // ---- Load register (literal) ----

    fn literal(&mut self, op: &str, opc: u32, rt: u32, offset: i32) {
        assert!(offset % 4 == 0, "{op}: literal offset {offset} is not word aligned");
        assert!(fits_signed(offset as i64, 21), "{op}: literal offset {offset} out of range ±1MiB");
        self.write32(opc << 30 | 0x1800_0000 | (((offset >> 2) as u32) & 0x7FFFF) << 5 | rt);
    }

    /// `LDR Rt, <pc + offset>`.
    pub fn ldr_literal(&mut self, rt: Reg, offset: i32) {
        let opc = rt.is_64bit() as u32;
        self.literal("LDR", opc, gpr(rt), offset);
    }

    /// `LDR Rt, <target>` for an absolute literal address.
    pub fn ldr_literal_to(&mut self, rt: Reg, target: *const u8) {
        let offset = target as i64 - self.get_code_ptr() as i64;
        assert!(fits_signed(offset, 21), "LDR: literal at {target:p} out of range");
        self.ldr_literal(rt, offset as i32);
    }

    /// `LDRSW Xt, <pc + offset>`.
    pub fn ldrsw_literal(&mut self, rt: Reg, offset: i32) {
        assert!(rt.is_64bit(), "LDRSW: destination must be 64-bit, got {rt:?}");
        self.literal("LDRSW", 0b10, gpr(rt), offset);
    }

    /// `PRFM <op>, <pc + offset>`.
    pub fn prfm_literal(&mut self, op: PrefetchOp, offset: i32) {
        self.literal("PRFM", 0b11, op.enc(), offset);
    }

    // ---- Load/store exclusive and ordered ----

    #[allow(clippy::too_many_arguments)]
    fn exclusive(&mut self, size: u32, o2: u32, load: bool, pair: bool, o0: u32, rs: u32, rt2: u32, rt: u32, rn: Reg) {
        self.write32(
            size << 30
                | 0x0800_0000
                | o2 << 23
                | (load as u32) << 22
                | (pair as u32) << 21
                | rs << 16
                | o0 << 15
                | rt2 << 10
                | base("exclusive access", rn) << 5
                | rt,
        );
    }

    fn store_exclusive(&mut self, op: &str, size: u32, o0: u32, rs: Reg, rt: Reg, rn: Reg) {
        status_reg(op, rs, &[rt, rn]);
        self.exclusive(size, 0, false, false, o0, gpr(rs), 31, gpr(rt), rn);
    }

    fn load_exclusive(&mut self, size: u32, o0: u32, rt: Reg, rn: Reg) {
        self.exclusive(size, 0, true, false, o0, 31, 31, gpr(rt), rn);
    }

    fn ordered(&mut self, size: u32, load: bool, rt: Reg, rn: Reg) {
        self.exclusive(size, 1, load, false, 1, 31, 31, gpr(rt), rn);
    }

    /// `STXRB Ws, Wt, [Xn]`. `Ws` receives 0 on success.
    pub fn stxrb(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STXRB", 0, 0, rs, rt, rn);
    }

    /// `STLXRB Ws, Wt, [Xn]`.
    pub fn stlxrb(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STLXRB", 0, 1, rs, rt, rn);
    }

    /// `LDXRB Wt, [Xn]`.
    pub fn ldxrb(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(0, 0, rt, rn);
    }

    /// `LDAXRB Wt, [Xn]`.
    pub fn ldaxrb(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(0, 1, rt, rn);
    }

    /// `STLRB Wt, [Xn]`.
    pub fn stlrb(&mut self, rt: Reg, rn: Reg) {
        self.ordered(0, false, rt, rn);
    }

    /// `LDARB Wt, [Xn]`.
    pub fn ldarb(&mut self, rt: Reg, rn: Reg) {
        self.ordered(0, true, rt, rn);
    }

    /// `STXRH Ws, Wt, [Xn]`.
    pub fn stxrh(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STXRH", 1, 0, rs, rt, rn);
    }

    /// `STLXRH Ws, Wt, [Xn]`.
    pub fn stlxrh(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STLXRH", 1, 1, rs, rt, rn);
    }

    /// `LDXRH Wt, [Xn]`.
    pub fn ldxrh(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(1, 0, rt, rn);
    }

    /// `LDAXRH Wt, [Xn]`.
    pub fn ldaxrh(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(1, 1, rt, rn);
    }

    /// `STLRH Wt, [Xn]`.
    pub fn stlrh(&mut self, rt: Reg, rn: Reg) {
        self.ordered(1, false, rt, rn);
    }

    /// `LDARH Wt, [Xn]`.
    pub fn ldarh(&mut self, rt: Reg, rn: Reg) {
        self.ordered(1, true, rt, rn);
    }

    /// `STXR Ws, Rt, [Xn]`.
    pub fn stxr(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STXR", gpr_size(rt), 0, rs, rt, rn);
    }

    /// `STLXR Ws, Rt, [Xn]`.
    pub fn stlxr(&mut self, rs: Reg, rt: Reg, rn: Reg) {
        self.store_exclusive("STLXR", gpr_size(rt), 1, rs, rt, rn);
    }

    /// `LDXR Rt, [Xn]`.
    pub fn ldxr(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(gpr_size(rt), 0, rt, rn);
    }

    /// `LDAXR Rt, [Xn]`.
    pub fn ldaxr(&mut self, rt: Reg, rn: Reg) {
        self.load_exclusive(gpr_size(rt), 1, rt, rn);
    }

    /// `STLR Rt, [Xn]`: store-release.
    pub fn stlr(&mut self, rt: Reg, rn: Reg) {
        self.ordered(gpr_size(rt), false, rt, rn);
    }

    /// `LDAR Rt, [Xn]`: load-acquire.
    pub fn ldar(&mut self, rt: Reg, rn: Reg) {
        self.ordered(gpr_size(rt), true, rt, rn);
    }

    fn store_exclusive_pair(&mut self, op: &str, o0: u32, rs: Reg, rt: Reg, rt2: Reg, rn: Reg) {
        same_width(op, &[rt, rt2]);
        status_reg(op, rs, &[rt, rt2, rn]);
        let size = 0b10 | rt.is_64bit() as u32;
        self.exclusive(size, 0, false, true, o0, gpr(rs), gpr(rt2), gpr(rt), rn);
    }

    fn load_exclusive_pair(&mut self, op: &str, o0: u32, rt: Reg, rt2: Reg, rn: Reg) {
        same_width(op, &[rt, rt2]);
        assert!(rt.index() != rt2.index(), "{op}: transfer registers must differ");
        let size = 0b10 | rt.is_64bit() as u32;
        self.exclusive(size, 0, true, true, o0, 31, gpr(rt2), gpr(rt), rn);
    }

    /// `STXP Ws, Rt, Rt2, [Xn]`.
    pub fn stxp(&mut self, rs: Reg, rt: Reg, rt2: Reg, rn: Reg) {
        self.store_exclusive_pair("STXP", 0, rs, rt, rt2, rn);
    }

    /// `STLXP Ws, Rt, Rt2, [Xn]`.
    pub fn stlxp(&mut self, rs: Reg, rt: Reg, rt2: Reg, rn: Reg) {
        self.store_exclusive_pair("STLXP", 1, rs, rt, rt2, rn);
    }

    /// `LDXP Rt, Rt2, [Xn]`.
    pub fn ldxp(&mut self, rt: Reg, rt2: Reg, rn: Reg) {
        self.load_exclusive_pair("LDXP", 0, rt, rt2, rn);
    }

    /// `LDAXP Rt, Rt2, [Xn]`.
    pub fn ldaxp(&mut self, rt: Reg, rt2: Reg, rn: Reg) {
        self.load_exclusive_pair("LDAXP", 1, rt, rt2, rn);
    }

    // ---- Load/store pair ----

    fn gpr_pair(&mut self, op: &str, load: bool, index: Option<IndexType>, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        same_width(op, &[rt, rt2]);
        let (opc, scale) = if rt.is_64bit() { (0b10, 8) } else { (0b00, 4) };
        self.write32(pair_word(op, opc, false, load, index, gpr(rt), gpr(rt2), rn, imm, scale));
    }

    /// `STNP Rt, Rt2, [Xn, #imm]`: store pair, non-temporal hint.
    pub fn stnp(&mut self, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.gpr_pair("STNP", false, None, rt, rt2, rn, imm);
    }

    /// `LDNP Rt, Rt2, [Xn, #imm]`.
    pub fn ldnp(&mut self, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.gpr_pair("LDNP", true, None, rt, rt2, rn, imm);
    }

    /// `STP Rt, Rt2, [Xn, #imm]`, `[Xn, #imm]!` or `[Xn], #imm`.
    pub fn stp(&mut self, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.gpr_pair("STP", false, Some(index), rt, rt2, rn, imm);
    }

    /// `LDP Rt, Rt2, [Xn, #imm]`, `[Xn, #imm]!` or `[Xn], #imm`.
    pub fn ldp(&mut self, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.gpr_pair("LDP", true, Some(index), rt, rt2, rn, imm);
    }

    /// `LDPSW Xt, Xt2, ...`: load two sign-extended words.
    pub fn ldpsw(&mut self, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        same_width("LDPSW", &[rt, rt2]);
        assert!(rt.is_64bit(), "LDPSW: destinations must be 64-bit, got {rt:?}");
        self.write32(pair_word("LDPSW", 0b01, false, true, Some(index), gpr(rt), gpr(rt2), rn, imm, 4));
    }

    // ---- Load/store (immediate offset) ----

    fn gpr_indexed(&mut self, op: &str, size: u32, opc: u32, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.write32(indexed_word(op, size, false, opc, index, gpr(rt), rn, imm));
    }

    /// `STRB Wt, ...`.
    pub fn strb(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("STRB", 0, 0b00, index, rt, rn, imm);
    }

    /// `LDRB Wt, ...`.
    pub fn ldrb(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("LDRB", 0, 0b01, index, rt, rn, imm);
    }

    /// `LDRSB Rt, ...`: sign-extends to the width of `rt`.
    pub fn ldrsb(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("LDRSB", 0, signed_opc(rt), index, rt, rn, imm);
    }

    /// `STRH Wt, ...`.
    pub fn strh(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("STRH", 1, 0b00, index, rt, rn, imm);
    }

    /// `LDRH Wt, ...`.
    pub fn ldrh(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("LDRH", 1, 0b01, index, rt, rn, imm);
    }

    /// `LDRSH Rt, ...`.
    pub fn ldrsh(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("LDRSH", 1, signed_opc(rt), index, rt, rn, imm);
    }

    /// `STR Rt, ...`: 32 or 64 bits by the width of `rt`.
    pub fn str(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("STR", gpr_size(rt), 0b00, index, rt, rn, imm);
    }

    /// `LDR Rt, ...`: 32 or 64 bits by the width of `rt`.
    pub fn ldr(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        self.gpr_indexed("LDR", gpr_size(rt), 0b01, index, rt, rn, imm);
    }

    /// `LDRSW Xt, ...`.
    pub fn ldrsw(&mut self, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        assert!(rt.is_64bit(), "LDRSW: destination must be 64-bit, got {rt:?}");
        self.gpr_indexed("LDRSW", 2, 0b10, index, rt, rn, imm);
    }

    /// `PRFM op, [Xn, #imm]`.
    pub fn prfm(&mut self, op: PrefetchOp, rn: Reg, imm: i32) {
        self.write32(indexed_word("PRFM", 3, false, 0b10, IndexType::Unsigned, op.enc(), rn, imm));
    }

    // ---- Load/store (register offset) ----

    fn register_offset(&mut self, op: &str, size: u32, opc: u32, rt: u32, rn: Reg, option: ArithOption) {
        let (rm, data) = match option {
            ArithOption::Extended { reg, extend, shift } => {
                assert!(shift == 0 || shift == 4, "{op}: index shift must be none or scaled");
                let ext = extend as u32;
                assert!(
                    ext & 0b010 != 0 && (ext & 1 == 1) == reg.is_64bit(),
                    "{op}: {extend:?} is not a valid index extension for {reg:?}"
                );
                (reg, option.data())
            }
            ArithOption::Shifted { reg, kind, amount } => {
                assert!(
                    kind == ShiftType::Lsl && reg.is_64bit(),
                    "{op}: shifted index must be LSL of a 64-bit register"
                );
                assert!(
                    amount == 0 || amount as u32 == size,
                    "{op}: index shift {amount} must be 0 or {size}"
                );
                (reg, (ExtendType::Uxtx as u32) << 13 | ((amount != 0) as u32) << 12)
            }
            ArithOption::Immediate(_) => panic!("{op}: register offset needs a register operand"),
        };
        self.write32(
            size << 30
                | 0x3800_0000
                | opc << 22
                | 1 << 21
                | gpr(rm) << 16
                | data
                | 1 << 11
                | base(op, rn) << 5
                | rt,
        );
    }

    /// `STRB Wt, [Xn, Rm{, extend}]`.
    pub fn strb_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("STRB", 0, 0b00, gpr(rt), rn, option);
    }

    /// `LDRB Wt, [Xn, Rm{, extend}]`.
    pub fn ldrb_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("LDRB", 0, 0b01, gpr(rt), rn, option);
    }

    /// `LDRSB Rt, [Xn, Rm{, extend}]`.
    pub fn ldrsb_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("LDRSB", 0, signed_opc(rt), gpr(rt), rn, option);
    }

    /// `STRH Wt, [Xn, Rm{, extend}]`.
    pub fn strh_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("STRH", 1, 0b00, gpr(rt), rn, option);
    }

    /// `LDRH Wt, [Xn, Rm{, extend}]`.
    pub fn ldrh_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("LDRH", 1, 0b01, gpr(rt), rn, option);
    }

    /// `LDRSH Rt, [Xn, Rm{, extend}]`.
    pub fn ldrsh_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("LDRSH", 1, signed_opc(rt), gpr(rt), rn, option);
    }

    /// `STR Rt, [Xn, Rm{, extend/shift}]`.
    pub fn str_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("STR", gpr_size(rt), 0b00, gpr(rt), rn, option);
    }

    /// `LDR Rt, [Xn, Rm{, extend/shift}]`.
    pub fn ldr_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        self.register_offset("LDR", gpr_size(rt), 0b01, gpr(rt), rn, option);
    }

    /// `LDRSW Xt, [Xn, Rm{, extend}]`.
    pub fn ldrsw_reg(&mut self, rt: Reg, rn: Reg, option: ArithOption) {
        assert!(rt.is_64bit(), "LDRSW: destination must be 64-bit, got {rt:?}");
        self.register_offset("LDRSW", 2, 0b10, gpr(rt), rn, option);
    }

    /// `PRFM <op>, [Xn, Rm{, extend}]`.
    pub fn prfm_reg(&mut self, op: PrefetchOp, rn: Reg, option: ArithOption) {
        self.register_offset("PRFM", 3, 0b10, op.enc(), rn, option);
    }

    // ---- PC-relative addressing ----

    fn pc_relative(&mut self, page: bool, rd: Reg, imm: i64) {
        assert!(rd.is_64bit(), "ADR/ADRP: destination must be 64-bit, got {rd:?}");
        let imm = imm as u32;
        self.write32(
            (page as u32) << 31 | (imm & 3) << 29 | 0x1000_0000 | ((imm >> 2) & 0x7FFFF) << 5 | gpr(rd),
        );
    }

    /// `ADR Xd, <pc + offset>` (±1 MiB).
    pub fn adr(&mut self, rd: Reg, offset: i32) {
        assert!(fits_signed(offset as i64, 21), "ADR: offset {offset} out of range ±1MiB");
        self.pc_relative(false, rd, offset as i64);
    }

    /// `ADRP Xd, <page(pc) + offset>`; `offset` is a byte distance in whole
    /// 4 KiB pages (±4 GiB).
    pub fn adrp(&mut self, rd: Reg, offset: i64) {
        assert!(offset & 0xFFF == 0, "ADRP: offset {offset:#x} is not page aligned");
        let pages = offset >> 12;
        assert!(fits_signed(pages, 21), "ADRP: offset {offset:#x} out of range ±4GiB");
        self.pc_relative(true, rd, pages);
    }

    /// `ADR Xd, <target>`.
    pub fn adr_to(&mut self, rd: Reg, target: *const u8) {
        let offset = target as i64 - self.get_code_ptr() as i64;
        assert!(fits_signed(offset, 21), "ADR: target {target:p} out of range ±1MiB");
        self.adr(rd, offset as i32);
    }

    /// `ADRP Xd, <page of target>`.
    pub fn adrp_to(&mut self, rd: Reg, target: *const u8) {
        let offset = (target as i64 & !0xFFF) - (self.get_code_ptr() as i64 & !0xFFF);
        self.adrp(rd, offset);
    }
}

/// `opc` for sign-extending loads: 10 into X, 11 into W.
fn signed_opc(rt: Reg) -> u32 {
    if rt.is_64bit() {
        0b10
    } else {
        0b11
    }
}

/// Status register of a store-exclusive: a W register distinct from the
/// other operands.
fn status_reg(op: &str, rs: Reg, others: &[Reg]) {
    assert!(rs.is_32bit(), "{op}: status register must be 32-bit, got {rs:?}");
    for &r in others {
        assert!(r.index() != rs.index(), "{op}: status register {rs:?} overlaps {r:?}");
    }
}

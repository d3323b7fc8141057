use super::arith::zr_like;
use super::{gpr, same_width, sf, width, Emitter};
use crate::arith::{ArithOption, ShiftType};
use crate::imm::LogicalImm;
use crate::reg::Reg;

/// Left shift applied to a `MOVZ`/`MOVN`/`MOVK` halfword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ShiftAmount {
    Shift0 = 0,
    Shift16 = 1,
    Shift32 = 2,
    Shift48 = 3,
}

impl ShiftAmount {
    /// Shift selecting halfword `index` (0–3).
    pub fn from_halfword(index: u32) -> Self {
        match index {
            0 => ShiftAmount::Shift0,
            1 => ShiftAmount::Shift16,
            2 => ShiftAmount::Shift32,
            3 => ShiftAmount::Shift48,
            _ => panic!("halfword index {index} out of range"),
        }
    }
}

impl<'a> Emitter<'a> {
    // ---- Logical (shifted register) ----

    fn logical_reg(&mut self, op: &str, opc: u32, invert: bool, rd: Reg, rn: Reg, option: ArithOption) {
        let rm = match option {
            ArithOption::Shifted { reg, .. } => reg,
            _ => panic!("{op}: logical instructions take a shifted register operand"),
        };
        same_width(op, &[rd, rn, rm]);
        self.write32(
            sf(rd)
                | opc << 29
                | 0x0A00_0000
                | (invert as u32) << 21
                | gpr(rm) << 16
                | option.data()
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `AND Rd, Rn, Rm`.
    pub fn and(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.and_with(rd, rn, lsl0(rm));
    }

    /// `AND Rd, Rn, Rm{, shift}`.
    pub fn and_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("AND", 0b00, false, rd, rn, option);
    }

    /// `BIC Rd, Rn, Rm`: `Rn & !Rm`.
    pub fn bic(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.bic_with(rd, rn, lsl0(rm));
    }

    /// `BIC Rd, Rn, Rm{, shift}`.
    pub fn bic_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("BIC", 0b00, true, rd, rn, option);
    }

    /// `ORR Rd, Rn, Rm`.
    pub fn orr(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.orr_with(rd, rn, lsl0(rm));
    }

    /// `ORR Rd, Rn, Rm{, shift}`.
    pub fn orr_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("ORR", 0b01, false, rd, rn, option);
    }

    /// `ORN Rd, Rn, Rm`: `Rn | !Rm`.
    pub fn orn(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.orn_with(rd, rn, lsl0(rm));
    }

    /// `ORN Rd, Rn, Rm{, shift}`.
    pub fn orn_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("ORN", 0b01, true, rd, rn, option);
    }

    /// `EOR Rd, Rn, Rm`.
    pub fn eor(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.eor_with(rd, rn, lsl0(rm));
    }

    /// `EOR Rd, Rn, Rm{, shift}`.
    pub fn eor_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("EOR", 0b10, false, rd, rn, option);
    }

    /// `EON Rd, Rn, Rm`: `Rn ^ !Rm`.
    pub fn eon(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.eon_with(rd, rn, lsl0(rm));
    }

    /// `EON Rd, Rn, Rm{, shift}`.
    pub fn eon_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("EON", 0b10, true, rd, rn, option);
    }

    /// `ANDS Rd, Rn, Rm`.
    pub fn ands(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.ands_with(rd, rn, lsl0(rm));
    }

    /// `ANDS Rd, Rn, Rm{, shift}`.
    pub fn ands_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("ANDS", 0b11, false, rd, rn, option);
    }

    /// `BICS Rd, Rn, Rm`.
    pub fn bics(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.bics_with(rd, rn, lsl0(rm));
    }

    /// `BICS Rd, Rn, Rm{, shift}`.
    pub fn bics_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.logical_reg("BICS", 0b11, true, rd, rn, option);
    }

    /// `MOV Rd, Rm` (`ORR Rd, ZR, Rm`). Index 31 is ZR here; copy to or
    /// from SP with `add_imm(rd, rn, 0, false)`.
    pub fn mov(&mut self, rd: Reg, rm: Reg) {
        self.orr(rd, zr_like(rd), rm);
    }

    /// `MVN Rd, Rm` (`ORN Rd, ZR, Rm`).
    pub fn mvn(&mut self, rd: Reg, rm: Reg) {
        self.orn(rd, zr_like(rd), rm);
    }

    /// `TST Rn, Rm` (`ANDS ZR, Rn, Rm`).
    pub fn tst(&mut self, rn: Reg, rm: Reg) {
        self.ands(zr_like(rn), rn, rm);
    }

    // ---- Logical (immediate) ----

    fn logical_imm(&mut self, op: &str, opc: u32, rd: Reg, rn: Reg, imm: u64) {
        same_width(op, &[rd, rn]);
        let enc = LogicalImm::new(imm, width(rd))
            .unwrap_or_else(|| panic!("{op}: {imm:#x} is not a valid logical immediate"));
        self.write32(sf(rd) | opc << 29 | 0x1200_0000 | enc.encode() | gpr(rn) << 5 | gpr(rd));
    }

    /// `AND Rd, Rn, #imm`. Index 31 as `rd` is SP.
    pub fn and_imm(&mut self, rd: Reg, rn: Reg, imm: u64) {
        self.logical_imm("AND", 0b00, rd, rn, imm);
    }

    /// `ORR Rd, Rn, #imm`.
    pub fn orr_imm(&mut self, rd: Reg, rn: Reg, imm: u64) {
        self.logical_imm("ORR", 0b01, rd, rn, imm);
    }

    /// `EOR Rd, Rn, #imm`.
    pub fn eor_imm(&mut self, rd: Reg, rn: Reg, imm: u64) {
        self.logical_imm("EOR", 0b10, rd, rn, imm);
    }

    /// `ANDS Rd, Rn, #imm`.
    pub fn ands_imm(&mut self, rd: Reg, rn: Reg, imm: u64) {
        self.logical_imm("ANDS", 0b11, rd, rn, imm);
    }

    /// `TST Rn, #imm`.
    pub fn tst_imm(&mut self, rn: Reg, imm: u64) {
        self.ands_imm(zr_like(rn), rn, imm);
    }

    // ---- Move wide ----

    fn move_wide(&mut self, op: &str, opc: u32, rd: Reg, imm: u16, shift: ShiftAmount) {
        assert!(rd.is_gpr(), "{op}: expected a general register, got {rd:?}");
        assert!(
            rd.is_64bit() || shift <= ShiftAmount::Shift16,
            "{op}: {shift:?} needs a 64-bit destination"
        );
        self.write32(sf(rd) | opc << 29 | 0x1280_0000 | (shift as u32) << 21 | (imm as u32) << 5 | gpr(rd));
    }

    /// `MOVZ Rd, #imm16, LSL #shift`.
    pub fn movz(&mut self, rd: Reg, imm: u16, shift: ShiftAmount) {
        self.move_wide("MOVZ", 0b10, rd, imm, shift);
    }

    /// `MOVN Rd, #imm16, LSL #shift`: `Rd = !(imm << shift)`.
    pub fn movn(&mut self, rd: Reg, imm: u16, shift: ShiftAmount) {
        self.move_wide("MOVN", 0b00, rd, imm, shift);
    }

    /// `MOVK Rd, #imm16, LSL #shift`: replace one halfword.
    pub fn movk(&mut self, rd: Reg, imm: u16, shift: ShiftAmount) {
        self.move_wide("MOVK", 0b11, rd, imm, shift);
    }

    // ---- Bitfield ----

    fn bitfield(&mut self, op: &str, opc: u32, rd: Reg, rn: Reg, immr: u32, imms: u32) {
        same_width(op, &[rd, rn]);
        let w = width(rd);
        assert!(immr < w && imms < w, "{op}: immr {immr} / imms {imms} out of range for {rd:?}");
        self.write32(
            sf(rd)
                | opc << 29
                | 0x1300_0000
                | (rd.is_64bit() as u32) << 22
                | immr << 16
                | imms << 10
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `SBFM Rd, Rn, #immr, #imms`.
    pub fn sbfm(&mut self, rd: Reg, rn: Reg, immr: u32, imms: u32) {
        self.bitfield("SBFM", 0b00, rd, rn, immr, imms);
    }

    /// `BFM Rd, Rn, #immr, #imms`.
    pub fn bfm(&mut self, rd: Reg, rn: Reg, immr: u32, imms: u32) {
        self.bitfield("BFM", 0b01, rd, rn, immr, imms);
    }

    /// `UBFM Rd, Rn, #immr, #imms`.
    pub fn ubfm(&mut self, rd: Reg, rn: Reg, immr: u32, imms: u32) {
        self.bitfield("UBFM", 0b10, rd, rn, immr, imms);
    }

    /// `SXTB Rd, Wn`.
    pub fn sxtb(&mut self, rd: Reg, rn: Reg) {
        self.sbfm(rd, source_like("SXTB", rd, rn), 0, 7);
    }

    /// `SXTH Rd, Wn`.
    pub fn sxth(&mut self, rd: Reg, rn: Reg) {
        self.sbfm(rd, source_like("SXTH", rd, rn), 0, 15);
    }

    /// `SXTW Xd, Wn`.
    pub fn sxtw(&mut self, rd: Reg, rn: Reg) {
        assert!(rd.is_64bit(), "SXTW: destination must be 64-bit, got {rd:?}");
        self.sbfm(rd, source_like("SXTW", rd, rn), 0, 31);
    }

    /// `UXTB Wd, Wn`. Writing the W view clears the upper half.
    pub fn uxtb(&mut self, rd: Reg, rn: Reg) {
        gpr_pair("UXTB", rd, rn);
        self.ubfm(rd.to_32(), rn.to_32(), 0, 7);
    }

    /// `UXTH Wd, Wn`.
    pub fn uxth(&mut self, rd: Reg, rn: Reg) {
        gpr_pair("UXTH", rd, rn);
        self.ubfm(rd.to_32(), rn.to_32(), 0, 15);
    }

    /// `LSL Rd, Rn, #shift`.
    pub fn lsl_imm(&mut self, rd: Reg, rn: Reg, shift: u32) {
        let w = width(rd);
        assert!(shift < w, "LSL: shift {shift} out of range");
        self.ubfm(rd, rn, (w - shift) % w, w - 1 - shift);
    }

    /// `LSR Rd, Rn, #shift`.
    pub fn lsr_imm(&mut self, rd: Reg, rn: Reg, shift: u32) {
        let w = width(rd);
        assert!(shift < w, "LSR: shift {shift} out of range");
        self.ubfm(rd, rn, shift, w - 1);
    }

    /// `ASR Rd, Rn, #shift`.
    pub fn asr_imm(&mut self, rd: Reg, rn: Reg, shift: u32) {
        let w = width(rd);
        assert!(shift < w, "ASR: shift {shift} out of range");
        self.sbfm(rd, rn, shift, w - 1);
    }

    /// `UBFX Rd, Rn, #lsb, #width`: extract `width` bits at `lsb`, zero-extended.
    pub fn ubfx(&mut self, rd: Reg, rn: Reg, lsb: u32, bits: u32) {
        check_field("UBFX", rd, lsb, bits);
        self.ubfm(rd, rn, lsb, lsb + bits - 1);
    }

    /// `SBFX Rd, Rn, #lsb, #width`: extract `width` bits at `lsb`, sign-extended.
    pub fn sbfx(&mut self, rd: Reg, rn: Reg, lsb: u32, bits: u32) {
        check_field("SBFX", rd, lsb, bits);
        self.sbfm(rd, rn, lsb, lsb + bits - 1);
    }

    /// `BFI Rd, Rn, #lsb, #width`: insert the low `width` bits of `rn` at `lsb`.
    pub fn bfi(&mut self, rd: Reg, rn: Reg, lsb: u32, bits: u32) {
        check_field("BFI", rd, lsb, bits);
        let w = width(rd);
        self.bfm(rd, rn, (w - lsb) % w, bits - 1);
    }

    /// `UBFIZ Rd, Rn, #lsb, #width`: low `width` bits of `rn` moved to `lsb`, rest zero.
    pub fn ubfiz(&mut self, rd: Reg, rn: Reg, lsb: u32, bits: u32) {
        check_field("UBFIZ", rd, lsb, bits);
        let w = width(rd);
        self.ubfm(rd, rn, (w - lsb) % w, bits - 1);
    }
}

fn lsl0(rm: Reg) -> ArithOption {
    ArithOption::shifted(rm, ShiftType::Lsl, 0)
}

fn gpr_pair(op: &str, rd: Reg, rn: Reg) {
    assert!(
        rd.is_gpr() && rn.is_gpr(),
        "{op}: expected general registers, got {rd:?}, {rn:?}"
    );
}

/// Sign-extend aliases name a W source even for X destinations.
fn source_like(op: &str, rd: Reg, rn: Reg) -> Reg {
    gpr_pair(op, rd, rn);
    if rd.is_64bit() {
        rn.to_64()
    } else {
        rn.to_32()
    }
}

fn check_field(op: &str, rd: Reg, lsb: u32, bits: u32) {
    assert!(rd.is_gpr(), "{op}: expected a general register, got {rd:?}");
    assert!(
        bits >= 1 && lsb + bits <= width(rd),
        "{op}: field lsb {lsb} width {bits} does not fit {rd:?}"
    );
}

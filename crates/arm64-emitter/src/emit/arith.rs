use super::{gpr, same_width, sf, Emitter};
use crate::arith::{ArithOption, ShiftType};
use crate::cond::Cond;
use crate::reg::Reg;

/// Zero register of the same width as `r`.
pub(crate) fn zr_like(r: Reg) -> Reg {
    if r.is_64bit() {
        Reg::ZR
    } else {
        Reg::WZR
    }
}

impl<'a> Emitter<'a> {
    // ---- Add/subtract (shifted or extended register) ----

    fn arith_reg(&mut self, op: &str, sub: bool, flags: bool, rd: Reg, rn: Reg, option: ArithOption) {
        let (rm, extended) = match option {
            ArithOption::Extended { reg, .. } => {
                same_width(op, &[rd, rn]);
                assert!(
                    !reg.is_64bit() || rd.is_64bit(),
                    "{op}: 64-bit extend source {reg:?} with 32-bit destination {rd:?}"
                );
                (reg, 1)
            }
            ArithOption::Shifted { reg, kind, .. } => {
                same_width(op, &[rd, rn, reg]);
                assert!(kind != ShiftType::Ror, "{op}: ROR is not a valid add/sub shift");
                (reg, 0)
            }
            ArithOption::Immediate(_) => panic!("{op}: use the _imm form for immediates"),
        };
        self.write32(
            sf(rd)
                | (sub as u32) << 30
                | (flags as u32) << 29
                | 0x0B00_0000
                | extended << 21
                | gpr(rm) << 16
                | option.data()
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `ADD Rd, Rn, Rm`.
    pub fn add(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.add_with(rd, rn, ArithOption::shifted(rm, ShiftType::Lsl, 0));
    }

    /// `ADD Rd, Rn, Rm{, shift|extend}` with an explicit operand form.
    pub fn add_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.arith_reg("ADD", false, false, rd, rn, option);
    }

    /// `ADDS Rd, Rn, Rm`: add, setting flags.
    pub fn adds(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.adds_with(rd, rn, ArithOption::shifted(rm, ShiftType::Lsl, 0));
    }

    /// `ADDS Rd, Rn, Rm{, shift|extend}`.
    pub fn adds_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.arith_reg("ADDS", false, true, rd, rn, option);
    }

    /// `SUB Rd, Rn, Rm`.
    pub fn sub(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.sub_with(rd, rn, ArithOption::shifted(rm, ShiftType::Lsl, 0));
    }

    /// `SUB Rd, Rn, Rm{, shift|extend}`.
    pub fn sub_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.arith_reg("SUB", true, false, rd, rn, option);
    }

    /// `SUBS Rd, Rn, Rm`: subtract, setting flags.
    pub fn subs(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.subs_with(rd, rn, ArithOption::shifted(rm, ShiftType::Lsl, 0));
    }

    /// `SUBS Rd, Rn, Rm{, shift|extend}`.
    pub fn subs_with(&mut self, rd: Reg, rn: Reg, option: ArithOption) {
        self.arith_reg("SUBS", true, true, rd, rn, option);
    }

    /// `CMN Rn, Rm` (`ADDS ZR, Rn, Rm`).
    pub fn cmn(&mut self, rn: Reg, rm: Reg) {
        self.adds(zr_like(rn), rn, rm);
    }

    /// `CMN Rn, Rm{, shift|extend}` (alias of `ADDS ZR, ..`).
    pub fn cmn_with(&mut self, rn: Reg, option: ArithOption) {
        self.adds_with(zr_like(rn), rn, option);
    }

    /// `CMP Rn, Rm` (`SUBS ZR, Rn, Rm`).
    pub fn cmp(&mut self, rn: Reg, rm: Reg) {
        self.subs(zr_like(rn), rn, rm);
    }

    /// `CMP Rn, Rm{, shift|extend}` (alias of `SUBS ZR, ..`).
    pub fn cmp_with(&mut self, rn: Reg, option: ArithOption) {
        self.subs_with(zr_like(rn), rn, option);
    }

    // ---- Add/subtract (immediate) ----

    fn arith_imm(&mut self, op: &str, sub: bool, flags: bool, rd: Reg, rn: Reg, imm: u32, shift: bool) {
        same_width(op, &[rd, rn]);
        assert!(imm < 4096, "{op}: immediate {imm:#x} exceeds 12 bits");
        self.write32(
            sf(rd)
                | (sub as u32) << 30
                | (flags as u32) << 29
                | 0x1100_0000
                | (shift as u32) << 22
                | imm << 10
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `ADD Rd, Rn, #imm{, LSL #12}`. Index 31 is SP for both registers.
    pub fn add_imm(&mut self, rd: Reg, rn: Reg, imm: u32, shift: bool) {
        self.arith_imm("ADD", false, false, rd, rn, imm, shift);
    }

    /// `ADDS Rd, Rn, #imm{, LSL #12}`.
    pub fn adds_imm(&mut self, rd: Reg, rn: Reg, imm: u32, shift: bool) {
        self.arith_imm("ADDS", false, true, rd, rn, imm, shift);
    }

    /// `SUB Rd, Rn, #imm{, LSL #12}`.
    pub fn sub_imm(&mut self, rd: Reg, rn: Reg, imm: u32, shift: bool) {
        self.arith_imm("SUB", true, false, rd, rn, imm, shift);
    }

    /// `SUBS Rd, Rn, #imm{, LSL #12}`.
    pub fn subs_imm(&mut self, rd: Reg, rn: Reg, imm: u32, shift: bool) {
        self.arith_imm("SUBS", true, true, rd, rn, imm, shift);
    }

    /// `CMN Rn, #imm{, LSL #12}`.
    pub fn cmn_imm(&mut self, rn: Reg, imm: u32, shift: bool) {
        self.adds_imm(zr_like(rn), rn, imm, shift);
    }

    /// `CMP Rn, #imm{, LSL #12}`.
    pub fn cmp_imm(&mut self, rn: Reg, imm: u32, shift: bool) {
        self.subs_imm(zr_like(rn), rn, imm, shift);
    }

    // ---- Add/subtract with carry ----

    fn carry(&mut self, op: &str, sub: bool, flags: bool, rd: Reg, rn: Reg, rm: Reg) {
        same_width(op, &[rd, rn, rm]);
        self.write32(
            sf(rd)
                | (sub as u32) << 30
                | (flags as u32) << 29
                | 0x1A00_0000
                | gpr(rm) << 16
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `ADC Rd, Rn, Rm`: add with carry.
    pub fn adc(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.carry("ADC", false, false, rd, rn, rm);
    }

    /// `ADCS Rd, Rn, Rm`.
    pub fn adcs(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.carry("ADCS", false, true, rd, rn, rm);
    }

    /// `SBC Rd, Rn, Rm`: subtract with carry.
    pub fn sbc(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.carry("SBC", true, false, rd, rn, rm);
    }

    /// `SBCS Rd, Rn, Rm`.
    pub fn sbcs(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.carry("SBCS", true, true, rd, rn, rm);
    }

    // ---- Conditional compare ----

    fn cond_compare(&mut self, op: &str, sub: bool, rn: Reg, field: u32, is_imm: bool, nzcv: u8, cond: Cond) {
        assert!(nzcv < 16, "{op}: nzcv {nzcv} exceeds 4 bits");
        self.write32(
            sf(rn)
                | (sub as u32) << 30
                | 1 << 29
                | 0x1A40_0000
                | field << 16
                | cond.enc() << 12
                | (is_imm as u32) << 11
                | gpr(rn) << 5
                | nzcv as u32,
        );
    }

    /// `CCMN Rn, #imm5, #nzcv, cond`.
    pub fn ccmn_imm(&mut self, rn: Reg, imm: u8, nzcv: u8, cond: Cond) {
        assert!(imm < 32, "CCMN: immediate {imm} exceeds 5 bits");
        self.cond_compare("CCMN", false, rn, imm as u32, true, nzcv, cond);
    }

    /// `CCMP Rn, #imm5, #nzcv, cond`.
    pub fn ccmp_imm(&mut self, rn: Reg, imm: u8, nzcv: u8, cond: Cond) {
        assert!(imm < 32, "CCMP: immediate {imm} exceeds 5 bits");
        self.cond_compare("CCMP", true, rn, imm as u32, true, nzcv, cond);
    }

    /// `CCMN Rn, Rm, #nzcv, cond`.
    pub fn ccmn(&mut self, rn: Reg, rm: Reg, nzcv: u8, cond: Cond) {
        same_width("CCMN", &[rn, rm]);
        self.cond_compare("CCMN", false, rn, gpr(rm), false, nzcv, cond);
    }

    /// `CCMP Rn, Rm, #nzcv, cond`.
    pub fn ccmp(&mut self, rn: Reg, rm: Reg, nzcv: u8, cond: Cond) {
        same_width("CCMP", &[rn, rm]);
        self.cond_compare("CCMP", true, rn, gpr(rm), false, nzcv, cond);
    }

    // ---- Conditional select ----

    fn cond_select(&mut self, op: &str, invert: bool, op2: u32, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        same_width(op, &[rd, rn, rm]);
        self.write32(
            sf(rd)
                | (invert as u32) << 30
                | 0x1A80_0000
                | gpr(rm) << 16
                | cond.enc() << 12
                | op2 << 10
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `CSEL Rd, Rn, Rm, cond`.
    pub fn csel(&mut self, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        self.cond_select("CSEL", false, 0, rd, rn, rm, cond);
    }

    /// `CSINC Rd, Rn, Rm, cond`: `Rd = cond ? Rn : Rm + 1`.
    pub fn csinc(&mut self, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        self.cond_select("CSINC", false, 1, rd, rn, rm, cond);
    }

    /// `CSINV Rd, Rn, Rm, cond`: `Rd = cond ? Rn : !Rm`.
    pub fn csinv(&mut self, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        self.cond_select("CSINV", true, 0, rd, rn, rm, cond);
    }

    /// `CSNEG Rd, Rn, Rm, cond`: `Rd = cond ? Rn : -Rm`.
    pub fn csneg(&mut self, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        self.cond_select("CSNEG", true, 1, rd, rn, rm, cond);
    }

    /// `CSET Rd, cond`: `Rd = cond ? 1 : 0`.
    pub fn cset(&mut self, rd: Reg, cond: Cond) {
        let zr = zr_like(rd);
        self.csinc(rd, zr, zr, invertible("CSET", cond));
    }

    /// `CSETM Rd, cond`: `Rd = cond ? -1 : 0`.
    pub fn csetm(&mut self, rd: Reg, cond: Cond) {
        let zr = zr_like(rd);
        self.csinv(rd, zr, zr, invertible("CSETM", cond));
    }

    /// `CINC Rd, Rn, cond`: `Rd = cond ? Rn + 1 : Rn`.
    pub fn cinc(&mut self, rd: Reg, rn: Reg, cond: Cond) {
        self.csinc(rd, rn, rn, invertible("CINC", cond));
    }

    /// `CNEG Rd, Rn, cond`: `Rd = cond ? -Rn : Rn`.
    pub fn cneg(&mut self, rd: Reg, rn: Reg, cond: Cond) {
        self.csneg(rd, rn, rn, invertible("CNEG", cond));
    }

    // ---- Data processing (1 source) ----

    fn data1(&mut self, op: &str, opcode: u32, rd: Reg, rn: Reg) {
        same_width(op, &[rd, rn]);
        self.write32(sf(rd) | 0x5AC0_0000 | opcode << 10 | gpr(rn) << 5 | gpr(rd));
    }

    /// `RBIT Rd, Rn`: reverse bit order.
    pub fn rbit(&mut self, rd: Reg, rn: Reg) {
        self.data1("RBIT", 0b000000, rd, rn);
    }

    /// Byte swap within each halfword.
    pub fn rev16(&mut self, rd: Reg, rn: Reg) {
        self.data1("REV16", 0b000001, rd, rn);
    }

    /// Byte swap within each word (`REV Wd` for 32-bit operands).
    pub fn rev32(&mut self, rd: Reg, rn: Reg) {
        self.data1("REV32", 0b000010, rd, rn);
    }

    /// Byte swap of a whole 64-bit register.
    pub fn rev64(&mut self, rd: Reg, rn: Reg) {
        assert!(rd.is_64bit(), "REV64: operands must be 64-bit, got {rd:?}");
        self.data1("REV64", 0b000011, rd, rn);
    }

    /// `CLZ Rd, Rn`: count leading zeros.
    pub fn clz(&mut self, rd: Reg, rn: Reg) {
        self.data1("CLZ", 0b000100, rd, rn);
    }

    /// `CLS Rd, Rn`: count leading sign bits.
    pub fn cls(&mut self, rd: Reg, rn: Reg) {
        self.data1("CLS", 0b000101, rd, rn);
    }

    // ---- Data processing (2 source) ----

    fn data2(&mut self, op: &str, opcode: u32, rd: Reg, rn: Reg, rm: Reg) {
        same_width(op, &[rd, rn, rm]);
        self.write32(sf(rd) | 0x1AC0_0000 | gpr(rm) << 16 | opcode << 10 | gpr(rn) << 5 | gpr(rd));
    }

    /// `UDIV Rd, Rn, Rm`.
    pub fn udiv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("UDIV", 0b000010, rd, rn, rm);
    }

    /// `SDIV Rd, Rn, Rm`.
    pub fn sdiv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("SDIV", 0b000011, rd, rn, rm);
    }

    /// `LSLV Rd, Rn, Rm`.
    pub fn lslv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("LSLV", 0b001000, rd, rn, rm);
    }

    /// `LSRV Rd, Rn, Rm`.
    pub fn lsrv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("LSRV", 0b001001, rd, rn, rm);
    }

    /// `ASRV Rd, Rn, Rm`.
    pub fn asrv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("ASRV", 0b001010, rd, rn, rm);
    }

    /// `RORV Rd, Rn, Rm`.
    pub fn rorv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.data2("RORV", 0b001011, rd, rn, rm);
    }

    /// CRC32 family: `Wd`, `Wn` accumulate; `rm` is `W` except for the
    /// doubleword forms, which take an `X` data register and set `sf`.
    fn crc32(&mut self, op: &str, opcode: u32, rd: Reg, rn: Reg, rm: Reg, doubleword: bool) {
        same_width(op, &[rd, rn]);
        assert!(!rd.is_64bit(), "{op}: accumulator must be a 32-bit register, got {rd:?}");
        assert!(
            rm.is_gpr() && rm.is_64bit() == doubleword,
            "{op}: data register {rm:?} has the wrong width"
        );
        self.write32(
            (doubleword as u32) << 31 | 0x1AC0_0000 | gpr(rm) << 16 | opcode << 10 | gpr(rn) << 5 | gpr(rd),
        );
    }

    /// `CRC32B Wd, Wn, Wm`.
    pub fn crc32b(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32B", 0b010000, rd, rn, rm, false);
    }

    /// `CRC32H Wd, Wn, Wm`.
    pub fn crc32h(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32H", 0b010001, rd, rn, rm, false);
    }

    /// `CRC32W Wd, Wn, Wm`.
    pub fn crc32w(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32W", 0b010010, rd, rn, rm, false);
    }

    /// `CRC32X Wd, Wn, Xm`.
    pub fn crc32x(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32X", 0b010011, rd, rn, rm, true);
    }

    /// `CRC32CB Wd, Wn, Wm`.
    pub fn crc32cb(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32CB", 0b010100, rd, rn, rm, false);
    }

    /// `CRC32CH Wd, Wn, Wm`.
    pub fn crc32ch(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32CH", 0b010101, rd, rn, rm, false);
    }

    /// `CRC32CW Wd, Wn, Wm`.
    pub fn crc32cw(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32CW", 0b010110, rd, rn, rm, false);
    }

    /// `CRC32CX Wd, Wn, Xm`.
    pub fn crc32cx(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.crc32("CRC32CX", 0b010111, rd, rn, rm, true);
    }

    // ---- Data processing (3 source) ----

    fn data3(&mut self, op31: u32, o0: u32, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        self.write32(
            sf(rd)
                | 0x1B00_0000
                | op31 << 21
                | gpr(rm) << 16
                | o0 << 15
                | gpr(ra) << 10
                | gpr(rn) << 5
                | gpr(rd),
        );
    }

    /// `MADD Rd, Rn, Rm, Ra`: `Rd = Ra + Rn * Rm`.
    pub fn madd(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        same_width("MADD", &[rd, rn, rm, ra]);
        self.data3(0b000, 0, rd, rn, rm, ra);
    }

    /// `MSUB Rd, Rn, Rm, Ra`: `Rd = Ra - Rn * Rm`.
    pub fn msub(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        same_width("MSUB", &[rd, rn, rm, ra]);
        self.data3(0b000, 1, rd, rn, rm, ra);
    }

    fn long_multiply(&mut self, op: &str, op31: u32, o0: u32, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        same_width(op, &[rd, ra]);
        same_width(op, &[rn, rm]);
        assert!(
            rd.is_64bit() && !rn.is_64bit(),
            "{op}: expects Xd, Wn, Wm, Xa operands"
        );
        self.data3(op31, o0, rd, rn, rm, ra);
    }

    /// `SMADDL Xd, Wn, Wm, Xa`.
    pub fn smaddl(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        self.long_multiply("SMADDL", 0b001, 0, rd, rn, rm, ra);
    }

    /// `SMSUBL Xd, Wn, Wm, Xa`.
    pub fn smsubl(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        self.long_multiply("SMSUBL", 0b001, 1, rd, rn, rm, ra);
    }

    /// `UMADDL Xd, Wn, Wm, Xa`.
    pub fn umaddl(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        self.long_multiply("UMADDL", 0b101, 0, rd, rn, rm, ra);
    }

    /// `UMSUBL Xd, Wn, Wm, Xa`.
    pub fn umsubl(&mut self, rd: Reg, rn: Reg, rm: Reg, ra: Reg) {
        self.long_multiply("UMSUBL", 0b101, 1, rd, rn, rm, ra);
    }

    /// High 64 bits of the signed 128-bit product.
    pub fn smulh(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        same_width("SMULH", &[rd, rn, rm]);
        assert!(rd.is_64bit(), "SMULH: operands must be 64-bit");
        self.data3(0b010, 0, rd, rn, rm, Reg::ZR);
    }

    /// `UMULH Xd, Xn, Xm`: high half of the unsigned product.
    pub fn umulh(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        same_width("UMULH", &[rd, rn, rm]);
        assert!(rd.is_64bit(), "UMULH: operands must be 64-bit");
        self.data3(0b110, 0, rd, rn, rm, Reg::ZR);
    }

    /// `MUL Rd, Rn, Rm` (`MADD` with a zero addend).
    pub fn mul(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.madd(rd, rn, rm, zr_like(rd));
    }

    /// `MNEG Rd, Rn, Rm`: `Rd = -(Rn * Rm)`.
    pub fn mneg(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.msub(rd, rn, rm, zr_like(rd));
    }
}

/// AL and NV have no inverse that selects the other operand.
fn invertible(op: &str, cond: Cond) -> Cond {
    assert!(
        cond != Cond::AL && cond != Cond::NV,
        "{op}: condition {cond:?} cannot be inverted"
    );
    cond.invert()
}

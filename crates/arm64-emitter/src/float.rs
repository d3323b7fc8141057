//! Scalar floating-point and Advanced SIMD (vector) instructions.
//!
//! Vector operands are `D` registers for 64-bit vectors and `Q` registers
//! for 128-bit vectors; the register view selects the `Q` bit. Element
//! sizes are passed explicitly in bits.

use crate::code_buffer::CodeBuffer;
use crate::cond::Cond;
use crate::emit::load_store::{base, indexed_word, pair_word};
use crate::emit::{frame_plan, gpr, Emitter, IndexType};
use crate::imm::fp_imm8;
use crate::reg::{Reg, RegSet};

/// Vector/FP encoder. Borrows an [`Emitter`] and writes through it.
pub struct FloatEmitter<'e, 'a> {
    emit: &'e mut Emitter<'a>,
}

fn vreg(op: &str, r: Reg) -> u32 {
    assert!(r.is_vector(), "{op}: expected a vector register, got {r:?}");
    r.enc()
}

/// `type` field of scalar FP instructions: 0 single, 1 double.
fn scalar_type(op: &str, r: Reg) -> u32 {
    if r.is_single() {
        0
    } else if r.is_double() {
        1
    } else {
        panic!("{op}: expected an S or D register, got {r:?}")
    }
}

fn same_scalar(op: &str, regs: &[Reg]) -> u32 {
    let ty = scalar_type(op, regs[0]);
    for &r in &regs[1..] {
        assert!(scalar_type(op, r) == ty, "{op}: operand precision mismatch in {regs:?}");
    }
    ty
}

/// `Q` bit of a vector operand: D = 64-bit vector, Q = 128-bit vector.
fn q_bit(op: &str, r: Reg) -> u32 {
    if r.is_quad() {
        1
    } else if r.is_double() {
        0
    } else {
        panic!("{op}: vector operand must be a D or Q register, got {r:?}")
    }
}

fn same_vector(op: &str, regs: &[Reg]) -> u32 {
    let q = q_bit(op, regs[0]);
    for &r in &regs[1..] {
        assert!(q_bit(op, r) == q, "{op}: vector width mismatch in {regs:?}");
    }
    q
}

/// Element size in bits to the 2-bit `size` field.
fn size_code(op: &str, size: u8) -> u32 {
    match size {
        8 => 0,
        16 => 1,
        32 => 2,
        64 => 3,
        _ => panic!("{op}: element size {size} is not 8, 16, 32 or 64"),
    }
}

/// FP element size to the `sz` bit.
fn fp_sz(op: &str, size: u8) -> u32 {
    match size {
        32 => 0,
        64 => 1,
        _ => panic!("{op}: floating-point element size must be 32 or 64, got {size}"),
    }
}

/// `imm5` selecting lane `index` of a `size`-bit element.
fn lane_imm5(op: &str, size: u8, index: u8) -> u32 {
    let s = size_code(op, size);
    assert!((index as u32) < 16 >> s, "{op}: lane {index} out of range for {size}-bit elements");
    (index as u32) << (s + 1) | 1 << s
}

impl<'e, 'a> FloatEmitter<'e, 'a> {
    pub fn new(emit: &'e mut Emitter<'a>) -> Self {
        FloatEmitter { emit }
    }

    pub fn buffer(&self) -> &CodeBuffer<'a> {
        self.emit.buffer()
    }

    fn write32(&mut self, word: u32) {
        self.emit.write32(word);
    }

    // ---- Encoding groups ----

    fn fp1(&mut self, op: &str, opcode: u32, rd: Reg, rn: Reg) {
        let ty = same_scalar(op, &[rd, rn]);
        self.write32(0x1E20_4000 | ty << 22 | opcode << 15 | vreg(op, rn) << 5 | vreg(op, rd));
    }

    fn fp2(&mut self, op: &str, opcode: u32, rd: Reg, rn: Reg, rm: Reg) {
        let ty = same_scalar(op, &[rd, rn, rm]);
        self.write32(
            0x1E20_0800 | ty << 22 | vreg(op, rm) << 16 | opcode << 12 | vreg(op, rn) << 5 | vreg(op, rd),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn three_same(&mut self, op: &str, u: u32, size: u32, opcode: u32, rd: Reg, rn: Reg, rm: Reg) {
        let q = same_vector(op, &[rd, rn, rm]);
        self.write32(
            q << 30
                | u << 29
                | 0x0E20_0400
                | size << 22
                | vreg(op, rm) << 16
                | opcode << 11
                | vreg(op, rn) << 5
                | vreg(op, rd),
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn two_misc(&mut self, op: &str, q: u32, u: u32, size: u32, opcode: u32, rd: Reg, rn: Reg) {
        self.write32(
            q << 30 | u << 29 | 0x0E20_0800 | size << 22 | opcode << 12 | vreg(op, rn) << 5 | vreg(op, rd),
        );
    }

    fn two_misc_same(&mut self, op: &str, u: u32, size: u32, opcode: u32, rd: Reg, rn: Reg) {
        let q = same_vector(op, &[rd, rn]);
        self.two_misc(op, q, u, size, opcode, rd, rn);
    }

    #[allow(clippy::too_many_arguments)]
    fn copy(&mut self, q: u32, op_bit: u32, imm5: u32, imm4: u32, rd: u32, rn: u32) {
        self.write32(q << 30 | op_bit << 29 | 0x0E00_0400 | imm5 << 16 | imm4 << 11 | rn << 5 | rd);
    }

    fn conversion(&mut self, sf: u32, ty: u32, rmode: u32, opcode: u32, rd: u32, rn: u32) {
        self.write32(sf << 31 | 0x1E20_0000 | ty << 22 | rmode << 19 | opcode << 16 | rn << 5 | rd);
    }

    // ---- Load/store ----

    /// `(size field, opc)` for a `size`-bit FP/SIMD register access.
    fn ls_size(op: &str, size: u8, load: bool) -> (u32, u32) {
        let opc = load as u32;
        match size {
            8 => (0, opc),
            16 => (1, opc),
            32 => (2, opc),
            64 => (3, opc),
            128 => (0, 0b10 | opc),
            _ => panic!("{op}: access size {size} is not 8, 16, 32, 64 or 128"),
        }
    }

    /// `STR Bt/Ht/St/Dt/Qt, ...`.
    pub fn str(&mut self, size: u8, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        let (sz, opc) = Self::ls_size("STR", size, false);
        self.write32(indexed_word("STR", sz, true, opc, index, vreg("STR", rt), rn, imm));
    }

    /// `LDR Bt/Ht/St/Dt/Qt, ...`.
    pub fn ldr(&mut self, size: u8, index: IndexType, rt: Reg, rn: Reg, imm: i32) {
        let (sz, opc) = Self::ls_size("LDR", size, true);
        self.write32(indexed_word("LDR", sz, true, opc, index, vreg("LDR", rt), rn, imm));
    }

    #[allow(clippy::too_many_arguments)]
    fn pair(&mut self, op: &str, load: bool, size: u8, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        let (opc, scale) = match size {
            32 => (0b00, 4),
            64 => (0b01, 8),
            128 => (0b10, 16),
            _ => panic!("{op}: pair size {size} is not 32, 64 or 128"),
        };
        let word = pair_word(op, opc, true, load, Some(index), vreg(op, rt), vreg(op, rt2), rn, imm, scale);
        self.write32(word);
    }

    /// `STP <St|Dt|Qt>, <St2|Dt2|Qt2>, ...`.
    pub fn stp(&mut self, size: u8, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.pair("STP", false, size, index, rt, rt2, rn, imm);
    }

    /// `LDP <St|Dt|Qt>, <St2|Dt2|Qt2>, ...`.
    pub fn ldp(&mut self, size: u8, index: IndexType, rt: Reg, rt2: Reg, rn: Reg, imm: i32) {
        self.pair("LDP", true, size, index, rt, rt2, rn, imm);
    }

    /// Single-structure load/store of lane `index`. `rm` of `Some(ZR)`
    /// post-increments by the element size, `Some(Xm)` by a register.
    #[allow(clippy::too_many_arguments)]
    fn single_structure(&mut self, op: &str, load: bool, size: u8, rt: Reg, index: u8, rn: Reg, rm: Option<Reg>) {
        let lanes = 16 >> size_code(op, size);
        assert!(index < lanes, "{op}: lane {index} out of range for {size}-bit elements");
        let i = index as u32;
        let (opcode, q, s, sz) = match size {
            8 => (0b000, i >> 3, (i >> 2) & 1, i & 3),
            16 => (0b010, i >> 2, (i >> 1) & 1, (i & 1) << 1),
            32 => (0b100, i >> 1, i & 1, 0b00),
            _ => (0b100, i, 0, 0b01),
        };
        let (post, rm_field) = match rm {
            Some(rm) => {
                assert!(rm.is_64bit(), "{op}: post-index register must be 64-bit, got {rm:?}");
                (1, gpr(rm))
            }
            None => (0, 0),
        };
        self.write32(
            q << 30
                | 0x0D00_0000
                | post << 23
                | (load as u32) << 22
                | rm_field << 16
                | opcode << 13
                | s << 12
                | sz << 10
                | base(op, rn) << 5
                | vreg(op, rt),
        );
    }

    /// `LD1 {Vt.<size>}[index], [Xn]`.
    pub fn ld1_lane(&mut self, size: u8, rt: Reg, index: u8, rn: Reg) {
        self.single_structure("LD1", true, size, rt, index, rn, None);
    }

    /// `LD1 {Vt.<size>}[index], [Xn], Xm`. `Reg::ZR` as `rm` steps by the
    /// element size.
    pub fn ld1_lane_post(&mut self, size: u8, rt: Reg, index: u8, rn: Reg, rm: Reg) {
        self.single_structure("LD1", true, size, rt, index, rn, Some(rm));
    }

    /// `ST1 {Vt.<T>}[index], [Xn]`.
    pub fn st1_lane(&mut self, size: u8, rt: Reg, index: u8, rn: Reg) {
        self.single_structure("ST1", false, size, rt, index, rn, None);
    }

    /// `ST1 {Vt.<T>}[index], [Xn], <Xm|#size>`.
    pub fn st1_lane_post(&mut self, size: u8, rt: Reg, index: u8, rn: Reg, rm: Reg) {
        self.single_structure("ST1", false, size, rt, index, rn, Some(rm));
    }

    /// `LD1R {Vt.<T>}, [Xn]`: load one element and replicate it to all lanes.
    pub fn ld1r(&mut self, size: u8, rt: Reg, rn: Reg) {
        let q = q_bit("LD1R", rt);
        self.write32(
            q << 30
                | 0x0D40_C000
                | size_code("LD1R", size) << 10
                | base("LD1R", rn) << 5
                | vreg("LD1R", rt),
        );
    }

    fn multiple_structure(&mut self, op: &str, load: bool, size: u8, count: u8, rt: Reg, rn: Reg) {
        let opcode = match count {
            1 => 0b0111,
            2 => 0b1010,
            3 => 0b0110,
            4 => 0b0010,
            _ => panic!("{op}: register count {count} is not 1-4"),
        };
        let q = q_bit(op, rt);
        self.write32(
            q << 30
                | 0x0C00_0000
                | (load as u32) << 22
                | opcode << 12
                | size_code(op, size) << 10
                | base(op, rn) << 5
                | vreg(op, rt),
        );
    }

    /// `LD1 {Vt.<T> .. Vt+count-1.<T>}, [Xn]`.
    pub fn ld1(&mut self, size: u8, count: u8, rt: Reg, rn: Reg) {
        self.multiple_structure("LD1", true, size, count, rt, rn);
    }

    /// `ST1 {Vt.<T>, ..}, [Xn]` over `count` consecutive registers.
    pub fn st1(&mut self, size: u8, count: u8, rt: Reg, rn: Reg) {
        self.multiple_structure("ST1", false, size, count, rt, rn);
    }

    // ---- Scalar arithmetic ----

    /// `FMOV <Sd|Dd>, <Sn|Dn>`.
    pub fn fmov(&mut self, rd: Reg, rn: Reg) {
        self.fp1("FMOV", 0b000000, rd, rn);
    }

    /// `FABS <Sd|Dd>, <Sn|Dn>`.
    pub fn fabs(&mut self, rd: Reg, rn: Reg) {
        self.fp1("FABS", 0b000001, rd, rn);
    }

    /// `FNEG <Sd|Dd>, <Sn|Dn>`.
    pub fn fneg(&mut self, rd: Reg, rn: Reg) {
        self.fp1("FNEG", 0b000010, rd, rn);
    }

    /// `FSQRT <Sd|Dd>, <Sn|Dn>`.
    pub fn fsqrt(&mut self, rd: Reg, rn: Reg) {
        self.fp1("FSQRT", 0b000011, rd, rn);
    }

    /// `FMUL <Sd|Dd>, Vn, Vm`.
    pub fn fmul(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FMUL", 0b0000, rd, rn, rm);
    }

    /// `FDIV <Sd|Dd>, Vn, Vm`.
    pub fn fdiv(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FDIV", 0b0001, rd, rn, rm);
    }

    /// `FADD <Sd|Dd>, Vn, Vm`.
    pub fn fadd(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FADD", 0b0010, rd, rn, rm);
    }

    /// `FSUB <Sd|Dd>, Vn, Vm`.
    pub fn fsub(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FSUB", 0b0011, rd, rn, rm);
    }

    /// `FMAX <Sd|Dd>, Vn, Vm`.
    pub fn fmax(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FMAX", 0b0100, rd, rn, rm);
    }

    /// `FMIN <Sd|Dd>, Vn, Vm`.
    pub fn fmin(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FMIN", 0b0101, rd, rn, rm);
    }

    /// `FNMUL <Sd|Dd>, Vn, Vm`.
    pub fn fnmul(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.fp2("FNMUL", 0b1000, rd, rn, rm);
    }

    /// `FMOV Sd/Dd, #value`. Panics unless `value` is an 8-bit FP immediate.
    pub fn fmov_imm(&mut self, rd: Reg, value: f64) {
        let ty = scalar_type("FMOV", rd);
        let imm8 = fp_imm8(value)
            .unwrap_or_else(|| panic!("FMOV: {value} is not representable as an FP immediate"));
        self.write32(0x1E20_1000 | ty << 22 | (imm8 as u32) << 13 | rd.enc());
    }

    /// `FCVT` between precisions. Sizes are 16, 32 or 64 bits.
    pub fn fcvt(&mut self, size_to: u8, size_from: u8, rd: Reg, rn: Reg) {
        let code = |size: u8| match size {
            32 => 0b00,
            64 => 0b01,
            16 => 0b11,
            _ => panic!("FCVT: size {size} is not 16, 32 or 64"),
        };
        assert!(size_to != size_from, "FCVT: source and destination precision are both {size_to}");
        for (reg, size) in [(rd, size_to), (rn, size_from)] {
            assert!(
                size == 16 || scalar_type("FCVT", reg) == code(size),
                "FCVT: {reg:?} does not hold a {size}-bit value"
            );
        }
        self.write32(
            0x1E22_4000
                | code(size_from) << 22
                | code(size_to) << 15
                | vreg("FCVT", rn) << 5
                | vreg("FCVT", rd),
        );
    }

    // ---- Vector integer / bitwise ----

    /// `AND Vd.<8B|16B>, Vn, Vm`.
    pub fn and(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.three_same("AND", 0, 0b00, 0b00011, rd, rn, rm);
    }

    /// `BIC Vd.<8B|16B>, Vn, Vm`.
    pub fn bic(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.three_same("BIC", 0, 0b01, 0b00011, rd, rn, rm);
    }

    /// `ORR Vd.<8B|16B>, Vn, Vm`.
    pub fn orr(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.three_same("ORR", 0, 0b10, 0b00011, rd, rn, rm);
    }

    /// `EOR Vd.<8B|16B>, Vn, Vm`.
    pub fn eor(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.three_same("EOR", 1, 0b00, 0b00011, rd, rn, rm);
    }

    /// `BSL`: bitwise select: `rd = (rd & rn) | (!rd & rm)`.
    pub fn bsl(&mut self, rd: Reg, rn: Reg, rm: Reg) {
        self.three_same("BSL", 1, 0b01, 0b00011, rd, rn, rm);
    }

    /// `MOV Vd, Vn` (`ORR Vd, Vn, Vn`).
    pub fn mov(&mut self, rd: Reg, rn: Reg) {
        self.orr(rd, rn, rn);
    }

    /// `NOT Vd.<8B|16B>, Vn`.
    pub fn not(&mut self, rd: Reg, rn: Reg) {
        self.two_misc_same("NOT", 1, 0b00, 0b00101, rd, rn);
    }

    /// `ADD Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn add(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        let sz = self.element("ADD", size, rd);
        self.three_same("ADD", 0, sz, 0b10000, rd, rn, rm);
    }

    /// `SUB Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn sub(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        let sz = self.element("SUB", size, rd);
        self.three_same("SUB", 1, sz, 0b10000, rd, rn, rm);
    }

    /// `MUL Vd.<T>, Vn.<T>, Vm.<T>` (8/16/32-bit lanes).
    pub fn mul(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        assert!(size != 64, "MUL: 64-bit elements are not supported");
        let sz = self.element("MUL", size, rd);
        self.three_same("MUL", 0, sz, 0b10011, rd, rn, rm);
    }

    /// `NEG Vd.<T>, Vn.<T>`.
    pub fn neg(&mut self, size: u8, rd: Reg, rn: Reg) {
        let sz = self.element("NEG", size, rd);
        self.two_misc_same("NEG", 1, sz, 0b01011, rd, rn);
    }

    /// `ABS Vd.<T>, Vn.<T>`.
    pub fn abs(&mut self, size: u8, rd: Reg, rn: Reg) {
        let sz = self.element("ABS", size, rd);
        self.two_misc_same("ABS", 0, sz, 0b01011, rd, rn);
    }

    /// Element size field; 64-bit elements need a 128-bit vector.
    fn element(&self, op: &str, size: u8, rd: Reg) -> u32 {
        let sz = size_code(op, size);
        assert!(sz != 3 || rd.is_quad(), "{op}: 64-bit elements need a Q register");
        sz
    }

    /// `REV16 Vd.<T>, Vn.<T>` (8-bit lanes).
    pub fn rev16(&mut self, size: u8, rd: Reg, rn: Reg) {
        assert!(size == 8, "REV16: element size must be 8");
        self.two_misc_same("REV16", 0, 0, 0b00001, rd, rn);
    }

    /// `REV32 Vd.<T>, Vn.<T>`.
    pub fn rev32(&mut self, size: u8, rd: Reg, rn: Reg) {
        assert!(size == 8 || size == 16, "REV32: element size must be 8 or 16");
        self.two_misc_same("REV32", 1, size_code("REV32", size), 0b00000, rd, rn);
    }

    /// `REV64 Vd.<T>, Vn.<T>`.
    pub fn rev64(&mut self, size: u8, rd: Reg, rn: Reg) {
        assert!(size <= 32, "REV64: element size must be 8, 16 or 32");
        self.two_misc_same("REV64", 0, size_code("REV64", size), 0b00000, rd, rn);
    }

    // ---- Vector floating point ----

    #[allow(clippy::too_many_arguments)]
    fn fp_three_same(&mut self, op: &str, u: u32, high: u32, opcode: u32, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        let sz = self.fp_element(op, size, rd);
        self.three_same(op, u, high << 1 | sz, opcode, rd, rn, rm);
    }

    #[allow(clippy::too_many_arguments)]
    fn fp_two_misc(&mut self, op: &str, u: u32, high: u32, opcode: u32, size: u8, rd: Reg, rn: Reg) {
        let sz = self.fp_element(op, size, rd);
        self.two_misc_same(op, u, high << 1 | sz, opcode, rd, rn);
    }

    fn fp_element(&self, op: &str, size: u8, rd: Reg) -> u32 {
        let sz = fp_sz(op, size);
        assert!(sz == 0 || rd.is_quad(), "{op}: 64-bit elements need a Q register");
        sz
    }

    /// `FADD Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fadd_vec(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FADD", 0, 0, 0b11010, size, rd, rn, rm);
    }

    /// `FSUB Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fsub_vec(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FSUB", 0, 1, 0b11010, size, rd, rn, rm);
    }

    /// `FMUL Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fmul_vec(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FMUL", 1, 0, 0b11011, size, rd, rn, rm);
    }

    /// `FDIV Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fdiv_vec(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FDIV", 1, 0, 0b11111, size, rd, rn, rm);
    }

    /// `FABS Vd.<T>, Vn.<T>`.
    pub fn fabs_vec(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FABS", 0, 1, 0b01111, size, rd, rn);
    }

    /// `FNEG Vd.<T>, Vn.<T>`.
    pub fn fneg_vec(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FNEG", 1, 1, 0b01111, size, rd, rn);
    }

    /// Reciprocal estimate.
    pub fn frecpe(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FRECPE", 0, 1, 0b11101, size, rd, rn);
    }

    /// Reciprocal square root estimate.
    pub fn frsqrte(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FRSQRTE", 1, 1, 0b11101, size, rd, rn);
    }

    /// `FCVTZS Vd.<T>, Vn.<T>`.
    pub fn fcvtzs(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCVTZS", 0, 1, 0b11011, size, rd, rn);
    }

    /// `FCVTZU Vd.<T>, Vn.<T>`.
    pub fn fcvtzu(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCVTZU", 1, 1, 0b11011, size, rd, rn);
    }

    /// `SCVTF Vd.<T>, Vn.<T>`.
    pub fn scvtf(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("SCVTF", 0, 0, 0b11101, size, rd, rn);
    }

    /// `UCVTF Vd.<T>, Vn.<T>`.
    pub fn ucvtf(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("UCVTF", 1, 0, 0b11101, size, rd, rn);
    }

    fn widen_narrow(&mut self, op: &str, upper: bool, sz: u32, opcode: u32, rd: Reg, rn: Reg) {
        vreg(op, rd);
        vreg(op, rn);
        self.two_misc(op, upper as u32, 0, sz, opcode, rd, rn);
    }

    /// `FCVTL Vd.<dest>, Vn.<src>`: widen the low half; `dest_size` is
    /// 32 (from half) or 64 (from single).
    pub fn fcvtl(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        self.widen_narrow("FCVTL", false, fp_sz("FCVTL", dest_size), 0b10111, rd, rn);
    }

    /// `FCVTL2`: widen the high half.
    pub fn fcvtl2(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        self.widen_narrow("FCVTL2", true, fp_sz("FCVTL2", dest_size), 0b10111, rd, rn);
    }

    /// `FCVTN Vd.<dest>, Vn.<src>`: narrow into the low half; `dest_size`
    /// is 16 (from single) or 32 (from double).
    pub fn fcvtn(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        let sz = narrow_sz("FCVTN", dest_size);
        self.widen_narrow("FCVTN", false, sz, 0b10110, rd, rn);
    }

    /// `FCVTN2`: narrow into the high half, keeping the low half.
    pub fn fcvtn2(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        let sz = narrow_sz("FCVTN2", dest_size);
        self.widen_narrow("FCVTN2", true, sz, 0b10110, rd, rn);
    }

    /// `XTN Vd.<dest>, Vn.<2*dest>`: truncate each element to `dest_size` bits.
    pub fn xtn(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        assert!(dest_size <= 32, "XTN: destination elements must be 8, 16 or 32 bits");
        self.widen_narrow("XTN", false, size_code("XTN", dest_size), 0b10010, rd, rn);
    }

    /// `XTN2 Vd.<Tb>, Vn.<Ta>`: narrow into the upper half.
    pub fn xtn2(&mut self, dest_size: u8, rd: Reg, rn: Reg) {
        assert!(dest_size <= 32, "XTN2: destination elements must be 8, 16 or 32 bits");
        self.widen_narrow("XTN2", true, size_code("XTN2", dest_size), 0b10010, rd, rn);
    }

    // ---- Lane moves ----

    /// `DUP Vd.<T>, Vn.<Ts>[index]`.
    pub fn dup_element(&mut self, size: u8, rd: Reg, rn: Reg, index: u8) {
        let q = q_bit("DUP", rd);
        let imm5 = lane_imm5("DUP", size, index);
        self.copy(q, 0, imm5, 0b0000, vreg("DUP", rd), vreg("DUP", rn));
    }

    /// `DUP Vd.<T>, Rn`: broadcast a general register.
    pub fn dup_gpr(&mut self, size: u8, rd: Reg, rn: Reg) {
        let q = q_bit("DUP", rd);
        assert!(
            (size == 64) == rn.is_64bit(),
            "DUP: {size}-bit elements take a {} source, got {rn:?}",
            if size == 64 { "X" } else { "W" }
        );
        let imm5 = lane_imm5("DUP", size, 0);
        self.copy(q, 0, imm5, 0b0001, vreg("DUP", rd), gpr(rn));
    }

    /// `INS Vd.<Ts>[index], Rn` (alias `MOV`).
    pub fn ins_gpr(&mut self, size: u8, rd: Reg, index: u8, rn: Reg) {
        assert!((size == 64) == rn.is_64bit(), "INS: source width does not match {size}-bit lane");
        let imm5 = lane_imm5("INS", size, index);
        self.copy(1, 0, imm5, 0b0011, vreg("INS", rd), gpr(rn));
    }

    /// `INS Vd.<Ts>[index1], Vn.<Ts>[index2]`.
    pub fn ins_element(&mut self, size: u8, rd: Reg, index1: u8, rn: Reg, index2: u8) {
        let imm5 = lane_imm5("INS", size, index1);
        lane_imm5("INS", size, index2);
        let imm4 = (index2 as u32) << size_code("INS", size);
        self.copy(1, 1, imm5, imm4, vreg("INS", rd), vreg("INS", rn));
    }

    /// `UMOV Rd, Vn.<Ts>[index]`: zero-extending lane read.
    pub fn umov(&mut self, size: u8, rd: Reg, rn: Reg, index: u8) {
        assert!(
            (size == 64) == rd.is_64bit(),
            "UMOV: {size}-bit lanes need a {} destination, got {rd:?}",
            if size == 64 { "X" } else { "W" }
        );
        let imm5 = lane_imm5("UMOV", size, index);
        self.copy((size == 64) as u32, 0, imm5, 0b0111, gpr(rd), vreg("UMOV", rn));
    }

    /// `SMOV Rd, Vn.<Ts>[index]`: sign-extending lane read.
    pub fn smov(&mut self, size: u8, rd: Reg, rn: Reg, index: u8) {
        assert!(size < 64, "SMOV: lane size must be 8, 16 or 32");
        assert!(size < 32 || rd.is_64bit(), "SMOV: 32-bit lanes need an X destination");
        let imm5 = lane_imm5("SMOV", size, index);
        self.copy(rd.is_64bit() as u32, 0, imm5, 0b0101, gpr(rd), vreg("SMOV", rn));
    }

    // ---- FP <-> integer ----

    /// `FMOV` between a general register and an FP register, either
    /// direction. `top` addresses the upper 64 bits (`Vn.D[1]`).
    pub fn fmov_gpr(&mut self, rd: Reg, rn: Reg, top: bool) {
        let (g, v, opcode) = if rd.is_gpr() { (rd, rn, 0b110) } else { (rn, rd, 0b111) };
        vreg("FMOV", v);
        let (ty, rmode) = if top {
            assert!(g.is_64bit(), "FMOV: top half moves need an X register");
            (0b10, 0b01)
        } else {
            let ty = scalar_type("FMOV", v);
            assert!(
                (ty == 1) == g.is_64bit(),
                "FMOV: {v:?} and {g:?} differ in width"
            );
            (ty, 0b00)
        };
        let (d, n) = if rd.is_gpr() { (gpr(rd), v.enc()) } else { (v.enc(), gpr(rn)) };
        self.conversion(g.is_64bit() as u32, ty, rmode, opcode, d, n);
    }

    /// `SCVTF Sd/Dd, Rn`: signed integer to FP.
    pub fn scvtf_gpr(&mut self, rd: Reg, rn: Reg) {
        let ty = scalar_type("SCVTF", rd);
        self.conversion(rn.is_64bit() as u32, ty, 0b00, 0b010, rd.enc(), gpr(rn));
    }

    /// `UCVTF Sd/Dd, Rn`: unsigned integer to FP.
    pub fn ucvtf_gpr(&mut self, rd: Reg, rn: Reg) {
        let ty = scalar_type("UCVTF", rd);
        self.conversion(rn.is_64bit() as u32, ty, 0b00, 0b011, rd.enc(), gpr(rn));
    }

    /// `FCVTZS Rd, Sn/Dn`: FP to signed integer, rounding toward zero.
    pub fn fcvtzs_gpr(&mut self, rd: Reg, rn: Reg) {
        let ty = scalar_type("FCVTZS", rn);
        self.conversion(rd.is_64bit() as u32, ty, 0b11, 0b000, gpr(rd), rn.enc());
    }

    /// `FCVTZU Rd, Sn/Dn`: FP to unsigned integer, rounding toward zero.
    pub fn fcvtzu_gpr(&mut self, rd: Reg, rn: Reg) {
        let ty = scalar_type("FCVTZU", rn);
        self.conversion(rd.is_64bit() as u32, ty, 0b11, 0b001, gpr(rd), rn.enc());
    }

    // ---- Compare and select ----

    fn compare(&mut self, op: &str, opc2: u32, rn: Reg, rm: Option<Reg>) {
        let (ty, rm) = match rm {
            Some(rm) => (same_scalar(op, &[rn, rm]), rm.enc()),
            None => (scalar_type(op, rn), 0),
        };
        self.write32(0x1E20_2000 | ty << 22 | rm << 16 | rn.enc() << 5 | opc2);
    }

    /// `FCMP <Sn|Dn>, <Sm|Dm>`.
    pub fn fcmp(&mut self, rn: Reg, rm: Reg) {
        self.compare("FCMP", 0b00000, rn, Some(rm));
    }

    /// `FCMP Rn, #0.0`.
    pub fn fcmp_zero(&mut self, rn: Reg) {
        self.compare("FCMP", 0b01000, rn, None);
    }

    /// `FCMPE`: signals on quiet NaN operands too.
    pub fn fcmpe(&mut self, rn: Reg, rm: Reg) {
        self.compare("FCMPE", 0b10000, rn, Some(rm));
    }

    /// `FCMPE <Sn|Dn>, #0.0`.
    pub fn fcmpe_zero(&mut self, rn: Reg) {
        self.compare("FCMPE", 0b11000, rn, None);
    }

    /// `FCMEQ Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fcmeq(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FCMEQ", 0, 0, 0b11100, size, rd, rn, rm);
    }

    /// `FCMGE Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fcmge(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FCMGE", 1, 0, 0b11100, size, rd, rn, rm);
    }

    /// `FCMGT Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn fcmgt(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.fp_three_same("FCMGT", 1, 1, 0b11100, size, rd, rn, rm);
    }

    /// `FCMEQ Vd.<T>, Vn.<T>, #0.0`.
    pub fn fcmeq_zero(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCMEQ", 0, 1, 0b01101, size, rd, rn);
    }

    /// `FCMGE Vd.<T>, Vn.<T>, #0.0`.
    pub fn fcmge_zero(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCMGE", 1, 1, 0b01100, size, rd, rn);
    }

    /// `FCMGT Vd.<T>, Vn.<T>, #0.0`.
    pub fn fcmgt_zero(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCMGT", 0, 1, 0b01100, size, rd, rn);
    }

    /// `FCMLE Vd.<T>, Vn.<T>, #0.0`.
    pub fn fcmle_zero(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCMLE", 1, 1, 0b01101, size, rd, rn);
    }

    /// `FCMLT Vd.<T>, Vn.<T>, #0.0`.
    pub fn fcmlt_zero(&mut self, size: u8, rd: Reg, rn: Reg) {
        self.fp_two_misc("FCMLT", 0, 1, 0b01110, size, rd, rn);
    }

    /// `FCSEL Rd, Rn, Rm, cond`.
    pub fn fcsel(&mut self, rd: Reg, rn: Reg, rm: Reg, cond: Cond) {
        let ty = same_scalar("FCSEL", &[rd, rn, rm]);
        self.write32(
            0x1E20_0C00 | ty << 22 | rm.enc() << 16 | cond.enc() << 12 | rn.enc() << 5 | rd.enc(),
        );
    }

    // ---- Permute ----

    fn permute(&mut self, op: &str, opcode: u32, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        let q = same_vector(op, &[rd, rn, rm]);
        let sz = self.element(op, size, rd);
        self.write32(
            q << 30 | 0x0E00_0800 | sz << 22 | rm.enc() << 16 | opcode << 12 | rn.enc() << 5 | rd.enc(),
        );
    }

    /// `UZP1 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn uzp1(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("UZP1", 0b001, size, rd, rn, rm);
    }

    /// `TRN1 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn trn1(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("TRN1", 0b010, size, rd, rn, rm);
    }

    /// `ZIP1 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn zip1(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("ZIP1", 0b011, size, rd, rn, rm);
    }

    /// `UZP2 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn uzp2(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("UZP2", 0b101, size, rd, rn, rm);
    }

    /// `TRN2 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn trn2(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("TRN2", 0b110, size, rd, rn, rm);
    }

    /// `ZIP2 Vd.<T>, Vn.<T>, Vm.<T>`.
    pub fn zip2(&mut self, size: u8, rd: Reg, rn: Reg, rm: Reg) {
        self.permute("ZIP2", 0b111, size, rd, rn, rm);
    }

    // ---- Shift by immediate ----

    fn shift_imm(&mut self, op: &str, u: u32, immhb: u32, opcode: u32, rd: Reg, rn: Reg) {
        self.write32(u << 29 | 0x0F00_0400 | immhb << 16 | opcode << 11 | vreg(op, rn) << 5 | vreg(op, rd));
    }

    /// `SSHLL Vd.<2*src>, Vn.<src>, #shift`: sign-extend the low half and shift left.
    pub fn sshll(&mut self, src_size: u8, rd: Reg, rn: Reg, shift: u8) {
        let immhb = widen_shift("SSHLL", src_size, shift);
        self.shift_imm("SSHLL", 0, immhb, 0b10100, rd, rn);
    }

    /// `USHLL`: zero-extend the low half and shift left.
    pub fn ushll(&mut self, src_size: u8, rd: Reg, rn: Reg, shift: u8) {
        let immhb = widen_shift("USHLL", src_size, shift);
        self.shift_imm("USHLL", 1, immhb, 0b10100, rd, rn);
    }

    /// `SXTL Vd.<Ta>, Vn.<Tb>` (alias of `SSHLL #0`).
    pub fn sxtl(&mut self, src_size: u8, rd: Reg, rn: Reg) {
        self.sshll(src_size, rd, rn, 0);
    }

    /// `UXTL Vd.<Ta>, Vn.<Tb>` (alias of `USHLL #0`).
    pub fn uxtl(&mut self, src_size: u8, rd: Reg, rn: Reg) {
        self.ushll(src_size, rd, rn, 0);
    }

    /// `SHRN Vd.<dest>, Vn.<2*dest>, #shift`: shift right and narrow.
    pub fn shrn(&mut self, dest_size: u8, rd: Reg, rn: Reg, shift: u8) {
        assert!(dest_size <= 32, "SHRN: destination elements must be 8, 16 or 32 bits");
        size_code("SHRN", dest_size);
        assert!(
            (1..=dest_size).contains(&shift),
            "SHRN: shift {shift} out of range 1..={dest_size}"
        );
        let immhb = 2 * dest_size as u32 - shift as u32;
        self.shift_imm("SHRN", 0, immhb, 0b10000, rd, rn);
    }

    // ---- ABI ----

    /// Save the Q registers in `regs` (full 128 bits each) below SP.
    pub fn abi_push_registers(&mut self, regs: RegSet) {
        let (slots, total) = frame_plan(regs, 16);
        for slot in &slots {
            let rt = Reg::q(slot.first);
            let (index, imm) = if slot.offset == 0 {
                (IndexType::Pre, -total)
            } else {
                (IndexType::Unsigned, slot.offset)
            };
            match slot.second {
                Some(second) => self.stp(128, index, rt, Reg::q(second), Reg::SP, imm),
                None => self.str(128, index, rt, Reg::SP, imm),
            }
        }
    }

    /// Restore what [`abi_push_registers`](Self::abi_push_registers)
    /// saved, skipping registers in `ignore`.
    pub fn abi_pop_registers(&mut self, regs: RegSet, ignore: RegSet) {
        let (slots, total) = frame_plan(regs, 16);
        let keep = |idx: u8| !ignore.contains_index(idx);

        for slot in slots.iter().rev() {
            let first = keep(slot.first).then(|| Reg::q(slot.first));
            let second = slot.second.filter(|&i| keep(i)).map(Reg::q);

            if slot.offset != 0 {
                match (first, second) {
                    (Some(a), Some(b)) => self.ldp(128, IndexType::Unsigned, a, b, Reg::SP, slot.offset),
                    (Some(a), None) => self.ldr(128, IndexType::Unsigned, a, Reg::SP, slot.offset),
                    (None, Some(b)) => self.ldr(128, IndexType::Unsigned, b, Reg::SP, slot.offset + 16),
                    (None, None) => {}
                }
                continue;
            }

            match (first, second) {
                (Some(a), Some(b)) => self.ldp(128, IndexType::Post, a, b, Reg::SP, total),
                (Some(a), None) => self.ldr(128, IndexType::Post, a, Reg::SP, total),
                (None, second) => {
                    if let Some(b) = second {
                        self.ldr(128, IndexType::Unsigned, b, Reg::SP, 16);
                    }
                    self.emit.add_imm(Reg::SP, Reg::SP, total as u32, false);
                }
            }
        }
    }
}

fn narrow_sz(op: &str, dest_size: u8) -> u32 {
    match dest_size {
        16 => 0,
        32 => 1,
        _ => panic!("{op}: destination elements must be 16 or 32 bits, got {dest_size}"),
    }
}

/// `immh:immb` for a widening left shift of `src_size`-bit elements.
fn widen_shift(op: &str, src_size: u8, shift: u8) -> u32 {
    assert!(src_size <= 32, "{op}: source elements must be 8, 16 or 32 bits");
    size_code(op, src_size);
    assert!(shift < src_size, "{op}: shift {shift} out of range for {src_size}-bit elements");
    src_size as u32 + shift as u32
}

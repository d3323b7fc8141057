use super::arith::zr_like;
use super::logic::ShiftAmount;
use super::{width, Emitter};
use crate::imm::{fits_signed, LogicalImm};
use crate::reg::Reg;

impl<'a> Emitter<'a> {
    /// Load an arbitrary constant into `rd` with as few words as the
    /// encoder can find.
    ///
    /// In order of preference: a single `MOVZ`/`MOVN`, a single `ORR` of a
    /// logical immediate, `ADR`/`ADRP` when `imm` is an address near the
    /// cursor, then `MOVZ`/`MOVN` plus one `MOVK` per halfword that differs
    /// from the majority fill (`0x0000` or `0xFFFF`).
    ///
    /// For a 32-bit `rd` the upper half of `imm` must be zero.
    ///
    /// The `ADR`/`ADRP` choice depends on the cursor address, so the same
    /// constant can encode differently at different addresses, and the
    /// result is only valid where it was emitted. Code that will be copied
    /// elsewhere or patched in place should use
    /// [`movi2r_full`](Self::movi2r_full).
    pub fn movi2r(&mut self, rd: Reg, imm: u64) {
        let imm = check_constant(rd, imm);
        let halves = halfwords(rd, imm);
        let zeros = halves.iter().filter(|&&h| h == 0).count();
        let ones = halves.iter().filter(|&&h| h == 0xFFFF).count();
        let invert = ones > zeros;
        let wide_words = (halves.len() - zeros.max(ones)).max(1);

        if wide_words == 1 {
            log::trace!("movi2r {rd:?} = {imm:#x}: single move-wide");
            self.move_wide_sequence(rd, &halves, invert);
            return;
        }

        if LogicalImm::new(imm, width(rd)).is_some() {
            log::trace!("movi2r {rd:?} = {imm:#x}: logical immediate");
            self.orr_imm(rd, zr_like(rd), imm);
            return;
        }

        if rd.is_64bit() && self.try_pc_relative(rd, imm, wide_words) {
            return;
        }

        log::trace!("movi2r {rd:?} = {imm:#x}: {wide_words} move-wide words");
        self.move_wide_sequence(rd, &halves, invert);
    }

    /// Load `imm` with a fixed-length `MOVZ` + `MOVK` sequence: two words
    /// for a 32-bit `rd`, four for a 64-bit one. The length does not depend
    /// on the value, so the sequence can later be rewritten in place.
    pub fn movi2r_full(&mut self, rd: Reg, imm: u64) {
        let imm = check_constant(rd, imm);
        let halves = halfwords(rd, imm);
        self.movz(rd, halves[0], ShiftAmount::Shift0);
        for (i, &half) in halves.iter().enumerate().skip(1) {
            self.movk(rd, half, ShiftAmount::from_halfword(i as u32));
        }
    }

    /// One `MOVZ` (or `MOVN` when `invert`) for the first halfword that
    /// differs from the fill, then a `MOVK` for each later one.
    fn move_wide_sequence(&mut self, rd: Reg, halves: &[u16], invert: bool) {
        let fill = if invert { 0xFFFF } else { 0 };
        let mut differing = halves.iter().enumerate().filter(|&(_, &h)| h != fill);

        let (first, value) = match differing.next() {
            Some((i, &h)) => (i, h),
            None => (0, fill),
        };
        let shift = ShiftAmount::from_halfword(first as u32);
        if invert {
            self.movn(rd, !value, shift);
        } else {
            self.movz(rd, value, shift);
        }
        for (i, &half) in differing {
            self.movk(rd, half, ShiftAmount::from_halfword(i as u32));
        }
    }

    /// `ADR`, `ADRP` or `ADRP` + `ADD` when that beats `wide_words`.
    fn try_pc_relative(&mut self, rd: Reg, imm: u64, wide_words: usize) -> bool {
        let pc = self.get_code_ptr() as u64;
        let offset = imm.wrapping_sub(pc) as i64;
        if fits_signed(offset, 21) {
            log::trace!("movi2r {rd:?} = {imm:#x}: ADR");
            self.adr(rd, offset as i32);
            return true;
        }

        let page_offset = (imm & !0xFFF).wrapping_sub(pc & !0xFFF) as i64;
        let low = (imm & 0xFFF) as u32;
        let words = if low == 0 { 1 } else { 2 };
        if words < wide_words && fits_signed(page_offset >> 12, 21) {
            log::trace!("movi2r {rd:?} = {imm:#x}: ADRP, {words} words");
            self.adrp(rd, page_offset);
            if low != 0 {
                self.add_imm(rd, rd, low, false);
            }
            return true;
        }
        false
    }
}

fn check_constant(rd: Reg, imm: u64) -> u64 {
    assert!(rd.is_gpr(), "MOVI2R: expected a general register, got {rd:?}");
    assert!(
        rd.is_64bit() || imm >> 32 == 0,
        "MOVI2R: {imm:#x} does not fit 32-bit {rd:?}"
    );
    imm
}

/// Halfwords of `imm`, least significant first, as many as `rd` holds.
fn halfwords(rd: Reg, imm: u64) -> Vec<u16> {
    let count = width(rd) / 16;
    (0..count).map(|i| (imm >> (16 * i)) as u16).collect()
}

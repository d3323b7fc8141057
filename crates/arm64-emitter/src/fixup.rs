use crate::cond::Cond;
use crate::reg::Reg;

/// The branch family of a PC-relative branch, with the operands that
/// survive into the final word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind {
    Cbz(Reg),
    Cbnz(Reg),
    BCond(Cond),
    Tbz(Reg, u8),
    Tbnz(Reg, u8),
    B,
    Bl,
}

impl BranchKind {
    /// Inclusive byte displacement range reachable from the branch.
    pub fn range(self) -> (i64, i64) {
        let bits = match self {
            BranchKind::Cbz(_) | BranchKind::Cbnz(_) | BranchKind::BCond(_) => 19,
            BranchKind::Tbz(..) | BranchKind::Tbnz(..) => 14,
            BranchKind::B | BranchKind::Bl => 26,
        };
        (-(1i64 << (bits + 1)), (1i64 << (bits + 1)) - 4)
    }

    /// Reject bad operands up front, before a placeholder is written.
    pub(crate) fn validate(self) {
        match self {
            BranchKind::Cbz(rt) | BranchKind::Cbnz(rt) => {
                assert!(rt.is_gpr(), "{self:?}: compare register must be a general register");
            }
            BranchKind::Tbz(rt, bit) | BranchKind::Tbnz(rt, bit) => {
                assert!(rt.is_gpr(), "{self:?}: test register must be a general register");
                let width = if rt.is_64bit() { 64 } else { 32 };
                assert!(bit < width, "{self:?}: bit {bit} out of range for {rt:?}");
            }
            BranchKind::BCond(_) | BranchKind::B | BranchKind::Bl => {}
        }
    }

    /// Full instruction word for a branch at `source` targeting `target`.
    pub(crate) fn encode(self, source: usize, target: usize) -> u32 {
        let disp = target as i64 - source as i64;
        assert!(
            disp & 3 == 0,
            "{self:?}: target {target:#x} is not word aligned relative to {source:#x}"
        );
        let (min, max) = self.range();
        assert!(
            (min..=max).contains(&disp),
            "{self:?}: branch displacement {disp} out of range {min}..={max}"
        );
        let words = (disp >> 2) as u32;
        let imm19 = (words & 0x7FFFF) << 5;
        match self {
            BranchKind::Cbz(rt) => sf(rt) | 0x3400_0000 | imm19 | rt.enc(),
            BranchKind::Cbnz(rt) => sf(rt) | 0x3500_0000 | imm19 | rt.enc(),
            BranchKind::BCond(cond) => 0x5400_0000 | imm19 | cond.enc(),
            BranchKind::Tbz(rt, bit) => 0x3600_0000 | test_bit(bit) | (words & 0x3FFF) << 5 | rt.enc(),
            BranchKind::Tbnz(rt, bit) => 0x3700_0000 | test_bit(bit) | (words & 0x3FFF) << 5 | rt.enc(),
            BranchKind::B => 0x1400_0000 | (words & 0x03FF_FFFF),
            BranchKind::Bl => 0x9400_0000 | (words & 0x03FF_FFFF),
        }
    }
}

fn sf(rt: Reg) -> u32 {
    (rt.is_64bit() as u32) << 31
}

/// `b5` at bit 31, `b40` at bits 23..19.
fn test_bit(bit: u8) -> u32 {
    ((bit as u32) >> 5) << 31 | ((bit as u32) & 0x1F) << 19
}

/// A forward branch whose target is not known yet.
///
/// Returned by the fixup forms of the branch emitters and consumed by
/// [`Emitter::set_jump_target`](crate::Emitter::set_jump_target). Until
/// then the branch word is a `BRK #0` placeholder, so running code with an
/// unresolved fixup traps instead of jumping somewhere arbitrary.
#[derive(Debug)]
#[must_use = "an unresolved fixup leaves a trap in place of its branch"]
pub struct FixupBranch {
    pub(crate) offset: usize,
    pub(crate) kind: BranchKind,
}

impl FixupBranch {
    /// Byte offset of the placeholder word from the region start.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn kind(&self) -> BranchKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        assert_eq!(BranchKind::B.range(), (-(128 << 20), (128 << 20) - 4));
        assert_eq!(BranchKind::BCond(Cond::EQ).range(), (-(1 << 20), (1 << 20) - 4));
        assert_eq!(BranchKind::Tbz(Reg::W0, 0).range(), (-(32 << 10), (32 << 10) - 4));
    }

    #[test]
    fn encode_extremes() {
        assert_eq!(BranchKind::B.encode(0x1000, 0x1000 - 4), 0x17FF_FFFF);
        assert_eq!(BranchKind::Bl.encode(0x1000, 0x1000), 0x9400_0000);
        assert_eq!(
            BranchKind::BCond(Cond::LT).encode(0, (1 << 20) - 4),
            0x5400_0000 | 0x3FFFF << 5 | 0xB
        );
        assert_eq!(
            BranchKind::BCond(Cond::EQ).encode(1 << 20, 0),
            0x5400_0000 | 0x40000 << 5
        );
    }

    #[test]
    fn test_bit_split() {
        // TBNZ X3, #33, +8
        assert_eq!(BranchKind::Tbnz(Reg::X3, 33).encode(0, 8), 0xB708_0043);
        // TBZ W1, #3, +4
        assert_eq!(BranchKind::Tbz(Reg::W1, 3).encode(0, 4), 0x3618_0021);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn bcond_one_past_range() {
        BranchKind::BCond(Cond::NE).encode(0, 1 << 20);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn tbz_one_past_range() {
        BranchKind::Tbz(Reg::X0, 1).encode((32 << 10) + 4, 0);
    }

    #[test]
    #[should_panic(expected = "bit 32 out of range")]
    fn tbz_w_high_bit() {
        BranchKind::Tbz(Reg::W0, 32).validate();
    }
}

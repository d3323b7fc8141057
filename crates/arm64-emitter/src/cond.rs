/// Condition codes for conditional branches, selects and compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Cond {
    EQ = 0b0000,
    NE = 0b0001,
    CS = 0b0010,
    CC = 0b0011,
    MI = 0b0100,
    PL = 0b0101,
    VS = 0b0110,
    VC = 0b0111,
    HI = 0b1000,
    LS = 0b1001,
    GE = 0b1010,
    LT = 0b1011,
    GT = 0b1100,
    LE = 0b1101,
    AL = 0b1110,
    NV = 0b1111,
}

impl Cond {
    /// Unsigned higher or same.
    pub const HS: Cond = Cond::CS;
    /// Unsigned lower.
    pub const LO: Cond = Cond::CC;

    /// Invert the condition (e.g., LE → GT, EQ → NE).
    pub fn invert(self) -> Self {
        // On aarch64, inverting a condition flips bit 0.
        Self::from_bits(self as u8 ^ 1)
    }

    /// Condition for a 4-bit field value.
    pub fn from_bits(bits: u8) -> Self {
        assert!(bits < 16, "condition field is 4 bits, got {bits}");
        // Safety: every 4-bit value is a variant.
        unsafe { std::mem::transmute(bits) }
    }

    pub(crate) fn enc(self) -> u32 {
        self as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invert_pairs() {
        assert_eq!(Cond::EQ.invert(), Cond::NE);
        assert_eq!(Cond::LE.invert(), Cond::GT);
        assert_eq!(Cond::HS.invert(), Cond::LO);
        assert_eq!(Cond::AL.invert(), Cond::NV);
        for bits in 0..16 {
            let c = Cond::from_bits(bits);
            assert_eq!(c.invert().invert(), c);
        }
    }
}

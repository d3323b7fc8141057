//! Immediate-operand codecs shared by the integer and FP emitters.

/// Compact `N:immr:imms` form of a logical (bitmask) immediate.
///
/// A bitmask immediate is a run of ones, rotated right by `immr` inside an
/// element of 2, 4, 8, 16, 32 or 64 bits, replicated across the register.
/// All-zeros and all-ones cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalImm {
    pub n: u8,
    pub immr: u8,
    pub imms: u8,
}

impl LogicalImm {
    /// Encode `value` for a `width`-bit (32 or 64) operation.
    ///
    /// For 32-bit operations the upper half of `value` must be zero.
    pub fn new(value: u64, width: u32) -> Option<Self> {
        assert!(width == 32 || width == 64, "logical immediate width must be 32 or 64");
        let imm = if width == 32 {
            if value >> 32 != 0 {
                return None;
            }
            value | value << 32
        } else {
            value
        };
        if imm == 0 || imm == u64::MAX {
            return None;
        }

        // Smallest element size that replicates to the full value.
        let mut size = 64u32;
        while size > 2 {
            let half = size / 2;
            let mask = (1u64 << half) - 1;
            if imm & mask != (imm >> half) & mask {
                break;
            }
            size = half;
        }

        let elem = imm & element_mask(size);
        let ones = elem.count_ones();
        let run = (1u64 << ones) - 1;
        let immr = (0..size).find(|&r| rotate_left(elem, r, size) == run)?;
        let imms = (!(size * 2 - 1) & 0x3F) | (ones - 1);

        Some(LogicalImm {
            n: (size == 64) as u8,
            immr: immr as u8,
            imms: imms as u8,
        })
    }

    /// `(N << 22) | (immr << 16) | (imms << 10)`.
    pub fn encode(self) -> u32 {
        (self.n as u32) << 22 | (self.immr as u32) << 16 | (self.imms as u32) << 10
    }

    /// Expand back to the `width`-bit value.
    pub fn decode(self, width: u32) -> u64 {
        let len = if self.n == 1 { 6 } else { 7 - (!self.imms & 0x3F).leading_zeros() };
        let size = 1u32 << len;
        let ones = (self.imms as u32 & (size - 1)) + 1;
        let run = if ones == 64 { u64::MAX } else { (1u64 << ones) - 1 };
        let mut elem = rotate_left(run, (size - self.immr as u32 % size) % size, size);
        let mut filled = size;
        while filled < 64 {
            elem |= elem << filled;
            filled *= 2;
        }
        if width == 32 {
            elem & 0xFFFF_FFFF
        } else {
            elem
        }
    }
}

fn element_mask(size: u32) -> u64 {
    if size == 64 {
        u64::MAX
    } else {
        (1u64 << size) - 1
    }
}

fn rotate_left(value: u64, amount: u32, size: u32) -> u64 {
    if amount == 0 {
        return value;
    }
    let mask = element_mask(size);
    ((value << amount) | (value >> (size - amount))) & mask
}

/// Encode `value` as the 8-bit FP immediate of `FMOV (immediate)`:
/// `±(16 + m) / 16 × 2^e` for `m` in 0–15 and `e` in −3–4.
pub fn fp_imm8(value: f64) -> Option<u8> {
    let bits = value.to_bits();
    if bits & 0x0000_FFFF_FFFF_FFFF != 0 {
        return None;
    }
    let b = (bits >> 54) & 1;
    let replicated = (bits >> 54) & 0xFF;
    if replicated != if b == 1 { 0xFF } else { 0 } {
        return None;
    }
    if (bits >> 62) & 1 == b {
        return None;
    }
    let sign = (bits >> 63) as u8;
    Some(sign << 7 | (b as u8) << 6 | ((bits >> 48) & 0x3F) as u8)
}

/// True if `value` fits a `bits`-wide two's-complement field.
pub(crate) fn fits_signed(value: i64, bits: u32) -> bool {
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;
    (min..=max).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packed(imm: LogicalImm) -> u32 {
        (imm.n as u32) << 12 | (imm.immr as u32) << 6 | imm.imms as u32
    }

    #[test]
    fn alternating_patterns() {
        assert_eq!(packed(LogicalImm::new(0x5555_5555, 32).unwrap()), 0b0_000000_111100);
        assert_eq!(packed(LogicalImm::new(0xaaaa_aaaa, 32).unwrap()), 0b0_000001_111100);
        assert_eq!(packed(LogicalImm::new(0x1111_1111, 32).unwrap()), 0b0_000000_111000);
        assert_eq!(packed(LogicalImm::new(0x8888_8888, 32).unwrap()), 0b0_000001_111000);
        assert_eq!(packed(LogicalImm::new(0x9999_9999, 32).unwrap()), 0b0_000001_111001);
    }

    #[test]
    fn single_bit_64() {
        let imm = LogicalImm::new(1, 64).unwrap();
        assert_eq!(imm, LogicalImm { n: 1, immr: 0, imms: 0 });
    }

    #[test]
    fn rejects_unencodable() {
        assert_eq!(LogicalImm::new(0, 32), None);
        assert_eq!(LogicalImm::new(0, 64), None);
        assert_eq!(LogicalImm::new(u64::MAX, 64), None);
        assert_eq!(LogicalImm::new(0xffff_ffff, 32), None);
        assert_eq!(LogicalImm::new(0x1234_5678, 32), None);
        assert_eq!(LogicalImm::new(0x1_0000_0000, 32), None);
    }

    #[test]
    fn decode_inverts_encode() {
        let values: [(u64, u32); 8] = [
            (0x5555_5555, 32),
            (0x0000_ff00, 32),
            (0x8000_0000, 32),
            (0xffff_fffe, 32),
            (0x00ff_00ff_00ff_00ff, 64),
            (0xffff_0000_0000_0000, 64),
            (0x7fff_ffff_ffff_ffff, 64),
            (0x0000_0000_ffff_ffff, 64),
        ];
        for (value, width) in values {
            let imm = LogicalImm::new(value, width).unwrap();
            assert_eq!(imm.decode(width), value, "{value:#x}/{width}");
        }
    }

    #[test]
    fn fp_immediates() {
        assert_eq!(fp_imm8(1.0), Some(0x70));
        assert_eq!(fp_imm8(2.0), Some(0x00));
        assert_eq!(fp_imm8(-0.5), Some(0xE0));
        assert_eq!(fp_imm8(31.0), Some(0x3F));
        assert_eq!(fp_imm8(0.125), Some(0x40));
        assert_eq!(fp_imm8(0.0), None);
        assert_eq!(fp_imm8(0.1), None);
        assert_eq!(fp_imm8(64.0), None);
    }

    #[test]
    fn signed_fit() {
        assert!(fits_signed(255, 9));
        assert!(fits_signed(-256, 9));
        assert!(!fits_signed(256, 9));
        assert!(!fits_signed(-257, 9));
    }
}

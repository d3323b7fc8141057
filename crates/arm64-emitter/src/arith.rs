use crate::reg::Reg;

/// Shift applied to the second operand of shifted-register forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShiftType {
    Lsl = 0,
    Lsr = 1,
    Asr = 2,
    Ror = 3,
}

/// Extension applied to the second operand of extended-register forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExtendType {
    Uxtb = 0,
    Uxth = 1,
    Uxtw = 2,
    Uxtx = 3,
    Sxtb = 4,
    Sxth = 5,
    Sxtw = 6,
    Sxtx = 7,
}

/// Shift code that lands on the `S` bit (bit 12) of register-offset
/// loads and stores: "scale the index by the access size".
const SCALED_INDEX: u8 = 4;

/// Second-operand descriptor for arithmetic, logical and register-offset
/// memory instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOption {
    Extended { reg: Reg, extend: ExtendType, shift: u8 },
    Immediate(u32),
    Shifted { reg: Reg, kind: ShiftType, amount: u8 },
}

impl ArithOption {
    /// Plain register operand: `UXTX` for a 64-bit register, `UXTW` for a
    /// 32-bit one, no shift.
    pub fn reg(rm: Reg) -> Self {
        ArithOption::Extended { reg: rm, extend: default_extend(rm), shift: 0 }
    }

    /// Memory index register, scaled by the access size.
    pub fn index(rm: Reg) -> Self {
        ArithOption::Extended { reg: rm, extend: default_extend(rm), shift: SCALED_INDEX }
    }

    /// Extended register with an explicit extension and left shift 0–4.
    pub fn extended(rm: Reg, extend: ExtendType, shift: u8) -> Self {
        assert!(rm.is_gpr(), "extended operand needs a general register, got {rm:?}");
        assert!(shift <= 4, "extend shift must be 0-4, got {shift}");
        ArithOption::Extended { reg: rm, extend, shift }
    }

    /// Shifted register. An amount equal to the register width means "no
    /// shift" and is stored as 0.
    pub fn shifted(rm: Reg, kind: ShiftType, amount: u8) -> Self {
        assert!(rm.is_gpr(), "shifted operand needs a general register, got {rm:?}");
        let width = if rm.is_64bit() { 64 } else { 32 };
        let amount = if amount == width { 0 } else { amount };
        assert!(amount < width, "shift amount {amount} out of range for {rm:?}");
        ArithOption::Shifted { reg: rm, kind, amount }
    }

    pub fn imm(value: u32) -> Self {
        ArithOption::Immediate(value)
    }

    /// The register operand, if any.
    pub fn rm(&self) -> Option<Reg> {
        match *self {
            ArithOption::Extended { reg, .. } | ArithOption::Shifted { reg, .. } => Some(reg),
            ArithOption::Immediate(_) => None,
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, ArithOption::Extended { .. })
    }

    /// Pre-shifted bit field to OR into an instruction word.
    ///
    /// Extended: `(extend << 13) | (shift << 10)`.
    /// Shifted: `(kind << 22) | (amount << 10)`.
    pub fn data(&self) -> u32 {
        match *self {
            ArithOption::Extended { extend, shift, .. } => {
                (extend as u32) << 13 | (shift as u32) << 10
            }
            ArithOption::Shifted { kind, amount, .. } => (kind as u32) << 22 | (amount as u32) << 10,
            ArithOption::Immediate(_) => panic!("immediate ArithOption has no register field data"),
        }
    }
}

fn default_extend(rm: Reg) -> ExtendType {
    assert!(rm.is_gpr(), "operand needs a general register, got {rm:?}");
    if rm.is_64bit() {
        ExtendType::Uxtx
    } else {
        ExtendType::Uxtw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_defaults_by_width() {
        assert_eq!(ArithOption::reg(Reg::X2).data(), 3 << 13);
        assert_eq!(ArithOption::reg(Reg::W2).data(), 2 << 13);
    }

    #[test]
    fn scaled_index_sets_s_bit() {
        assert_eq!(ArithOption::index(Reg::X5).data(), 3 << 13 | 1 << 12);
    }

    #[test]
    fn shifted_data() {
        let opt = ArithOption::shifted(Reg::X6, ShiftType::Asr, 3);
        assert_eq!(opt.data(), 2 << 22 | 3 << 10);
        assert_eq!(opt.rm(), Some(Reg::X6));
    }

    #[test]
    fn full_width_shift_normalises_to_zero() {
        assert_eq!(ArithOption::shifted(Reg::X1, ShiftType::Lsl, 64).data(), 0);
        assert_eq!(ArithOption::shifted(Reg::W1, ShiftType::Lsr, 32).data(), 1 << 22);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn oversized_shift_panics() {
        let _ = ArithOption::shifted(Reg::W1, ShiftType::Lsl, 33);
    }

    #[test]
    #[should_panic(expected = "no register field")]
    fn immediate_has_no_data() {
        let _ = ArithOption::imm(7).data();
    }
}

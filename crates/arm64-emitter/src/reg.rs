use std::fmt;

const GPR64: u8 = 0x20;
const SINGLE: u8 = 0x40;
const DOUBLE: u8 = 0x80;
const QUAD: u8 = 0xC0;
const CLASS_MASK: u8 = 0xE0;

/// AArch64 register descriptor.
///
/// One byte carries both the architectural index and the register class:
///
/// | bits | meaning |
/// |------|---------|
/// | 0–4  | index 0–31 |
/// | 5    | 64-bit general register |
/// | 6–7  | `01` single (S), `10` double (D), `11` quad (Q) |
///
/// Index 31 is context-dependent: it encodes ZR (zero register) in most
/// instructions, but SP (stack pointer) in base-address contexts
/// (load/store base, add/sub immediate). `SP` and `ZR` share a tag.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Reg(u8);

/// The class a valid [`Reg`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    Gpr32,
    Gpr64,
    Single,
    Double,
    Quad,
}

macro_rules! reg_consts {
    ($flag:expr; $($name:ident = $idx:expr),* $(,)?) => {
        $(pub const $name: Reg = Reg($flag | $idx);)*
    };
}

impl Reg {
    reg_consts!(0;
        W0 = 0, W1 = 1, W2 = 2, W3 = 3, W4 = 4, W5 = 5, W6 = 6, W7 = 7,
        W8 = 8, W9 = 9, W10 = 10, W11 = 11, W12 = 12, W13 = 13, W14 = 14, W15 = 15,
        W16 = 16, W17 = 17, W18 = 18, W19 = 19, W20 = 20, W21 = 21, W22 = 22, W23 = 23,
        W24 = 24, W25 = 25, W26 = 26, W27 = 27, W28 = 28, W29 = 29, W30 = 30,
        WSP = 31, WZR = 31,
    );
    reg_consts!(GPR64;
        X0 = 0, X1 = 1, X2 = 2, X3 = 3, X4 = 4, X5 = 5, X6 = 6, X7 = 7,
        X8 = 8, X9 = 9, X10 = 10, X11 = 11, X12 = 12, X13 = 13, X14 = 14, X15 = 15,
        X16 = 16, X17 = 17, X18 = 18, X19 = 19, X20 = 20, X21 = 21, X22 = 22, X23 = 23,
        X24 = 24, X25 = 25, X26 = 26, X27 = 27, X28 = 28, X29 = 29, X30 = 30,
        SP = 31, ZR = 31, XZR = 31,
        FP = 29, LR = 30,
    );
    reg_consts!(SINGLE;
        S0 = 0, S1 = 1, S2 = 2, S3 = 3, S4 = 4, S5 = 5, S6 = 6, S7 = 7,
        S8 = 8, S9 = 9, S10 = 10, S11 = 11, S12 = 12, S13 = 13, S14 = 14, S15 = 15,
        S16 = 16, S17 = 17, S18 = 18, S19 = 19, S20 = 20, S21 = 21, S22 = 22, S23 = 23,
        S24 = 24, S25 = 25, S26 = 26, S27 = 27, S28 = 28, S29 = 29, S30 = 30, S31 = 31,
    );
    reg_consts!(DOUBLE;
        D0 = 0, D1 = 1, D2 = 2, D3 = 3, D4 = 4, D5 = 5, D6 = 6, D7 = 7,
        D8 = 8, D9 = 9, D10 = 10, D11 = 11, D12 = 12, D13 = 13, D14 = 14, D15 = 15,
        D16 = 16, D17 = 17, D18 = 18, D19 = 19, D20 = 20, D21 = 21, D22 = 22, D23 = 23,
        D24 = 24, D25 = 25, D26 = 26, D27 = 27, D28 = 28, D29 = 29, D30 = 30, D31 = 31,
    );
    reg_consts!(QUAD;
        Q0 = 0, Q1 = 1, Q2 = 2, Q3 = 3, Q4 = 4, Q5 = 5, Q6 = 6, Q7 = 7,
        Q8 = 8, Q9 = 9, Q10 = 10, Q11 = 11, Q12 = 12, Q13 = 13, Q14 = 14, Q15 = 15,
        Q16 = 16, Q17 = 17, Q18 = 18, Q19 = 19, Q20 = 20, Q21 = 21, Q22 = 22, Q23 = 23,
        Q24 = 24, Q25 = 25, Q26 = 26, Q27 = 27, Q28 = 28, Q29 = 29, Q30 = 30, Q31 = 31,
    );

    /// "No register". Every encoding routine rejects it.
    pub const INVALID: Reg = Reg(0xFF);

    /// `Wn` for index `n` (0–31).
    pub const fn w(n: u8) -> Reg {
        assert!(n < 32, "register index out of range");
        Reg(n)
    }

    /// `Xn` for index `n` (0–31).
    pub const fn x(n: u8) -> Reg {
        assert!(n < 32, "register index out of range");
        Reg(GPR64 | n)
    }

    /// `Sn` for index `n` (0–31).
    pub const fn s(n: u8) -> Reg {
        assert!(n < 32, "register index out of range");
        Reg(SINGLE | n)
    }

    /// `Dn` for index `n` (0–31).
    pub const fn d(n: u8) -> Reg {
        assert!(n < 32, "register index out of range");
        Reg(DOUBLE | n)
    }

    /// `Qn` for index `n` (0–31).
    pub const fn q(n: u8) -> Reg {
        assert!(n < 32, "register index out of range");
        Reg(QUAD | n)
    }

    /// The raw tag byte.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Architectural index 0–31.
    pub const fn index(self) -> u8 {
        self.0 & 0x1F
    }

    /// Index as an instruction field. Callers validate the class first.
    pub(crate) const fn enc(self) -> u32 {
        (self.0 & 0x1F) as u32
    }

    pub const fn class(self) -> Option<RegClass> {
        match self.0 & CLASS_MASK {
            0 => Some(RegClass::Gpr32),
            GPR64 => Some(RegClass::Gpr64),
            SINGLE => Some(RegClass::Single),
            DOUBLE => Some(RegClass::Double),
            QUAD => Some(RegClass::Quad),
            _ => None,
        }
    }

    pub const fn is_valid(self) -> bool {
        self.class().is_some()
    }

    /// 64-bit general register (`Xn`, `SP`, `XZR`).
    pub const fn is_64bit(self) -> bool {
        self.0 & CLASS_MASK == GPR64
    }

    pub const fn is_32bit(self) -> bool {
        self.0 & CLASS_MASK == 0
    }

    pub const fn is_gpr(self) -> bool {
        self.is_32bit() || self.is_64bit()
    }

    pub const fn is_single(self) -> bool {
        self.0 & CLASS_MASK == SINGLE
    }

    pub const fn is_double(self) -> bool {
        self.0 & CLASS_MASK == DOUBLE
    }

    pub const fn is_quad(self) -> bool {
        self.0 & CLASS_MASK == QUAD
    }

    pub const fn is_vector(self) -> bool {
        self.is_single() || self.is_double() || self.is_quad()
    }

    /// Same index, as a 64-bit general register.
    ///
    /// The view conversions only swap the class bits, so they accept any
    /// tag; converting a vector register gives the GPR of the same index.
    pub const fn to_64(self) -> Reg {
        Reg(GPR64 | self.index())
    }

    /// Same index, as a 32-bit general register.
    pub const fn to_32(self) -> Reg {
        Reg(self.index())
    }

    /// Same index, as a single-precision view.
    pub const fn to_single(self) -> Reg {
        Reg(SINGLE | self.index())
    }

    /// Same index, as a double-precision / 64-bit vector view.
    pub const fn to_double(self) -> Reg {
        Reg(DOUBLE | self.index())
    }

    /// Same index, as a full 128-bit vector view.
    pub const fn to_quad(self) -> Reg {
        Reg(QUAD | self.index())
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.class() {
            Some(RegClass::Gpr32) => "W",
            Some(RegClass::Gpr64) => "X",
            Some(RegClass::Single) => "S",
            Some(RegClass::Double) => "D",
            Some(RegClass::Quad) => "Q",
            None => return write!(f, "Reg::INVALID({:#04x})", self.0),
        };
        write!(f, "{prefix}{}", self.index())
    }
}

/// Set of register indices, bit `i` standing for register index `i`.
///
/// Used by the ABI save/restore helpers, where the class (X or Q) is
/// implied by the emitter doing the saving.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RegSet(u32);

impl RegSet {
    pub const fn empty() -> Self {
        RegSet(0)
    }

    pub const fn from_bits(bits: u32) -> Self {
        RegSet(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub fn insert(&mut self, reg: Reg) {
        self.0 |= 1 << reg.index();
    }

    pub fn remove(&mut self, reg: Reg) {
        self.0 &= !(1 << reg.index());
    }

    pub fn with(mut self, reg: Reg) -> Self {
        self.insert(reg);
        self
    }

    pub const fn contains_index(self, index: u8) -> bool {
        index < 32 && self.0 & (1 << index) != 0
    }

    pub const fn contains(self, reg: Reg) -> bool {
        self.contains_index(reg.index())
    }

    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: RegSet) -> RegSet {
        RegSet(self.0 | other.0)
    }

    pub const fn difference(self, other: RegSet) -> RegSet {
        RegSet(self.0 & !other.0)
    }

    /// Member indices in ascending order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0u8..32).filter(move |&i| self.contains_index(i))
    }
}

impl FromIterator<Reg> for RegSet {
    fn from_iter<I: IntoIterator<Item = Reg>>(iter: I) -> Self {
        let mut set = RegSet::empty();
        for reg in iter {
            set.insert(reg);
        }
        set
    }
}

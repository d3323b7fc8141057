//! Operand enums for exception, hint, barrier, system-register and
//! prefetch instructions.

/// PSTATE field written by `MSR (immediate)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PStateField {
    SpSel,
    DaifSet,
    DaifClr,
}

impl PStateField {
    /// `(op1, op2)`.
    pub(crate) fn ops(self) -> (u32, u32) {
        match self {
            PStateField::SpSel => (0b000, 0b101),
            PStateField::DaifSet => (0b011, 0b110),
            PStateField::DaifClr => (0b011, 0b111),
        }
    }
}

/// `HINT #n` operations with dedicated mnemonics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SystemHint {
    Nop = 0,
    Yield = 1,
    Wfe = 2,
    Wfi = 3,
    Sev = 4,
    Sevl = 5,
}

/// Shareability domain and access type of a `DSB`/`DMB`/`ISB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BarrierType {
    OshLd = 1,
    OshSt = 2,
    Osh = 3,
    NshLd = 5,
    NshSt = 6,
    Nsh = 7,
    IshLd = 9,
    IshSt = 10,
    Ish = 11,
    Ld = 13,
    St = 14,
    Sy = 15,
}

/// System registers reachable from EL0 through `MRS`/`MSR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum SystemReg {
    NZCV,
    FPCR,
    FPSR,
    TPIDR_EL0,
    TPIDRRO_EL0,
    CNTVCT_EL0,
    CNTFRQ_EL0,
    DCZID_EL0,
    CTR_EL0,
}

impl SystemReg {
    /// `o0:op1:CRn:CRm:op2`, positioned at bits 19..5.
    pub(crate) fn fields(self) -> u32 {
        let (op0, op1, crn, crm, op2) = match self {
            SystemReg::NZCV => (3, 3, 4, 2, 0),
            SystemReg::FPCR => (3, 3, 4, 4, 0),
            SystemReg::FPSR => (3, 3, 4, 4, 1),
            SystemReg::TPIDR_EL0 => (3, 3, 13, 0, 2),
            SystemReg::TPIDRRO_EL0 => (3, 3, 13, 0, 3),
            SystemReg::CNTVCT_EL0 => (3, 3, 14, 0, 2),
            SystemReg::CNTFRQ_EL0 => (3, 3, 14, 0, 0),
            SystemReg::DCZID_EL0 => (3, 3, 0, 0, 7),
            SystemReg::CTR_EL0 => (3, 3, 0, 0, 1),
        };
        (op0 - 2) << 19 | op1 << 16 | crn << 12 | crm << 8 | op2 << 5
    }

    /// Whether EL0 code may write the register.
    pub fn is_writable(self) -> bool {
        matches!(
            self,
            SystemReg::NZCV | SystemReg::FPCR | SystemReg::FPSR | SystemReg::TPIDR_EL0
        )
    }
}

/// `PRFM` operation: `type:target:policy` packed in 5 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefetchOp(u8);

impl PrefetchOp {
    pub const PLDL1KEEP: PrefetchOp = PrefetchOp(0b00000);
    pub const PLDL1STRM: PrefetchOp = PrefetchOp(0b00001);
    pub const PLDL2KEEP: PrefetchOp = PrefetchOp(0b00010);
    pub const PLDL2STRM: PrefetchOp = PrefetchOp(0b00011);
    pub const PLDL3KEEP: PrefetchOp = PrefetchOp(0b00100);
    pub const PLDL3STRM: PrefetchOp = PrefetchOp(0b00101);
    pub const PLIL1KEEP: PrefetchOp = PrefetchOp(0b01000);
    pub const PLIL1STRM: PrefetchOp = PrefetchOp(0b01001);
    pub const PLIL2KEEP: PrefetchOp = PrefetchOp(0b01010);
    pub const PLIL2STRM: PrefetchOp = PrefetchOp(0b01011);
    pub const PLIL3KEEP: PrefetchOp = PrefetchOp(0b01100);
    pub const PLIL3STRM: PrefetchOp = PrefetchOp(0b01101);
    pub const PSTL1KEEP: PrefetchOp = PrefetchOp(0b10000);
    pub const PSTL1STRM: PrefetchOp = PrefetchOp(0b10001);
    pub const PSTL2KEEP: PrefetchOp = PrefetchOp(0b10010);
    pub const PSTL2STRM: PrefetchOp = PrefetchOp(0b10011);
    pub const PSTL3KEEP: PrefetchOp = PrefetchOp(0b10100);
    pub const PSTL3STRM: PrefetchOp = PrefetchOp(0b10101);

    /// Raw `Rt` field value.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub(crate) fn enc(self) -> u32 {
        self.0 as u32
    }
}

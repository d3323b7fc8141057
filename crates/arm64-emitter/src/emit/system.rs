use super::{gpr, Emitter};
use crate::reg::Reg;
use crate::system::{BarrierType, PStateField, SystemHint, SystemReg};

impl<'a> Emitter<'a> {
    // ---- Exception generation ----

    fn exception(&mut self, opc: u32, imm: u16, ll: u32) {
        self.write32(0xD400_0000 | opc << 21 | (imm as u32) << 5 | ll);
    }

    /// `SVC #imm16`: supervisor call.
    pub fn svc(&mut self, imm: u16) {
        self.exception(0b000, imm, 0b01);
    }

    /// `HVC #imm16`.
    pub fn hvc(&mut self, imm: u16) {
        self.exception(0b000, imm, 0b10);
    }

    /// `SMC #imm16`.
    pub fn smc(&mut self, imm: u16) {
        self.exception(0b000, imm, 0b11);
    }

    /// `BRK #imm16`: breakpoint.
    pub fn brk(&mut self, imm: u16) {
        self.exception(0b001, imm, 0b00);
    }

    /// `HLT #imm16`.
    pub fn hlt(&mut self, imm: u16) {
        self.exception(0b010, imm, 0b00);
    }

    /// `DCPS1 #imm16`.
    pub fn dcps1(&mut self, imm: u16) {
        self.exception(0b101, imm, 0b01);
    }

    /// `DCPS2 #imm16`.
    pub fn dcps2(&mut self, imm: u16) {
        self.exception(0b101, imm, 0b10);
    }

    /// `DCPS3 #imm16`.
    pub fn dcps3(&mut self, imm: u16) {
        self.exception(0b101, imm, 0b11);
    }

    // ---- System ----

    /// `MSR <pstatefield>, #imm4`.
    pub fn msr_pstate(&mut self, field: PStateField, imm: u8) {
        assert!(imm < 16, "MSR: pstate immediate {imm} exceeds 4 bits");
        if field == PStateField::SpSel {
            assert!(imm < 2, "MSR SPSel: immediate must be 0 or 1");
        }
        let (op1, op2) = field.ops();
        self.write32(0xD500_401F | op1 << 16 | (imm as u32) << 8 | op2 << 5);
    }

    /// `HINT #op`.
    pub fn hint(&mut self, op: SystemHint) {
        self.write32(0xD503_201F | (op as u32) << 5);
    }

    /// `NOP`.
    pub fn nop(&mut self) {
        self.hint(SystemHint::Nop);
    }

    /// `CLREX`.
    pub fn clrex(&mut self) {
        self.write32(0xD503_3F5F);
    }

    /// `DSB <option>`.
    pub fn dsb(&mut self, kind: BarrierType) {
        self.write32(0xD503_309F | (kind as u32) << 8);
    }

    /// `DMB <option>`.
    pub fn dmb(&mut self, kind: BarrierType) {
        self.write32(0xD503_30BF | (kind as u32) << 8);
    }

    /// `ISB`. Only the full-system option is architecturally defined.
    pub fn isb(&mut self, kind: BarrierType) {
        assert!(kind == BarrierType::Sy, "ISB: only SY is defined, got {kind:?}");
        self.write32(0xD503_30DF | (kind as u32) << 8);
    }

    /// `MRS Xt, <sysreg>`.
    pub fn mrs(&mut self, rt: Reg, reg: SystemReg) {
        assert!(rt.is_64bit(), "MRS: destination must be a 64-bit register, got {rt:?}");
        self.write32(0xD530_0000 | reg.fields() | gpr(rt));
    }

    /// `MSR <sysreg>, Xt`.
    pub fn msr(&mut self, reg: SystemReg, rt: Reg) {
        assert!(reg.is_writable(), "MSR: {reg:?} is read-only at EL0");
        assert!(rt.is_64bit(), "MSR: source must be a 64-bit register, got {rt:?}");
        self.write32(0xD510_0000 | reg.fields() | gpr(rt));
    }
}

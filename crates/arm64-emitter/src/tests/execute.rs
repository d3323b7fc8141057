//! Emit, finalize and call. Only built on aarch64 hosts.

use crate::arith::{ArithOption, ShiftType};
use crate::code_block::CodeBlock;
use crate::cond::Cond;
use crate::emit::Emitter;
use crate::reg::{Reg, RegSet};

fn build(f: impl FnOnce(&mut Emitter<'_>)) -> CodeBlock {
    let mut block = CodeBlock::new(4096).unwrap();
    f(&mut block.emitter());
    block.finalize().unwrap();
    block
}

fn movi2r_value(imm: u64) -> u64 {
    let block = build(|e| {
        e.movi2r(Reg::X0, imm);
        e.ret();
    });
    let func: extern "C" fn() -> u64 = unsafe { std::mem::transmute(block.base()) };
    func()
}

#[test]
fn execute_movi2r_values() {
    for imm in [
        0,
        u64::MAX,
        0x1234,
        0xFFFF_0000_0000_0000,
        0x1234_5678_9ABC_DEF0,
        0x5555_5555_5555_5555,
        0x0000_FFFF_0000_FFFF,
    ] {
        assert_eq!(movi2r_value(imm), imm, "movi2r {imm:#x}");
    }
}

#[test]
fn execute_add() {
    let block = build(|e| {
        e.add(Reg::X0, Reg::X0, Reg::X1);
        e.ret();
    });
    let func: extern "C" fn(u64, u64) -> u64 = unsafe { std::mem::transmute(block.base()) };
    assert_eq!(func(40, 2), 42);
}

#[test]
fn execute_forward_branch() {
    // max(a, b) with a fixup resolved after the fact.
    let block = build(|e| {
        e.cmp(Reg::X0, Reg::X1);
        let done = e.b_cond(Cond::GE);
        e.mov(Reg::X0, Reg::X1);
        e.set_jump_target(done);
        e.ret();
    });
    let func: extern "C" fn(i64, i64) -> i64 = unsafe { std::mem::transmute(block.base()) };
    assert_eq!(func(3, 9), 9);
    assert_eq!(func(9, 3), 9);
    assert_eq!(func(-5, -7), -5);
}

#[test]
fn execute_backward_loop() {
    // Sum 1..=n.
    let block = build(|e| {
        e.movi2r(Reg::X1, 0);
        let skip = e.cbz(Reg::X0);
        let top = e.get_code_ptr();
        e.add(Reg::X1, Reg::X1, Reg::X0);
        e.sub_imm(Reg::X0, Reg::X0, 1, false);
        e.cbnz_to(Reg::X0, top);
        e.set_jump_target(skip);
        e.mov(Reg::X0, Reg::X1);
        e.ret();
    });
    let func: extern "C" fn(u64) -> u64 = unsafe { std::mem::transmute(block.base()) };
    assert_eq!(func(0), 0);
    assert_eq!(func(10), 55);
}

/// Byte `k` of the result is the `k`-th member of `regs` after a pop
/// that skips `ignore`; pushed values are the register index, and the
/// clobber written between push and pop is `0x80 | index`.
fn gprs_after_pop(regs: RegSet, ignore: RegSet) -> u64 {
    let block = build(|e| {
        // Outer save keeps the caller's callee-saved registers intact.
        e.abi_push_registers(regs);
        for i in regs.iter() {
            e.movi2r(Reg::x(i), i as u64);
        }
        e.add_imm(Reg::X1, Reg::SP, 0, false);
        e.abi_push_registers(regs);
        for i in regs.iter() {
            e.movi2r(Reg::x(i), 0x80 | i as u64);
        }
        e.abi_pop_registers(regs, ignore);
        e.add_imm(Reg::X2, Reg::SP, 0, false);

        e.movi2r(Reg::X0, 0);
        for (k, i) in regs.iter().enumerate() {
            e.add_with(Reg::X0, Reg::X0, ArithOption::shifted(Reg::x(i), ShiftType::Lsl, 8 * k as u8));
        }
        // Poison the result if SP moved.
        e.cmp(Reg::X1, Reg::X2);
        e.movi2r(Reg::X3, u64::MAX);
        e.csel(Reg::X0, Reg::X0, Reg::X3, Cond::EQ);
        e.abi_pop_registers(regs, RegSet::empty());
        e.ret();
    });
    let func: extern "C" fn() -> u64 = unsafe { std::mem::transmute(block.base()) };
    func()
}

fn expected_bytes(regs: RegSet, ignore: RegSet) -> u64 {
    regs.iter()
        .enumerate()
        .map(|(k, i)| {
            let v = if ignore.contains_index(i) { 0x80 | i as u64 } else { i as u64 };
            v << (8 * k)
        })
        .sum()
}

#[test]
fn execute_abi_push_pop_restores_values() {
    let four = RegSet::from_bits(1 << 19 | 1 << 20 | 1 << 21 | 1 << 22);
    let three = RegSet::from_bits(1 << 19 | 1 << 20 | 1 << 21);
    for (regs, ignore) in [
        (four, RegSet::empty()),
        (four, RegSet::empty().with(Reg::X21)),
        (three, RegSet::empty()),
        (three, RegSet::empty().with(Reg::X19)),
        (three, RegSet::empty().with(Reg::X21)),
    ] {
        assert_eq!(
            gprs_after_pop(regs, ignore),
            expected_bytes(regs, ignore),
            "{regs:?} ignoring {ignore:?}"
        );
    }
    assert_eq!(gprs_after_pop(four, RegSet::empty()), 0x1615_1413);
    assert_eq!(gprs_after_pop(four, RegSet::empty().with(Reg::X21)), 0x1695_1413);
}

/// Like [`gprs_after_pop`] for Q registers. Lane 0 of `Qi` holds `i`,
/// lane 1 holds `0x40 | i`; both lanes of the clobber hold `0x80 | i`.
/// Result bytes `2k` and `2k + 1` are the two lanes of the `k`-th member.
fn qregs_after_pop(regs: RegSet, ignore: RegSet) -> u64 {
    let block = build(|e| {
        e.float().abi_push_registers(regs);
        for i in regs.iter() {
            e.movi2r(Reg::X9, i as u64);
            e.movi2r(Reg::X10, 0x40 | i as u64);
            let mut f = e.float();
            f.dup_gpr(64, Reg::q(i), Reg::X9);
            f.ins_gpr(64, Reg::q(i), 1, Reg::X10);
        }
        e.add_imm(Reg::X1, Reg::SP, 0, false);
        e.float().abi_push_registers(regs);
        for i in regs.iter() {
            e.movi2r(Reg::X9, 0x80 | i as u64);
            e.float().dup_gpr(64, Reg::q(i), Reg::X9);
        }
        e.float().abi_pop_registers(regs, ignore);
        e.add_imm(Reg::X2, Reg::SP, 0, false);

        e.movi2r(Reg::X0, 0);
        for (k, i) in regs.iter().enumerate() {
            for lane in 0..2u8 {
                e.float().umov(64, Reg::X9, Reg::q(i), lane);
                let shift = 16 * k as u8 + 8 * lane;
                e.add_with(Reg::X0, Reg::X0, ArithOption::shifted(Reg::X9, ShiftType::Lsl, shift));
            }
        }
        e.cmp(Reg::X1, Reg::X2);
        e.movi2r(Reg::X3, u64::MAX);
        e.csel(Reg::X0, Reg::X0, Reg::X3, Cond::EQ);
        e.float().abi_pop_registers(regs, RegSet::empty());
        e.ret();
    });
    let func: extern "C" fn() -> u64 = unsafe { std::mem::transmute(block.base()) };
    func()
}

#[test]
fn execute_q_register_push_pop_restores_values() {
    let regs = RegSet::from_bits(1 << 8 | 1 << 9 | 1 << 10);
    for ignore in [RegSet::empty(), RegSet::from_bits(1 << 8), RegSet::from_bits(1 << 10)] {
        let lanes = |i: u8| i as u64 | (0x40 | i as u64) << 8;
        let expected: u64 = regs
            .iter()
            .enumerate()
            .map(|(k, i)| {
                let v = if ignore.contains_index(i) {
                    (0x80 | i as u64) * 0x101
                } else {
                    lanes(i)
                };
                v << (16 * k)
            })
            .sum();
        assert_eq!(qregs_after_pop(regs, ignore), expected, "ignoring {ignore:?}");
    }
    assert_eq!(qregs_after_pop(regs, RegSet::empty()), 0x4A0A_4909_4808);
}

#[test]
fn execute_scalar_fp() {
    let block = build(|e| {
        let mut f = e.float();
        f.fmul(Reg::D0, Reg::D0, Reg::D1);
        f.fsqrt(Reg::D0, Reg::D0);
        e.ret();
    });
    let func: extern "C" fn(f64, f64) -> f64 = unsafe { std::mem::transmute(block.base()) };
    assert_eq!(func(2.0, 8.0), 4.0);
}

#[test]
fn execute_vector_add() {
    // dst[i] = a[i] + b[i] for four f32 lanes.
    let block = build(|e| {
        let mut f = e.float();
        f.ld1(32, 1, Reg::Q0, Reg::X0);
        f.ld1(32, 1, Reg::Q1, Reg::X1);
        f.fadd_vec(32, Reg::Q0, Reg::Q0, Reg::Q1);
        f.st1(32, 1, Reg::Q0, Reg::X2);
        e.ret();
    });
    let func: extern "C" fn(*const f32, *const f32, *mut f32) =
        unsafe { std::mem::transmute(block.base()) };
    let a = [1.0f32, 2.0, 3.0, 4.0];
    let b = [10.0f32, 20.0, 30.0, 40.0];
    let mut out = [0.0f32; 4];
    func(a.as_ptr(), b.as_ptr(), out.as_mut_ptr());
    assert_eq!(out, [11.0, 22.0, 33.0, 44.0]);
}

#[test]
fn reopen_and_patch() {
    let mut block = build(|e| {
        e.movi2r(Reg::W0, 42);
        e.ret();
    });
    let func: extern "C" fn() -> u32 = unsafe { std::mem::transmute(block.base()) };
    assert_eq!(func(), 42);

    block.reopen().unwrap();
    block.emitter().movi2r(Reg::W0, 44);
    block.finalize().unwrap();
    assert_eq!(func(), 44);
}

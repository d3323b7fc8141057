use arm64_emitter::{
    ArithOption, CodeBlock, CodeBuffer, Cond, Emitter, IndexType, Reg, RegSet, ShiftType, BRK_POISON,
};

fn emit(f: impl FnOnce(&mut Emitter<'_>)) -> Vec<u32> {
    let mut words = [0u32; 32];
    let mut e = Emitter::from_words(&mut words);
    f(&mut e);
    e.code()
}

#[test]
fn add_x_and_w_differ_only_in_sf() {
    let x = emit(|e| e.add(Reg::X0, Reg::X1, Reg::X2));
    let w = emit(|e| e.add(Reg::W0, Reg::W1, Reg::W2));
    assert_eq!(x, vec![0x8B02_0020]);
    assert_eq!(w, vec![0x0B02_0020]);
    assert_eq!(x[0] ^ w[0], 1 << 31);
}

#[test]
fn register_views_round_trip() {
    for n in 0..31 {
        let x = Reg::x(n);
        assert_eq!(x.to_32().to_64(), x);
        assert_eq!(x.to_32().index(), n);
    }
    for n in 0..32 {
        let q = Reg::q(n);
        assert_eq!(q.to_double().to_quad(), q);
        assert_eq!(q.to_single().index(), n);
        assert!(q.to_double().is_double());
    }
}

#[test]
fn fixup_matches_known_target_form() {
    for cond in [Cond::EQ, Cond::LT, Cond::HI] {
        let late = emit(|e| {
            let f = e.b_cond(cond);
            for _ in 0..5 {
                e.nop();
            }
            e.set_jump_target(f);
        });
        let early = emit(|e| {
            let target = e.get_code_ptr().wrapping_add(24);
            e.b_cond_to(cond, target);
            for _ in 0..5 {
                e.nop();
            }
        });
        assert_eq!(late, early);
    }
}

#[test]
fn fixup_to_explicit_target() {
    let code = emit(|e| {
        let start = e.get_code_ptr();
        e.nop();
        let f = e.cbnz(Reg::W3);
        e.set_jump_target_to(f, start);
    });
    // CBNZ W3, #-4
    assert_eq!(code[1], 0x35FF_FFE3);
}

#[test]
#[should_panic(expected = "out of range")]
fn conditional_branch_past_one_mebibyte_panics() {
    emit(|e| {
        let target = e.get_code_ptr().wrapping_sub((1 << 20) + 4);
        e.b_cond_to(Cond::EQ, target);
    });
}

#[test]
fn conditional_branch_range_edges() {
    emit(|e| {
        let here = e.get_code_ptr();
        e.b_cond_to(Cond::EQ, here.wrapping_sub(1 << 20));
        let here = e.get_code_ptr();
        e.b_cond_to(Cond::EQ, here.wrapping_add((1 << 20) - 4));
    });
}

#[test]
fn abi_frame_keeps_sp_aligned() {
    for count in 1..=10u32 {
        let regs: RegSet = (19..19 + count as u8).map(Reg::x).collect();
        let push = emit(|e| e.abi_push_registers(regs));
        // The first word is a pre-indexed store that moves SP by the whole
        // area; its scaled offset is a multiple of 16 bytes.
        let first = push[0];
        let offset = if first & 0x3B00_0000 == 0x2900_0000 {
            // STP: imm7 scaled by 8.
            (((first >> 15) & 0x7F) as i32) << 25 >> 25 << 3
        } else {
            // STR (pre-index): imm9.
            (((first >> 12) & 0x1FF) as i32) << 23 >> 23
        };
        assert!(offset < 0 && offset % 16 == 0, "{count} registers: SP moved by {offset}");
        assert_eq!(push.len() as u32, count.div_ceil(2));

        let pop = emit(|e| e.abi_pop_registers(regs, RegSet::empty()));
        assert_eq!(pop.len(), push.len());
    }
}

#[test]
fn movi2r_word_counts() {
    assert_eq!(emit(|e| e.movi2r(Reg::X0, 0)).len(), 1);
    assert_eq!(emit(|e| e.movi2r(Reg::X0, u64::MAX)).len(), 1);
    assert_eq!(emit(|e| e.movi2r(Reg::X0, 0xABCD_0000_0000)).len(), 1);
    assert_eq!(emit(|e| e.movi2r(Reg::X0, 0x00FF_00FF_00FF_00FF)).len(), 1);
    assert_eq!(emit(|e| e.movi2r(Reg::X0, 0x1234_0000_5678)).len(), 2);
    assert_eq!(emit(|e| e.movi2r(Reg::W0, 0x1234_5678)).len(), 2);
    assert_eq!(emit(|e| e.movi2r_full(Reg::X0, 1)).len(), 4);
}

#[test]
fn shifted_operand_normalizes_full_width() {
    assert_eq!(
        ArithOption::shifted(Reg::X1, ShiftType::Lsl, 64),
        ArithOption::shifted(Reg::X1, ShiftType::Lsl, 0)
    );
}

#[repr(align(16))]
struct Aligned([u8; 32]);

#[test]
fn buffer_cursor_over_bytes() {
    let mut mem = Aligned([0; 32]);
    let bytes = &mut mem.0[..];
    let mut e = Emitter::new(CodeBuffer::new(bytes));
    e.nop();
    e.align_code16();
    assert_eq!(e.offset(), 16);
    assert_eq!(e.code()[1..4], [BRK_POISON; 3]);

    let buf = e.into_buffer();
    assert_eq!(buf.offset(), 16);
    assert_eq!(buf.read32(0), 0xD503_201F);
    assert_eq!(buf.words().len(), 4);
}

#[test]
fn code_block_emit_and_finalize() -> Result<(), anyhow::Error> {
    let mut block = CodeBlock::builder(8192).guard_page(true).build()?;
    let used = {
        let mut e = block.emitter();
        e.stp(IndexType::Pre, Reg::FP, Reg::LR, Reg::SP, -16);
        e.ldp(IndexType::Post, Reg::FP, Reg::LR, Reg::SP, 16);
        e.ret();
        e.offset()
    };
    assert_eq!(used, 12);
    assert_eq!(block.space_left(used), block.size() - 12);
    block.finalize()?;
    block.reopen()?;
    block.clear();
    Ok(())
}

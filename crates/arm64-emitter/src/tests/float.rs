use super::{encode, encode_one};
use crate::cond::Cond;
use crate::emit::IndexType;
use crate::reg::{Reg, RegSet};

// ---- Scalar ----

#[test]
fn encode_scalar_arithmetic() {
    assert_eq!(encode_one(|e| e.float().fadd(Reg::S0, Reg::S1, Reg::S2)), 0x1E222820);
    assert_eq!(encode_one(|e| e.float().fadd(Reg::D0, Reg::D1, Reg::D2)), 0x1E622820);
    assert_eq!(encode_one(|e| e.float().fsub(Reg::S0, Reg::S1, Reg::S2)), 0x1E223820);
    assert_eq!(encode_one(|e| e.float().fmul(Reg::D0, Reg::D1, Reg::D2)), 0x1E620820);
    assert_eq!(encode_one(|e| e.float().fdiv(Reg::D0, Reg::D1, Reg::D2)), 0x1E621820);
}

#[test]
fn encode_scalar_one_source() {
    assert_eq!(encode_one(|e| e.float().fmov(Reg::S0, Reg::S1)), 0x1E204020);
    assert_eq!(encode_one(|e| e.float().fabs(Reg::D0, Reg::D1)), 0x1E60C020);
    assert_eq!(encode_one(|e| e.float().fneg(Reg::S0, Reg::S1)), 0x1E214020);
    assert_eq!(encode_one(|e| e.float().fsqrt(Reg::D0, Reg::D1)), 0x1E61C020);
}

#[test]
fn encode_precision_conversion() {
    assert_eq!(encode_one(|e| e.float().fcvt(64, 32, Reg::D0, Reg::S1)), 0x1E22C020);
    assert_eq!(encode_one(|e| e.float().fcvt(32, 64, Reg::S0, Reg::D1)), 0x1E624020);
}

#[test]
fn encode_fmov_immediate() {
    assert_eq!(encode_one(|e| e.float().fmov_imm(Reg::D0, 1.0)), 0x1E6E1000);
}

#[test]
#[should_panic(expected = "not representable")]
fn fmov_immediate_unrepresentable_panics() {
    encode(|e| e.float().fmov_imm(Reg::D0, 0.1));
}

#[test]
#[should_panic(expected = "precision mismatch")]
fn scalar_mixed_precision_panics() {
    encode(|e| e.float().fadd(Reg::D0, Reg::S1, Reg::D2));
}

#[test]
fn encode_compare_and_select() {
    assert_eq!(encode_one(|e| e.float().fcmp(Reg::D0, Reg::D1)), 0x1E612000);
    assert_eq!(encode_one(|e| e.float().fcmp_zero(Reg::S0)), 0x1E202008);
    assert_eq!(encode_one(|e| e.float().fcmpe(Reg::S0, Reg::S1)), 0x1E212010);
    assert_eq!(encode_one(|e| e.float().fcsel(Reg::D0, Reg::D1, Reg::D2, Cond::EQ)), 0x1E620C20);
}

// ---- FP <-> integer ----

#[test]
fn encode_integer_conversions() {
    assert_eq!(encode_one(|e| e.float().scvtf_gpr(Reg::D0, Reg::X1)), 0x9E620020);
    assert_eq!(encode_one(|e| e.float().ucvtf_gpr(Reg::S0, Reg::W1)), 0x1E230020);
    assert_eq!(encode_one(|e| e.float().fcvtzs_gpr(Reg::W0, Reg::S1)), 0x1E380020);
    assert_eq!(encode_one(|e| e.float().fcvtzs_gpr(Reg::X0, Reg::D1)), 0x9E780020);
    assert_eq!(encode_one(|e| e.float().fcvtzu_gpr(Reg::X0, Reg::D1)), 0x9E790020);
}

#[test]
fn encode_fmov_general() {
    assert_eq!(encode_one(|e| e.float().fmov_gpr(Reg::X0, Reg::D1, false)), 0x9E660020);
    assert_eq!(encode_one(|e| e.float().fmov_gpr(Reg::D0, Reg::X1, false)), 0x9E670020);
    assert_eq!(encode_one(|e| e.float().fmov_gpr(Reg::W0, Reg::S1, false)), 0x1E260020);
    assert_eq!(encode_one(|e| e.float().fmov_gpr(Reg::X0, Reg::Q1, true)), 0x9EAE0020);
    assert_eq!(encode_one(|e| e.float().fmov_gpr(Reg::Q0, Reg::X1, true)), 0x9EAF0020);
}

#[test]
#[should_panic(expected = "differ in width")]
fn fmov_general_width_mismatch_panics() {
    encode(|e| e.float().fmov_gpr(Reg::W0, Reg::D1, false));
}

// ---- Vector ----

#[test]
fn encode_vector_fp_arithmetic() {
    assert_eq!(encode_one(|e| e.float().fadd_vec(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E22D420);
    assert_eq!(encode_one(|e| e.float().fadd_vec(64, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E62D420);
    assert_eq!(encode_one(|e| e.float().fsub_vec(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4EA2D420);
    assert_eq!(encode_one(|e| e.float().fmul_vec(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x6E22DC20);
    assert_eq!(encode_one(|e| e.float().fabs_vec(32, Reg::Q0, Reg::Q1)), 0x4EA0F820);
    assert_eq!(encode_one(|e| e.float().fneg_vec(64, Reg::Q0, Reg::Q1)), 0x6EE0F820);
}

#[test]
fn vector_width_follows_register_view() {
    // FADD V0.2S vs V0.4S differ only in Q.
    let narrow = encode_one(|e| e.float().fadd_vec(32, Reg::D0, Reg::D1, Reg::D2));
    let wide = encode_one(|e| e.float().fadd_vec(32, Reg::Q0, Reg::Q1, Reg::Q2));
    assert_eq!(narrow ^ wide, 1 << 30);
}

#[test]
#[should_panic(expected = "need a Q register")]
fn double_elements_in_d_register_panic() {
    encode(|e| e.float().fadd_vec(64, Reg::D0, Reg::D1, Reg::D2));
}

#[test]
fn encode_vector_integer_and_bitwise() {
    assert_eq!(encode_one(|e| e.float().add(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4EA28420);
    assert_eq!(encode_one(|e| e.float().add(8, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E228420);
    assert_eq!(encode_one(|e| e.float().sub(64, Reg::Q0, Reg::Q1, Reg::Q2)), 0x6EE28420);
    assert_eq!(encode_one(|e| e.float().and(Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E221C20);
    assert_eq!(encode_one(|e| e.float().bic(Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E621C20);
    assert_eq!(encode_one(|e| e.float().orr(Reg::Q0, Reg::Q1, Reg::Q2)), 0x4EA21C20);
    assert_eq!(encode_one(|e| e.float().eor(Reg::Q0, Reg::Q1, Reg::Q2)), 0x6E221C20);
    assert_eq!(encode_one(|e| e.float().bsl(Reg::Q0, Reg::Q1, Reg::Q2)), 0x6E621C20);
    assert_eq!(encode_one(|e| e.float().mov(Reg::Q0, Reg::Q1)), 0x4EA11C20);
    assert_eq!(encode_one(|e| e.float().not(Reg::Q0, Reg::Q1)), 0x6E205820);
}

#[test]
fn encode_vector_conversions() {
    assert_eq!(encode_one(|e| e.float().scvtf(32, Reg::Q0, Reg::Q1)), 0x4E21D820);
    assert_eq!(encode_one(|e| e.float().ucvtf(32, Reg::Q0, Reg::Q1)), 0x6E21D820);
    assert_eq!(encode_one(|e| e.float().fcvtzs(32, Reg::Q0, Reg::Q1)), 0x4EA1B820);
    assert_eq!(encode_one(|e| e.float().fcvtl(64, Reg::Q0, Reg::D1)), 0x0E617820);
    assert_eq!(encode_one(|e| e.float().fcvtn(32, Reg::D0, Reg::Q1)), 0x0E616820);
    assert_eq!(encode_one(|e| e.float().fcvtn2(32, Reg::Q0, Reg::Q1)), 0x4E616820);
    assert_eq!(encode_one(|e| e.float().xtn(8, Reg::D0, Reg::Q1)), 0x0E212820);
    assert_eq!(encode_one(|e| e.float().xtn(32, Reg::D0, Reg::Q1)), 0x0EA12820);
}

#[test]
fn encode_vector_reverse() {
    assert_eq!(encode_one(|e| e.float().rev64(32, Reg::Q0, Reg::Q1)), 0x4EA00820);
    assert_eq!(encode_one(|e| e.float().rev32(8, Reg::Q0, Reg::Q1)), 0x6E200820);
    assert_eq!(encode_one(|e| e.float().rev16(8, Reg::Q0, Reg::Q1)), 0x4E201820);
}

#[test]
fn encode_lane_moves() {
    assert_eq!(encode_one(|e| e.float().dup_element(32, Reg::Q0, Reg::Q1, 1)), 0x4E0C0420);
    assert_eq!(encode_one(|e| e.float().dup_gpr(32, Reg::Q0, Reg::W1)), 0x4E040C20);
    assert_eq!(encode_one(|e| e.float().ins_gpr(32, Reg::Q0, 1, Reg::W1)), 0x4E0C1C20);
    assert_eq!(encode_one(|e| e.float().ins_element(32, Reg::Q0, 1, Reg::Q1, 0)), 0x6E0C0420);
    assert_eq!(encode_one(|e| e.float().ins_element(32, Reg::Q0, 0, Reg::Q1, 3)), 0x6E046420);
    assert_eq!(encode_one(|e| e.float().umov(32, Reg::W0, Reg::Q1, 1)), 0x0E0C3C20);
    assert_eq!(encode_one(|e| e.float().umov(64, Reg::X0, Reg::Q1, 1)), 0x4E183C20);
    assert_eq!(encode_one(|e| e.float().smov(16, Reg::X0, Reg::Q1, 2)), 0x4E0A2C20);
}

#[test]
#[should_panic(expected = "lane 4 out of range")]
fn lane_index_out_of_range_panics() {
    encode(|e| e.float().umov(32, Reg::W0, Reg::Q1, 4));
}

#[test]
fn encode_vector_compares() {
    assert_eq!(encode_one(|e| e.float().fcmeq(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E22E420);
    assert_eq!(encode_one(|e| e.float().fcmge(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x6E22E420);
    assert_eq!(encode_one(|e| e.float().fcmgt(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x6EA2E420);
    assert_eq!(encode_one(|e| e.float().fcmeq_zero(32, Reg::Q0, Reg::Q1)), 0x4EA0D820);
    assert_eq!(encode_one(|e| e.float().fcmlt_zero(32, Reg::Q0, Reg::Q1)), 0x4EA0E820);
}

#[test]
fn encode_permutes() {
    assert_eq!(encode_one(|e| e.float().uzp1(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E821820);
    assert_eq!(encode_one(|e| e.float().zip1(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E823820);
    assert_eq!(encode_one(|e| e.float().trn2(32, Reg::Q0, Reg::Q1, Reg::Q2)), 0x4E826820);
}

#[test]
fn encode_shift_immediate() {
    assert_eq!(encode_one(|e| e.float().uxtl(8, Reg::Q0, Reg::D1)), 0x2F08A420);
    assert_eq!(encode_one(|e| e.float().sshll(16, Reg::Q0, Reg::D1, 2)), 0x0F12A420);
    assert_eq!(encode_one(|e| e.float().shrn(8, Reg::D0, Reg::Q1, 3)), 0x0F0D8420);
}

#[test]
#[should_panic(expected = "out of range")]
fn widening_shift_too_large_panics() {
    encode(|e| e.float().ushll(8, Reg::Q0, Reg::D1, 8));
}

// ---- Loads and stores ----

#[test]
fn encode_fp_loads_and_stores() {
    let word = encode_one(|e| e.float().ldr(128, IndexType::Unsigned, Reg::Q0, Reg::X1, 16));
    assert_eq!(word, 0x3DC00420);
    let word = encode_one(|e| e.float().str(128, IndexType::Unsigned, Reg::Q0, Reg::X1, 0));
    assert_eq!(word, 0x3D800020);
    let word = encode_one(|e| e.float().ldr(64, IndexType::Unsigned, Reg::D0, Reg::X1, 8));
    assert_eq!(word, 0xFD400420);
    let word = encode_one(|e| e.float().ldr(32, IndexType::Unsigned, Reg::S0, Reg::SP, 4));
    assert_eq!(word, 0xBD4007E0);
    let word = encode_one(|e| e.float().str(64, IndexType::Pre, Reg::D0, Reg::SP, -16));
    assert_eq!(word, 0xFC1F0FE0);
}

#[test]
fn encode_fp_pairs() {
    let word = encode_one(|e| e.float().stp(128, IndexType::Pre, Reg::Q0, Reg::Q1, Reg::SP, -32));
    assert_eq!(word, 0xADBF07E0);
    let word = encode_one(|e| e.float().ldp(64, IndexType::Post, Reg::d(8), Reg::d(9), Reg::SP, 16));
    assert_eq!(word, 0x6CC127E8);
}

#[test]
fn encode_structure_loads_and_stores() {
    assert_eq!(encode_one(|e| e.float().ld1(8, 1, Reg::Q0, Reg::X1)), 0x4C407020);
    assert_eq!(encode_one(|e| e.float().st1(32, 2, Reg::Q0, Reg::X1)), 0x4C00A820);
    assert_eq!(encode_one(|e| e.float().ld1_lane(32, Reg::Q0, 1, Reg::X1)), 0x0D409020);
    assert_eq!(encode_one(|e| e.float().ld1_lane(64, Reg::Q0, 1, Reg::X1)), 0x4D408420);
    assert_eq!(encode_one(|e| e.float().ld1_lane_post(32, Reg::Q0, 0, Reg::X1, Reg::ZR)), 0x0DDF8020);
    assert_eq!(encode_one(|e| e.float().st1_lane(8, Reg::Q0, 15, Reg::X1)), 0x4D001C20);
    assert_eq!(encode_one(|e| e.float().ld1r(32, Reg::Q0, Reg::X1)), 0x4D40C820);
}

#[test]
#[should_panic(expected = "count 5")]
fn structure_count_out_of_range_panics() {
    encode(|e| e.float().ld1(32, 5, Reg::Q0, Reg::X1));
}

// ---- ABI ----

#[test]
fn abi_push_pop_q_registers() {
    let regs = RegSet::from_bits(1 << 8 | 1 << 9 | 1 << 10);
    let push = encode(|e| e.float().abi_push_registers(regs));
    // STP Q8, Q9, [SP, #-48]!; STR Q10, [SP, #32]
    assert_eq!(push, vec![0xADBEA7E8, 0x3D800BEA]);
    let pop = encode(|e| e.float().abi_pop_registers(regs, RegSet::empty()));
    // LDR Q10, [SP, #32]; LDP Q8, Q9, [SP], #48
    assert_eq!(pop, vec![0x3DC00BEA, 0xACC1A7E8]);
}

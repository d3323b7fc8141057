use super::load_store::IndexType;
use super::Emitter;
use crate::reg::{Reg, RegSet};

/// One store/load of a save area: a pair, or a lone trailing register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Slot {
    pub first: u8,
    pub second: Option<u8>,
    pub offset: i32,
}

/// Layout of a save area for `regs`, `slot_size` bytes per register.
///
/// Registers are stored in ascending index order, paired, from SP
/// upward. The area is rounded to 16 bytes so SP stays aligned.
pub(crate) fn frame_plan(regs: RegSet, slot_size: i32) -> (Vec<Slot>, i32) {
    let indices: Vec<u8> = regs.iter().collect();
    let total = (indices.len() as i32 * slot_size + 15) & !15;
    let slots = indices
        .chunks(2)
        .enumerate()
        .map(|(i, chunk)| Slot {
            first: chunk[0],
            second: chunk.get(1).copied(),
            offset: i as i32 * 2 * slot_size,
        })
        .collect();
    (slots, total)
}

impl<'a> Emitter<'a> {
    /// Save the X registers in `regs` below SP.
    ///
    /// The first store pre-decrements SP by the whole (16-byte rounded)
    /// area, so SP is aligned at every instruction boundary.
    pub fn abi_push_registers(&mut self, regs: RegSet) {
        assert!(!regs.contains_index(31), "ABI push: index 31 (SP/ZR) cannot be saved");
        let (slots, total) = frame_plan(regs, 8);
        for slot in &slots {
            let rt = Reg::x(slot.first);
            let (index, imm) = if slot.offset == 0 {
                (IndexType::Pre, -total)
            } else {
                (IndexType::Unsigned, slot.offset)
            };
            match slot.second {
                Some(second) => self.stp(index, rt, Reg::x(second), Reg::SP, imm),
                None => self.str(index, rt, Reg::SP, imm),
            }
        }
    }

    /// Restore what [`abi_push_registers`](Self::abi_push_registers) saved,
    /// skipping registers in `ignore` (they keep their current value).
    ///
    /// Loads run in reverse; the last one post-increments SP past the area.
    pub fn abi_pop_registers(&mut self, regs: RegSet, ignore: RegSet) {
        assert!(!regs.contains_index(31), "ABI pop: index 31 (SP/ZR) cannot be restored");
        let (slots, total) = frame_plan(regs, 8);
        let keep = |idx: u8| !ignore.contains_index(idx);

        for slot in slots.iter().rev() {
            let first = keep(slot.first).then(|| Reg::x(slot.first));
            let second = slot.second.filter(|&i| keep(i)).map(Reg::x);

            if slot.offset != 0 {
                match (first, second) {
                    (Some(a), Some(b)) => self.ldp(IndexType::Unsigned, a, b, Reg::SP, slot.offset),
                    (Some(a), None) => self.ldr(IndexType::Unsigned, a, Reg::SP, slot.offset),
                    (None, Some(b)) => self.ldr(IndexType::Unsigned, b, Reg::SP, slot.offset + 8),
                    (None, None) => {}
                }
                continue;
            }

            match (first, second) {
                (Some(a), Some(b)) => self.ldp(IndexType::Post, a, b, Reg::SP, total),
                (Some(a), None) => self.ldr(IndexType::Post, a, Reg::SP, total),
                (None, second) => {
                    if let Some(b) = second {
                        self.ldr(IndexType::Unsigned, b, Reg::SP, 8);
                    }
                    self.add_imm(Reg::SP, Reg::SP, total as u32, false);
                }
            }
        }
    }
}

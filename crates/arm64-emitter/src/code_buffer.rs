use std::marker::PhantomData;
use std::ptr;

/// `BRK #0`. Used for padding and as the placeholder of unresolved fixups.
pub const BRK_POISON: u32 = 0xD420_0000;

/// Write cursor over a caller-provided code region.
///
/// The buffer does not own the memory; it borrows it for `'a` and appends
/// little-endian instruction words at the cursor. The cursor is always a
/// multiple of 4 bytes from a 4-byte aligned base.
///
/// `[last_flush, offset)` is the part written since the last
/// [`flush_icache`](Self::flush_icache), i.e. the part the instruction
/// cache may not have seen yet.
pub struct CodeBuffer<'a> {
    base: *mut u8,
    capacity: usize,
    offset: usize,
    last_flush: usize,
    _region: PhantomData<&'a mut [u8]>,
}

impl<'a> CodeBuffer<'a> {
    /// Cursor over `region`. The region must be 4-byte aligned.
    pub fn new(region: &'a mut [u8]) -> Self {
        assert!(
            region.as_ptr() as usize % 4 == 0,
            "code region must be 4-byte aligned"
        );
        let capacity = region.len() & !3;
        CodeBuffer {
            base: region.as_mut_ptr(),
            capacity,
            offset: 0,
            last_flush: 0,
            _region: PhantomData,
        }
    }

    /// Cursor over a word slice; alignment holds by construction.
    pub fn from_words(words: &'a mut [u32]) -> Self {
        let capacity = words.len() * 4;
        CodeBuffer {
            base: words.as_mut_ptr() as *mut u8,
            capacity,
            offset: 0,
            last_flush: 0,
            _region: PhantomData,
        }
    }

    /// Cursor over raw memory, e.g. an executable mapping owned elsewhere.
    ///
    /// # Safety
    /// `base..base + capacity` must be writable, 4-byte aligned, and not
    /// accessed through any other path for `'a`.
    pub unsafe fn from_raw_parts(base: *mut u8, capacity: usize) -> Self {
        assert!(base as usize % 4 == 0, "code region must be 4-byte aligned");
        CodeBuffer {
            base,
            capacity: capacity & !3,
            offset: 0,
            last_flush: 0,
            _region: PhantomData,
        }
    }

    pub fn base(&self) -> *const u8 {
        self.base
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes between the region start and the cursor.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.capacity - self.offset
    }

    /// Address the next word will be written to.
    pub fn get_code_ptr(&self) -> *const u8 {
        self.base.wrapping_add(self.offset)
    }

    pub fn get_writable_code_ptr(&mut self) -> *mut u8 {
        self.base.wrapping_add(self.offset)
    }

    /// True if `ptr` lies in the region (the one-past-the-end address counts).
    pub fn contains(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let base = self.base as usize;
        addr >= base && addr <= base + self.capacity
    }

    /// Move the cursor to `ptr`, which must lie in the region.
    ///
    /// The flush window restarts at the new position.
    pub fn set_code_ptr(&mut self, ptr: *const u8) {
        assert!(
            self.contains(ptr),
            "set_code_ptr: {ptr:p} is outside the code region at {:p}",
            self.base
        );
        self.set_offset(ptr as usize - self.base as usize);
    }

    pub fn set_offset(&mut self, offset: usize) {
        assert!(offset % 4 == 0, "code offset {offset:#x} is not word aligned");
        assert!(
            offset <= self.capacity,
            "code offset {offset:#x} past capacity {:#x}",
            self.capacity
        );
        self.offset = offset;
        self.last_flush = offset;
    }

    /// Require room for `bytes` more bytes at the cursor.
    pub fn reserve(&mut self, bytes: usize) {
        assert!(
            bytes <= self.remaining(),
            "code buffer exhausted: need {bytes} bytes, {} left",
            self.remaining()
        );
    }

    /// Append a 32-bit instruction word.
    pub fn write32(&mut self, word: u32) {
        assert!(self.offset + 4 <= self.capacity, "code buffer overflow");
        unsafe {
            let dst = self.base.add(self.offset);
            ptr::copy_nonoverlapping(word.to_le_bytes().as_ptr(), dst, 4);
        }
        self.offset += 4;
    }

    /// Overwrite a previously emitted word at byte offset `offset`.
    pub fn write32_at(&mut self, offset: usize, word: u32) {
        assert!(offset % 4 == 0, "patch offset {offset:#x} is not word aligned");
        assert!(offset + 4 <= self.capacity, "patch offset {offset:#x} out of bounds");
        unsafe {
            let dst = self.base.add(offset);
            ptr::copy_nonoverlapping(word.to_le_bytes().as_ptr(), dst, 4);
        }
    }

    /// Read back the word at byte offset `offset`.
    pub fn read32(&self, offset: usize) -> u32 {
        assert!(offset + 4 <= self.capacity, "read offset {offset:#x} out of bounds");
        let mut bytes = [0u8; 4];
        unsafe {
            ptr::copy_nonoverlapping(self.base.add(offset), bytes.as_mut_ptr(), 4);
        }
        u32::from_le_bytes(bytes)
    }

    /// Words written so far, from the region start to the cursor.
    pub fn words(&self) -> Vec<u32> {
        (0..self.offset).step_by(4).map(|off| self.read32(off)).collect()
    }

    /// Pad with `BRK #0` until the cursor is 16-byte aligned.
    pub fn align_code16(&mut self) -> *const u8 {
        self.align_to(16)
    }

    /// Pad with `BRK #0` until the cursor is page aligned.
    pub fn align_code_page(&mut self) -> *const u8 {
        self.align_to(page_size())
    }

    fn align_to(&mut self, align: usize) -> *const u8 {
        let addr = self.get_code_ptr() as usize;
        let padding = align_up(addr, align) - addr;
        self.reserve(padding);
        for _ in 0..padding / 4 {
            self.write32(BRK_POISON);
        }
        self.get_code_ptr()
    }

    /// Make everything written since the last flush visible to instruction
    /// fetch.
    pub fn flush_icache(&mut self) {
        let start = self.base.wrapping_add(self.last_flush);
        let end = self.get_code_ptr();
        if end > start as *const u8 {
            flush_icache_range(start, end);
        }
        self.last_flush = self.offset;
    }

    /// Make `[start, end)` visible to instruction fetch.
    pub fn flush_icache_range(&self, start: *const u8, end: *const u8) {
        flush_icache_range(start, end);
    }
}

pub(crate) fn page_size() -> usize {
    unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

pub(crate) fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Invalidate the instruction cache for `[start, end)`.
/// Required on aarch64 after writing code and before executing it.
pub fn flush_icache_range(start: *const u8, end: *const u8) {
    log::trace!("icache flush {start:p}..{end:p}");
    if end <= start {
        return;
    }
    unsafe { clear_cache(start, end) };
}

// On macOS, use the sys_icache_invalidate function from libSystem.
#[cfg(all(target_arch = "aarch64", target_os = "macos"))]
unsafe fn clear_cache(start: *const u8, end: *const u8) {
    extern "C" {
        fn sys_icache_invalidate(start: *mut libc::c_void, size: usize);
    }
    unsafe { sys_icache_invalidate(start as *mut libc::c_void, end as usize - start as usize) };
}

// Elsewhere on aarch64: clean D-cache lines to the point of unification,
// then invalidate the matching I-cache lines. Line sizes come from CTR_EL0.
#[cfg(all(target_arch = "aarch64", not(target_os = "macos")))]
unsafe fn clear_cache(start: *const u8, end: *const u8) {
    use std::arch::asm;

    let ctr: u64;
    unsafe { asm!("mrs {}, ctr_el0", out(reg) ctr, options(nomem, nostack, preserves_flags)) };
    let icache_line = 4usize << (ctr & 0xF);
    let dcache_line = 4usize << ((ctr >> 16) & 0xF);
    let (start, end) = (start as usize, end as usize);

    let mut addr = start & !(dcache_line - 1);
    while addr < end {
        unsafe { asm!("dc cvau, {}", in(reg) addr, options(nostack, preserves_flags)) };
        addr += dcache_line;
    }
    unsafe { asm!("dsb ish", options(nostack, preserves_flags)) };

    addr = start & !(icache_line - 1);
    while addr < end {
        unsafe { asm!("ic ivau, {}", in(reg) addr, options(nostack, preserves_flags)) };
        addr += icache_line;
    }
    unsafe { asm!("dsb ish", "isb", options(nostack, preserves_flags)) };
}

// Coherent instruction fetch; nothing to do.
#[cfg(not(target_arch = "aarch64"))]
unsafe fn clear_cache(_start: *const u8, _end: *const u8) {}

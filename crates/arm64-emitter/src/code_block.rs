use std::ptr;

use crate::code_buffer::{align_up, flush_icache_range, page_size, CodeBuffer, BRK_POISON};
use crate::emit::Emitter;

/// Executable memory region owned by the emitter's caller.
///
/// Lifecycle:
/// 1. `new(size)` maps `size` bytes read+write (plus a guard page) and
///    fills them with `BRK #0`
/// 2. `emitter()` hands out an [`Emitter`] writing from the region start
/// 3. `finalize()` flips the region to read+execute and flushes the icache
/// 4. `reopen()` flips it back to read+write for patching
///
/// The region is unmapped on drop.
pub struct CodeBlock {
    base: *mut u8,
    /// Usable bytes, page aligned.
    size: usize,
    /// Total mapping, including the guard page.
    mapped: usize,
    poison: bool,
    executable: bool,
}

// The mapping is exclusively owned; nothing else aliases it.
unsafe impl Send for CodeBlock {}

/// Options for [`CodeBlock`]. Both `poison` and `guard_page` default to on.
#[derive(Debug, Clone)]
pub struct CodeBlockBuilder {
    size: usize,
    poison: bool,
    guard_page: bool,
}

impl CodeBlockBuilder {
    /// Fill the region with `BRK #0` on allocation and on `clear()`.
    pub fn poison(mut self, poison: bool) -> Self {
        self.poison = poison;
        self
    }

    /// Map an inaccessible page after the region to trap runaway writes.
    pub fn guard_page(mut self, guard_page: bool) -> Self {
        self.guard_page = guard_page;
        self
    }

    pub fn build(self) -> anyhow::Result<CodeBlock> {
        anyhow::ensure!(self.size > 0, "code block size must be non-zero");
        let page = page_size();
        let size = align_up(self.size, page);
        let mapped = if self.guard_page { size + page } else { size };

        let base = unsafe {
            libc::mmap(
                ptr::null_mut(),
                mapped,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        anyhow::ensure!(base != libc::MAP_FAILED, "code block mmap of {mapped} bytes failed");
        let base = base as *mut u8;

        if self.guard_page {
            let ret = unsafe { libc::mprotect(base.add(size) as *mut libc::c_void, page, libc::PROT_NONE) };
            if ret != 0 {
                unsafe { libc::munmap(base as *mut libc::c_void, mapped) };
                anyhow::bail!("code block guard page mprotect failed");
            }
        }

        let mut block = CodeBlock {
            base,
            size,
            mapped,
            poison: self.poison,
            executable: false,
        };
        if block.poison {
            block.fill_poison();
        }
        log::debug!("code block: mapped {size:#x} bytes at {base:p} (guard page: {})", self.guard_page);
        Ok(block)
    }
}

impl CodeBlock {
    /// Map a poisoned, guarded region of at least `size` bytes.
    pub fn new(size: usize) -> anyhow::Result<Self> {
        Self::builder(size).build()
    }

    pub fn builder(size: usize) -> CodeBlockBuilder {
        CodeBlockBuilder {
            size,
            poison: true,
            guard_page: true,
        }
    }

    pub fn base(&self) -> *const u8 {
        self.base
    }

    /// Usable size in bytes (the requested size rounded up to whole pages).
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_executable(&self) -> bool {
        self.executable
    }

    /// True if `ptr` points into the usable region.
    pub fn is_in_space(&self, ptr: *const u8) -> bool {
        let addr = ptr as usize;
        let base = self.base as usize;
        addr >= base && addr < base + self.size
    }

    /// Bytes left after `used` bytes have been emitted.
    pub fn space_left(&self, used: usize) -> usize {
        self.size.saturating_sub(used)
    }

    /// An emitter writing from the start of the region.
    ///
    /// Panics if the block is finalized.
    pub fn emitter(&mut self) -> Emitter<'_> {
        self.assert_writable("emitter");
        // The mutable borrow of `self` keeps the region unaliased for the
        // emitter's lifetime.
        let buf = unsafe { CodeBuffer::from_raw_parts(self.base, self.size) };
        Emitter::new(buf)
    }

    /// Reset the region to `BRK #0` (if poisoning is on).
    pub fn clear(&mut self) {
        self.assert_writable("clear");
        if self.poison {
            self.fill_poison();
        }
        log::debug!("code block: cleared {:p}", self.base);
    }

    /// Flip the region to read+execute and invalidate the instruction cache.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.executable, "code block is already finalized");
        self.protect(libc::PROT_READ | libc::PROT_EXEC)?;
        flush_icache_range(self.base, self.base.wrapping_add(self.size));
        self.executable = true;
        log::debug!("code block: {:p} is now executable", self.base);
        Ok(())
    }

    /// Flip a finalized region back to read+write.
    pub fn reopen(&mut self) -> anyhow::Result<()> {
        anyhow::ensure!(self.executable, "code block is not finalized");
        self.protect(libc::PROT_READ | libc::PROT_WRITE)?;
        self.executable = false;
        log::debug!("code block: {:p} reopened for writing", self.base);
        Ok(())
    }

    fn protect(&self, prot: libc::c_int) -> anyhow::Result<()> {
        let ret = unsafe { libc::mprotect(self.base as *mut libc::c_void, self.size, prot) };
        anyhow::ensure!(ret == 0, "code block mprotect({prot:#x}) failed");
        Ok(())
    }

    fn assert_writable(&self, op: &str) {
        assert!(!self.executable, "{op}: code block is finalized; reopen() it first");
    }

    fn fill_poison(&mut self) {
        let words = unsafe { std::slice::from_raw_parts_mut(self.base as *mut u32, self.size / 4) };
        words.fill(BRK_POISON.to_le());
    }
}

impl Drop for CodeBlock {
    fn drop(&mut self) {
        log::debug!("code block: unmapping {:p}", self.base);
        unsafe {
            libc::munmap(self.base as *mut libc::c_void, self.mapped);
        }
    }
}

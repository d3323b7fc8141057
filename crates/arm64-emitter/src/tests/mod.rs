#[cfg(all(target_arch = "aarch64", unix))]
mod execute;
mod float;

use crate::emit::Emitter;

/// Run `f` against a scratch emitter and return the words it wrote.
pub(crate) fn encode(f: impl FnOnce(&mut Emitter<'_>)) -> Vec<u32> {
    let mut words = [0u32; 64];
    let mut e = Emitter::from_words(&mut words);
    f(&mut e);
    e.code()
}

/// The single word `f` writes.
pub(crate) fn encode_one(f: impl FnOnce(&mut Emitter<'_>)) -> u32 {
    let code = encode(f);
    assert_eq!(code.len(), 1, "expected one word, got {code:08x?}");
    code[0]
}

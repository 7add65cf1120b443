//! Word packing and unpacking
//!
//! Payloads travel as whole machine words. Packing rounds the byte length
//! up to the next word and zero-fills the tail; unpacking copies back as many
//! bytes as the destination holds.

use l4_sys::{Limits, MsgRegs, WordCount, WORD_BYTES};

use crate::{Result, ShimError};

/// Copy `src` into the message registers
///
/// # Returns
/// Number of registers that carry the payload
///
/// # Errors
/// Returns `ShimError::Capacity` if `src` needs more words than
/// [`Limits::max_words`]. The registers are left untouched in that case.
pub fn pack(regs: &mut MsgRegs, src: &[u8]) -> Result<WordCount> {
    let limits = Limits::current();
    let words = WordCount::for_bytes(src.len())
        .filter(|words| words.get() <= limits.max_words)
        .ok_or(ShimError::Capacity {
            bytes: src.len(),
            words: src.len().div_ceil(WORD_BYTES),
            max_words: limits.max_words,
        })?;

    regs.words_mut(words).fill(0);
    regs.as_bytes_mut()[..src.len()].copy_from_slice(src);
    Ok(words)
}

/// Copy `words` registers into `dst`, truncating silently
///
/// Returns the number of bytes copied: `min(words * WORD_BYTES, dst.len())`.
pub fn unpack(regs: &MsgRegs, words: WordCount, dst: &mut [u8]) -> usize {
    let len = words.bytes().min(dst.len());
    dst[..len].copy_from_slice(&regs.as_bytes()[..len]);
    len
}

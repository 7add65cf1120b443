//! User-level thread control block (UTCB)
//!
//! The UTCB is the kernel-provided, thread-local page through which message
//! payloads travel. Only the parts an IPC marshaller needs are modelled:
//! the untyped message registers and the IPC error word.

use core::ops::{Deref, DerefMut};

use crate::{Word, UTCB_GENERIC_DATA_SIZE, WORD_BYTES};

/// Number of significant message registers, bounded by the UTCB size
///
/// Holding a `WordCount` proves the count fits into [`MsgRegs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct WordCount(usize);

impl WordCount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(UTCB_GENERIC_DATA_SIZE);

    /// Returns `None` if `words` exceeds the message register count
    pub const fn new(words: usize) -> Option<Self> {
        if words <= UTCB_GENERIC_DATA_SIZE {
            Some(Self(words))
        } else {
            None
        }
    }

    /// Clamp to the message register count
    pub const fn saturating(words: usize) -> Self {
        if words <= UTCB_GENERIC_DATA_SIZE {
            Self(words)
        } else {
            Self::MAX
        }
    }

    /// Words needed to carry `len` bytes, rounded up
    pub const fn for_bytes(len: usize) -> Option<Self> {
        Self::new(len.div_ceil(WORD_BYTES))
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn bytes(self) -> usize {
        self.0 * WORD_BYTES
    }
}

/// Untyped message registers
#[repr(C)]
#[derive(Clone)]
pub struct MsgRegs {
    pub mr: [Word; UTCB_GENERIC_DATA_SIZE],
}

impl MsgRegs {
    pub const fn new() -> Self {
        Self { mr: [0; UTCB_GENERIC_DATA_SIZE] }
    }

    /// Registers `0..words`
    pub fn words(&self, words: WordCount) -> &[Word] {
        &self.mr[..words.get()]
    }

    /// Registers `0..words`, mutable
    pub fn words_mut(&mut self, words: WordCount) -> &mut [Word] {
        &mut self.mr[..words.get()]
    }

    /// Registers viewed as bytes in native byte order
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `[Word; N]` has no padding and every byte pattern is a
        // valid `u8`; the slice borrows `self`.
        unsafe {
            core::slice::from_raw_parts(
                self.mr.as_ptr() as *const u8,
                UTCB_GENERIC_DATA_SIZE * WORD_BYTES,
            )
        }
    }

    /// Registers viewed as mutable bytes in native byte order
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above; every byte pattern is also a valid `Word`.
        unsafe {
            core::slice::from_raw_parts_mut(
                self.mr.as_mut_ptr() as *mut u8,
                UTCB_GENERIC_DATA_SIZE * WORD_BYTES,
            )
        }
    }
}

impl Default for MsgRegs {
    fn default() -> Self {
        Self::new()
    }
}

/// The slice of a thread's UTCB used for IPC
#[repr(C)]
#[derive(Clone, Default)]
pub struct Utcb {
    pub mr: MsgRegs,
    /// IPC error word, meaningful only after a tag with `ERROR` set
    pub error: Word,
}

impl Utcb {
    pub const fn new() -> Self {
        Self { mr: MsgRegs::new(), error: 0 }
    }
}

impl Deref for Utcb {
    type Target = MsgRegs;

    fn deref(&self) -> &MsgRegs {
        &self.mr
    }
}

impl DerefMut for Utcb {
    fn deref_mut(&mut self) -> &mut MsgRegs {
        &mut self.mr
    }
}

//! Message tags
//!
//! A message tag is a single machine word that travels with every IPC:
//!
//! ```text
//!  bits  16..     12..15   6..11        0..5
//!       +-------+--------+------------+-------+
//!       | label | flags  | typed items| words |
//!       +-------+--------+------------+-------+
//! ```

use bitflags::bitflags;

use crate::{Word, WordCount};

bitflags! {
    /// Flag nibble of a message tag
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MsgTagFlags: Word {
        /// Scheduling hint: donate the remaining time slice
        const SCHEDULE = 0x1000;
        /// Transfer FPU state along with the message
        const TRANSFER_FPU = 0x2000;
        /// Cross-CPU IPC (set by the kernel)
        const XCPU = 0x4000;
        /// IPC failed; details in the UTCB error word
        const ERROR = 0x8000;
    }
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsgTag(Word);

impl MsgTag {
    pub const WORDS_MASK: usize = 0x3f;
    const ITEMS_SHIFT: u32 = 6;
    const ITEMS_MASK: Word = 0x3f << Self::ITEMS_SHIFT;
    const FLAGS_MASK: Word = 0xf000;
    const LABEL_SHIFT: u32 = 16;

    /// Build a tag. The word count is already bounded by its type.
    pub fn new(label: Word, words: WordCount, items: usize, flags: MsgTagFlags) -> Self {
        Self(
            (label << Self::LABEL_SHIFT)
                | (flags.bits() & Self::FLAGS_MASK)
                | ((items << Self::ITEMS_SHIFT) & Self::ITEMS_MASK)
                | words.get(),
        )
    }

    /// Reinterpret a raw tag word (as handed back by the kernel)
    pub const fn from_raw(raw: Word) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> Word {
        self.0
    }

    pub const fn label(self) -> Word {
        self.0 >> Self::LABEL_SHIFT
    }

    /// Untyped word count as encoded in the tag
    ///
    /// The field is six bits wide, so a kernel can in principle report one
    /// more word than the UTCB holds. [`WordCount::saturating`] clamps that.
    pub const fn words(self) -> usize {
        self.0 & Self::WORDS_MASK
    }

    pub const fn items(self) -> usize {
        (self.0 & Self::ITEMS_MASK) >> Self::ITEMS_SHIFT
    }

    pub fn flags(self) -> MsgTagFlags {
        MsgTagFlags::from_bits_truncate(self.0 & Self::FLAGS_MASK)
    }

    pub fn has_error(self) -> bool {
        self.flags().contains(MsgTagFlags::ERROR)
    }

    /// Same tag with the error flag raised
    pub fn with_error(self) -> Self {
        Self(self.0 | MsgTagFlags::ERROR.bits())
    }
}

//! L4 Kernel ABI Vocabulary
//!
//! # Purpose
//! Names the pieces of the L4 IPC ABI that user-level marshalling code has
//! to speak: machine words, capability indices, message tags, the UTCB
//! message registers, IPC timeouts and IPC error codes.
//!
//! # Integration Points
//! - Provides to: `l49-shim` (marshalling), `l4-mock` (in-process kernel)
//! - The [`Transport`] trait is the seam between the two: the shim calls
//!   into it, a kernel backend implements it.
//!
//! # Layout
//! ```text
//! Utcb
//!  ├─ mr: MsgRegs      [Word; UTCB_GENERIC_DATA_SIZE]   (payload)
//!  └─ error: Word      IPC error word, valid when the tag has ERROR set
//! ```
//!
//! # Testing Strategy
//! - Compile time: ABI sizes and limits pinned with `static_assertions`
//! - Unit tests: tag packing, error decoding, word counts, capability bits

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod config;
mod error;
mod msgtag;
mod timeout;
mod transport;
mod utcb;

pub use config::Limits;
pub use error::IpcErrorCode;
pub use msgtag::{MsgTag, MsgTagFlags};
pub use timeout::{Timeout, TimeoutKind};
pub use transport::{ipc_error, Transport};
pub use utcb::{MsgRegs, Utcb, WordCount};

use static_assertions::{assert_eq_size, const_assert};

/// Machine word as seen by the kernel
pub type Word = usize;

/// Capability index into the task's capability space
pub type CapIdx = Word;

/// Bytes per machine word
pub const WORD_BYTES: usize = core::mem::size_of::<Word>();

/// Number of untyped message registers in the UTCB
pub const UTCB_GENERIC_DATA_SIZE: usize = 63;

/// Largest payload that fits into one message, in bytes
pub const MSG_MAX_BYTES: usize = UTCB_GENERIC_DATA_SIZE * WORD_BYTES;

/// Largest chunk a single vcon write accepts
pub const VCON_WRITE_SIZE: usize = (UTCB_GENERIC_DATA_SIZE - 2) * WORD_BYTES;

/// Capability indices are slot numbers shifted by this amount
pub const CAP_SHIFT: usize = 12;

/// Set in every invalid capability index
pub const INVALID_CAP_BIT: CapIdx = 1 << 11;

/// Canonical invalid capability index
pub const INVALID_CAP: CapIdx = !0 << (CAP_SHIFT - 1);

/// Log console every task receives from its parent
pub const BASE_LOG_CAP: CapIdx = 5 << CAP_SHIFT;

/// Check whether a capability index is invalid
#[inline]
pub const fn is_invalid_cap(cap: CapIdx) -> bool {
    cap & INVALID_CAP_BIT != 0
}

assert_eq_size!(MsgTag, Word);
const_assert!(VCON_WRITE_SIZE <= MSG_MAX_BYTES);
const_assert!(UTCB_GENERIC_DATA_SIZE <= MsgTag::WORDS_MASK);
const_assert!(!is_invalid_cap(BASE_LOG_CAP));

//! Kernel transport seam
//!
//! The IPC primitives a marshaller needs, expressed the way the kernel ABI
//! expresses them: every call takes the thread's UTCB, returns the result
//! tag, and reports failure through the tag's error flag plus the UTCB error
//! word (see [`ipc_error`]).

use crate::{CapIdx, IpcErrorCode, MsgTag, Timeout, Utcb, Word};

/// Blocking, capability-addressed IPC substrate
///
/// Implementations own the per-thread [`Utcb`]. Callers only reach it
/// through [`Transport::with_utcb`], which lends it for one closure, so a
/// reference to the message registers can never outlive the operation that
/// borrowed them.
pub trait Transport {
    /// Borrow the calling thread's UTCB for the duration of `f`
    fn with_utcb<R>(&self, f: impl FnOnce(&mut Utcb) -> R) -> R;

    /// Send `tag.words()` message registers to `dest`
    fn ipc_send(&self, dest: CapIdx, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> MsgTag;

    /// Receive from one specific partner
    fn ipc_receive(&self, src: CapIdx, utcb: &mut Utcb, timeout: Timeout) -> MsgTag;

    /// Open wait: receive from any gate bound to this thread
    ///
    /// Returns the result tag and the label of the gate the message came
    /// through.
    fn ipc_wait(&self, utcb: &mut Utcb, timeout: Timeout) -> (MsgTag, Word);

    /// Reply to the last caller, then open-wait for the next message
    fn ipc_reply_and_wait(&self, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> (MsgTag, Word);

    /// Send to `dest` and wait for its reply
    fn ipc_call(&self, dest: CapIdx, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> MsgTag;

    /// Look up a named capability in the task's environment
    ///
    /// Unknown names yield an index with [`crate::INVALID_CAP_BIT`] set.
    fn env_get_cap(&self, name: &str) -> CapIdx;

    /// Write raw bytes to a virtual console
    ///
    /// Writes longer than [`crate::VCON_WRITE_SIZE`] are rejected by the
    /// kernel, not truncated.
    fn vcon_send(&self, vcon: CapIdx, buf: &[u8]) -> MsgTag;
}

/// Decode the error of a completed IPC
///
/// `None` if `tag` reports success.
pub fn ipc_error(tag: MsgTag, utcb: &Utcb) -> Option<IpcErrorCode> {
    if tag.has_error() {
        Some(IpcErrorCode::from_word(utcb.error))
    } else {
        None
    }
}

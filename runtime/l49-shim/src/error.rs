use core::fmt;

use l4_sys::IpcErrorCode;
use thiserror::Error;

/// Status reported for a successful operation on a C-style status surface
pub const STATUS_OK: i32 = 0;

/// The single negative status every failure collapses to
pub const STATUS_ERROR: i32 = -1;

/// Which IPC primitive failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcOp {
    Send,
    Receive,
    Wait,
    Call,
}

impl fmt::Display for IpcOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "send",
            Self::Receive => "receive",
            Self::Wait => "wait",
            Self::Call => "call",
        })
    }
}

/// Error types for shim operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ShimError {
    /// Payload does not fit into the message registers; nothing was sent
    #[error("{bytes}-byte message needs {words} words, only {max_words} fit")]
    Capacity { bytes: usize, words: usize, max_words: usize },

    /// The kernel reported an IPC error
    #[error("IPC {op} failed: {code}")]
    Ipc { op: IpcOp, code: IpcErrorCode },
}

impl ShimError {
    /// Status code for callers bridging to a C-style surface
    ///
    /// The kernel error code is deliberately not propagated.
    pub fn status(&self) -> i32 {
        STATUS_ERROR
    }
}

pub type Result<T> = core::result::Result<T, ShimError>;

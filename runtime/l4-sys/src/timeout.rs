//! IPC timeouts
//!
//! Every IPC carries a send-phase and a receive-phase timeout. This layer
//! only ever needs two points on that scale: wait forever, or do not wait.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutKind {
    /// Block until the phase completes
    Never,
    /// Fail the phase immediately if it cannot complete
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    pub send: TimeoutKind,
    pub receive: TimeoutKind,
}

impl Timeout {
    /// Unbounded in both phases
    pub const NEVER: Self = Self { send: TimeoutKind::Never, receive: TimeoutKind::Never };

    /// Unbounded send phase, zero receive phase
    pub const RECV_ZERO: Self = Self { send: TimeoutKind::Never, receive: TimeoutKind::Zero };
}

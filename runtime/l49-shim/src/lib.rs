//! L49 Shim - Byte-buffer IPC over L4 message registers
//!
//! # Purpose
//! Lets a user-level task exchange bounded binary messages with other tasks
//! through synchronous, capability-addressed kernel IPC. Payloads are packed
//! into the UTCB message registers on the way out and unpacked from them on
//! the way back.
//!
//! # Integration Points
//! - Depends on: a [`Transport`] (the kernel's IPC primitives)
//! - Provides to: any component that wants to talk to an IPC gate with
//!   plain byte slices
//! - Capabilities required: the target gates (resolved by name) and the
//!   log console at [`l4_sys::BASE_LOG_CAP`]
//!
//! # Architecture
//! ```text
//! Shim::call(gate, req, rep)
//!   └─> Transport::with_utcb          [borrow this thread's UTCB]
//!        ├─> words::pack(req)         [bytes -> message registers]
//!        ├─> Transport::ipc_call      [kernel: send, wait for reply]
//!        └─> words::unpack(rep)       [message registers -> bytes]
//! ```
//!
//! Every operation is synchronous and stateless. Nothing is cached between
//! calls, and the UTCB is never held past the operation that borrowed it.
//!
//! # Usage
//! ```no_run
//! # fn demo<T: l49_shim::Transport>(transport: T) -> l49_shim::Result<()> {
//! use l49_shim::Shim;
//!
//! let shim = Shim::new(transport);
//! if let Some(cons) = shim.get_cap("p9cons") {
//!     let mut reply = [0u8; 16];
//!     let got = shim.call(cons, b"ping", &mut reply)?;
//!     shim.puts(core::str::from_utf8(&reply[..got.len]).unwrap_or("?"));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Testing Strategy
//! - Unit tests: packing bounds, error mapping, each reply outcome against a
//!   scripted transport
//! - Integration tests: client and server threads over `l4-mock`
//! - Benchmarks: `pack`/`unpack` throughput (criterion)

#![no_std]

#[cfg(test)]
#[macro_use]
extern crate std;

mod cap;
pub mod console;
mod error;
mod ipc;
pub mod words;

pub use cap::{CapHandle, Source};
pub use console::ConsoleLogger;
pub use error::{IpcOp, Result, ShimError, STATUS_ERROR, STATUS_OK};
pub use ipc::{Delivery, NextMessage, Received, ReplyOutcome};

pub use l4_sys as sys;
pub use l4_sys::Transport;

#[cfg(feature = "mock")]
pub use l4_mock as mock;

/// Entry point for all shim operations
///
/// Wraps the transport of the calling thread. The shim itself holds no
/// state, so it is `Sync` whenever the transport is.
pub struct Shim<T> {
    transport: T,
}

impl<T> Shim<T> {
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bounds every operation of this shim enforces
    pub const fn limits(&self) -> sys::Limits {
        sys::Limits::current()
    }

    pub fn into_inner(self) -> T {
        self.transport
    }
}

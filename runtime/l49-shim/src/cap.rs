//! Capability handles and name resolution

use core::fmt;
use core::num::NonZeroUsize;

use l4_sys::{is_invalid_cap, CapIdx, Transport};

use crate::Shim;

/// A valid capability index naming an IPC gate or other kernel object
///
/// Construction rejects zero and every index with the invalid bit set, so a
/// `CapHandle` can be handed to the kernel without further checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapHandle(NonZeroUsize);

impl CapHandle {
    pub fn new(raw: CapIdx) -> Option<Self> {
        if is_invalid_cap(raw) {
            return None;
        }
        NonZeroUsize::new(raw).map(Self)
    }

    pub fn raw(self) -> CapIdx {
        self.0.get()
    }
}

impl fmt::Display for CapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cap:{:#x}", self.raw())
    }
}

/// Where a receive takes its message from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Any gate bound to the calling thread (open wait)
    Any,
    /// One specific partner
    Gate(CapHandle),
}

impl From<CapHandle> for Source {
    fn from(cap: CapHandle) -> Self {
        Self::Gate(cap)
    }
}

/// An absent handle means "receive from anyone"
impl From<Option<CapHandle>> for Source {
    fn from(cap: Option<CapHandle>) -> Self {
        cap.map_or(Self::Any, Self::Gate)
    }
}

impl<T: Transport> Shim<T> {
    /// Look up a named capability in the task's environment
    ///
    /// Returns `None` for an empty name, an unknown name, or a name bound
    /// to an invalid capability. Nothing is cached.
    pub fn get_cap(&self, name: &str) -> Option<CapHandle> {
        if name.is_empty() {
            return None;
        }

        let cap = CapHandle::new(self.transport.env_get_cap(name));
        if cap.is_none() {
            log::debug!("capability {:?} not available", name);
        }
        cap
    }
}

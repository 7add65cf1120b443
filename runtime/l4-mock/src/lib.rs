//! ⚠️  MOCK L4 kernel for host development and tests
//!
//! # WARNING: This is NOT a real kernel!
//!
//! An in-process stand-in for the L4 IPC substrate so that marshalling code
//! can be exercised on a development host, with client and server running
//! on ordinary OS threads.
//!
//! ## What is modelled
//!
//! - IPC gates: zero-capacity `crossbeam` channels, so a send rendezvouses
//!   with a receiver exactly like a synchronous kernel IPC
//! - One UTCB per OS thread (`thread_local!`)
//! - The implicit reply capability a call leaves on the receiving thread
//! - The named capability environment a task inherits from its parent
//! - The log console at [`BASE_LOG_CAP`], captured line by line
//!
//! ## Current Limitations
//!
//! - No typed items, mappings or capability transfer
//! - Timeouts are either unbounded or zero
//! - A targeted receive names a gate, not a sender thread
//!
//! ## Usage
//!
//! ```no_run
//! use l4_mock::MockKernel;
//!
//! let kernel = MockKernel::new();
//! let gate = kernel.create_gate("echo", 0x10);
//! let server = kernel.thread();
//! server.bind(gate).unwrap();
//! ```

mod thread;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam::channel::{bounded, Receiver, Sender};
use l4_sys::{CapIdx, MsgTag, Word, BASE_LOG_CAP, CAP_SHIFT, INVALID_CAP};
use thiserror::Error;

pub use thread::MockThread;

/// Mock kernel errors (setup only; IPC failures travel in message tags)
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MockError {
    #[error("capability {0:#x} is not an IPC gate")]
    NotAGate(CapIdx),
}

pub type Result<T> = core::result::Result<T, MockError>;

/// First capability slot handed out by [`MockKernel::create_gate`]
const FIRST_FREE_SLOT: usize = 0x10;

/// A message in flight between two threads
pub(crate) struct Envelope {
    pub(crate) tag: MsgTag,
    pub(crate) payload: Vec<Word>,
    /// Reply capability installed on the receiver (calls only)
    pub(crate) reply_to: Option<Sender<Envelope>>,
}

#[derive(Clone)]
pub(crate) struct Gate {
    pub(crate) tx: Sender<Envelope>,
    pub(crate) rx: Receiver<Envelope>,
    pub(crate) label: Word,
}

#[derive(Clone)]
pub(crate) enum Object {
    Gate(Gate),
    Vcon,
}

pub(crate) struct Inner {
    objects: Mutex<HashMap<CapIdx, Object>>,
    env: Mutex<HashMap<String, CapIdx>>,
    next_slot: AtomicUsize,
    console: Mutex<Vec<Vec<u8>>>,
    ipc_count: AtomicUsize,
}

// A panicking test thread must not wedge the rest of the kernel.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Inner {
    pub(crate) fn object(&self, cap: CapIdx) -> Option<Object> {
        lock(&self.objects).get(&cap).cloned()
    }

    pub(crate) fn gate(&self, cap: CapIdx) -> Option<Gate> {
        match self.object(cap) {
            Some(Object::Gate(gate)) => Some(gate),
            _ => None,
        }
    }

    pub(crate) fn lookup(&self, name: &str) -> CapIdx {
        lock(&self.env).get(name).copied().unwrap_or(INVALID_CAP)
    }

    pub(crate) fn count_ipc(&self) {
        self.ipc_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn console_write(&self, bytes: &[u8]) {
        log::trace!("vcon: {}", String::from_utf8_lossy(bytes));
        lock(&self.console).push(bytes.to_vec());
    }
}

/// Shared mock kernel state
///
/// Cheap to clone; all clones see the same capability space.
#[derive(Clone)]
pub struct MockKernel {
    inner: Arc<Inner>,
}

impl MockKernel {
    /// Create a kernel whose capability space holds only the log console
    pub fn new() -> Self {
        let mut objects = HashMap::new();
        objects.insert(BASE_LOG_CAP, Object::Vcon);

        Self {
            inner: Arc::new(Inner {
                objects: Mutex::new(objects),
                env: Mutex::new(HashMap::new()),
                next_slot: AtomicUsize::new(FIRST_FREE_SLOT),
                console: Mutex::new(Vec::new()),
                ipc_count: AtomicUsize::new(0),
            }),
        }
    }

    /// Create an IPC gate and publish it in the environment under `name`
    ///
    /// `label` is what an open wait reports for messages arriving through
    /// this gate. An empty `name` leaves the gate unpublished.
    pub fn create_gate(&self, name: &str, label: Word) -> CapIdx {
        let slot = self.inner.next_slot.fetch_add(1, Ordering::Relaxed);
        let cap = slot << CAP_SHIFT;
        let (tx, rx) = bounded(0);

        lock(&self.inner.objects).insert(cap, Object::Gate(Gate { tx, rx, label }));
        if !name.is_empty() {
            self.register(name, cap);
        }

        log::trace!("created gate {:#x} ({:?}, label {:#x})", cap, name, label);
        cap
    }

    /// Publish an arbitrary capability index under `name`
    pub fn register(&self, name: &str, cap: CapIdx) {
        lock(&self.inner.env).insert(name.to_owned(), cap);
    }

    /// Environment lookup as the task would see it
    pub fn lookup(&self, name: &str) -> CapIdx {
        self.inner.lookup(name)
    }

    /// A transport endpoint for one thread of the task
    pub fn thread(&self) -> MockThread {
        MockThread::new(Arc::clone(&self.inner))
    }

    /// Everything written to the log console, one entry per write
    pub fn console_lines(&self) -> Vec<Vec<u8>> {
        lock(&self.inner.console).clone()
    }

    /// Number of IPC system calls issued so far (console writes excluded)
    pub fn ipc_count(&self) -> usize {
        self.inner.ipc_count.load(Ordering::Relaxed)
    }
}

impl Default for MockKernel {
    fn default() -> Self {
        Self::new()
    }
}

//! Per-thread transport endpoint

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use crossbeam::channel::{bounded, Receiver, Select, Sender, TryRecvError, TrySendError};
use l4_sys::{
    CapIdx, IpcErrorCode, MsgTag, MsgTagFlags, Timeout, TimeoutKind, Transport, Utcb, Word,
    WordCount, VCON_WRITE_SIZE,
};

use crate::{lock, Envelope, Inner, MockError, Object, Result};

thread_local! {
    static UTCB: RefCell<Utcb> = const { RefCell::new(Utcb::new()) };
}

/// Transport endpoint for one thread
///
/// The UTCB belongs to the OS thread, as on a real kernel; what a
/// `MockThread` adds is the set of gates its open waits listen on and the
/// reply capability left behind by the last call it received.
pub struct MockThread {
    kernel: Arc<Inner>,
    bound: Mutex<Vec<(Word, Receiver<Envelope>)>>,
    partner: Mutex<Option<Sender<Envelope>>>,
}

/// Fail an IPC with `code`
fn fail(utcb: &mut Utcb, code: IpcErrorCode) -> MsgTag {
    utcb.error = code.to_word();
    MsgTag::from_raw(0).with_error()
}

fn success() -> MsgTag {
    MsgTag::new(0, WordCount::ZERO, 0, MsgTagFlags::empty())
}

/// Snapshot the significant message registers
fn envelope(utcb: &Utcb, tag: MsgTag, reply_to: Option<Sender<Envelope>>) -> Envelope {
    let words = WordCount::saturating(tag.words());
    Envelope {
        tag: MsgTag::new(tag.label(), words, 0, MsgTagFlags::empty()),
        payload: utcb.words(words).to_vec(),
        reply_to,
    }
}

impl MockThread {
    pub(crate) fn new(kernel: Arc<Inner>) -> Self {
        Self {
            kernel,
            bound: Mutex::new(Vec::new()),
            partner: Mutex::new(None),
        }
    }

    /// Make `gate` visible to this thread's open waits
    pub fn bind(&self, gate: CapIdx) -> Result<()> {
        let gate_obj = self.kernel.gate(gate).ok_or(MockError::NotAGate(gate))?;
        lock(&self.bound).push((gate_obj.label, gate_obj.rx));
        Ok(())
    }

    /// Whether a reply capability is pending on this thread
    pub fn has_partner(&self) -> bool {
        lock(&self.partner).is_some()
    }

    /// Copy a delivered message into the UTCB and take over its reply cap
    fn deliver(&self, utcb: &mut Utcb, env: Envelope) -> MsgTag {
        let words = WordCount::saturating(env.payload.len());
        utcb.words_mut(words).copy_from_slice(&env.payload[..words.get()]);
        if env.reply_to.is_some() {
            *lock(&self.partner) = env.reply_to;
        }
        env.tag
    }

    fn open_wait(&self, utcb: &mut Utcb, timeout: Timeout) -> (MsgTag, Word) {
        let bound = lock(&self.bound).clone();
        if bound.is_empty() {
            log::trace!("open wait with no bound gates");
            let code = match timeout.receive {
                TimeoutKind::Zero => IpcErrorCode::ReceiveTimeout,
                TimeoutKind::Never => IpcErrorCode::ReceiveCanceled,
            };
            return (fail(utcb, code), 0);
        }

        let mut select = Select::new();
        for (_, rx) in &bound {
            select.recv(rx);
        }

        let op = match timeout.receive {
            TimeoutKind::Never => select.select(),
            TimeoutKind::Zero => match select.try_select() {
                Ok(op) => op,
                Err(_) => return (fail(utcb, IpcErrorCode::ReceiveTimeout), 0),
            },
        };

        let (label, rx) = &bound[op.index()];
        match op.recv(rx) {
            Ok(env) => {
                log::trace!("open wait: {} words via label {:#x}", env.payload.len(), label);
                (self.deliver(utcb, env), *label)
            }
            Err(_) => (fail(utcb, IpcErrorCode::ReceiveAborted), 0),
        }
    }
}

impl Transport for MockThread {
    fn with_utcb<R>(&self, f: impl FnOnce(&mut Utcb) -> R) -> R {
        UTCB.with(|utcb| f(&mut *utcb.borrow_mut()))
    }

    fn ipc_send(&self, dest: CapIdx, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> MsgTag {
        self.kernel.count_ipc();
        let Some(gate) = self.kernel.gate(dest) else {
            return fail(utcb, IpcErrorCode::NotExistent);
        };

        let env = envelope(utcb, tag, None);
        log::trace!("send {} words to {:#x}", env.payload.len(), dest);
        match timeout.send {
            TimeoutKind::Never => match gate.tx.send(env) {
                Ok(()) => success(),
                Err(_) => fail(utcb, IpcErrorCode::SendAborted),
            },
            TimeoutKind::Zero => match gate.tx.try_send(env) {
                Ok(()) => success(),
                Err(TrySendError::Full(_)) => fail(utcb, IpcErrorCode::SendTimeout),
                Err(TrySendError::Disconnected(_)) => fail(utcb, IpcErrorCode::SendAborted),
            },
        }
    }

    fn ipc_receive(&self, src: CapIdx, utcb: &mut Utcb, timeout: Timeout) -> MsgTag {
        self.kernel.count_ipc();
        let Some(gate) = self.kernel.gate(src) else {
            return fail(utcb, IpcErrorCode::NotExistent);
        };

        let received = match timeout.receive {
            TimeoutKind::Never => gate.rx.recv().map_err(|_| IpcErrorCode::ReceiveAborted),
            TimeoutKind::Zero => gate.rx.try_recv().map_err(|err| match err {
                TryRecvError::Empty => IpcErrorCode::ReceiveTimeout,
                TryRecvError::Disconnected => IpcErrorCode::ReceiveAborted,
            }),
        };

        match received {
            Ok(env) => self.deliver(utcb, env),
            Err(code) => fail(utcb, code),
        }
    }

    fn ipc_wait(&self, utcb: &mut Utcb, timeout: Timeout) -> (MsgTag, Word) {
        self.kernel.count_ipc();
        self.open_wait(utcb, timeout)
    }

    fn ipc_reply_and_wait(&self, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> (MsgTag, Word) {
        self.kernel.count_ipc();
        let Some(partner) = lock(&self.partner).take() else {
            return (fail(utcb, IpcErrorCode::NotExistent), 0);
        };

        let env = envelope(utcb, tag, None);
        log::trace!("reply {} words", env.payload.len());
        // The reply channel has room for exactly one message; it is only
        // gone if the caller stopped waiting.
        if partner.try_send(env).is_err() {
            return (fail(utcb, IpcErrorCode::NotExistent), 0);
        }

        self.open_wait(utcb, timeout)
    }

    fn ipc_call(&self, dest: CapIdx, utcb: &mut Utcb, tag: MsgTag, timeout: Timeout) -> MsgTag {
        self.kernel.count_ipc();
        let Some(gate) = self.kernel.gate(dest) else {
            return fail(utcb, IpcErrorCode::NotExistent);
        };

        let (reply_tx, reply_rx) = bounded(1);
        let env = envelope(utcb, tag, Some(reply_tx));
        log::trace!("call {:#x} with {} words", dest, env.payload.len());

        let sent = match timeout.send {
            TimeoutKind::Never => gate.tx.send(env).map_err(|_| IpcErrorCode::SendAborted),
            TimeoutKind::Zero => gate.tx.try_send(env).map_err(|err| match err {
                TrySendError::Full(_) => IpcErrorCode::SendTimeout,
                TrySendError::Disconnected(_) => IpcErrorCode::SendAborted,
            }),
        };
        if let Err(code) = sent {
            return fail(utcb, code);
        }

        let reply = match timeout.receive {
            TimeoutKind::Never => reply_rx.recv().map_err(|_| IpcErrorCode::ReceiveCanceled),
            TimeoutKind::Zero => reply_rx.try_recv().map_err(|err| match err {
                TryRecvError::Empty => IpcErrorCode::ReceiveTimeout,
                TryRecvError::Disconnected => IpcErrorCode::ReceiveCanceled,
            }),
        };

        match reply {
            Ok(env) => self.deliver(utcb, env),
            Err(code) => fail(utcb, code),
        }
    }

    fn env_get_cap(&self, name: &str) -> CapIdx {
        self.kernel.lookup(name)
    }

    fn vcon_send(&self, vcon: CapIdx, buf: &[u8]) -> MsgTag {
        let code = match self.kernel.object(vcon) {
            Some(Object::Vcon) if buf.len() <= VCON_WRITE_SIZE => {
                self.kernel.console_write(buf);
                return success();
            }
            Some(Object::Vcon) => IpcErrorCode::SendMsgCut,
            _ => IpcErrorCode::NotExistent,
        };

        // The console may be written from inside another thread-local UTCB
        // borrow (a logger firing mid-operation); only record the error word
        // when the UTCB is free.
        UTCB.with(|utcb| {
            if let Ok(mut utcb) = utcb.try_borrow_mut() {
                utcb.error = code.to_word();
            }
        });
        MsgTag::from_raw(0).with_error()
    }
}

//! The four IPC operations
//!
//! Each operation borrows the thread's UTCB for exactly one kernel call:
//! pack, invoke, check the result tag, unpack. A payload that does not fit
//! is rejected before the kernel is entered.

use l4_sys::{
    ipc_error, IpcErrorCode, MsgRegs, MsgTag, MsgTagFlags, Timeout, Transport, Utcb, Word,
    WordCount,
};

use crate::{words, CapHandle, IpcOp, Result, Shim, ShimError, Source};

/// A message copied out of the message registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Received {
    /// Bytes written to the destination
    pub len: usize,
    /// Bytes the sender's tag declared (whole words)
    pub declared: usize,
    /// Label of the gate an open wait received through; zero otherwise
    pub label: Word,
}

impl Received {
    /// The destination was too small for the whole message
    pub fn is_truncated(&self) -> bool {
        self.declared > self.len
    }
}

/// Fate of the reply phase of a reply-and-wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Failed(IpcErrorCode),
}

/// Fate of the zero-timeout wait that follows a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextMessage {
    /// The reply failed, so no wait took place
    NotAttempted,
    /// Nothing was pending
    Empty,
    /// A message was already waiting and has been unpacked
    Arrived(Received),
    /// The wait failed for a reason other than the timeout
    Failed(IpcErrorCode),
}

/// Both outcomes of a reply-and-wait, reported separately
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyOutcome {
    pub delivery: Delivery,
    pub next: NextMessage,
}

impl ReplyOutcome {
    pub fn is_delivered(&self) -> bool {
        self.delivery == Delivery::Delivered
    }
}

fn data_tag(words: WordCount) -> MsgTag {
    MsgTag::new(0, words, 0, MsgTagFlags::empty())
}

fn check(op: IpcOp, tag: MsgTag, utcb: &Utcb) -> Result<MsgTag> {
    match ipc_error(tag, utcb) {
        Some(code) => Err(ShimError::Ipc { op, code }),
        None => Ok(tag),
    }
}

fn unpack_received(regs: &MsgRegs, tag: MsgTag, label: Word, dst: &mut [u8]) -> Received {
    let words = WordCount::saturating(tag.words());
    Received {
        len: words::unpack(regs, words, dst),
        declared: words.bytes(),
        label,
    }
}

fn trace_result<R>(what: &str, result: Result<R>) -> Result<R> {
    if let Err(err) = &result {
        log::debug!("{}: {}", what, err);
    }
    result
}

fn trace_received(what: &str, result: Result<Received>) -> Result<Received> {
    if let Ok(received) = &result {
        if received.is_truncated() {
            log::debug!(
                "{}: message of {} bytes truncated to {}",
                what,
                received.declared,
                received.len
            );
        }
    }
    trace_result(what, result)
}

impl<T: Transport> Shim<T> {
    /// Send `msg` to `dest`, blocking until the kernel has delivered it
    ///
    /// # Errors
    /// - `ShimError::Capacity` if `msg` does not fit; the kernel is not
    ///   entered
    /// - `ShimError::Ipc` if the kernel reports an error
    pub fn send(&self, dest: CapHandle, msg: &[u8]) -> Result<()> {
        log::trace!("send {} bytes to {}", msg.len(), dest);
        let result = self.transport.with_utcb(|utcb| {
            let words = words::pack(&mut utcb.mr, msg)?;
            let tag = self.transport.ipc_send(dest.raw(), utcb, data_tag(words), Timeout::NEVER);
            check(IpcOp::Send, tag, utcb).map(|_| ())
        });
        trace_result("send", result)
    }

    /// Block until a message arrives and copy it into `dst`
    ///
    /// `Source::Any` (or `None`) takes a message from any gate bound to this
    /// thread; a handle restricts the receive to that partner. A message
    /// larger than `dst` is truncated without error; see
    /// [`Received::is_truncated`].
    pub fn recv(&self, src: impl Into<Source>, dst: &mut [u8]) -> Result<Received> {
        let src = src.into();
        log::trace!("receive from {:?} into {} bytes", src, dst.len());
        let result = self.transport.with_utcb(|utcb| {
            let (op, tag, label) = match src {
                Source::Gate(cap) => {
                    let tag = self.transport.ipc_receive(cap.raw(), utcb, Timeout::NEVER);
                    (IpcOp::Receive, tag, 0)
                }
                Source::Any => {
                    let (tag, label) = self.transport.ipc_wait(utcb, Timeout::NEVER);
                    (IpcOp::Wait, tag, label)
                }
            };
            let tag = check(op, tag, utcb)?;
            Ok(unpack_received(&utcb.mr, tag, label, dst))
        });
        trace_received("receive", result)
    }

    /// Reply to the last caller without picking up a follow-up message
    ///
    /// Equivalent to [`Shim::reply_and_wait`] with an empty destination. A
    /// message that was already pending is still taken off the gate; only
    /// its size survives, in `NextMessage::Arrived`.
    pub fn reply(&self, msg: &[u8]) -> Result<ReplyOutcome> {
        self.reply_and_wait(msg, &mut [])
    }

    /// Reply to the last caller, then look for a next message without waiting
    ///
    /// The reply phase is unbounded; the wait phase has a zero timeout. An
    /// empty wait is not a failure: once the payload has been packed this
    /// returns `Ok`, with the fate of each phase in the [`ReplyOutcome`].
    ///
    /// # Errors
    /// Only `ShimError::Capacity`, in which case no reply is attempted.
    pub fn reply_and_wait(&self, msg: &[u8], dst: &mut [u8]) -> Result<ReplyOutcome> {
        log::trace!("reply {} bytes", msg.len());
        let result = self.transport.with_utcb(|utcb| {
            let words = words::pack(&mut utcb.mr, msg)?;
            let (tag, label) =
                self.transport.ipc_reply_and_wait(utcb, data_tag(words), Timeout::RECV_ZERO);

            let outcome = match ipc_error(tag, utcb) {
                None => ReplyOutcome {
                    delivery: Delivery::Delivered,
                    next: NextMessage::Arrived(unpack_received(&utcb.mr, tag, label, dst)),
                },
                Some(IpcErrorCode::ReceiveTimeout) => ReplyOutcome {
                    delivery: Delivery::Delivered,
                    next: NextMessage::Empty,
                },
                Some(code) if code.is_receive_phase() => ReplyOutcome {
                    delivery: Delivery::Delivered,
                    next: NextMessage::Failed(code),
                },
                Some(code) => ReplyOutcome {
                    delivery: Delivery::Failed(code),
                    next: NextMessage::NotAttempted,
                },
            };
            Ok(outcome)
        });

        if let Ok(ReplyOutcome { delivery: Delivery::Failed(code), .. }) = &result {
            log::debug!("reply not delivered: {}", code);
        }
        trace_result("reply", result)
    }

    /// Send `req` to `dest` and block until the reply is copied into `dst`
    ///
    /// Truncation follows the same rule as [`Shim::recv`].
    pub fn call(&self, dest: CapHandle, req: &[u8], dst: &mut [u8]) -> Result<Received> {
        log::trace!("call {} with {} bytes", dest, req.len());
        let result = self.transport.with_utcb(|utcb| {
            let words = words::pack(&mut utcb.mr, req)?;
            let tag = self.transport.ipc_call(dest.raw(), utcb, data_tag(words), Timeout::NEVER);
            let tag = check(IpcOp::Call, tag, utcb)?;
            Ok(unpack_received(&utcb.mr, tag, 0, dst))
        });
        trace_received("call", result)
    }
}

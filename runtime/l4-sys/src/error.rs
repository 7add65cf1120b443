//! IPC error codes
//!
//! When an IPC fails the kernel raises `MsgTagFlags::ERROR` in the returned
//! tag and leaves a code in the UTCB error word. Bit 0 of the code tells
//! which phase failed: clear for the send phase, set for the receive phase.

use thiserror::Error;

use crate::Word;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IpcErrorCode {
    #[error("send timeout")]
    SendTimeout,

    #[error("receive timeout")]
    ReceiveTimeout,

    #[error("IPC partner does not exist")]
    NotExistent,

    #[error("send canceled")]
    SendCanceled,

    #[error("receive canceled")]
    ReceiveCanceled,

    #[error("send message cut")]
    SendMsgCut,

    #[error("receive message cut")]
    ReceiveMsgCut,

    #[error("send page-fault timeout")]
    SendPageFaultTimeout,

    #[error("receive page-fault timeout")]
    ReceivePageFaultTimeout,

    #[error("send aborted")]
    SendAborted,

    #[error("receive aborted")]
    ReceiveAborted,

    #[error("send map failed")]
    SendMapFailed,

    #[error("receive map failed")]
    ReceiveMapFailed,

    #[error("unknown IPC error {0:#x}")]
    Unknown(Word),
}

impl IpcErrorCode {
    /// Mask applied to the UTCB error word
    pub const MASK: Word = 0x1f;

    /// Decode the UTCB error word
    pub fn from_word(word: Word) -> Self {
        match word & Self::MASK {
            0x02 => Self::SendTimeout,
            0x03 => Self::ReceiveTimeout,
            0x04 => Self::NotExistent,
            0x06 => Self::SendCanceled,
            0x07 => Self::ReceiveCanceled,
            0x08 => Self::SendMsgCut,
            0x09 => Self::ReceiveMsgCut,
            0x0a => Self::SendPageFaultTimeout,
            0x0b => Self::ReceivePageFaultTimeout,
            0x0e => Self::SendAborted,
            0x0f => Self::ReceiveAborted,
            0x10 => Self::SendMapFailed,
            0x11 => Self::ReceiveMapFailed,
            other => Self::Unknown(other),
        }
    }

    /// Encode as a UTCB error word
    pub fn to_word(self) -> Word {
        match self {
            Self::SendTimeout => 0x02,
            Self::ReceiveTimeout => 0x03,
            Self::NotExistent => 0x04,
            Self::SendCanceled => 0x06,
            Self::ReceiveCanceled => 0x07,
            Self::SendMsgCut => 0x08,
            Self::ReceiveMsgCut => 0x09,
            Self::SendPageFaultTimeout => 0x0a,
            Self::ReceivePageFaultTimeout => 0x0b,
            Self::SendAborted => 0x0e,
            Self::ReceiveAborted => 0x0f,
            Self::SendMapFailed => 0x10,
            Self::ReceiveMapFailed => 0x11,
            Self::Unknown(word) => word & Self::MASK,
        }
    }

    /// The failure happened while receiving, after any send phase completed
    pub fn is_receive_phase(self) -> bool {
        self.to_word() & 1 != 0
    }
}

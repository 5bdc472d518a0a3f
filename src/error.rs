//! definition of the general mechatrolink error type

use std::sync::Arc;
use core::fmt;
use thiserror::Error;
use crate::{
    data::PackingError,
    registers::ModeStatus,
    };

/**
    general object reporting an unexpected result regarding register communication with a mechatrolink instance

    Its variants are meant to help finding the cause responsible for the problem and how to deal with it. None of them is retried automatically, the caller is expected to report it and continue with the next cycle.

    Each variant has a negative result code given by [Self::code], matching the codes reported by the firmware-era drivers.
*/
#[derive(Clone, Debug, Error)]
pub enum LinkError {
    /// no instance matches the requested name
    #[error("no mechatrolink instance with this name")]
    NotFound,
    /// allocating the instance table failed during setup
    #[error("out of memory for the instance table")]
    MemoryExhausted,
    /// error caused by the register bus
    ///
    /// these errors are exterior to this library
    #[error("register bus failure: {0}")]
    RegisterIo(Arc<std::io::Error>),
    /// the send count FIFO overflowed
    #[error("send count FIFO error")]
    TxSendCountFifo,
    /// receive count FIFO error reported by the hardware
    ///
    /// reserved: it is not detected yet
    #[error("receive count FIFO error")]
    RxFifo,
    /// a received packet declares no byte, this is a hardware fault rather than an empty message
    #[error("received packet has zero bytes")]
    RxPacketSizeZero,
    /// the received data does not fit in the receive buffer provided
    #[error("received bytes are more than the receive buffer capacity")]
    RxArraySize,
    /// bytes left after the full words are not between 0 and 3
    #[error("error in buffer parsing: {0}")]
    BufferParsing(&'static str),
    /// the caller provided a value the hardware cannot represent
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// the write queue already holds as many messages as it can
    #[error("write queue is full")]
    QueueFull,
    /// the module descriptor found during discovery does not match a mechatrolink module
    #[error("inconsistent module descriptor: {0}")]
    Inconsistent(&'static str),
}

/// convenient alias to simplify return annotations
pub type LinkResult<T=()> = core::result::Result<T, LinkError>;

const EINVAL: i32 = 22;
const ENOMEM: i32 = 12;
const ENOSPC: i32 = 28;

impl LinkError {
    /// negative result code of this error
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => -EINVAL,
            Self::MemoryExhausted => -ENOMEM,
            Self::RegisterIo(_) => -1,
            Self::TxSendCountFifo => -214,
            Self::RxFifo => -114,
            Self::RxPacketSizeZero => -1120,
            Self::RxArraySize => -1140,
            Self::BufferParsing(_) => -EINVAL,
            Self::InvalidArgument(_) => -EINVAL,
            Self::QueueFull => -ENOSPC,
            Self::Inconsistent(_) => -EINVAL,
        }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(src: std::io::Error) -> Self {
        LinkError::RegisterIo(Arc::new(src))
    }
}

impl From<PackingError> for LinkError {
    fn from(src: PackingError) -> Self {
        LinkError::BufferParsing(match src {
            PackingError::BadSize(_, text) => text,
        })
    }
}


/**
    error interrupting a transfer of several messages, with the progress made before the error

    `done` is what completed before the error, so the caller can reconcile its own state even on failure
*/
#[derive(Clone, Debug, Error)]
#[error("{error} (interrupted after {done:?})")]
pub struct Interrupted<T: fmt::Debug> {
    /// progress accomplished before the error
    pub done: T,
    #[source]
    pub error: LinkError,
}
impl<T: fmt::Debug> Interrupted<T> {
    pub fn new(done: T, error: LinkError) -> Self {
        Self {done, error}
    }
    /// negative result code of the underlying error
    pub fn code(&self) -> i32  {self.error.code()}
}
impl<T: fmt::Debug> From<Interrupted<T>> for LinkError {
    fn from(src: Interrupted<T>) -> Self  {src.error}
}


/// classify the error bits of the mode register, `None` means no error is reported
pub fn classify_mode(status: ModeStatus) -> Option<LinkError> {
    // TODO: report LinkError::RxFifo once the receive count FIFO error bit is confirmed in the firmware register map
    if status.send_count_fifo_error()
        {Some(LinkError::TxSendCountFifo)}
    else
        {None}
}

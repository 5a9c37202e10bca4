//! Error types for the Modbus optimization and framing core.

use thiserror::Error;

/// Result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed sum over every failure kind the core can surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Out-of-range or otherwise invalid input, detected before doing work.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// Caller-supplied buffer cannot hold the encoded frame or parsed data.
    #[error("buffer too small: need {needed}, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Structural check failed: length, start byte, CRLF, protocol id, byte-count
    /// mismatch, echoed slave mismatch.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// Frame was structurally sound but the CRC trailer did not match.
    #[error("CRC mismatch: expected {expected:#06x}, computed {computed:#06x}")]
    CrcMismatch { expected: u16, computed: u16 },

    /// Frame was structurally sound but the LRC trailer did not match.
    #[error("LRC mismatch: expected {expected:#04x}, computed {computed:#04x}")]
    LrcMismatch { expected: u8, computed: u8 },

    /// The transport returned nothing within its deadline.
    #[error("timeout waiting for response")]
    Timeout,

    /// The transport's send or receive call reported a non-timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The slave returned a valid frame whose function code has the high bit set.
    #[error("exception response: code {0:#04x}")]
    ExceptionResponse(u8),

    /// The function code is not one this core recognizes or supports for the operation.
    #[error("invalid function code: {0:#04x}")]
    InvalidFc(u8),

    /// An address (or address + quantity span) is out of the valid `[0, 65536)` range.
    #[error("invalid address: {0}")]
    InvalidAddress(u32),

    /// A requested quantity is zero or exceeds the function code's maximum.
    #[error("invalid quantity: {0}")]
    InvalidQuantity(u16),

    /// A fixed-capacity block pool would have overflowed.
    #[error("too many blocks: capacity {0}")]
    TooManyBlocks(usize),

    /// A fixed-capacity plan pool would have overflowed.
    #[error("too many plans: capacity {0}")]
    TooManyPlans(usize),

    /// Heap allocation failed while building intermediate arrays.
    #[error("out of memory")]
    OutOfMemory,

    /// A fixed-capacity pool had no free slot.
    #[error("no memory available in pool")]
    NoMemory,

    /// The request targets a disabled transport variant or unimplemented feature.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl Error {
    pub fn invalid_param(msg: impl Into<String>) -> Self {
        Error::InvalidParam(msg.into())
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Error::InvalidFrame(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Error::Transport(msg.into())
    }

    pub fn not_supported(msg: impl Into<String>) -> Self {
        Error::NotSupported(msg.into())
    }
}

use thiserror::Error;

/// Reasons an inbound link frame is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short ({len} bytes)")]
    FrameTooShort { len: usize },

    #[error("crc mismatch: expected {expected:#06x}, received {received:#06x}")]
    ChecksumMismatch { expected: u16, received: u16 },

    #[error("not a status reply (signature {found:02x?})")]
    SignatureMismatch { found: [u8; 2] },

    #[error("range violation: {0}")]
    RangeViolation(&'static str),
}

/// Reasons a bus command is rejected. The command is still acknowledged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("empty payload")]
    EmptyPayload,

    #[error("payload too large ({len} bytes)")]
    PayloadTooLarge { len: usize },

    #[error("parse failure: {0}")]
    ParseFailure(String),

    #[error("value out of range: {0}")]
    CommandOutOfRange(String),

    #[error("unknown command topic: {0}")]
    UnknownTopic(String),
}

//! Protocol errors

use thiserror::Error;

/// Errors that can occur while speaking the Open Interface protocol
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Unknown opcode: {0}")]
    UnknownOpcode(u8),

    #[error("Invalid stream header: {0:#04x}")]
    InvalidHeader(u8),

    #[error("Checksum mismatch: frame sums to {sum:#04x}")]
    ChecksumMismatch { sum: u8 },

    #[error("Stream payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Truncated value for sensor packet {0}")]
    TruncatedValue(u8),

    #[error("Write queue closed")]
    QueueClosed,

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

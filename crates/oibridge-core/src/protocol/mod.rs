//! Open Interface Protocol
//!
//! Implements the opcode-driven byte protocol spoken by Open Interface robots.
//!
//! Commands are a single opcode byte followed by opcode-specific argument
//! bytes. Streamed telemetry uses length-prefixed, checksummed frames.

pub mod commands;
mod error;
pub mod opcodes;
pub mod stream;

pub use commands::Command;
pub use error::ProtocolError;
pub use opcodes::Opcode;
pub use stream::{checksum, StreamFrame, StreamFrameCodec, STREAM_HEADER};

/// Default baud rate for Open Interface serial links
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Maximum payload carried by one streaming frame
pub const MAX_STREAM_PAYLOAD: usize = u8::MAX as usize;

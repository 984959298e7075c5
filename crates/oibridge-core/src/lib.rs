//! # OiBridge Core Library
//!
//! Core functionality for relaying an Open Interface robot onto the network.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A sensor table holding byte-encoded telemetry values
//! - Open Interface opcodes, command encoding and streaming frame codec
//! - A protocol engine that simulates a robot behind a byte stream
//! - A transport bridge relaying bytes between a socket and a serial device
//! - A connection supervisor tying listener, devices and sessions together
//!
//! ## Example
//!
//! ```rust,ignore
//! use oibridge_core::{config::BridgeConfig, sensors::SensorTable, supervisor::Supervisor};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = BridgeConfig::from_file(std::path::Path::new("oibridge.json"))?;
//! let supervisor = Supervisor::new(config, SensorTable::with_mock_values());
//! supervisor.run(CancellationToken::new()).await?;
//! ```

pub mod bridge;
pub mod config;
pub mod engine;
pub mod protocol;
pub mod sensors;
pub mod supervisor;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::bridge::{
        run_session, run_session_until, BridgeError, BridgeOptions, Endpoint, EndpointKind,
    };
    pub use crate::config::{BridgeConfig, ConfigError, DeviceConfig};
    pub use crate::engine::{serve_stream, spawn_simulator, AuditLog, Engine, SimulatorHandle};
    pub use crate::protocol::{Command, Opcode, ProtocolError, StreamFrame, StreamFrameCodec};
    pub use crate::sensors::{SensingSimulator, SensorReading, SensorTable};
    pub use crate::supervisor::Supervisor;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

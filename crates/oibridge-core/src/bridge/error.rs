//! Bridge errors

use thiserror::Error;

/// Errors that end the bridge service (as opposed to a single session)
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot open device {device}: {reason}")]
    DeviceOpen { device: String, reason: String },

    #[error("Device {0} is not an external endpoint")]
    NotAnEndpoint(String),
}

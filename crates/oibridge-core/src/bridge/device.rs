//! Device endpoints
//!
//! Opens the device side of a bridge session: a local serial port or a TCP
//! connection to a remote bridge.

use serialport::SerialPort;
use std::collections::BTreeSet;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_serial::SerialPortBuilderExt;

use super::{BridgeError, Endpoint, EndpointKind};
use crate::config::DeviceConfig;

/// Open the device endpoint described by `config`.
///
/// Simulated devices are served in-process by the supervisor and have no
/// external endpoint.
pub async fn open_device(
    config: &DeviceConfig,
    read_timeout: Duration,
) -> Result<Endpoint, BridgeError> {
    match config {
        DeviceConfig::Serial { path, baud_rate } => open_serial(path, *baud_rate, read_timeout),
        DeviceConfig::Remote { addr } => {
            tracing::info!(%addr, "dialing remote device");
            let stream = TcpStream::connect(addr.as_str())
                .await
                .map_err(|e| BridgeError::DeviceOpen {
                    device: addr.clone(),
                    reason: e.to_string(),
                })?;
            if let Err(e) = stream.set_nodelay(true) {
                tracing::debug!(error = %e, "cannot disable Nagle on remote device");
            }
            Ok(Endpoint::from_tcp(stream))
        }
        DeviceConfig::Simulated { .. } => Err(BridgeError::NotAnEndpoint("simulated".to_string())),
    }
}

/// Open a serial port as 8N1 without flow control
pub fn open_serial(
    path: &str,
    baud_rate: u32,
    read_timeout: Duration,
) -> Result<Endpoint, BridgeError> {
    tracing::info!(path, baud_rate, "opening serial port");
    let mut port = tokio_serial::new(path, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(read_timeout)
        .open_native_async()
        .map_err(|e| {
            tracing::warn!(available = ?list_ports(), "serial port open failed");
            BridgeError::DeviceOpen {
                device: path.to_string(),
                reason: e.to_string(),
            }
        })?;

    // Keep DTR asserted so USB adapters that reset on DTR toggles stay up
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::debug!(error = %e, "cannot set DTR high (continuing)");
    }

    Ok(Endpoint::from_stream(path, EndpointKind::Device, port))
}

/// Sort key so that USB serial adapters come first:
///  - ttyACM* and ttyUSB* (numerically by suffix)
///  - then macOS cu.usbserial* ports
///  - then other ports (by name)
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    if basename.starts_with("cu.usbserial") {
        return (2, 0, basename.to_string());
    }
    (3, 0, basename.to_string())
}

/// Names of the serial ports present on this machine, USB adapters first
pub fn list_ports() -> Vec<String> {
    let mut names: BTreeSet<String> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| info.port_name)
        .collect();

    // Linux-only: the enumeration API misses some USB adapters
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    names.insert(format!("/dev/{}", fname));
                }
            }
        }
    }

    let mut names: Vec<String> = names.into_iter().collect();
    names.sort_by_key(|name| port_sort_key(name));
    names
}

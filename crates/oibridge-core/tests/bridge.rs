//! Bridge sessions over in-memory endpoints

use oibridge_core::bridge::{DirectionExit, SessionReport};
use oibridge_core::prelude::*;
use oibridge_core::sensors::catalogue;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn fast_options() -> BridgeOptions {
    BridgeOptions {
        read_timeout: Duration::from_millis(20),
        buffer_size: 64,
    }
}

/// Start a session between a network client and a device.
///
/// Returns the far ends: what the client writes into and what the device
/// writes into.
fn start_session() -> (DuplexStream, DuplexStream, JoinHandle<SessionReport>) {
    let (client, client_side) = duplex(1024);
    let (device, device_side) = duplex(1024);
    let network = Endpoint::from_stream("client", EndpointKind::Network, client_side);
    let serial = Endpoint::from_stream("device", EndpointKind::Device, device_side);
    let session = tokio::spawn(async move { run_session(network, serial, &fast_options()).await });
    (client, device, session)
}

async fn read_n(stream: &mut DuplexStream, n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; n];
    stream.read_exact(&mut buf).await.unwrap();
    buf
}

#[tokio::test]
async fn test_bytes_flow_both_ways_unaltered() {
    let (mut client, mut device, session) = start_session();

    let request = [0x80, 0x83, 0x8E, 0x16];
    client.write_all(&request).await.unwrap();
    assert_eq!(read_n(&mut device, 4).await, request.to_vec());

    let response: Vec<u8> = (0u8..=255).collect();
    device.write_all(&response).await.unwrap();
    assert_eq!(read_n(&mut client, 256).await, response);

    drop(client);
    let report = session.await.unwrap();
    assert_eq!(report.forward.copied, 4);
    assert_eq!(report.backward.copied, 256);
    assert_eq!(report.forward.label, "client => device");
}

#[tokio::test]
async fn test_client_hangup_cancels_device_direction() {
    let (mut client, mut device, session) = start_session();

    client.write_all(b"hello").await.unwrap();
    assert_eq!(read_n(&mut device, 5).await, b"hello".to_vec());
    drop(client);

    let report = session.await.unwrap();
    assert_eq!(report.forward.exit, DirectionExit::PeerClosed);
    assert_eq!(report.backward.exit, DirectionExit::Cancelled);

    // The device side of the session has been shut down
    let mut rest = Vec::new();
    device.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_device_close_ends_session() {
    let (mut client, device, session) = start_session();
    drop(device);

    let report = session.await.unwrap();
    assert_eq!(report.backward.exit, DirectionExit::SourceClosed);
    assert_eq!(report.forward.exit, DirectionExit::Cancelled);

    let mut rest = Vec::new();
    client.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn test_read_timeouts_are_retried() {
    let (mut client, mut device, session) = start_session();

    // Several read timeouts elapse before the device answers
    tokio::time::sleep(Duration::from_millis(100)).await;
    device.write_all(&[0x04, 0xB0]).await.unwrap();
    assert_eq!(read_n(&mut client, 2).await, vec![0x04, 0xB0]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    client.write_all(&[0x8E, 0x23]).await.unwrap();
    assert_eq!(read_n(&mut device, 2).await, vec![0x8E, 0x23]);

    assert!(!session.is_finished());
    drop(client);
    let report = session.await.unwrap();
    assert_eq!(report.forward.exit, DirectionExit::PeerClosed);
}

#[tokio::test]
async fn test_bridge_to_simulated_robot() {
    let (sim, robot) = spawn_simulator(Arc::new(SensorTable::with_mock_values()), 15);
    let (mut client, client_side) = duplex(1024);
    let network = Endpoint::from_stream("client", EndpointKind::Network, client_side);
    let device = Endpoint::from_stream("simulator", EndpointKind::Device, robot);
    let session = tokio::spawn(async move { run_session(network, device, &fast_options()).await });

    let mut request = Command::Start.to_bytes();
    request.extend(Command::Sensors(catalogue::VOLTAGE).to_bytes());
    request.extend(Command::QueryList(vec![catalogue::OI_MODE, catalogue::TEMPERATURE]).to_bytes());
    client.write_all(&request).await.unwrap();
    assert_eq!(read_n(&mut client, 4).await, vec![0x04, 0xB0, 2, 24]);

    drop(client);
    let report = session.await.unwrap();
    assert_eq!(report.forward.copied, request.len() as u64);
    assert_eq!(report.backward.copied, 4);

    // Closing the bridge closes the simulator's input
    let engine = sim.join().await.unwrap();
    assert_eq!(engine.commands(), 3);
}

#[tokio::test]
async fn test_shutdown_token_ends_idle_session() {
    let (client, client_side) = duplex(1024);
    let (device, device_side) = duplex(1024);
    let network = Endpoint::from_stream("client", EndpointKind::Network, client_side);
    let serial = Endpoint::from_stream("device", EndpointKind::Device, device_side);
    let shutdown = CancellationToken::new();
    let session_shutdown = shutdown.clone();
    let session = tokio::spawn(async move {
        run_session_until(network, serial, &fast_options(), &session_shutdown).await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!session.is_finished());
    shutdown.cancel();

    let report = tokio::time::timeout(Duration::from_secs(2), session)
        .await
        .expect("session ends after shutdown")
        .unwrap();
    assert_eq!(report.forward.exit, DirectionExit::Cancelled);
    assert_eq!(report.backward.exit, DirectionExit::Cancelled);
    drop((client, device));
}

#[tokio::test]
async fn test_session_end_leaves_shutdown_token_untouched() {
    let (client, client_side) = duplex(1024);
    let (_device, device_side) = duplex(1024);
    let network = Endpoint::from_stream("client", EndpointKind::Network, client_side);
    let serial = Endpoint::from_stream("device", EndpointKind::Device, device_side);
    let shutdown = CancellationToken::new();

    drop(client);
    let report = run_session_until(network, serial, &fast_options(), &shutdown).await;
    assert_eq!(report.forward.exit, DirectionExit::PeerClosed);
    assert!(!shutdown.is_cancelled());
}

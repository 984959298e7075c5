//! Supervisor over real TCP sockets

use oibridge_core::prelude::*;
use oibridge_core::sensors::catalogue;
use pretty_assertions::assert_eq;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn config(device: DeviceConfig) -> BridgeConfig {
    BridgeConfig {
        listen_addr: "127.0.0.1:0".to_string(),
        device,
        read_timeout_ms: 50,
        ..BridgeConfig::default()
    }
}

/// Bind a supervisor on an ephemeral port and serve it in the background
async fn start(
    device: DeviceConfig,
) -> (SocketAddr, CancellationToken, JoinHandle<Result<(), BridgeError>>) {
    let supervisor = Supervisor::new(config(device), SensorTable::with_mock_values());
    let listener = supervisor.bind().await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = CancellationToken::new();
    let task = tokio::spawn(supervisor.serve(listener, shutdown.clone()));
    (addr, shutdown, task)
}

async fn query(stream: &mut TcpStream, command: Command, n: usize) -> Vec<u8> {
    stream.write_all(&command.to_bytes()).await.unwrap();
    let mut buf = vec![0u8; n];
    tokio::time::timeout(Duration::from_secs(5), stream.read_exact(&mut buf))
        .await
        .expect("response in time")
        .unwrap();
    buf
}

#[tokio::test]
async fn test_simulated_clients_are_served_concurrently() {
    let (addr, shutdown, task) = start(DeviceConfig::Simulated { sensing: false }).await;

    let mut first = TcpStream::connect(addr).await.unwrap();
    let mut second = TcpStream::connect(addr).await.unwrap();

    assert_eq!(
        query(&mut second, Command::Sensors(catalogue::VOLTAGE), 2).await,
        vec![0x04, 0xB0]
    );
    assert_eq!(
        query(&mut first, Command::Sensors(catalogue::OI_MODE), 1).await,
        vec![2]
    );

    drop(first);
    drop(second);
    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_sensing_keeps_packet_lengths() {
    let (addr, shutdown, task) = start(DeviceConfig::Simulated { sensing: true }).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let ids = vec![catalogue::VOLTAGE, catalogue::CURRENT, catalogue::BATTERY_CHARGE];
    let reply = query(&mut client, Command::QueryList(ids.clone()), 6).await;
    assert_eq!(reply.len(), 6);

    drop(client);
    shutdown.cancel();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_remote_device_chain() {
    let (robot_addr, robot_shutdown, robot_task) =
        start(DeviceConfig::Simulated { sensing: false }).await;
    let (bridge_addr, bridge_shutdown, bridge_task) = start(DeviceConfig::Remote {
        addr: robot_addr.to_string(),
    })
    .await;

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    let mut request = Command::Safe.to_bytes();
    request.extend(Command::drive_straight(200).to_bytes());
    client.write_all(&request).await.unwrap();
    assert_eq!(
        query(&mut client, Command::Sensors(catalogue::REQUESTED_VELOCITY), 2).await,
        vec![0x00, 0xC8]
    );

    drop(client);
    bridge_shutdown.cancel();
    bridge_task.await.unwrap().unwrap();
    robot_shutdown.cancel();
    robot_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_clients_of_exclusive_device_are_served_in_turn() {
    let (robot_addr, robot_shutdown, robot_task) =
        start(DeviceConfig::Simulated { sensing: false }).await;
    let (bridge_addr, bridge_shutdown, bridge_task) = start(DeviceConfig::Remote {
        addr: robot_addr.to_string(),
    })
    .await;

    for _ in 0..2 {
        let mut client = TcpStream::connect(bridge_addr).await.unwrap();
        assert_eq!(
            query(&mut client, Command::Sensors(catalogue::CHARGING_STATE), 1).await,
            vec![21]
        );
    }

    bridge_shutdown.cancel();
    bridge_task.await.unwrap().unwrap();
    robot_shutdown.cancel();
    robot_task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_device_open_failure_stops_supervisor() {
    // Reserve a port and release it so nothing is listening there
    let unused = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead_addr = unused.local_addr().unwrap();
    drop(unused);

    let (addr, _shutdown, task) = start(DeviceConfig::Remote {
        addr: dead_addr.to_string(),
    })
    .await;
    let _client = TcpStream::connect(addr).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("supervisor stops")
        .unwrap();
    assert!(matches!(result, Err(BridgeError::DeviceOpen { .. })));
}

#[tokio::test]
async fn test_missing_serial_port_stops_supervisor() {
    let (addr, _shutdown, task) = start(DeviceConfig::Serial {
        path: "/dev/oibridge-missing-port".to_string(),
        baud_rate: 115200,
    })
    .await;
    let _client = TcpStream::connect(addr).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("supervisor stops")
        .unwrap();
    assert!(matches!(result, Err(BridgeError::DeviceOpen { .. })));
}

#[tokio::test]
async fn test_shutdown_closes_idle_simulated_client() {
    let (addr, shutdown, task) = start(DeviceConfig::Simulated { sensing: false }).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    assert_eq!(
        query(&mut client, Command::Sensors(catalogue::OI_MODE), 1).await,
        vec![2]
    );

    // The client stays connected while the supervisor is stopped
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(3), task)
        .await
        .expect("supervisor stops with a client connected")
        .unwrap()
        .unwrap();

    let mut rest = Vec::new();
    let closed = tokio::time::timeout(Duration::from_secs(3), client.read_to_end(&mut rest)).await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn test_shutdown_ends_bridge_session_with_idle_client() {
    let (robot_addr, robot_shutdown, robot_task) =
        start(DeviceConfig::Simulated { sensing: false }).await;
    let (bridge_addr, bridge_shutdown, bridge_task) = start(DeviceConfig::Remote {
        addr: robot_addr.to_string(),
    })
    .await;

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    assert_eq!(
        query(&mut client, Command::Sensors(catalogue::VOLTAGE), 2).await,
        vec![0x04, 0xB0]
    );

    bridge_shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(3), bridge_task)
        .await
        .expect("bridge stops with a client connected")
        .unwrap()
        .unwrap();

    robot_shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(3), robot_task)
        .await
        .expect("robot stops")
        .unwrap()
        .unwrap();
    drop(client);
}

//! Connection Supervisor
//!
//! Accepts TCP clients and gives each one a device for the lifetime of its
//! connection. Real devices (serial or remote) are exclusive, so their
//! sessions run one at a time; simulated devices get a fresh engine per
//! client and run concurrently.

use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bridge::{open_device, run_session_until, BridgeError, Endpoint};
use crate::config::{BridgeConfig, DeviceConfig};
use crate::engine::{serve_stream, AuditLog};
use crate::sensors::{SensingSimulator, SensorTable};

/// Listener loop owning the configuration and the base sensor table
pub struct Supervisor {
    config: BridgeConfig,
    table: Arc<SensorTable>,
    sensing: Option<SensingSimulator>,
}

impl Supervisor {
    /// Create a supervisor. `table` is only used for simulated devices.
    pub fn new(config: BridgeConfig, table: SensorTable) -> Self {
        let sensing = match config.device {
            DeviceConfig::Simulated { sensing: true } => Some(SensingSimulator::new()),
            _ => None,
        };
        Self {
            config,
            table: Arc::new(table),
            sensing,
        }
    }

    /// Replace the sensing source (e.g. with a seeded one)
    pub fn with_sensing(mut self, sensing: SensingSimulator) -> Self {
        self.sensing = Some(sensing);
        self
    }

    /// Configuration in use
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Bind the configured listen address
    pub async fn bind(&self) -> Result<TcpListener, BridgeError> {
        let addr = self.config.listen_addr.clone();
        let listener = TcpListener::bind(addr.as_str())
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        if let Ok(local) = listener.local_addr() {
            info!(addr = %local, device = ?self.config.device, "listening");
        }
        Ok(listener)
    }

    /// Bind and serve until `shutdown` fires or a device cannot be opened
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), BridgeError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from an already bound listener.
    ///
    /// When `shutdown` fires the listener stops accepting and every running
    /// session is closed. A bridge session ends within one read timeout; a
    /// simulated session is dropped right away.
    pub async fn serve(
        mut self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), BridgeError> {
        let mut simulated = JoinSet::new();
        let mut accepted = 0u64;

        let result = loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(accepted, "shutdown requested; no longer accepting");
                    break Ok(());
                }
                conn = listener.accept() => match conn {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };
            accepted += 1;
            info!(%peer, accepted, "client connected");
            if let Err(e) = stream.set_nodelay(true) {
                debug!(%peer, error = %e, "cannot disable Nagle");
            }

            while let Some(done) = simulated.try_join_next() {
                if let Err(e) = done {
                    warn!(error = %e, "simulated session task failed");
                }
            }

            if self.config.device.is_exclusive() {
                if let Err(e) = self.bridge_session(stream, &shutdown).await {
                    break Err(e);
                }
                info!(%peer, "client disconnected");
            } else {
                let table = self.session_table();
                let capacity = self.config.write_queue_capacity;
                let shutdown = shutdown.clone();
                simulated.spawn(async move {
                    tokio::select! {
                        engine = serve_stream(stream, table, capacity, AuditLog::new()) => {
                            info!(%peer, commands = engine.commands(), "client disconnected");
                        }
                        _ = shutdown.cancelled() => {
                            info!(%peer, "closing simulated session for shutdown");
                        }
                    }
                });
            }
        };

        if !simulated.is_empty() {
            debug!(sessions = simulated.len(), "waiting for simulated sessions");
        }
        while let Some(done) = simulated.join_next().await {
            if let Err(e) = done {
                warn!(error = %e, "simulated session task failed");
            }
        }
        result
    }

    /// Sensor table for a new simulated session
    fn session_table(&mut self) -> Arc<SensorTable> {
        match self.sensing.as_mut() {
            Some(sensing) => Arc::new(sensing.sense(&self.table)),
            None => Arc::clone(&self.table),
        }
    }

    /// Open the device and relay `stream` to it until either side is done
    async fn bridge_session(
        &self,
        stream: TcpStream,
        shutdown: &CancellationToken,
    ) -> Result<(), BridgeError> {
        let device = match open_device(&self.config.device, self.config.read_timeout()).await {
            Ok(device) => device,
            Err(e) => {
                warn!(error = %e, "cannot open device; stopping");
                return Err(e);
            }
        };
        let report = run_session_until(
            Endpoint::from_tcp(stream),
            device,
            &self.config.bridge_options(),
            shutdown,
        )
        .await;
        debug!(
            forward = report.forward.copied,
            backward = report.backward.copied,
            "session bytes relayed"
        );
        Ok(())
    }
}

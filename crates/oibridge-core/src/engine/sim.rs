//! In-process simulated device
//!
//! [`spawn_simulator`] returns the controller end of an in-memory duplex pipe
//! with an [`Engine`] serving the other end, so a controller (or the bridge)
//! can talk to it exactly as it would to a serial port.

use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use super::{spawn_writer, AuditLog, Engine};
use crate::sensors::SensorTable;

/// Size of the in-memory pipe between controller and simulator
const PIPE_CAPACITY: usize = 4096;

/// Handle on a running simulator task
pub struct SimulatorHandle {
    audit: AuditLog,
    task: JoinHandle<Engine>,
}

impl SimulatorHandle {
    /// Bytes read and written by the simulator so far
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Wait for the simulator to finish and return its final engine state.
    ///
    /// The simulator finishes once the controller end of the pipe is dropped.
    pub async fn join(self) -> Option<Engine> {
        match self.task.await {
            Ok(engine) => Some(engine),
            Err(e) => {
                tracing::warn!(error = %e, "simulator task failed");
                None
            }
        }
    }
}

/// Start a simulated robot and return the controller end of its stream
pub fn spawn_simulator(
    table: Arc<SensorTable>,
    queue_capacity: usize,
) -> (SimulatorHandle, DuplexStream) {
    let (controller, device) = tokio::io::duplex(PIPE_CAPACITY);
    let audit = AuditLog::new();
    let task = tokio::spawn(serve_stream(device, table, queue_capacity, audit.clone()));
    (SimulatorHandle { audit, task }, controller)
}

/// Serve one byte stream with a fresh engine until the input ends.
///
/// The output half is shut down after every queued response has been written.
pub async fn serve_stream<S>(
    stream: S,
    table: Arc<SensorTable>,
    queue_capacity: usize,
    audit: AuditLog,
) -> Engine
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (mut reader, writer) = tokio::io::split(stream);
    let (queue, writer_task) = spawn_writer(writer, queue_capacity, audit.clone());

    let mut engine = Engine::new(table, queue.clone(), audit);
    let commands = engine.serve(&mut reader).await;
    tracing::debug!(commands, "simulated session finished");

    queue.stop().await;
    match writer_task.await {
        Ok(Ok(mut writer)) => {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(error = %e, "shutdown of simulator output failed");
            }
        }
        Ok(Err(e)) => tracing::warn!(error = %e, "simulator writer failed"),
        Err(e) => tracing::warn!(error = %e, "simulator writer task failed"),
    }

    engine
}

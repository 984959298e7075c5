//! Protocol Engine
//!
//! Interprets an Open Interface command stream the way a robot would and
//! answers from a [`SensorTable`]. Used as the simulated device behind the
//! bridge and directly by the supervisor in simulated mode.
//!
//! Protocol violations never stop the engine: unknown opcodes, missing sensor
//! values and short argument reads are logged and the next byte is parsed as a
//! fresh opcode. Only the end of the input stream (or a dead writer) ends
//! [`Engine::serve`].

mod audit;
mod queue;
mod sim;

use byteorder::{BigEndian, ByteOrder};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, trace, warn};

use crate::protocol::{Opcode, ProtocolError, StreamFrame};
use crate::sensors::{catalogue, SensorTable};

pub use audit::AuditLog;
pub use queue::{spawn_writer, WriteQueue, DEFAULT_QUEUE_CAPACITY};
pub use sim::{serve_stream, spawn_simulator, SimulatorHandle};

/// Simulated Open Interface robot
pub struct Engine {
    /// Shared, read-only sensor values
    table: Arc<SensorTable>,
    /// Output queue drained by the writer task
    queue: WriteQueue,
    /// Byte-level record of the session
    audit: AuditLog,
    /// Velocity bytes of the last Drive command
    requested_velocity: Vec<u8>,
    /// Radius bytes of the last Drive command
    requested_radius: Vec<u8>,
    /// Number of opcodes executed
    commands: u64,
}

impl Engine {
    /// Create an engine answering from `table` and writing into `queue`
    pub fn new(table: Arc<SensorTable>, queue: WriteQueue, audit: AuditLog) -> Self {
        Self {
            table,
            queue,
            audit,
            requested_velocity: vec![0, 0],
            requested_radius: vec![0, 0],
            commands: 0,
        }
    }

    /// Velocity bytes stored by the last Drive command (big-endian)
    pub fn requested_velocity(&self) -> &[u8] {
        &self.requested_velocity
    }

    /// Radius bytes stored by the last Drive command (big-endian)
    pub fn requested_radius(&self) -> &[u8] {
        &self.requested_radius
    }

    /// Number of opcodes executed so far
    pub fn commands(&self) -> u64 {
        self.commands
    }

    /// Audit log shared with this engine
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Execute commands until the input ends or the writer goes away.
    ///
    /// Returns the number of opcodes executed.
    pub async fn serve<R>(&mut self, reader: &mut R) -> u64
    where
        R: AsyncRead + Unpin,
    {
        loop {
            match self.execute(reader).await {
                Ok(()) => {}
                Err(ProtocolError::ShortRead { actual: 0, .. }) => {
                    debug!(commands = self.commands, "input closed; engine stopping");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, commands = self.commands, "engine stopping");
                    break;
                }
            }
        }
        self.commands
    }

    /// Read and execute a single command.
    ///
    /// Fails only when no opcode could be read or the output queue is closed.
    pub async fn execute<R>(&mut self, reader: &mut R) -> Result<(), ProtocolError>
    where
        R: AsyncRead + Unpin,
    {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(ProtocolError::ShortRead {
                    expected: 1,
                    actual: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };
        trace!(opcode = byte, "engine reads");
        self.audit.record_read(&[byte]);
        self.commands += 1;

        match Opcode::try_from(byte) {
            Ok(Opcode::Sensors) => {
                if let Some(&id) = self.read(reader, 1).await.first() {
                    self.write_sensor(id).await?;
                }
            }
            Ok(Opcode::QueryList) => {
                let Some(&count) = self.read(reader, 1).await.first() else {
                    return Ok(());
                };
                for _ in 0..count {
                    let Some(&id) = self.read(reader, 1).await.first() else {
                        return Ok(());
                    };
                    self.write_sensor(id).await?;
                }
            }
            Ok(Opcode::Stream) => {
                let Some(&count) = self.read(reader, 1).await.first() else {
                    return Ok(());
                };
                let ids = self.read(reader, count as usize).await;
                if ids.len() != count as usize {
                    return Ok(());
                }
                self.write_stream_frame(&ids).await?;
            }
            Ok(Opcode::Start) => info!("switched to passive mode"),
            Ok(Opcode::Safe) => info!("switched to safe mode"),
            Ok(Opcode::PauseResumeStream) => match self.read(reader, 1).await.first() {
                Some(0) => info!("stream paused"),
                Some(_) => info!("stream resumed"),
                None => {}
            },
            Ok(Opcode::DirectDrive) => {
                let data = self.read(reader, 4).await;
                if data.len() == 4 {
                    let right = BigEndian::read_i16(&data[..2]);
                    let left = BigEndian::read_i16(&data[2..]);
                    info!(right, left, "direct drive");
                }
            }
            Ok(Opcode::Drive) => {
                let velocity = self.read(reader, 2).await;
                let radius = self.read(reader, 2).await;
                if velocity.len() == 2 {
                    self.requested_velocity = velocity;
                }
                if radius.len() == 2 {
                    self.requested_radius = radius;
                }
                info!(
                    velocity = BigEndian::read_i16(&self.requested_velocity),
                    radius = BigEndian::read_i16(&self.requested_radius),
                    "drive"
                );
            }
            Ok(other) => warn!(opcode = byte, name = ?other, "unknown opcode: not simulated"),
            Err(_) => warn!(opcode = byte, "unknown opcode"),
        }

        Ok(())
    }

    /// Current value of a sensor, with Drive-owned ids taking precedence
    fn lookup(&self, id: u8) -> Option<Vec<u8>> {
        match id {
            catalogue::REQUESTED_VELOCITY => Some(self.requested_velocity.clone()),
            catalogue::REQUESTED_RADIUS => Some(self.requested_radius.clone()),
            _ => self.table.get(id).map(<[u8]>::to_vec),
        }
    }

    async fn write_sensor(&self, id: u8) -> Result<(), ProtocolError> {
        match self.lookup(id) {
            Some(value) if !value.is_empty() => {
                debug!(sensor_id = id, value = ?value, "sensor value");
                self.queue.push(value).await
            }
            _ => {
                warn!(sensor_id = id, "no mock value for sensor packet id");
                Ok(())
            }
        }
    }

    async fn write_stream_frame(&self, ids: &[u8]) -> Result<(), ProtocolError> {
        let mut frame = StreamFrame::new();
        for &id in ids {
            let value = match self.lookup(id) {
                Some(value) => value,
                None => {
                    warn!(sensor_id = id, "no mock value for streaming packet id");
                    self.table.value_or_zeroed(id)
                }
            };
            frame.push(id, value);
        }

        match frame.to_bytes() {
            Ok(bytes) => {
                debug!(length = frame.payload_len(), checksum = bytes[bytes.len() - 1], "stream frame");
                self.queue.push(bytes).await
            }
            Err(e) => {
                warn!(error = %e, "cannot build stream frame");
                Ok(())
            }
        }
    }

    /// Read `n` argument bytes, or return an empty buffer if fewer arrived
    async fn read<R>(&self, reader: &mut R, n: usize) -> Vec<u8>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match reader.read(&mut buf[filled..]).await {
                Ok(0) => break,
                Ok(count) => filled += count,
                Err(e) => {
                    warn!(error = %e, "error reading command stream");
                    break;
                }
            }
        }

        if filled != n {
            warn!(expected = n, actual = filled, "short read");
            return Vec::new();
        }

        trace!(bytes = ?buf, "engine reads");
        self.audit.record_read(&buf);
        buf
    }
}

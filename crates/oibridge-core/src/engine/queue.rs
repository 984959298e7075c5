//! Bounded write queue and its writer task.
//!
//! ```text
//! Engine ─► WriteQueue (mpsc, bounded) ─► Writer Task ─► output stream
//! ```
//!
//! Buffers are written in enqueue order. A full queue suspends the engine
//! until the writer catches up. An empty buffer tells the writer to stop.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::AuditLog;
use crate::protocol::ProtocolError;

/// Default queue depth
pub const DEFAULT_QUEUE_CAPACITY: usize = 15;

/// Producer side of the write queue
#[derive(Debug, Clone)]
pub struct WriteQueue {
    tx: mpsc::Sender<Vec<u8>>,
}

impl WriteQueue {
    /// Create a queue and the receiver a writer drains
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Enqueue output bytes, waiting while the queue is full.
    ///
    /// Empty buffers are ignored since they are reserved for [`WriteQueue::stop`].
    pub async fn push(&self, bytes: Vec<u8>) -> Result<(), ProtocolError> {
        if bytes.is_empty() {
            return Ok(());
        }
        self.tx
            .send(bytes)
            .await
            .map_err(|_| ProtocolError::QueueClosed)
    }

    /// Ask the writer to stop once everything queued before has been written
    pub async fn stop(&self) {
        if self.tx.send(Vec::new()).await.is_err() {
            tracing::debug!("writer already stopped");
        }
    }
}

/// Spawn a writer task draining a new queue into `writer`.
///
/// The task hands the writer back when it stops so the caller can shut it down.
pub fn spawn_writer<W>(
    writer: W,
    capacity: usize,
    audit: AuditLog,
) -> (WriteQueue, JoinHandle<io::Result<W>>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (queue, rx) = WriteQueue::channel(capacity);
    let task = tokio::spawn(writer_loop(rx, writer, audit));
    (queue, task)
}

async fn writer_loop<W>(
    mut rx: mpsc::Receiver<Vec<u8>>,
    mut writer: W,
    audit: AuditLog,
) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(bytes) = rx.recv().await {
        if bytes.is_empty() {
            break;
        }
        tracing::trace!(bytes = ?bytes, "engine says");
        writer.write_all(&bytes).await?;
        writer.flush().await?;
        audit.record_written(&bytes);
    }
    Ok(writer)
}

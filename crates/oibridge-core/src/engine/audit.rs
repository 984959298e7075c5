use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Append-only record of every byte an engine read and wrote.
///
/// Clones share the same buffers, so a handle kept by a test observes the
/// traffic of an engine running in another task.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    read: Arc<Mutex<Vec<u8>>>,
    written: Arc<Mutex<Vec<u8>>>,
}

impl AuditLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes consumed from the input stream
    pub fn record_read(&self, bytes: &[u8]) {
        lock(&self.read).extend_from_slice(bytes);
    }

    /// Append bytes delivered to the output stream
    pub fn record_written(&self, bytes: &[u8]) {
        lock(&self.written).extend_from_slice(bytes);
    }

    /// Snapshot of all bytes read so far
    pub fn read_bytes(&self) -> Vec<u8> {
        lock(&self.read).clone()
    }

    /// Snapshot of all bytes written so far
    pub fn written_bytes(&self) -> Vec<u8> {
        lock(&self.written).clone()
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(PoisonError::into_inner)
}

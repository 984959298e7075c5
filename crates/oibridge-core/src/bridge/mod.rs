//! Transport Bridge
//!
//! Relays raw bytes between two duplex endpoints, typically a TCP client and
//! a serial device. Bytes are never inspected or altered.
//!
//! Each session runs two directions as separate tasks sharing one
//! [`CancellationToken`]. A direction polls the token before every copy
//! attempt, so a peer stuck in a read notices cancellation at the latest when
//! its read timeout fires. Read timeouts are never terminal.

mod device;
mod endpoint;
mod error;

use std::io;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub use device::{list_ports, open_device, open_serial};
pub use endpoint::{BoxedReader, BoxedWriter, Endpoint, EndpointKind};
pub use error::BridgeError;

/// Default read timeout on bridge endpoints
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Default relay buffer size
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 8192;

/// Tuning for a bridge session
#[derive(Debug, Clone)]
pub struct BridgeOptions {
    /// How long a single read may block before the direction re-polls cancellation
    pub read_timeout: Duration,
    /// Relay buffer size per direction
    pub buffer_size: usize,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

/// Why a relay direction stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectionExit {
    /// The other direction raised cancellation
    Cancelled,
    /// A network source produced no bytes: the peer hung up
    PeerClosed,
    /// A device source reached end of file
    SourceClosed,
    /// A read or write failed with a non-timeout error
    Failed,
}

/// Outcome of one relay direction
#[derive(Debug, Clone)]
pub struct DirectionReport {
    /// `source => destination`
    pub label: String,
    /// Bytes relayed
    pub copied: u64,
    /// Terminal condition
    pub exit: DirectionExit,
}

/// Outcome of a whole session
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// First endpoint to second endpoint
    pub forward: DirectionReport,
    /// Second endpoint to first endpoint
    pub backward: DirectionReport,
}

/// Result of one bulk copy attempt
enum CopyStatus {
    /// A read blocked longer than the read timeout
    TimedOut,
    /// The source reported end of file
    Eof,
    /// Cancellation was observed between chunks
    Cancelled,
    /// Non-timeout I/O error
    Failed(io::Error),
}

/// Relay `a` and `b` in both directions until either side terminates.
///
/// Returns once both directions have exited. Both write halves are shut down
/// before returning; read halves are dropped by their directions.
pub async fn run_session(a: Endpoint, b: Endpoint, options: &BridgeOptions) -> SessionReport {
    run_session_until(a, b, options, &CancellationToken::new()).await
}

/// Like [`run_session`], but also ends when `shutdown` is cancelled.
///
/// Directions observe `shutdown` at their next cancellation poll, so the
/// session ends within one read timeout.
pub async fn run_session_until(
    a: Endpoint,
    b: Endpoint,
    options: &BridgeOptions,
    shutdown: &CancellationToken,
) -> SessionReport {
    let token = shutdown.child_token();
    let (a_label, a_kind, a_reader, a_writer) = a.into_parts();
    let (b_label, b_kind, b_reader, b_writer) = b.into_parts();

    let forward_label = format!("{} => {}", a_label, b_label);
    let backward_label = format!("{} => {}", b_label, a_label);
    info!(forward = %forward_label, backward = %backward_label, "bridge session starting");

    let forward = tokio::spawn(relay(
        forward_label.clone(),
        a_kind,
        a_reader,
        b_writer,
        token.clone(),
        options.clone(),
    ));
    let backward = tokio::spawn(relay(
        backward_label.clone(),
        b_kind,
        b_reader,
        a_writer,
        token.clone(),
        options.clone(),
    ));

    let (forward, backward) = tokio::join!(forward, backward);
    let forward = finish_direction(forward, forward_label, &token).await;
    let backward = finish_direction(backward, backward_label, &token).await;

    info!(
        forward_copied = forward.copied,
        forward_exit = ?forward.exit,
        backward_copied = backward.copied,
        backward_exit = ?backward.exit,
        "bridge session finished"
    );
    SessionReport { forward, backward }
}

/// Shut down the destination of a finished direction
async fn finish_direction(
    joined: Result<(DirectionReport, BoxedWriter), tokio::task::JoinError>,
    label: String,
    token: &CancellationToken,
) -> DirectionReport {
    match joined {
        Ok((report, mut writer)) => {
            if let Err(e) = writer.shutdown().await {
                debug!(direction = %report.label, error = %e, "closing destination failed");
            }
            report
        }
        Err(e) => {
            warn!(direction = %label, error = %e, "relay task failed");
            token.cancel();
            DirectionReport {
                label,
                copied: 0,
                exit: DirectionExit::Failed,
            }
        }
    }
}

/// One relay direction. Hands the destination back when done.
async fn relay(
    label: String,
    kind: EndpointKind,
    mut src: BoxedReader,
    mut dst: BoxedWriter,
    token: CancellationToken,
    options: BridgeOptions,
) -> (DirectionReport, BoxedWriter) {
    let mut buf = vec![0u8; options.buffer_size.max(1)];
    let mut total = 0u64;
    debug!(direction = %label, "copying");

    let exit = loop {
        if token.is_cancelled() {
            debug!(direction = %label, "stopping; closing source");
            break DirectionExit::Cancelled;
        }

        let (copied, status) =
            copy_until_stalled(&mut src, &mut dst, &mut buf, options.read_timeout, &token).await;
        total += copied;

        match status {
            CopyStatus::TimedOut => {
                trace!(direction = %label, copied, "read timeout; looping");
                continue;
            }
            CopyStatus::Cancelled => continue,
            _ if kind == EndpointKind::Network && copied == 0 => {
                info!(direction = %label, "done: network source has no data");
                token.cancel();
                break DirectionExit::PeerClosed;
            }
            CopyStatus::Failed(e) => {
                warn!(direction = %label, copied, error = %e, "done: copy failed");
                token.cancel();
                break DirectionExit::Failed;
            }
            CopyStatus::Eof if kind == EndpointKind::Network => {
                trace!(direction = %label, copied, "network source drained; looping");
                continue;
            }
            CopyStatus::Eof => {
                info!(direction = %label, copied, "done: device source closed");
                token.cancel();
                break DirectionExit::SourceClosed;
            }
        }
    };

    drop(src);
    let report = DirectionReport {
        label,
        copied: total,
        exit,
    };
    (report, dst)
}

/// Copy from `src` to `dst` until a read stalls, the source ends, an error
/// occurs or cancellation is observed. Returns the bytes copied in this attempt.
async fn copy_until_stalled(
    src: &mut BoxedReader,
    dst: &mut BoxedWriter,
    buf: &mut [u8],
    read_timeout: Duration,
    token: &CancellationToken,
) -> (u64, CopyStatus) {
    let mut copied = 0u64;
    loop {
        let n = match tokio::time::timeout(read_timeout, src.read(buf)).await {
            Err(_) => return (copied, CopyStatus::TimedOut),
            Ok(Ok(0)) => return (copied, CopyStatus::Eof),
            Ok(Ok(n)) => n,
            Ok(Err(e)) if is_timeout(&e) => return (copied, CopyStatus::TimedOut),
            Ok(Err(e)) => return (copied, CopyStatus::Failed(e)),
        };

        if let Err(e) = dst.write_all(&buf[..n]).await {
            return (copied, CopyStatus::Failed(e));
        }
        if let Err(e) = dst.flush().await {
            return (copied, CopyStatus::Failed(e));
        }
        copied += n as u64;

        if token.is_cancelled() {
            return (copied, CopyStatus::Cancelled);
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

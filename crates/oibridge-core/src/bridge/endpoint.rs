use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

/// Boxed read half of an endpoint
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of an endpoint
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// What sits behind an endpoint.
///
/// A network source that ends a copy without producing any bytes means the
/// peer hung up; device sources have no such convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// TCP socket
    Network,
    /// Serial port or simulated device
    Device,
}

/// A duplex byte endpoint split into independently owned halves
pub struct Endpoint {
    label: String,
    kind: EndpointKind,
    reader: BoxedReader,
    writer: BoxedWriter,
}

impl Endpoint {
    /// Assemble an endpoint from its halves
    pub fn new(
        label: impl Into<String>,
        kind: EndpointKind,
        reader: BoxedReader,
        writer: BoxedWriter,
    ) -> Self {
        Self {
            label: label.into(),
            kind,
            reader,
            writer,
        }
    }

    /// Network endpoint over a connected TCP socket, labelled with its peer address
    pub fn from_tcp(stream: TcpStream) -> Self {
        let label = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "tcp".to_string());
        let (reader, writer) = stream.into_split();
        Self::new(label, EndpointKind::Network, Box::new(reader), Box::new(writer))
    }

    /// Endpoint over any duplex stream
    pub fn from_stream<S>(label: impl Into<String>, kind: EndpointKind, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(label, kind, Box::new(reader), Box::new(writer))
    }

    /// Human-readable name used in log events
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Endpoint kind
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Split into label, kind, reader and writer
    pub fn into_parts(self) -> (String, EndpointKind, BoxedReader, BoxedWriter) {
        (self.label, self.kind, self.reader, self.writer)
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

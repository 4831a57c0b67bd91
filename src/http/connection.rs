use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::parser::{Decoded, DecodeError, RequestDecoder, CHUNK_SIZE};
use crate::http::response::Reply;
use crate::http::writer::ResponseWriter;

/// Byte stream a connection runs over: plain TCP or TLS on top of it.
pub trait Transport: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Transport for T {}

/// Identifier the registry hands out when a connection is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// One client socket and its lifecycle state.
pub struct Connection {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    stream: Box<dyn Transport>,
    chunk: Vec<u8>,
    keep_alive: bool,
    deadline: Instant,
    idle_timeout: Duration,
}

impl Connection {
    pub fn new(
        id: ConnectionId,
        peer: SocketAddr,
        stream: Box<dyn Transport>,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            id,
            peer,
            stream,
            chunk: vec![0u8; CHUNK_SIZE],
            keep_alive: false,
            deadline: Instant::now() + idle_timeout,
            idle_timeout,
        }
    }

    /// Waits for the first chunk of the next request.
    ///
    /// Cancel-safe: dropping the future before it completes consumes
    /// nothing from the socket.
    pub async fn fill(&mut self) -> std::io::Result<usize> {
        self.stream.read(&mut self.chunk).await
    }

    /// Bytes the last successful [`fill`](Self::fill) produced.
    pub fn take_prefetched(&self, n: usize) -> Vec<u8> {
        self.chunk[..n.min(self.chunk.len())].to_vec()
    }

    pub async fn read_request(
        &mut self,
        decoder: &RequestDecoder,
        prefetched: Vec<u8>,
    ) -> Result<Decoded, DecodeError> {
        decoder.decode(&mut self.stream, prefetched).await
    }

    /// Writes one reply and records whether the connection stays open.
    pub async fn respond(&mut self, reply: &Reply, keep_alive: bool) -> std::io::Result<()> {
        let writer = ResponseWriter::new(reply, keep_alive);
        writer.write_to_stream(&mut self.stream).await?;
        self.keep_alive = keep_alive;
        self.touch();
        Ok(())
    }

    /// Pushes the idle deadline out by the idle timeout.
    pub fn touch(&mut self) {
        self.deadline = Instant::now() + self.idle_timeout;
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn is_idle(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub async fn shutdown(mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::trace!(conn = %self.id, error = %e, "Shutdown after close failed");
        }
    }
}

//! Connection acceptor and the single-task poll loop.
//!
//! One task owns the listening socket and every client connection. Each
//! tick races `accept` and a first-chunk read on every registered
//! connection against the poll interval; whichever finishes first is
//! handled, the rest are picked up on a later tick.

use std::net::SocketAddr;
use std::time::Instant;

use anyhow::Context;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::http::connection::{Connection, ConnectionId, Transport};
use crate::http::parser::{Decoded, RequestDecoder};
use crate::http::retry;
use crate::notes::{NoteStore, NotesApi};
use crate::server::registry::ConnectionRegistry;
use crate::server::router::Router;
use crate::server::tls;
use crate::static_files::StaticAssets;

/// Pending connections the kernel queues while the loop is busy.
pub const LISTEN_BACKLOG: u32 = 20;

enum Event {
    Accepted(std::io::Result<(TcpStream, SocketAddr)>),
    Readable(ConnectionId, std::io::Result<usize>),
    Tick,
}

pub struct Server {
    listener: TcpListener,
    tls: Option<TlsAcceptor>,
    registry: ConnectionRegistry,
    router: Router,
    decoder: RequestDecoder,
    cfg: Config,
}

impl Server {
    /// Binds the listening socket and loads TLS if a cert/key pair exists.
    pub async fn bind(cfg: Config) -> anyhow::Result<Self> {
        let tls = tls::load_acceptor(&cfg.cert_path(), &cfg.key_path())
            .context("Failed to load TLS certificate")?;

        let addr = tokio::net::lookup_host(&cfg.listen_addr)
            .await
            .with_context(|| format!("Cannot resolve {}", cfg.listen_addr))?
            .next()
            .with_context(|| format!("No address for {}", cfg.listen_addr))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("Failed to bind {}", addr))?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        let store = NoteStore::new(&cfg.notes_root);
        store.ensure_root()?;
        let assets = StaticAssets::new(&cfg.static_root, cfg.cert_path());
        let router = Router::new(NotesApi::new(store), assets);

        info!(
            address = %listener.local_addr()?,
            tls = tls.is_some(),
            notes_root = %cfg.notes_root.display(),
            "Serving HTTP{}",
            if tls.is_some() { "S" } else { "" }
        );

        Ok(Self {
            listener,
            tls,
            registry: ConnectionRegistry::new(),
            router,
            decoder: RequestDecoder::new(cfg.retry_policy()),
            cfg,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.is_some()
    }

    /// Runs the poll loop forever. Per-connection failures never end it.
    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            self.tick().await;
        }
    }

    async fn tick(&mut self) {
        for conn in self.registry.reap_idle(Instant::now()) {
            debug!(conn = %conn.id, peer = %conn.peer, "Closing idle connection");
            conn.shutdown().await;
        }

        let event = {
            let mut reads: FuturesUnordered<_> = self
                .registry
                .iter_mut()
                .map(|(id, conn)| async move { (id, conn.fill().await) })
                .collect();

            tokio::select! {
                accepted = self.listener.accept() => Event::Accepted(accepted),
                Some((id, res)) = reads.next(), if !reads.is_empty() => Event::Readable(id, res),
                _ = sleep(self.cfg.poll_interval()) => Event::Tick,
            }
        };

        match event {
            Event::Accepted(Ok((stream, peer))) => self.accept(stream, peer).await,
            Event::Accepted(Err(e)) => warn!(error = %e, "Accept failed"),
            Event::Readable(id, Ok(0)) => {
                if let Some(conn) = self.registry.take(id) {
                    debug!(conn = %id, peer = %conn.peer, "Peer closed connection");
                }
            }
            Event::Readable(id, Ok(n)) => self.serve(id, n).await,
            Event::Readable(id, Err(e)) if retry::is_spurious(&e) => self.serve(id, 0).await,
            Event::Readable(id, Err(e)) => {
                if let Some(conn) = self.registry.take(id) {
                    warn!(conn = %id, peer = %conn.peer, error = %e, "Connection read failed");
                }
            }
            Event::Tick => {}
        }
    }

    async fn accept(&mut self, stream: TcpStream, peer: SocketAddr) {
        let id = self.registry.next_id();
        info!(conn = %id, peer = %peer, "Accepted connection");

        let transport: Box<dyn Transport> = match &self.tls {
            None => Box::new(stream),
            Some(acceptor) => {
                match timeout(self.cfg.handshake_timeout(), acceptor.accept(stream)).await {
                    Ok(Ok(tls_stream)) => Box::new(tls_stream),
                    Ok(Err(e)) => {
                        warn!(conn = %id, peer = %peer, error = %e, "TLS handshake failed");
                        return;
                    }
                    Err(_) => {
                        warn!(conn = %id, peer = %peer, "TLS handshake timed out");
                        return;
                    }
                }
            }
        };

        self.registry
            .insert(Connection::new(id, peer, transport, self.cfg.idle_timeout()));
        debug!(conn = %id, open = self.registry.len(), "Connection registered");
    }

    /// Serves one request on a connection that just became readable.
    async fn serve(&mut self, id: ConnectionId, prefetched: usize) {
        let Some(mut conn) = self.registry.take(id) else {
            return;
        };
        let first = conn.take_prefetched(prefetched);

        let (reply, keep_alive) = match conn.read_request(&self.decoder, first).await {
            Ok(Decoded::Closed) => {
                debug!(conn = %id, peer = %conn.peer, "Peer closed connection");
                return;
            }
            Ok(Decoded::Reject { reply, keep_alive }) => {
                warn!(conn = %id, peer = %conn.peer, "Malformed request");
                (reply, keep_alive)
            }
            Ok(Decoded::Request(req)) => {
                info!(
                    conn = %id,
                    method = req.method.as_str(),
                    path = %req.path,
                    user_agent = req.header("user-agent").unwrap_or("-"),
                    referer = req.header("referer").unwrap_or("-"),
                    "Request"
                );
                match self.router.handle(&req) {
                    Ok(reply) => (reply, req.keep_alive()),
                    Err(e) => {
                        error!(
                            conn = %id,
                            peer = %conn.peer,
                            method = req.method.as_str(),
                            path = %req.path,
                            error = %e,
                            "Request failed, dropping connection"
                        );
                        return;
                    }
                }
            }
            Err(e) => {
                error!(conn = %id, peer = %conn.peer, error = %e, "Abandoning connection");
                return;
            }
        };

        if let Err(e) = conn.respond(&reply, keep_alive).await {
            warn!(conn = %id, peer = %conn.peer, error = %e, "Failed to write response");
            return;
        }
        debug!(conn = %id, status = reply.status().as_u16(), keep_alive, "Response sent");

        if conn.keep_alive() {
            self.registry.insert(conn);
        } else {
            conn.shutdown().await;
        }
    }
}

/// Binds with `cfg` and serves until the loop ends.
pub async fn run(cfg: Config) -> anyhow::Result<()> {
    Server::bind(cfg).await?.run().await
}

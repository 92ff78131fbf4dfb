//! # Realm Server - Connection Acceptance
//!
//! Accepts TCP connections and runs one session task per connection.
//!
//! # Architecture
//!
//! 1. **TCP Listener** - Accepts incoming connections
//! 2. **World Registry** - Tracks every live session
//! 3. **Handler Registry** - Routes messages to handlers
//! 4. **Id Pool** - Assigns session ids, reused after disconnect
//!
//! # Example
//!
//! ```rust,no_run
//! use realm_network::{RealmServer, ServerContext};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(ctx: Arc<ServerContext>) -> realm_core::Result<()> {
//! let server = RealmServer::bind(ctx).await?;
//! server.run(CancellationToken::new()).await?;
//! # Ok(())
//! # }
//! ```

use realm_core::{RealmError, Result, SessionId};
use realm_world::Peer;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::ServerContext;
use crate::session::Session;

/// How long shutdown waits for sessions to finish cleanup
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Drive a registered session to completion.
///
/// Runs the receive loop and always runs cleanup afterwards, whether the
/// loop ended cleanly or with an error.
async fn serve_connection<R>(ctx: Arc<ServerContext>, session: Arc<Session>, reader: R) -> Result<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let id = session.id();
    tracing::info!("Session {} task started ({})", id, session.peer_label());

    let result = session.run(reader, ctx.clone()).await;
    match &result {
        Ok(()) => tracing::info!("Session {} task completed", id),
        Err(e) => tracing::error!("Session {} task failed: {}", id, e),
    }
    session.cleanup(&ctx).await;
    result
}

/// Build and register a session for a split connection, then start its task.
///
/// The session is visible in the world registry before this returns.
///
/// # Arguments
/// * `ctx` - Shared server state
/// * `id` - Session id already taken from `ctx.ids`
/// * `reader` / `writer` - The two halves of the connection
/// * `peer_label` - Remote address for logs
///
/// # Returns
/// The session and the task running it
///
/// # Errors
/// `Network` if the id is already registered; the id is returned to the pool
pub fn spawn_connection<R, W>(
    ctx: &Arc<ServerContext>,
    id: SessionId,
    reader: R,
    writer: W,
    peer_label: String,
) -> Result<(Arc<Session>, tokio::task::JoinHandle<Result<()>>)>
where
    R: AsyncRead + Send + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let session = Session::new(id, writer, peer_label, &ctx.network);
    if !ctx.world.register_session(session.clone()) {
        ctx.ids.release(id.get());
        return Err(RealmError::Network(format!("session id {} already registered", id)));
    }
    let task = tokio::spawn(serve_connection(ctx.clone(), session.clone(), reader));
    Ok((session, task))
}

/// The listening server
pub struct RealmServer {
    ctx: Arc<ServerContext>,
    listener: TcpListener,
}

impl RealmServer {
    /// Validate the network options and bind the listener
    ///
    /// # Errors
    /// Returns an error if:
    /// - Configuration is invalid
    /// - The listener cannot be bound
    pub async fn bind(ctx: Arc<ServerContext>) -> Result<Self> {
        ctx.network
            .validate()
            .map_err(|e| RealmError::Config(format!("Invalid configuration: {}", e)))?;

        let address = ctx.network.bind_address;
        let listener = TcpListener::bind(address).await.map_err(|e| {
            RealmError::Io(std::io::Error::new(e.kind(), format!("Failed to bind to {}: {}", address, e)))
        })?;

        tracing::info!("Realm server listening on {}", address);
        tracing::info!(
            "Configuration: max_connections={}, enforce_sequence={}",
            ctx.network.max_connections,
            ctx.network.enforce_sequence
        );
        Ok(Self { ctx, listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.ctx
    }

    /// Accept connections until `shutdown` fires, then close every session
    ///
    /// # Lifecycle
    ///
    /// ```text
    /// 1. Accept incoming connection
    /// 2. Check connection limit
    /// 3. Assign session id
    /// 4. Spawn session task
    /// 5. Repeat until shutdown
    /// ```
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        tracing::info!("Realm server accepting connections");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    match result {
                        Ok((socket, addr)) => self.admit(socket, addr).await,
                        Err(e) => tracing::error!("Error accepting connection: {:?}", e),
                    }
                }
                _ = shutdown.cancelled() => {
                    tracing::info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        self.drain().await;
        Ok(())
    }

    async fn admit(&self, mut socket: tokio::net::TcpStream, addr: SocketAddr) {
        if self.ctx.world.session_count() >= self.ctx.network.max_connections {
            tracing::warn!("Connection rejected: server full ({} sessions)", self.ctx.world.session_count());
            let _ = socket.shutdown().await;
            return;
        }

        let Some(id) = self.ctx.ids.acquire() else {
            tracing::warn!("Connection rejected: no free session id");
            let _ = socket.shutdown().await;
            return;
        };

        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!("Failed to set TCP_NODELAY for {}: {}", addr, e);
        }

        tracing::debug!("New connection from {}", addr);
        let (reader, writer) = socket.into_split();
        if let Err(e) = spawn_connection(&self.ctx, SessionId::new(id), reader, writer, addr.to_string()) {
            tracing::error!("Connection from {} not started: {}", addr, e);
        }
    }

    /// Close every session and wait for their cleanup.
    async fn drain(&self) {
        let sessions = self.ctx.world.sessions();
        tracing::info!("Closing {} sessions", sessions.len());
        for session in &sessions {
            session.close();
        }

        let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
        while self.ctx.ids.in_use() > 0 && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        let remaining = self.ctx.ids.in_use();
        if remaining > 0 {
            tracing::warn!("{} sessions still open after {:?}", remaining, DRAIN_TIMEOUT);
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats::collect(&self.ctx)
    }
}

/// Server statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStats {
    /// Current number of sessions
    pub sessions: usize,

    /// Sessions controlling a character
    pub characters: usize,

    /// Total bytes received from all sessions
    pub total_bytes_received: u64,

    /// Total bytes sent to all sessions
    pub total_bytes_sent: u64,

    /// Total messages handled for all sessions
    pub total_messages_handled: u64,
}

impl ServerStats {
    pub fn collect(ctx: &ServerContext) -> Self {
        let mut stats = Self::default();
        for session in ctx.world.sessions() {
            stats.sessions += 1;
            if session.character().is_some() {
                stats.characters += 1;
            }
            stats.total_bytes_received += session.bytes_received();
            stats.total_bytes_sent += session.bytes_sent();
            stats.total_messages_handled += session.messages_handled();
        }
        stats
    }
}

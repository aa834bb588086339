//! `PotsyncServer` builder and server loop.
//!
//! This is the entry point for running a potsync server. It ties together
//! all the layers: transport → protocol → engine → room store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use potsync_protocol::{Codec, JsonCodec};
use potsync_room::RoomConfig;
use potsync_store::Store;
use potsync_transport::{Transport, WebSocketTransport};
use tokio::net::TcpListener;

use crate::handler::handle_connection;
use crate::{Broadcaster, ConnectionHub, PotsyncError, SyncEngine, health};

/// How long a connection may stay silent before it is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// How often expired room snapshots are swept from the store.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState<S: Store, C: Codec> {
    pub(crate) engine: Arc<SyncEngine<S, ConnectionHub>>,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
}

/// Builder for configuring and starting a potsync server.
///
/// # Example
///
/// ```rust,ignore
/// let server = PotsyncServerBuilder::new()
///     .bind("0.0.0.0:8080")
///     .room_config(RoomConfig { max_players: 6, ..RoomConfig::default() })
///     .build(MemoryStore::new())
///     .await?;
/// server.run().await
/// ```
pub struct PotsyncServerBuilder {
    bind_addr: String,
    health_addr: Option<String>,
    room_config: RoomConfig,
    idle_timeout: Duration,
    sweep_interval: Duration,
}

impl PotsyncServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            health_addr: None,
            room_config: RoomConfig::default(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }

    /// Sets the address the WebSocket listener binds to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Serves `GET /health` on a separate address. Off by default.
    pub fn health_bind(mut self, addr: &str) -> Self {
        self.health_addr = Some(addr.to_string());
        self
    }

    /// Sets capacity, expiry, and default chips for rooms.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets how long a silent connection is kept open.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets how often expired rooms are purged from the store.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Binds the listeners and builds a server over `store`.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<S: Store>(
        self,
        store: S,
    ) -> Result<PotsyncServer<S, JsonCodec>, PotsyncError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let health = match &self.health_addr {
            Some(addr) => Some(
                TcpListener::bind(addr)
                    .await
                    .map_err(PotsyncError::Health)?,
            ),
            None => None,
        };

        let engine = SyncEngine::new(store, ConnectionHub::new(), self.room_config);
        let state = Arc::new(ServerState {
            engine: Arc::new(engine),
            codec: JsonCodec,
            idle_timeout: self.idle_timeout,
        });

        Ok(PotsyncServer {
            transport,
            health,
            state,
            sweep_interval: self.sweep_interval,
        })
    }
}

impl Default for PotsyncServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound potsync server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct PotsyncServer<S: Store, C: Codec> {
    transport: WebSocketTransport,
    health: Option<TcpListener>,
    state: Arc<ServerState<S, C>>,
    sweep_interval: Duration,
}

impl<S: Store, C: Codec> PotsyncServer<S, C> {
    /// Creates a new builder.
    pub fn builder() -> PotsyncServerBuilder {
        PotsyncServerBuilder::new()
    }

    /// Returns the address the WebSocket listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Returns the health listener's address, if one was configured.
    pub fn health_addr(&self) -> Option<std::io::Result<SocketAddr>> {
        self.health.as_ref().map(TcpListener::local_addr)
    }

    /// The engine every connection dispatches into.
    pub fn engine(&self) -> Arc<SyncEngine<S, ConnectionHub>> {
        Arc::clone(&self.state.engine)
    }

    /// Runs the accept loop, the store sweep, and the health endpoint if
    /// configured.
    ///
    /// Spawns a handler task for each accepted connection. Runs until the
    /// process is terminated.
    pub async fn run(mut self) -> Result<(), PotsyncError> {
        tokio::spawn(sweep_expired(self.engine(), self.sweep_interval));

        if let Some(listener) = self.health.take() {
            tokio::spawn(async move {
                if let Err(e) = health::serve(listener).await {
                    tracing::error!(error = %e, "health endpoint stopped");
                }
            });
        }

        tracing::info!(addr = ?self.local_addr().ok(), "potsync server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}

/// Purges expired snapshots every `period`, so rooms nobody reads again
/// still leave the store.
async fn sweep_expired<S: Store, B: Broadcaster>(
    engine: Arc<SyncEngine<S, B>>,
    period: Duration,
) {
    let period = period.max(Duration::from_millis(1));
    let mut ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        match engine.repository().store().purge_expired().await {
            Ok(0) => {}
            Ok(purged) => tracing::info!(purged, "expired rooms swept"),
            Err(e) => tracing::warn!(error = %e, "store sweep failed"),
        }
    }
}

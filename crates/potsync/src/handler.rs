//! Per-connection handler: frame decoding, intent dispatch, and delivery
//! of queued events.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Open an outbox in the connection hub
//!   2. Loop: receive a frame and dispatch it, write the next queued event
//!      to the socket, or ping the peer
//!   3. On exit, close the outbox and clean up the connection's membership

use std::sync::Arc;
use std::time::{Duration, Instant};

use potsync_protocol::{
    Codec, Envelope, ErrorKind, Payload, ServerEvent, SystemMessage,
};
use potsync_store::Store;
use potsync_transport::{Connection, ConnectionId, Frame, WebSocketConnection};
use tokio::time::MissedTickBehavior;

use crate::PotsyncError;
use crate::server::ServerState;

/// Drop guard that releases a connection's outbox and membership when the
/// handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, the engine's disconnect runs in a spawned task.
struct ConnectionGuard<S: Store, C: Codec> {
    conn: ConnectionId,
    state: Arc<ServerState<S, C>>,
}

impl<S: Store, C: Codec> Drop for ConnectionGuard<S, C> {
    fn drop(&mut self) {
        let conn = self.conn;
        self.state.engine.broadcaster().unregister(conn);

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            if let Err(e) = state.engine.disconnect(conn).await {
                tracing::warn!(%conn, error = %e, "disconnect cleanup failed");
            }
        });
    }
}

/// Outbound framing state for one connection.
struct Outbound {
    seq: u64,
    start: Instant,
}

impl Outbound {
    fn new() -> Self {
        Self {
            seq: 1,
            start: Instant::now(),
        }
    }

    /// Milliseconds since the connection was accepted.
    fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Wraps `payload` in the next envelope.
    fn envelope(&mut self, payload: Payload) -> Envelope {
        let seq = self.seq;
        self.seq += 1;
        Envelope {
            seq,
            timestamp: self.elapsed_ms(),
            payload,
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<S, C>(
    conn: WebSocketConnection,
    state: Arc<ServerState<S, C>>,
) -> Result<(), PotsyncError>
where
    S: Store,
    C: Codec,
{
    let conn_id = conn.id();
    tracing::debug!(%conn_id, "handling new connection");

    let mut outbox = state.engine.broadcaster().register(conn_id);
    let _guard = ConnectionGuard {
        conn: conn_id,
        state: Arc::clone(&state),
    };

    let mut out = Outbound::new();
    let mut deadline = tokio::time::Instant::now() + state.idle_timeout;

    // Ping twice per idle window so a silent but live peer answers in time.
    let ping_every = (state.idle_timeout / 2).max(Duration::from_millis(1));
    let mut pings = tokio::time::interval_at(
        tokio::time::Instant::now() + ping_every,
        ping_every,
    );
    pings.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            frame = tokio::time::timeout_at(deadline, conn.recv()) => {
                let frame = match frame {
                    Ok(Ok(Some(frame))) => frame,
                    Ok(Ok(None)) => {
                        tracing::info!(%conn_id, "connection closed cleanly");
                        break;
                    }
                    Ok(Err(e)) => {
                        tracing::debug!(%conn_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        tracing::info!(%conn_id, "connection timed out");
                        break;
                    }
                };
                // Any frame, keepalives included, counts as activity.
                deadline = tokio::time::Instant::now() + state.idle_timeout;

                let Frame::Data(data) = frame else {
                    continue;
                };
                if !handle_frame(&conn, &state, &data, &mut out).await? {
                    break;
                }
            }
            Some(event) = outbox.recv() => {
                send_payload(&conn, &state.codec, &mut out, Payload::Event(event))
                    .await?;
            }
            _ = pings.tick() => {
                conn.ping().await.map_err(PotsyncError::Transport)?;
            }
        }
    }

    // _guard drops here → outbox closes, disconnect fires.
    Ok(())
}

/// Decodes and dispatches one inbound frame. Returns `false` when the
/// client asked to close.
async fn handle_frame<S, C>(
    conn: &WebSocketConnection,
    state: &Arc<ServerState<S, C>>,
    data: &[u8],
    out: &mut Outbound,
) -> Result<bool, PotsyncError>
where
    S: Store,
    C: Codec,
{
    let conn_id = conn.id();

    let envelope: Envelope = match state.codec.decode(data) {
        Ok(env) => env,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "failed to decode envelope");
            send_bad_request(conn, &state.codec, out, format!("malformed frame: {e}"))
                .await?;
            return Ok(true);
        }
    };

    match envelope.payload {
        Payload::Intent(intent) => {
            state.engine.handle(conn_id, intent).await;
        }

        Payload::System(SystemMessage::Heartbeat { client_time }) => {
            let ack = SystemMessage::HeartbeatAck {
                client_time,
                server_time: out.elapsed_ms(),
            };
            send_payload(conn, &state.codec, out, Payload::System(ack)).await?;
        }

        Payload::System(SystemMessage::Disconnect { reason }) => {
            tracing::info!(%conn_id, %reason, "client disconnected");
            return Ok(false);
        }

        Payload::System(SystemMessage::HeartbeatAck { .. }) => {
            tracing::debug!(%conn_id, "ignoring heartbeat ack from client");
        }

        Payload::Event(_) => {
            send_bad_request(
                conn,
                &state.codec,
                out,
                "server events cannot be sent by clients".into(),
            )
            .await?;
        }
    }

    Ok(true)
}

/// Sends a `BadRequest` error event straight to the client.
async fn send_bad_request(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    out: &mut Outbound,
    message: String,
) -> Result<(), PotsyncError> {
    let event = ServerEvent::Error {
        kind: ErrorKind::BadRequest,
        message,
    };
    send_payload(conn, codec, out, Payload::Event(event)).await
}

/// Encodes `payload` into the next envelope and writes it to the socket.
async fn send_payload(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    out: &mut Outbound,
    payload: Payload,
) -> Result<(), PotsyncError> {
    let bytes = codec.encode(&out.envelope(payload))?;
    conn.send(&bytes).await.map_err(PotsyncError::Transport)?;
    Ok(())
}

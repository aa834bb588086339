//! Unified error type for potsync.

use potsync_protocol::ProtocolError;
use potsync_transport::TransportError;

/// Errors that stop a server or end a connection.
///
/// Room and store failures are not here: the engine reports those to the
/// client as error events and the connection carries on. The `#[from]`
/// conversions let `?` lift sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum PotsyncError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Binding or serving the health endpoint failed.
    #[error("health endpoint: {0}")]
    Health(#[source] std::io::Error),
}

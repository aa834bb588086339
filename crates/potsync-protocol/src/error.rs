//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames and snapshots.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed input, missing fields, or an
    /// unknown message tag.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but is not something this side accepts.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

//! Codec trait and implementations for serializing messages and snapshots.
//!
//! Both the connection handler (envelopes) and the room repository (stored
//! snapshots) go through a [`Codec`], so swapping the wire format is a
//! one-type change.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because one codec instance is shared by every
/// connection task.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T)
    -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// JSON keeps frames readable in browser DevTools and snapshots readable in
/// the store.
///
/// ```rust
/// use potsync_protocol::{Codec, Envelope, JsonCodec, Payload, SystemMessage};
///
/// let codec = JsonCodec;
/// let envelope = Envelope {
///     seq: 1,
///     timestamp: 5000,
///     payload: Payload::System(SystemMessage::Heartbeat { client_time: 5000 }),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Envelope, Intent, Payload, PlayerId, RoomId};

    #[test]
    fn test_json_codec_decodes_client_intent_frame() {
        let raw = br#"{
            "seq": 3,
            "timestamp": 120,
            "payload": {
                "type": "Intent",
                "data": {
                    "type": "ManualBet",
                    "room_id": "r1",
                    "player_id": "p1",
                    "amount": 200
                }
            }
        }"#;

        let envelope: Envelope = JsonCodec.decode(raw).unwrap();

        assert_eq!(envelope.seq, 3);
        assert_eq!(
            envelope.payload,
            Payload::Intent(Intent::ManualBet {
                room_id: RoomId::from("r1"),
                player_id: PlayerId::from("p1"),
                amount: 200,
            })
        );
    }

    #[test]
    fn test_json_codec_decode_garbage_is_decode_error() {
        let result: Result<Envelope, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}

//! The payload serializer seam: `codec` and everything built on it only ever depend on
//! this trait, never on a concrete schema format.

use thiserror::Error;

/// Failure from a [`Message`] implementation's encode or decode step.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload bytes did not conform to the expected schema.
    #[error("failed to deserialize payload: {0}")]
    Deserialize(String),
    /// The in-memory value could not be turned into bytes.
    #[error("failed to serialize payload: {0}")]
    Serialize(String),
}

/// A request or response body that can be carried as a [`Frame`](crate::frame::Frame)
/// payload.
///
/// Implementations are expected to be deterministic: encoding the same value twice
/// produces the same bytes, and `decode(encode(v))` recovers a value equal to `v`.
pub trait Message: Sized {
    /// Serializes `self` to bytes suitable for a frame's payload field.
    fn encode(&self) -> Result<Vec<u8>, CodecError>;

    /// Parses bytes previously produced by [`Message::encode`].
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;
}

impl Message for Vec<u8> {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(self.clone())
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(bytes.to_vec())
    }
}

impl Message for () {
    fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(Vec::new())
    }

    fn decode(_bytes: &[u8]) -> Result<Self, CodecError> {
        Ok(())
    }
}

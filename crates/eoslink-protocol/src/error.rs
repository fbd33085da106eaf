//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a frame into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a frame).
    ///
    /// Common causes: malformed JSON, an unknown channel name, or a
    /// payload whose fields don't match the channel's shape.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame decoded but violates the message contract.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The connector answered a request on a different channel than the
    /// one it was asked on.
    #[error("reply on channel `{got}` does not match request channel `{expected}`")]
    ChannelMismatch {
        expected: &'static str,
        got: &'static str,
    },
}

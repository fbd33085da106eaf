//! Error types for the bridge layer.

use eoslink_protocol::ProtocolError;

/// Errors that can settle a bridge call.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// The link to the connector is closed; nothing more can be sent or
    /// received.
    #[error("connector link closed")]
    Closed,

    /// The pending request was discarded before a reply arrived.
    #[error("reply for `{channel}` was dropped")]
    ReplyDropped { channel: &'static str },

    /// `send_async` was used for a fire-and-forget channel.
    #[error("channel `{0}` does not produce a reply")]
    NoReplyExpected(&'static str),

    /// The frame could not be encoded, or the reply didn't match.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

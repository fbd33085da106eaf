//! Unified error type for eoslink.

use eoslink_bridge::BridgeError;
use eoslink_protocol::ProtocolError;
use eoslink_session::SessionError;
use eoslink_transport::TransportError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` variants let `?` convert sub-crate errors directly.
#[derive(Debug, thiserror::Error)]
pub enum EosLinkError {
    /// Connecting to, or talking to, the connector failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The message bridge could not deliver a request or its reply.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// A session operation failed or the configuration is invalid.
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err: EosLinkError = TransportError::ConnectionClosed("gone".into()).into();
        assert!(matches!(err, EosLinkError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err: EosLinkError = ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, EosLinkError::Protocol(_)));
    }

    #[test]
    fn test_from_bridge_error() {
        let err: EosLinkError = BridgeError::Closed.into();
        assert!(matches!(err, EosLinkError::Bridge(_)));
    }

    #[test]
    fn test_from_session_error_keeps_message() {
        let err: EosLinkError = SessionError::InvalidConfig("no component".into()).into();
        assert!(matches!(err, EosLinkError::Session(_)));
        assert!(err.to_string().contains("no component"));
    }
}

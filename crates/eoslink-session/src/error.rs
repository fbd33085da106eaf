//! Error types for the session layer.

use eoslink_bridge::BridgeError;

/// Errors that can occur during session operations.
///
/// A connector that reports failure (`isOk: false`) is NOT an error here;
/// it surfaces as a failure trigger and [`Outcome::Failed`](crate::Outcome).
/// These variants cover the cases where no usable reply arrived at all.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The request never produced a usable reply (link closed, reply
    /// dropped, frame mismatch).
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The reply decoded but belongs to a different operation.
    #[error("unexpected reply on channel `{0}`")]
    UnexpectedReply(&'static str),

    /// The platform configuration could not be loaded.
    #[error("invalid platform configuration: {0}")]
    InvalidConfig(String),
}

//! Message bridge between the session core and the native connector.
//!
//! The bridge offers exactly three primitives:
//!
//! 1. [`MessageBridge::send_async`]: request/response. The returned
//!    future settles exactly once: with the connector's [`Reply`], or with
//!    a [`BridgeError`] if the transport goes away first.
//! 2. [`MessageBridge::send`]: fire-and-forget (used for keep-alive).
//! 3. [`MessageBridge::on_push`]: one handler per push channel for
//!    notifications the connector sends on its own.
//!
//! # How it fits in the stack
//!
//! ```text
//! Session Layer (above)  ← issues requests, handles status pushes
//!     ↕
//! Bridge (this crate)    ← correlates replies, routes pushes, orders writes
//!     ↕
//! Protocol / Transport   ← frames and bytes
//! ```
//!
//! [`Reply`]: eoslink_protocol::Reply

mod bridge;
mod error;

pub use bridge::{MessageBridge, PushHandler};
pub use error::BridgeError;

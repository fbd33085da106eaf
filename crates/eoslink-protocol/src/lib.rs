//! Message contract between the session core and the native connector.
//!
//! Every channel the connector understands is one variant of a tagged
//! union, so a payload with the wrong shape is rejected at the decode
//! boundary instead of surfacing later as a missing key.
//!
//! - **Types** ([`Request`], [`Reply`], [`Push`], [`Outbound`],
//!   [`Inbound`]): per-channel messages and the envelopes they travel in.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding or reply matching.
//!
//! ```text
//! Transport (bytes) → Protocol (Outbound / Inbound) → Bridge (pending replies, push handlers)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    AuthScopes, Inbound, InitParams, InitReply, LoginReply, LoginStatusChanged,
    OperationReply, Outbound, Push, PushChannel, Reply, Request,
};

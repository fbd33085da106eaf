//! Platform session management for eoslink.
//!
//! This crate owns the client-side view of the platform session:
//!
//! 1. **Configuration**: product/SDK settings and login scopes
//!    ([`PlatformConfig`])
//! 2. **Session state**: availability, login method, login status and the
//!    signed-in user's profile ([`SessionState`])
//! 3. **Session manager**: login/logout/achievement flows over the
//!    message bridge and the status-push handler ([`SessionManager`])
//! 4. **Event router**: the outcome triggers the host polls
//!    ([`Trigger`], [`EventRouter`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Host facade (above)     ← drives initialize / tick / operations
//!     ↕
//! Session Layer (this crate)  ← state machine and outcome triggers
//!     ↕
//! Bridge (below)          ← requests, replies, pushes
//! ```

mod config;
mod error;
mod events;
mod manager;
mod state;

pub use config::PlatformConfig;
pub use error::SessionError;
pub use events::{ChannelSink, EventRouter, NullSink, Trigger, TriggerSink};
pub use manager::{LoginCredentials, Outcome, SavedState, SessionManager};
pub use state::{LoginMethod, LoginStatus, Profile, SessionState};

pub use eoslink_protocol::AuthScopes;

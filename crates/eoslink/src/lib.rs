//! # eoslink
//!
//! Embedded client core for a native platform-authentication connector.
//!
//! A host application creates one [`Platform`] per process. The platform
//! keeps the client-side session (availability, login method, login
//! status, profile), talks to the native connector through a message
//! bridge, keeps the connector alive with a periodic tick, and reports
//! outcomes as [`Trigger`]s to the host's [`TriggerSink`].
//!
//! ```text
//! Host ──→ Platform ──→ SessionManager ──→ MessageBridge ──→ Connection ──→ connector
//!            │                ▲                   │
//!            └─ KeepAlive ────┼── platform-tick ──┘
//!                             └─── status pushes ─┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use eoslink::prelude::*;
//!
//! # async fn run() -> Result<(), EosLinkError> {
//! eoslink::init_tracing();
//!
//! let (sink, mut triggers) = ChannelSink::new();
//! let platform = Platform::builder()
//!     .config(PlatformConfig::default())
//!     .sink(sink)
//!     .connect("ws://127.0.0.1:6547")
//!     .await?;
//!
//! if platform.initialize().await? {
//!     platform.log_in_persistent().await?;
//! }
//! while let Some(trigger) = triggers.recv().await {
//!     println!("{trigger}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod platform;

pub use error::EosLinkError;
pub use platform::{Platform, PlatformBuilder};

pub use eoslink_bridge::MessageBridge;
pub use eoslink_session::{
    AuthScopes, ChannelSink, EventRouter, LoginCredentials, LoginMethod, LoginStatus, NullSink,
    Outcome, PlatformConfig, Profile, SavedState, SessionManager, SessionState, Trigger,
    TriggerSink,
};
pub use eoslink_tick::{KeepAliveConfig, KeepAliveMetrics, KeepAlivePhase};

/// Installs a `tracing` subscriber that honours `RUST_LOG` and defaults to
/// `info`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // Fails only if a global subscriber is already set.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{
        AuthScopes, ChannelSink, EosLinkError, KeepAliveConfig, LoginMethod, LoginStatus,
        Outcome, Platform, PlatformConfig, Profile, Trigger, TriggerSink,
    };
}

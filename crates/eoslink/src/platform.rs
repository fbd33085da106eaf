//! `Platform` host object and its builder.
//!
//! This is what a host application registers and drives. It ties the
//! layers together: connection → bridge → session, plus the keep-alive
//! scheduler that feeds `platform-tick` to the connector.

use std::sync::{Mutex, MutexGuard, PoisonError};

use eoslink_bridge::MessageBridge;
use eoslink_protocol::{JsonCodec, Request};
use eoslink_session::{
    EventRouter, LoginCredentials, LoginMethod, LoginStatus, NullSink, Outcome, PlatformConfig,
    Profile, SavedState, SessionManager, Trigger, TriggerSink,
};
use eoslink_tick::{KeepAliveConfig, KeepAliveMetrics, KeepAlivePhase, KeepAliveScheduler};
use eoslink_transport::{MemoryConnection, WebSocketConnection};

use crate::EosLinkError;

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for a [`Platform`].
///
/// # Example
///
/// ```rust,ignore
/// let platform = Platform::builder()
///     .config(config)
///     .sink(my_sink)
///     .connect("ws://127.0.0.1:6547")
///     .await?;
/// ```
pub struct PlatformBuilder {
    config: PlatformConfig,
    keep_alive: KeepAliveConfig,
    router: EventRouter,
}

impl PlatformBuilder {
    /// Creates a builder with default settings and a sink that discards
    /// triggers.
    pub fn new() -> Self {
        Self {
            config: PlatformConfig::default(),
            keep_alive: KeepAliveConfig::default(),
            router: EventRouter::new(NullSink),
        }
    }

    /// Sets the product/SDK configuration.
    pub fn config(mut self, config: PlatformConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the keep-alive configuration.
    pub fn keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets where triggers are delivered.
    pub fn sink(mut self, sink: impl TriggerSink) -> Self {
        self.router = EventRouter::new(sink);
        self
    }

    /// Builds the platform over an existing bridge. `None` means no
    /// connector is present and the platform stays unavailable.
    ///
    /// Must be called from within a Tokio runtime when a bridge is given.
    pub fn build(self, bridge: Option<MessageBridge>) -> Platform {
        Platform::assemble(self, bridge, false)
    }

    /// Connects to a connector process over WebSocket and builds the
    /// platform on that link. [`Platform::release`] closes the link.
    ///
    /// # Errors
    /// [`EosLinkError::Transport`] if the connection cannot be opened.
    pub async fn connect(self, url: &str) -> Result<Platform, EosLinkError> {
        let conn = WebSocketConnection::connect(url).await?;
        tracing::info!(url, "connected to platform connector");
        let bridge = MessageBridge::spawn(conn, JsonCodec);
        Ok(Platform::assemble(self, Some(bridge), true))
    }

    /// Builds the platform on one end of an in-process link and returns
    /// the other end for an embedded connector to serve.
    /// [`Platform::release`] closes the link.
    pub fn in_process(self) -> (Platform, MemoryConnection) {
        let (local, remote) = MemoryConnection::pair();
        let bridge = MessageBridge::spawn(local, JsonCodec);
        (Platform::assemble(self, Some(bridge), true), remote)
    }
}

impl Default for PlatformBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The host-facing platform object.
///
/// Lifecycle, as driven by the host:
///
/// ```text
/// new / builder ──→ initialize().await ──→ tick() every frame ──→ release()
///   │ keep-alive fallback timer starts       │ first tick hands the
///   │ status push handler registered         │ keep-alive over to frames
/// ```
///
/// Every method takes `&self`, so the platform can be shared behind an
/// `Arc` between the host's frame loop and the tasks awaiting operations.
pub struct Platform {
    session: SessionManager,
    bridge: Option<MessageBridge>,
    keep_alive: Mutex<Option<KeepAliveScheduler>>,
    /// Whether this platform opened the link and must close it on release.
    owns_link: bool,
}

impl Platform {
    /// Creates a new builder.
    pub fn builder() -> PlatformBuilder {
        PlatformBuilder::new()
    }

    /// Creates a platform with the default keep-alive settings.
    ///
    /// With a bridge, the status push handler is registered and the
    /// keep-alive fallback timer starts right away. Must then be called
    /// from within a Tokio runtime.
    pub fn new(config: PlatformConfig, bridge: Option<MessageBridge>, sink: impl TriggerSink) -> Self {
        Self::builder().config(config).sink(sink).build(bridge)
    }

    fn assemble(builder: PlatformBuilder, bridge: Option<MessageBridge>, owns_link: bool) -> Self {
        let session = SessionManager::new(builder.config, bridge.clone(), builder.router);

        let keep_alive = bridge.as_ref().map(|bridge| {
            let bridge = bridge.clone();
            KeepAliveScheduler::start(builder.keep_alive, move || {
                if let Err(e) = bridge.send(Request::PlatformTick) {
                    tracing::trace!(error = %e, "keep-alive not sent");
                }
            })
        });

        Self {
            session,
            bridge,
            keep_alive: Mutex::new(keep_alive),
            owns_link,
        }
    }

    // -- host capability interface --

    /// Runs the initialization exchange. Awaited by the host's load
    /// sequence; returns whether the platform is available.
    ///
    /// # Errors
    /// [`EosLinkError::Session`] if the connector never answered.
    pub async fn initialize(&self) -> Result<bool, EosLinkError> {
        Ok(self.session.initialize().await?)
    }

    /// Host per-frame callback. The first call takes over the keep-alive
    /// from the fallback timer.
    pub fn tick(&self) {
        if let Some(keep_alive) = self.keep_alive().as_mut() {
            keep_alive.on_frame();
        }
    }

    /// Tears the platform down: unregisters the status push handler and
    /// stops the keep-alive. Closes the link if the platform opened it.
    /// Safe to call more than once.
    pub fn release(&self) {
        self.session.detach_push_handler();
        if let Some(mut keep_alive) = self.keep_alive().take() {
            keep_alive.stop();
        }
        if let Some(bridge) = self.bridge.as_ref().filter(|_| self.owns_link) {
            bridge.close();
        }
        tracing::debug!("platform released");
    }

    pub fn save(&self) -> SavedState {
        self.session.save()
    }

    pub fn restore(&self, saved: SavedState) {
        self.session.restore(saved);
    }

    /// The underlying session manager.
    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Current keep-alive phase; `Stopped` without a connector or after
    /// release.
    pub fn keep_alive_phase(&self) -> KeepAlivePhase {
        self.keep_alive()
            .as_ref()
            .map_or(KeepAlivePhase::Stopped, KeepAliveScheduler::phase)
    }

    pub fn keep_alive_metrics(&self) -> KeepAliveMetrics {
        self.keep_alive()
            .as_ref()
            .map(KeepAliveScheduler::metrics)
            .unwrap_or_default()
    }

    // -- operations --

    pub async fn log_in(&self, credentials: LoginCredentials) -> Result<Outcome, EosLinkError> {
        Ok(self.session.log_in(credentials).await?)
    }

    pub async fn log_in_portal(&self) -> Result<Outcome, EosLinkError> {
        Ok(self.session.log_in_portal().await?)
    }

    pub async fn log_in_persistent(&self) -> Result<Outcome, EosLinkError> {
        Ok(self.session.log_in_persistent().await?)
    }

    pub async fn log_in_exchange_code(
        &self,
        exchange_code: impl Into<String>,
    ) -> Result<Outcome, EosLinkError> {
        Ok(self.session.log_in_exchange_code(exchange_code).await?)
    }

    pub async fn log_in_dev_auth_tool(
        &self,
        host: impl Into<String>,
        credential_name: impl Into<String>,
    ) -> Result<Outcome, EosLinkError> {
        Ok(self
            .session
            .log_in_dev_auth_tool(host, credential_name)
            .await?)
    }

    pub async fn log_out(&self) -> Result<Outcome, EosLinkError> {
        Ok(self.session.log_out().await?)
    }

    pub async fn unlock_achievement(&self, achievement_id: &str) -> Result<bool, EosLinkError> {
        Ok(self.session.unlock_achievement(achievement_id).await?)
    }

    // -- conditions --

    pub fn is_available(&self) -> bool {
        self.session.is_available()
    }

    pub fn is_platform_launcher(&self) -> bool {
        self.session.is_platform_launcher()
    }

    pub fn compare_login_method(&self, method: LoginMethod) -> bool {
        self.session.compare_login_method(method)
    }

    pub fn achievement_matches(&self, achievement_id: &str) -> bool {
        self.session.achievement_matches(achievement_id)
    }

    pub fn trigger_matches(&self, trigger: &Trigger, filter: &str) -> bool {
        self.session.trigger_matches(trigger, filter)
    }

    // -- expressions --

    /// Host-facing status string (`"logged-in"`, …).
    pub fn login_status(&self) -> &'static str {
        self.session.login_status().as_str()
    }

    pub fn login_status_kind(&self) -> LoginStatus {
        self.session.login_status()
    }

    /// Host-facing login method code (`-1` for none).
    pub fn login_method(&self) -> i32 {
        self.session.login_method().code()
    }

    pub fn launcher_exchange_code(&self) -> String {
        self.session.launcher_exchange_code()
    }

    pub fn account_id(&self) -> String {
        self.session.account_id()
    }

    pub fn display_name(&self) -> String {
        self.session.display_name()
    }

    pub fn display_name_sanitized(&self) -> String {
        self.session.display_name_sanitized()
    }

    pub fn nickname(&self) -> String {
        self.session.nickname()
    }

    pub fn preferred_language(&self) -> String {
        self.session.preferred_language()
    }

    pub fn user_country(&self) -> String {
        self.session.user_country()
    }

    pub fn last_achievement_id(&self) -> String {
        self.session.last_achievement_id()
    }

    pub fn profile(&self) -> Profile {
        self.session.profile()
    }

    fn keep_alive(&self) -> MutexGuard<'_, Option<KeepAliveScheduler>> {
        self.keep_alive.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

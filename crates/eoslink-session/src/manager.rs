//! The session manager: login, logout and achievement flows.
//!
//! Each operation follows the same shape:
//!
//! ```text
//! guard on `available` ──→ local bookkeeping ──→ send_async ──→ apply reply ──→ fire trigger(s)
//!        │ (unavailable)
//!        ▼
//!   Skipped / false, nothing sent, nothing fired
//! ```
//!
//! The connector's status push takes a separate path: the bridge calls the
//! handler registered in [`SessionManager::new`] directly, and only that
//! path changes `login_status`.
//!
//! # Concurrency
//!
//! Operations are not serialized against each other. Two overlapping
//! logins both go out, and whichever reply arrives last decides the
//! profile. The state lock is never held across an await or while a
//! trigger is fired.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use eoslink_bridge::MessageBridge;
use eoslink_protocol::{AuthScopes, Push, PushChannel, Reply, Request};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    EventRouter, LoginMethod, LoginStatus, PlatformConfig, Profile, SessionError,
    SessionState, Trigger,
};

// ---------------------------------------------------------------------------
// Operation inputs and outputs
// ---------------------------------------------------------------------------

/// Selects a login flow and carries its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginCredentials {
    Portal,
    Persistent,
    /// Exchange code, typically the launcher's.
    ExchangeCode(String),
    /// Developer authentication tool at `host`, using the named credential.
    DevAuthTool { host: String, credential_name: String },
}

impl LoginCredentials {
    pub fn method(&self) -> LoginMethod {
        match self {
            LoginCredentials::Portal => LoginMethod::Portal,
            LoginCredentials::Persistent => LoginMethod::Persistent,
            LoginCredentials::ExchangeCode(_) => LoginMethod::ExchangeCode,
            LoginCredentials::DevAuthTool { .. } => LoginMethod::DevAuthTool,
        }
    }

    fn into_request(self, scopes: AuthScopes) -> Request {
        match self {
            LoginCredentials::Portal => Request::LogInPortal { scopes },
            LoginCredentials::Persistent => Request::LogInPersistent { scopes },
            LoginCredentials::ExchangeCode(exchange_code) => Request::LogInExchangeCode {
                scopes,
                exchange_code,
            },
            LoginCredentials::DevAuthTool {
                host,
                credential_name,
            } => Request::LogInDevAuthTool {
                scopes,
                host,
                credential_name,
            },
        }
    }
}

/// How an operation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The platform is unavailable; nothing was sent.
    Skipped,
    /// The connector reported success.
    Succeeded,
    /// The connector reported failure.
    Failed,
}

/// Persisted session fields. There are none: the session is rebuilt from
/// the connector on every start.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedState {}

// ---------------------------------------------------------------------------
// SessionManager
// ---------------------------------------------------------------------------

/// Owns the session state and drives every session operation.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    config: Arc<PlatformConfig>,
    /// `None` when no connector is present. The session then stays
    /// unavailable for good.
    bridge: Option<MessageBridge>,
    state: Arc<RwLock<SessionState>>,
    router: EventRouter,
}

impl SessionManager {
    /// Creates the session and, when a connector is present, registers the
    /// status push handler.
    pub fn new(config: PlatformConfig, bridge: Option<MessageBridge>, router: EventRouter) -> Self {
        let manager = Self {
            config: Arc::new(config),
            bridge,
            state: Arc::new(RwLock::new(SessionState::default())),
            router,
        };
        manager.attach_push_handler();
        manager
    }

    fn attach_push_handler(&self) {
        let Some(bridge) = &self.bridge else {
            debug!("no connector present, session stays unavailable");
            return;
        };

        let state = Arc::clone(&self.state);
        let router = self.router.clone();
        bridge.on_push(PushChannel::LoginStatusChanged, move |push| match push {
            Push::OnLoginStatusChanged(changed) => {
                apply_status_push(&state, &router, changed.login_status);
            }
        });
    }

    /// Unregisters the status push handler. Used at teardown.
    pub fn detach_push_handler(&self) {
        if let Some(bridge) = &self.bridge {
            bridge.remove_push_handler(PushChannel::LoginStatusChanged);
        }
    }

    /// Whether a connector was supplied at construction.
    pub fn has_connector(&self) -> bool {
        self.bridge.is_some()
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    // -- operations --

    /// Runs the `init` exchange and records whether the platform is
    /// available. Returns the resulting availability.
    ///
    /// Without a connector nothing is sent and the result is `false`.
    /// An unavailable platform is not an error.
    ///
    /// # Errors
    /// [`SessionError::Bridge`] if no reply arrived; the session stays
    /// unavailable.
    pub async fn initialize(&self) -> Result<bool, SessionError> {
        let Some(bridge) = &self.bridge else {
            return Ok(false);
        };

        let request = Request::Init(self.config.init_params());
        let reply = match bridge.send_async(request).await {
            Ok(reply) => reply.into_init().ok_or(SessionError::UnexpectedReply("init"))?,
            Err(e) => {
                warn!(error = %e, "platform initialization failed");
                return Err(e.into());
            }
        };

        let available = reply.is_available;
        self.write().apply_init(reply);

        let state = self.read();
        info!(
            available,
            launcher = state.is_platform_launcher(),
            "platform initialized"
        );
        Ok(available)
    }

    /// Logs in with the given flow.
    ///
    /// The login method is recorded before the request goes out. On success
    /// the whole profile is replaced and `LoginComplete` fires; otherwise
    /// `LoginFailed` fires and the profile is left as it was.
    ///
    /// # Errors
    /// [`SessionError::Bridge`] if no reply arrived. `LoginFailed` has
    /// already fired.
    pub async fn log_in(&self, credentials: LoginCredentials) -> Result<Outcome, SessionError> {
        let Some(bridge) = self.available_bridge() else {
            debug!("platform unavailable, login skipped");
            return Ok(Outcome::Skipped);
        };

        let method = credentials.method();
        self.write().begin_login(method);
        info!(%method, "login requested");

        let request = credentials.into_request(self.config.scopes);
        let reply = match self.exchange(bridge, request, Reply::into_login).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(%method, error = %e, "login request failed");
                self.router.fire(Trigger::LoginFailed);
                return Err(e);
            }
        };

        let succeeded = self.write().apply_login(reply);
        if succeeded {
            info!(%method, account_id = %self.read().profile().account_id, "login complete");
            self.router.fire(Trigger::LoginComplete);
            Ok(Outcome::Succeeded)
        } else {
            info!(%method, "login rejected by connector");
            self.router.fire(Trigger::LoginFailed);
            Ok(Outcome::Failed)
        }
    }

    pub async fn log_in_portal(&self) -> Result<Outcome, SessionError> {
        self.log_in(LoginCredentials::Portal).await
    }

    pub async fn log_in_persistent(&self) -> Result<Outcome, SessionError> {
        self.log_in(LoginCredentials::Persistent).await
    }

    pub async fn log_in_exchange_code(
        &self,
        exchange_code: impl Into<String>,
    ) -> Result<Outcome, SessionError> {
        self.log_in(LoginCredentials::ExchangeCode(exchange_code.into()))
            .await
    }

    pub async fn log_in_dev_auth_tool(
        &self,
        host: impl Into<String>,
        credential_name: impl Into<String>,
    ) -> Result<Outcome, SessionError> {
        self.log_in(LoginCredentials::DevAuthTool {
            host: host.into(),
            credential_name: credential_name.into(),
        })
        .await
    }

    /// Logs out.
    ///
    /// On success the login method resets, the profile clears and
    /// `LogoutComplete` fires. On failure only `LogoutFailed` fires.
    ///
    /// # Errors
    /// [`SessionError::Bridge`] if no reply arrived. `LogoutFailed` has
    /// already fired.
    pub async fn log_out(&self) -> Result<Outcome, SessionError> {
        let Some(bridge) = self.available_bridge() else {
            debug!("platform unavailable, logout skipped");
            return Ok(Outcome::Skipped);
        };

        let reply = match self
            .exchange(bridge, Request::LogOut, Reply::into_operation)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "logout request failed");
                self.router.fire(Trigger::LogoutFailed);
                return Err(e);
            }
        };

        if reply.is_ok {
            self.write().apply_logout();
            info!("logout complete");
            self.router.fire(Trigger::LogoutComplete);
            Ok(Outcome::Succeeded)
        } else {
            info!("logout rejected by connector");
            self.router.fire(Trigger::LogoutFailed);
            Ok(Outcome::Failed)
        }
    }

    /// Unlocks an achievement and returns whether the connector accepted
    /// it. Returns `false` without sending when unavailable.
    ///
    /// `achievement_id` becomes the last achievement id before the request
    /// goes out, and again when its reply is applied. The id-specific
    /// trigger fired for the reply carries `achievement_id` itself.
    ///
    /// # Errors
    /// [`SessionError::Bridge`] if no reply arrived. The `Error` trigger
    /// pair has already fired.
    pub async fn unlock_achievement(&self, achievement_id: &str) -> Result<bool, SessionError> {
        let Some(bridge) = self.available_bridge() else {
            debug!(achievement_id, "platform unavailable, unlock skipped");
            return Ok(false);
        };

        self.write().record_achievement(achievement_id);
        let request = Request::UnlockAchievement {
            achievement_id: achievement_id.to_owned(),
        };

        let unlocked = match self.exchange(bridge, request, Reply::into_operation).await {
            Ok(reply) => reply.is_ok,
            Err(e) => {
                warn!(achievement_id, error = %e, "unlock request failed");
                self.fire_achievement(achievement_id, false);
                return Err(e);
            }
        };

        info!(achievement_id, unlocked, "achievement unlock finished");
        self.fire_achievement(achievement_id, unlocked);
        Ok(unlocked)
    }

    /// Applies an unsolicited status code from the connector.
    ///
    /// Known codes update the status (code `0` also resets the login
    /// method); unknown codes are logged and change nothing.
    /// `LoginStatusChanged` fires either way.
    pub fn on_status_push(&self, code: i32) {
        apply_status_push(&self.state, &self.router, code);
    }

    // -- conditions --

    pub fn is_available(&self) -> bool {
        self.read().is_available()
    }

    pub fn is_platform_launcher(&self) -> bool {
        self.read().is_platform_launcher()
    }

    pub fn compare_login_method(&self, method: LoginMethod) -> bool {
        self.read().login_method() == method
    }

    /// Case-insensitive comparison against the last achievement id.
    pub fn achievement_matches(&self, achievement_id: &str) -> bool {
        self.read().last_achievement_id().to_lowercase() == achievement_id.to_lowercase()
    }

    /// Evaluates a fired trigger for the host. See [`Trigger::matches`];
    /// the id compared is the one captured when the trigger fired, not the
    /// current last achievement id.
    pub fn trigger_matches(&self, trigger: &Trigger, filter: &str) -> bool {
        trigger.matches(filter)
    }

    // -- expressions --

    pub fn login_method(&self) -> LoginMethod {
        self.read().login_method()
    }

    pub fn login_status(&self) -> LoginStatus {
        self.read().login_status()
    }

    pub fn launcher_exchange_code(&self) -> String {
        self.read().launcher_exchange_code().to_owned()
    }

    pub fn account_id(&self) -> String {
        self.read().profile().account_id.clone()
    }

    pub fn display_name(&self) -> String {
        self.read().profile().display_name.clone()
    }

    pub fn display_name_sanitized(&self) -> String {
        self.read().profile().display_name_sanitized.clone()
    }

    pub fn nickname(&self) -> String {
        self.read().profile().nickname.clone()
    }

    pub fn preferred_language(&self) -> String {
        self.read().profile().preferred_language.clone()
    }

    pub fn user_country(&self) -> String {
        self.read().profile().country.clone()
    }

    pub fn last_achievement_id(&self) -> String {
        self.read().last_achievement_id().to_owned()
    }

    /// Snapshot of the whole profile.
    pub fn profile(&self) -> Profile {
        self.read().profile().clone()
    }

    /// Snapshot of the whole session state.
    pub fn snapshot(&self) -> SessionState {
        self.read().clone()
    }

    // -- save / restore --

    pub fn save(&self) -> SavedState {
        SavedState::default()
    }

    pub fn restore(&self, _saved: SavedState) {
        debug!("restore requested, no session fields are persisted");
    }

    // -- internals --

    fn available_bridge(&self) -> Option<&MessageBridge> {
        self.bridge.as_ref().filter(|_| self.is_available())
    }

    /// Sends `request` and unpacks the reply body.
    async fn exchange<T>(
        &self,
        bridge: &MessageBridge,
        request: Request,
        unpack: fn(Reply) -> Option<T>,
    ) -> Result<T, SessionError> {
        let channel = request.channel();
        let reply = bridge.send_async(request).await?;
        unpack(reply).ok_or(SessionError::UnexpectedReply(channel))
    }

    fn fire_achievement(&self, achievement_id: &str, unlocked: bool) {
        self.write().record_achievement(achievement_id);
        let achievement_id = achievement_id.to_owned();
        if unlocked {
            self.router.fire(Trigger::AnyAchievementUnlockSuccess);
            self.router.fire(Trigger::AchievementUnlockSuccess { achievement_id });
        } else {
            self.router.fire(Trigger::AnyAchievementUnlockError);
            self.router.fire(Trigger::AchievementUnlockError { achievement_id });
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared by [`SessionManager::on_status_push`] and the bridge handler.
fn apply_status_push(state: &RwLock<SessionState>, router: &EventRouter, code: i32) {
    let applied = state
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .apply_status(code);

    match applied {
        Some(status) => info!(code, %status, "login status changed"),
        None => warn!(code, "unrecognized login status code ignored"),
    }
    router.fire(Trigger::LoginStatusChanged);
}

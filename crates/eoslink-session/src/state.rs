//! Session state and its transitions.
//!
//! [`SessionState`] is a plain value. The [`SessionManager`](crate::SessionManager)
//! owns the only instance and is the only caller of the `pub(crate)`
//! transition methods below; everything public is read-only.

use std::fmt;

use eoslink_protocol::{InitReply, LoginReply};

// ---------------------------------------------------------------------------
// LoginMethod
// ---------------------------------------------------------------------------

/// The method of the most recent login attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoginMethod {
    /// No attempt since the last reset.
    #[default]
    None,
    /// Browser account portal.
    Portal,
    /// Stored refresh token from a previous login.
    Persistent,
    /// Exchange code handed over by the platform launcher.
    ExchangeCode,
    /// Local developer authentication tool.
    DevAuthTool,
}

impl LoginMethod {
    /// Host-facing numeric code: `-1` for `None`, then `0..=3`.
    pub fn code(self) -> i32 {
        match self {
            LoginMethod::None => -1,
            LoginMethod::Portal => 0,
            LoginMethod::Persistent => 1,
            LoginMethod::ExchangeCode => 2,
            LoginMethod::DevAuthTool => 3,
        }
    }

    /// Inverse of [`code`](Self::code).
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(LoginMethod::None),
            0 => Some(LoginMethod::Portal),
            1 => Some(LoginMethod::Persistent),
            2 => Some(LoginMethod::ExchangeCode),
            3 => Some(LoginMethod::DevAuthTool),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LoginMethod::None => "none",
            LoginMethod::Portal => "portal",
            LoginMethod::Persistent => "persistent",
            LoginMethod::ExchangeCode => "exchange-code",
            LoginMethod::DevAuthTool => "dev-auth-tool",
        }
    }
}

impl fmt::Display for LoginMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// LoginStatus
// ---------------------------------------------------------------------------

/// Authoritative session status, as last pushed by the connector.
///
/// ```text
/// NotLoggedIn ──push(1)──→ UsingLocalProfile ──push(2)──→ LoggedIn
///      ▲  └──────────────push(2)───────────────────────────┘   │
///      └──────────────────────push(0)──────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LoginStatus {
    #[default]
    NotLoggedIn,
    LoggedIn,
    UsingLocalProfile,
}

impl LoginStatus {
    /// Maps a pushed status code. Unknown codes yield `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(LoginStatus::NotLoggedIn),
            1 => Some(LoginStatus::UsingLocalProfile),
            2 => Some(LoginStatus::LoggedIn),
            _ => None,
        }
    }

    /// Host-facing status string.
    pub fn as_str(self) -> &'static str {
        match self {
            LoginStatus::NotLoggedIn => "not-logged-in",
            LoginStatus::LoggedIn => "logged-in",
            LoginStatus::UsingLocalProfile => "using-local-profile",
        }
    }
}

impl fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// The signed-in user's attributes.
///
/// Always replaced or cleared as a whole; never partially updated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    pub account_id: String,
    pub display_name: String,
    pub display_name_sanitized: String,
    pub nickname: String,
    pub preferred_language: String,
    pub country: String,
}

impl Profile {
    /// `true` when no login has populated the profile.
    pub fn is_empty(&self) -> bool {
        *self == Profile::default()
    }
}

impl From<LoginReply> for Profile {
    fn from(reply: LoginReply) -> Self {
        Self {
            account_id: reply.account_id,
            display_name: reply.display_name,
            display_name_sanitized: reply.display_name_sanitized,
            nickname: reply.nickname,
            preferred_language: reply.preferred_language,
            country: reply.country,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The client-side view of the platform session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    available: bool,
    is_platform_launcher: bool,
    launcher_exchange_code: String,
    login_method: LoginMethod,
    login_status: LoginStatus,
    profile: Profile,
    last_achievement_id: String,
}

impl SessionState {
    /// Whether the connector initialized successfully.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Whether the host process was started by the platform launcher.
    pub fn is_platform_launcher(&self) -> bool {
        self.is_platform_launcher
    }

    pub fn launcher_exchange_code(&self) -> &str {
        &self.launcher_exchange_code
    }

    pub fn login_method(&self) -> LoginMethod {
        self.login_method
    }

    pub fn login_status(&self) -> LoginStatus {
        self.login_status
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The id most recently submitted for unlocking.
    pub fn last_achievement_id(&self) -> &str {
        &self.last_achievement_id
    }

    // -- transitions, driven by the session manager --

    /// Applies the `init` reply. Launcher details are only taken when the
    /// connector reports itself available.
    pub(crate) fn apply_init(&mut self, reply: InitReply) {
        self.available = reply.is_available;
        if reply.is_available {
            self.is_platform_launcher = reply.is_platform_launcher;
            self.launcher_exchange_code = reply.launcher_exchange_code;
        }
    }

    /// Records the method before its request goes out.
    pub(crate) fn begin_login(&mut self, method: LoginMethod) {
        self.login_method = method;
    }

    /// Applies a login reply. Returns whether the login succeeded; on
    /// failure the profile is left untouched.
    pub(crate) fn apply_login(&mut self, reply: LoginReply) -> bool {
        if !reply.is_ok {
            return false;
        }
        self.profile = Profile::from(reply);
        true
    }

    /// Applies a successful logout.
    pub(crate) fn apply_logout(&mut self) {
        self.login_method = LoginMethod::None;
        self.profile = Profile::default();
    }

    /// Applies a pushed status code. Unknown codes change nothing and
    /// yield `None`.
    pub(crate) fn apply_status(&mut self, code: i32) -> Option<LoginStatus> {
        let status = LoginStatus::from_code(code)?;
        self.login_status = status;
        if status == LoginStatus::NotLoggedIn {
            self.login_method = LoginMethod::None;
        }
        Some(status)
    }

    pub(crate) fn record_achievement(&mut self, id: &str) {
        id.clone_into(&mut self.last_achievement_id);
    }
}

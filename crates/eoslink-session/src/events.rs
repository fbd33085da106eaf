//! Outcome triggers and the router that forwards them to the host.
//!
//! A trigger is a named notification that some outcome just happened. The
//! router holds no state of its own: firing hands the trigger straight to
//! the host's [`TriggerSink`]. The id-specific achievement triggers carry
//! the id they were fired for, so the host can evaluate them with
//! [`Trigger::matches`] whenever it gets around to draining them.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Every outcome the session reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Trigger {
    LoginComplete,
    LoginFailed,
    LogoutComplete,
    LogoutFailed,
    LoginStatusChanged,
    /// Some achievement unlocked.
    AnyAchievementUnlockSuccess,
    /// The achievement whose id the host filters on unlocked.
    AchievementUnlockSuccess { achievement_id: String },
    /// Some achievement failed to unlock.
    AnyAchievementUnlockError,
    /// The achievement whose id the host filters on failed to unlock.
    AchievementUnlockError { achievement_id: String },
}

impl Trigger {
    /// Whether the host evaluates this trigger against an achievement id
    /// filter instead of treating it as unconditionally true.
    pub fn takes_achievement_filter(&self) -> bool {
        self.achievement_id().is_some()
    }

    /// The id an achievement-specific trigger was fired for.
    pub fn achievement_id(&self) -> Option<&str> {
        match self {
            Trigger::AchievementUnlockSuccess { achievement_id }
            | Trigger::AchievementUnlockError { achievement_id } => Some(achievement_id),
            _ => None,
        }
    }

    /// Evaluates the trigger against the host's filter. Triggers without an
    /// id filter are always true; the achievement-specific ones compare
    /// `filter` case-insensitively against the id they were fired for.
    pub fn matches(&self, filter: &str) -> bool {
        self.achievement_id()
            .is_none_or(|id| id.to_lowercase() == filter.to_lowercase())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Trigger::LoginComplete => "login-complete",
            Trigger::LoginFailed => "login-failed",
            Trigger::LogoutComplete => "logout-complete",
            Trigger::LogoutFailed => "logout-failed",
            Trigger::LoginStatusChanged => "login-status-changed",
            Trigger::AnyAchievementUnlockSuccess => "any-achievement-unlock-success",
            Trigger::AchievementUnlockSuccess { .. } => "achievement-unlock-success",
            Trigger::AnyAchievementUnlockError => "any-achievement-unlock-error",
            Trigger::AchievementUnlockError { .. } => "achievement-unlock-error",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// The host's dispatch mechanism.
///
/// Called synchronously, possibly from the bridge's reader task, so an
/// implementation must not block. Panicking on the reader task closes the
/// link and fails every pending request. Implemented for any `Fn(Trigger)`
/// closure.
pub trait TriggerSink: Send + Sync + 'static {
    fn fire(&self, trigger: Trigger);
}

impl<F> TriggerSink for F
where
    F: Fn(Trigger) + Send + Sync + 'static,
{
    fn fire(&self, trigger: Trigger) {
        self(trigger)
    }
}

/// Forwards triggers to an unbounded channel, in fire order.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl ChannelSink {
    /// Creates the sink and the receiver the host drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Trigger>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl TriggerSink for ChannelSink {
    fn fire(&self, trigger: Trigger) {
        if let Err(mpsc::error::SendError(trigger)) = self.tx.send(trigger) {
            tracing::debug!(%trigger, "trigger receiver gone, dropped");
        }
    }
}

/// Discards every trigger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TriggerSink for NullSink {
    fn fire(&self, _trigger: Trigger) {}
}

// ---------------------------------------------------------------------------
// EventRouter
// ---------------------------------------------------------------------------

/// Thin conduit from the session manager to the host's sink.
#[derive(Clone)]
pub struct EventRouter {
    sink: Arc<dyn TriggerSink>,
}

impl EventRouter {
    pub fn new(sink: impl TriggerSink) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }

    /// Notifies the host that `trigger` is newly true.
    pub fn fire(&self, trigger: Trigger) {
        tracing::debug!(%trigger, "trigger fired");
        self.sink.fire(trigger);
    }
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter").finish_non_exhaustive()
    }
}

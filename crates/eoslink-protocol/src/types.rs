//! Per-channel message types and the frame envelopes that carry them.
//!
//! Channel names and field names match what the native connector speaks,
//! so the serde attributes here ARE the wire contract:
//!
//! ```text
//! → {"id":3,"request":{"channel":"log-in-exchange-code","params":{"scopes":{…},"exchangeCode":"XYZ"}}}
//! ← {"kind":"reply","id":3,"reply":{"channel":"log-in-exchange-code","result":{"isOk":false}}}
//! ← {"kind":"push","push":{"channel":"on-login-status-changed","params":{"loginStatus":2}}}
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// Authorization scopes requested with every login.
///
/// Each flag is independent. The default asks for the basic profile only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthScopes {
    pub basic_profile: bool,
    pub friends_list: bool,
    pub presence: bool,
    pub country: bool,
}

impl Default for AuthScopes {
    fn default() -> Self {
        Self {
            basic_profile: true,
            friends_list: false,
            presence: false,
            country: false,
        }
    }
}

/// Product and SDK settings sent once with the `init` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitParams {
    pub product_name: String,
    pub product_version: String,
    pub product_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub sandbox_id: String,
    pub deployment_id: String,
}

/// A message sent to the connector, one variant per channel.
///
/// Every variant except [`Request::PlatformTick`] expects exactly one
/// [`Reply`] on the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "channel",
    content = "params",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum Request {
    Init(InitParams),
    LogInPortal {
        scopes: AuthScopes,
    },
    LogInPersistent {
        scopes: AuthScopes,
    },
    LogInExchangeCode {
        scopes: AuthScopes,
        exchange_code: String,
    },
    #[serde(rename = "log-in-devauthtool")]
    LogInDevAuthTool {
        scopes: AuthScopes,
        host: String,
        credential_name: String,
    },
    LogOut,
    UnlockAchievement {
        achievement_id: String,
    },
    /// Keep-alive; fire-and-forget.
    PlatformTick,
}

impl Request {
    /// The wire name of this request's channel.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::LogInPortal { .. } => "log-in-portal",
            Self::LogInPersistent { .. } => "log-in-persistent",
            Self::LogInExchangeCode { .. } => "log-in-exchange-code",
            Self::LogInDevAuthTool { .. } => "log-in-devauthtool",
            Self::LogOut => "log-out",
            Self::UnlockAchievement { .. } => "unlock-achievement",
            Self::PlatformTick => "platform-tick",
        }
    }

    /// Whether the connector answers this request.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Self::PlatformTick)
    }
}

// ---------------------------------------------------------------------------
// Reply payloads
// ---------------------------------------------------------------------------

/// Result of the `init` exchange.
///
/// A missing `isAvailable` flag counts as unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InitReply {
    pub is_available: bool,
    #[serde(rename = "isEpicLauncher")]
    pub is_platform_launcher: bool,
    pub launcher_exchange_code: String,
}

/// Result of any of the four login requests.
///
/// On failure the connector sends only `isOk: false`; the profile fields
/// then default to empty and must not be applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoginReply {
    pub is_ok: bool,
    #[serde(rename = "epicAccountIdStr")]
    pub account_id: String,
    pub display_name: String,
    pub display_name_sanitized: String,
    pub nickname: String,
    pub preferred_language: String,
    pub country: String,
}

/// Result of a request that only reports success or failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OperationReply {
    pub is_ok: bool,
}

/// The connector's answer to a [`Request`], tagged with the same channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "result", rename_all = "kebab-case")]
pub enum Reply {
    Init(InitReply),
    LogInPortal(LoginReply),
    LogInPersistent(LoginReply),
    LogInExchangeCode(LoginReply),
    #[serde(rename = "log-in-devauthtool")]
    LogInDevAuthTool(LoginReply),
    LogOut(OperationReply),
    UnlockAchievement(OperationReply),
}

impl Reply {
    /// The wire name of this reply's channel.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::LogInPortal(_) => "log-in-portal",
            Self::LogInPersistent(_) => "log-in-persistent",
            Self::LogInExchangeCode(_) => "log-in-exchange-code",
            Self::LogInDevAuthTool(_) => "log-in-devauthtool",
            Self::LogOut(_) => "log-out",
            Self::UnlockAchievement(_) => "unlock-achievement",
        }
    }

    /// Extracts the `init` result.
    pub fn into_init(self) -> Option<InitReply> {
        match self {
            Self::Init(r) => Some(r),
            _ => None,
        }
    }

    /// Extracts a login result, whichever login channel it arrived on.
    pub fn into_login(self) -> Option<LoginReply> {
        match self {
            Self::LogInPortal(r)
            | Self::LogInPersistent(r)
            | Self::LogInExchangeCode(r)
            | Self::LogInDevAuthTool(r) => Some(r),
            _ => None,
        }
    }

    /// Extracts a plain success/failure result (`log-out`,
    /// `unlock-achievement`).
    pub fn into_operation(self) -> Option<OperationReply> {
        match self {
            Self::LogOut(r) | Self::UnlockAchievement(r) => Some(r),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Push notifications
// ---------------------------------------------------------------------------

/// Payload of `on-login-status-changed`.
///
/// `login_status` is the platform SDK's status enum as an integer; the
/// session layer decides which codes it recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatusChanged {
    pub login_status: i32,
}

/// An unsolicited message from the connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "params", rename_all = "kebab-case")]
pub enum Push {
    OnLoginStatusChanged(LoginStatusChanged),
}

impl Push {
    /// The channel this push arrived on.
    pub fn channel(&self) -> PushChannel {
        match self {
            Self::OnLoginStatusChanged(_) => PushChannel::LoginStatusChanged,
        }
    }
}

/// Names of the push channels a handler can be registered for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PushChannel {
    LoginStatusChanged,
}

impl PushChannel {
    /// The wire name of the channel.
    pub fn name(self) -> &'static str {
        match self {
            Self::LoginStatusChanged => "on-login-status-changed",
        }
    }
}

impl fmt::Display for PushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// A frame travelling from the session core to the connector.
///
/// `id` is present for request/response exchanges and absent for
/// fire-and-forget messages. The connector echoes it on the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outbound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub request: Request,
}

/// A frame travelling from the connector to the session core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Inbound {
    /// Answer to the outbound request carrying the same `id`.
    Reply { id: u64, reply: Reply },
    /// Unsolicited notification.
    Push { push: Push },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes() -> AuthScopes {
        AuthScopes::default()
    }

    #[test]
    fn test_auth_scopes_default_requests_basic_profile_only() {
        let s = AuthScopes::default();
        assert!(s.basic_profile);
        assert!(!s.friends_list);
        assert!(!s.presence);
        assert!(!s.country);
    }

    #[test]
    fn test_request_channel_matches_serde_tag() {
        let requests = [
            Request::Init(InitParams::default()),
            Request::LogInPortal { scopes: scopes() },
            Request::LogInPersistent { scopes: scopes() },
            Request::LogInExchangeCode {
                scopes: scopes(),
                exchange_code: "XYZ".into(),
            },
            Request::LogInDevAuthTool {
                scopes: scopes(),
                host: "localhost:6547".into(),
                credential_name: "dev".into(),
            },
            Request::LogOut,
            Request::UnlockAchievement {
                achievement_id: "Foo".into(),
            },
            Request::PlatformTick,
        ];

        for req in &requests {
            let value = serde_json::to_value(req).unwrap();
            assert_eq!(value["channel"], req.channel(), "{req:?}");
        }
    }

    #[test]
    fn test_reply_channel_matches_serde_tag() {
        let replies = [
            Reply::Init(InitReply::default()),
            Reply::LogInPortal(LoginReply::default()),
            Reply::LogInPersistent(LoginReply::default()),
            Reply::LogInExchangeCode(LoginReply::default()),
            Reply::LogInDevAuthTool(LoginReply::default()),
            Reply::LogOut(OperationReply::default()),
            Reply::UnlockAchievement(OperationReply::default()),
        ];

        for reply in &replies {
            let value = serde_json::to_value(reply).unwrap();
            assert_eq!(value["channel"], reply.channel(), "{reply:?}");
        }
    }

    #[test]
    fn test_exchange_code_request_wire_shape() {
        let req = Request::LogInExchangeCode {
            scopes: AuthScopes {
                basic_profile: true,
                friends_list: true,
                presence: false,
                country: true,
            },
            exchange_code: "XYZ".into(),
        };

        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(
            value,
            json!({
                "channel": "log-in-exchange-code",
                "params": {
                    "scopes": {
                        "basicProfile": true,
                        "friendsList": true,
                        "presence": false,
                        "country": true
                    },
                    "exchangeCode": "XYZ"
                }
            })
        );
    }

    #[test]
    fn test_dev_auth_tool_request_wire_shape() {
        let req = Request::LogInDevAuthTool {
            scopes: scopes(),
            host: "localhost:6547".into(),
            credential_name: "tester".into(),
        };

        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["params"]["host"], "localhost:6547");
        assert_eq!(value["params"]["credentialName"], "tester");
    }

    #[test]
    fn test_init_request_wire_shape() {
        let req = Request::Init(InitParams {
            product_name: "Game".into(),
            product_version: "1.0".into(),
            product_id: "p".into(),
            client_id: "c".into(),
            client_secret: "s".into(),
            sandbox_id: "sb".into(),
            deployment_id: "d".into(),
        });

        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["channel"], "init");
        assert_eq!(value["params"]["productName"], "Game");
        assert_eq!(value["params"]["clientSecret"], "s");
        assert_eq!(value["params"]["deploymentId"], "d");
    }

    #[test]
    fn test_platform_tick_expects_no_reply() {
        assert!(!Request::PlatformTick.expects_reply());
        assert!(Request::LogOut.expects_reply());
    }

    #[test]
    fn test_outbound_without_id_omits_field() {
        let frame = Outbound {
            id: None,
            request: Request::PlatformTick,
        };

        let value = serde_json::to_value(&frame).unwrap();

        assert_eq!(value, json!({ "request": { "channel": "platform-tick" } }));
    }

    #[test]
    fn test_init_reply_missing_availability_is_unavailable() {
        let reply: InitReply = serde_json::from_value(json!({})).unwrap();
        assert!(!reply.is_available);
        assert!(!reply.is_platform_launcher);
        assert_eq!(reply.launcher_exchange_code, "");
    }

    #[test]
    fn test_init_reply_reads_launcher_fields() {
        let reply: InitReply = serde_json::from_value(json!({
            "isAvailable": true,
            "isEpicLauncher": true,
            "launcherExchangeCode": "EXCH"
        }))
        .unwrap();

        assert!(reply.is_available);
        assert!(reply.is_platform_launcher);
        assert_eq!(reply.launcher_exchange_code, "EXCH");
    }

    #[test]
    fn test_failed_login_reply_has_empty_profile() {
        let reply: LoginReply =
            serde_json::from_value(json!({ "isOk": false })).unwrap();
        assert!(!reply.is_ok);
        assert_eq!(reply.account_id, "");
        assert_eq!(reply.display_name, "");
    }

    #[test]
    fn test_reply_extractors_match_channel_family() {
        let login = Reply::LogInDevAuthTool(LoginReply::default());
        assert!(login.clone().into_login().is_some());
        assert!(login.clone().into_init().is_none());
        assert!(login.into_operation().is_none());

        let logout = Reply::LogOut(OperationReply { is_ok: true });
        assert_eq!(logout.into_operation(), Some(OperationReply { is_ok: true }));
    }

    #[test]
    fn test_push_frame_decodes_status_code() {
        let frame: Inbound = serde_json::from_value(json!({
            "kind": "push",
            "push": {
                "channel": "on-login-status-changed",
                "params": { "loginStatus": 2 }
            }
        }))
        .unwrap();

        let Inbound::Push { push } = frame else {
            panic!("expected push");
        };
        assert_eq!(push.channel(), PushChannel::LoginStatusChanged);
        assert_eq!(
            push,
            Push::OnLoginStatusChanged(LoginStatusChanged { login_status: 2 })
        );
    }

    #[test]
    fn test_push_channel_display_is_wire_name() {
        assert_eq!(
            PushChannel::LoginStatusChanged.to_string(),
            "on-login-status-changed"
        );
    }
}

use std::sync::Arc;
use std::time::Duration;

use eoslink::prelude::*;
use eoslink_protocol::{
    Codec, Inbound, InitReply, JsonCodec, LoginReply, LoginStatusChanged, OperationReply,
    Outbound, Push, Reply, Request,
};
use eoslink_transport::{Connection, MemoryConnection};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Embedded connector
// ---------------------------------------------------------------------------

/// Answers every request with canned data. Successful logins and logouts
/// are followed by the status push a real connector would send.
async fn serve_connector(conn: MemoryConnection) {
    let mut ticks = 0u64;

    while let Ok(Some(bytes)) = conn.recv().await {
        let frame: Outbound = match JsonCodec.decode(&bytes) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "connector: undecodable frame");
                continue;
            }
        };
        let Some(id) = frame.id else {
            ticks += 1;
            continue;
        };
        let Some((reply, status)) = respond(frame.request) else {
            continue;
        };

        send(&conn, &Inbound::Reply { id, reply }).await;
        if let Some(login_status) = status {
            let push = Push::OnLoginStatusChanged(LoginStatusChanged { login_status });
            send(&conn, &Inbound::Push { push }).await;
        }
    }

    info!(ticks, "connector: link closed");
}

fn respond(request: Request) -> Option<(Reply, Option<i32>)> {
    let signed_in = || LoginReply {
        is_ok: true,
        account_id: "0f3c9a7e52d14b8e".into(),
        display_name: "Headless Player".into(),
        display_name_sanitized: "HeadlessPlayer".into(),
        nickname: "headless".into(),
        preferred_language: "en".into(),
        country: "NL".into(),
    };

    let response = match request {
        Request::Init(params) => {
            info!(product = %params.product_name, version = %params.product_version, "connector: init");
            let reply = InitReply {
                is_available: true,
                ..InitReply::default()
            };
            (Reply::Init(reply), None)
        }
        // No refresh token stored on a first run.
        Request::LogInPersistent { .. } => (Reply::LogInPersistent(LoginReply::default()), None),
        Request::LogInPortal { .. } => (Reply::LogInPortal(signed_in()), Some(2)),
        Request::LogInExchangeCode { .. } => (Reply::LogInExchangeCode(signed_in()), Some(2)),
        Request::LogInDevAuthTool { .. } => (Reply::LogInDevAuthTool(signed_in()), Some(2)),
        Request::LogOut => (Reply::LogOut(OperationReply { is_ok: true }), Some(0)),
        Request::UnlockAchievement { achievement_id } => {
            let is_ok = !achievement_id.is_empty();
            (Reply::UnlockAchievement(OperationReply { is_ok }), None)
        }
        Request::PlatformTick => return None,
    };
    Some(response)
}

async fn send(conn: &MemoryConnection, inbound: &Inbound) {
    let bytes = match JsonCodec.encode(inbound) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "connector: encode failed");
            return;
        }
    };
    if let Err(e) = conn.send(&bytes).await {
        warn!(error = %e, "connector: send failed");
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), EosLinkError> {
    eoslink::init_tracing();

    let config = PlatformConfig {
        product_id: "demo-product".into(),
        client_id: "demo-client".into(),
        client_secret: "demo-secret".into(),
        sandbox_id: "demo-sandbox".into(),
        deployment_id: "demo-deployment".into(),
        ..PlatformConfig::default()
    }
    .with_project_fallback(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    let (sink, mut triggers) = ChannelSink::new();
    let (platform, remote) = Platform::builder().config(config).sink(sink).in_process();
    let platform = Arc::new(platform);
    let connector = tokio::spawn(serve_connector(remote));

    let watcher = tokio::spawn({
        let platform = Arc::clone(&platform);
        async move {
            while let Some(trigger) = triggers.recv().await {
                info!(
                    %trigger,
                    first_launch = trigger.matches("firstlaunch"),
                    status = platform.login_status(),
                    "trigger"
                );
            }
        }
    });

    // Load sequence: the fallback timer keeps the connector alive meanwhile.
    if !platform.initialize().await? {
        warn!("platform unavailable, nothing to do");
        platform.release();
        return Ok(());
    }

    let frames = tokio::spawn({
        let platform = Arc::clone(&platform);
        async move {
            let mut frame = tokio::time::interval(Duration::from_millis(16));
            loop {
                frame.tick().await;
                platform.tick();
            }
        }
    });

    if platform.log_in_persistent().await? == Outcome::Failed {
        info!("no stored credentials, using the account portal");
        platform.log_in_portal().await?;
    }
    info!(
        account_id = %platform.account_id(),
        display_name = %platform.display_name(),
        country = %platform.user_country(),
        "signed in"
    );

    let unlocked = platform.unlock_achievement("FirstLaunch").await?;
    info!(unlocked, "achievement");

    tokio::time::sleep(Duration::from_millis(100)).await;
    platform.log_out().await?;
    // Let the connector's status push land.
    tokio::time::sleep(Duration::from_millis(50)).await;

    frames.abort();
    let metrics = platform.keep_alive_metrics();
    info!(
        fallback = metrics.fallback_ticks,
        frames = metrics.frame_ticks,
        status = platform.login_status(),
        "shutting down"
    );

    platform.release();
    let _ = connector.await;
    watcher.abort();
    Ok(())
}

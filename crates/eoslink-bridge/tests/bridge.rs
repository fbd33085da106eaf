//! Integration tests for the message bridge.
//!
//! The test plays the connector's role on the far end of a
//! `MemoryConnection` pair: it reads the frames the bridge writes and
//! answers with hand-built replies and pushes.

use std::time::Duration;

use eoslink_bridge::{BridgeError, MessageBridge};
use eoslink_protocol::{
    Codec, Inbound, JsonCodec, LoginReply, LoginStatusChanged, OperationReply,
    Outbound, ProtocolError, Push, PushChannel, Reply, Request,
};
use eoslink_transport::{Connection, MemoryConnection};
use tokio::sync::mpsc;

// =========================================================================
// Scripted connector
// =========================================================================

struct FakeConnector {
    conn: MemoryConnection,
}

impl FakeConnector {
    /// Reads and decodes the next frame the bridge wrote.
    async fn next_frame(&self) -> Outbound {
        let bytes = tokio::time::timeout(Duration::from_secs(5), self.conn.recv())
            .await
            .expect("bridge should write a frame")
            .expect("recv should succeed")
            .expect("link should be open");
        JsonCodec.decode(&bytes).expect("frame should decode")
    }

    async fn reply(&self, id: u64, reply: Reply) {
        let bytes = JsonCodec
            .encode(&Inbound::Reply { id, reply })
            .expect("encode");
        self.conn.send(&bytes).await.expect("send reply");
    }

    async fn push_status(&self, login_status: i32) {
        let push = Push::OnLoginStatusChanged(LoginStatusChanged { login_status });
        let bytes = JsonCodec.encode(&Inbound::Push { push }).expect("encode");
        self.conn.send(&bytes).await.expect("send push");
    }
}

fn setup() -> (MessageBridge, FakeConnector) {
    let (local, remote) = MemoryConnection::pair();
    let bridge = MessageBridge::spawn(local, JsonCodec);
    (bridge, FakeConnector { conn: remote })
}

fn ok() -> OperationReply {
    OperationReply { is_ok: true }
}

// =========================================================================
// send_async
// =========================================================================

#[tokio::test]
async fn test_send_async_resolves_with_reply() {
    let (bridge, connector) = setup();

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });

    let frame = connector.next_frame().await;
    assert_eq!(frame.request, Request::LogOut);
    let id = frame.id.expect("request frames carry an id");
    connector.reply(id, Reply::LogOut(ok())).await;

    let reply = call.await.unwrap().expect("should resolve");
    assert_eq!(reply, Reply::LogOut(ok()));
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_send_async_replies_out_of_order_reach_their_callers() {
    let (bridge, connector) = setup();

    let logout = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let first = connector.next_frame().await;

    let unlock = tokio::spawn({
        let bridge = bridge.clone();
        async move {
            bridge
                .send_async(Request::UnlockAchievement {
                    achievement_id: "Foo".into(),
                })
                .await
        }
    });
    let second = connector.next_frame().await;
    assert_ne!(first.id, second.id);

    // Answer the second request first.
    connector
        .reply(second.id.unwrap(), Reply::UnlockAchievement(ok()))
        .await;
    connector
        .reply(first.id.unwrap(), Reply::LogOut(OperationReply { is_ok: false }))
        .await;

    assert_eq!(
        unlock.await.unwrap().unwrap(),
        Reply::UnlockAchievement(ok())
    );
    assert_eq!(
        logout.await.unwrap().unwrap(),
        Reply::LogOut(OperationReply { is_ok: false })
    );
}

#[tokio::test]
async fn test_send_async_reply_on_wrong_channel_is_rejected() {
    let (bridge, connector) = setup();

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });

    let frame = connector.next_frame().await;
    connector
        .reply(frame.id.unwrap(), Reply::LogInPortal(LoginReply::default()))
        .await;

    let result = call.await.unwrap();
    assert!(
        matches!(
            result,
            Err(BridgeError::Protocol(ProtocolError::ChannelMismatch {
                expected: "log-out",
                got: "log-in-portal",
            }))
        ),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_send_async_fire_and_forget_channel_is_rejected() {
    let (bridge, _connector) = setup();

    let result = bridge.send_async(Request::PlatformTick).await;

    assert!(matches!(
        result,
        Err(BridgeError::NoReplyExpected("platform-tick"))
    ));
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn test_reply_for_unknown_id_is_ignored() {
    let (bridge, connector) = setup();

    connector.reply(9_999, Reply::LogOut(ok())).await;

    // The bridge keeps serving requests afterwards.
    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let frame = connector.next_frame().await;
    connector.reply(frame.id.unwrap(), Reply::LogOut(ok())).await;

    assert!(call.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_undecodable_frame_is_dropped() {
    let (bridge, connector) = setup();

    connector.conn.send(b"garbage").await.unwrap();

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let frame = connector.next_frame().await;
    connector.reply(frame.id.unwrap(), Reply::LogOut(ok())).await;

    assert!(call.await.unwrap().is_ok());
    assert!(!bridge.is_closed());
}

// =========================================================================
// send (fire-and-forget)
// =========================================================================

#[tokio::test]
async fn test_send_writes_frame_without_id() {
    let (bridge, connector) = setup();

    bridge.send(Request::PlatformTick).expect("should queue");

    let frame = connector.next_frame().await;
    assert_eq!(frame.id, None);
    assert_eq!(frame.request, Request::PlatformTick);
}

#[tokio::test]
async fn test_frames_reach_connector_in_call_order() {
    let (bridge, connector) = setup();

    bridge.send(Request::PlatformTick).unwrap();
    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    // Give the spawned request a chance to queue.
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    bridge.send(Request::PlatformTick).unwrap();

    assert_eq!(connector.next_frame().await.request, Request::PlatformTick);
    let logout = connector.next_frame().await;
    assert_eq!(logout.request, Request::LogOut);
    assert_eq!(connector.next_frame().await.request, Request::PlatformTick);

    connector.reply(logout.id.unwrap(), Reply::LogOut(ok())).await;
    assert!(call.await.unwrap().is_ok());
}

// =========================================================================
// Push handlers
// =========================================================================

#[tokio::test]
async fn test_push_delivered_to_handler_in_order() {
    let (bridge, connector) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bridge.on_push(PushChannel::LoginStatusChanged, move |push| {
        let _ = tx.send(push);
    });

    for code in [1, 2, 0] {
        connector.push_status(code).await;
    }

    for expected in [1, 2, 0] {
        let push = rx.recv().await.expect("push should arrive");
        assert_eq!(
            push,
            Push::OnLoginStatusChanged(LoginStatusChanged {
                login_status: expected
            })
        );
    }
}

#[tokio::test]
async fn test_on_push_replaces_previous_handler() {
    let (bridge, connector) = setup();
    let (old_tx, mut old_rx) = mpsc::unbounded_channel::<Push>();
    let (new_tx, mut new_rx) = mpsc::unbounded_channel::<Push>();

    bridge.on_push(PushChannel::LoginStatusChanged, move |p| {
        let _ = old_tx.send(p);
    });
    bridge.on_push(PushChannel::LoginStatusChanged, move |p| {
        let _ = new_tx.send(p);
    });

    connector.push_status(2).await;

    assert!(new_rx.recv().await.is_some());
    // The replaced handler (and its sender) was dropped.
    assert!(old_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_remove_push_handler_stops_delivery() {
    let (bridge, connector) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel::<Push>();
    bridge.on_push(PushChannel::LoginStatusChanged, move |p| {
        let _ = tx.send(p);
    });

    assert!(bridge.remove_push_handler(PushChannel::LoginStatusChanged));
    assert!(!bridge.remove_push_handler(PushChannel::LoginStatusChanged));

    connector.push_status(2).await;
    assert!(rx.recv().await.is_none(), "handler should be gone");
}

#[tokio::test]
async fn test_push_interleaves_with_pending_request() {
    let (bridge, connector) = setup();
    let (tx, mut rx) = mpsc::unbounded_channel();
    bridge.on_push(PushChannel::LoginStatusChanged, move |p| {
        let _ = tx.send(p);
    });

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let frame = connector.next_frame().await;

    // A push arrives while the request is still in flight.
    connector.push_status(0).await;
    assert!(rx.recv().await.is_some());
    assert_eq!(bridge.pending_requests(), 1);

    connector.reply(frame.id.unwrap(), Reply::LogOut(ok())).await;
    assert!(call.await.unwrap().is_ok());
}

// =========================================================================
// Teardown
// =========================================================================

#[tokio::test]
async fn test_connector_close_fails_pending_requests() {
    let (bridge, connector) = setup();

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let _frame = connector.next_frame().await;

    connector.conn.close().await.unwrap();

    let result = call.await.unwrap();
    assert!(matches!(result, Err(BridgeError::Closed)), "got {result:?}");
    assert!(bridge.is_closed());
}

#[tokio::test]
async fn test_panicking_push_handler_fails_pending_requests() {
    let (bridge, connector) = setup();
    bridge.on_push(PushChannel::LoginStatusChanged, |_| panic!("handler bug"));

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let _frame = connector.next_frame().await;

    connector.push_status(2).await;

    let result = tokio::time::timeout(Duration::from_secs(5), call)
        .await
        .expect("pending request should settle")
        .unwrap();
    assert!(matches!(result, Err(BridgeError::Closed)), "got {result:?}");
    assert!(bridge.is_closed());
    assert!(matches!(
        bridge.send_async(Request::LogOut).await,
        Err(BridgeError::Closed)
    ));
}

#[tokio::test]
async fn test_calls_after_close_fail_fast() {
    let (bridge, connector) = setup();
    connector.conn.close().await.unwrap();

    // Wait for the reader to observe the close.
    tokio::time::timeout(Duration::from_secs(5), async {
        while !bridge.is_closed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("bridge should notice the close");

    assert!(matches!(
        bridge.send_async(Request::LogOut).await,
        Err(BridgeError::Closed)
    ));
    assert!(matches!(
        bridge.send(Request::PlatformTick),
        Err(BridgeError::Closed)
    ));
}

#[tokio::test]
async fn test_close_fails_pending_and_closes_link() {
    let (bridge, connector) = setup();

    let call = tokio::spawn({
        let bridge = bridge.clone();
        async move { bridge.send_async(Request::LogOut).await }
    });
    let _frame = connector.next_frame().await;

    bridge.close();

    assert!(matches!(call.await.unwrap(), Err(BridgeError::Closed)));
    let eof = tokio::time::timeout(Duration::from_secs(5), connector.conn.recv())
        .await
        .expect("connector should see the close")
        .unwrap();
    assert_eq!(eof, None);
}

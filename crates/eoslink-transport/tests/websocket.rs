//! Integration tests for the WebSocket connection.
//!
//! A bare `tokio-tungstenite` server stands in for the connector process
//! so frames actually cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use eoslink_transport::{Connection, WebSocketConnection};
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    /// Binds a connector stand-in on a random port and returns its URL
    /// together with the listener.
    async fn bind_connector() -> (String, TcpListener) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        (format!("ws://{addr}"), listener)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive() {
        let (url, listener) = bind_connector().await;

        // The connector echoes one frame back, then answers with text.
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            let msg = ws.next().await.expect("frame").expect("ok frame");
            ws.send(msg).await.expect("echo");
            ws.send(Message::Text("as text".into()))
                .await
                .expect("text");
            ws
        });

        let conn = WebSocketConnection::connect(&url)
            .await
            .expect("client should connect");

        conn.send(b"hello connector").await.expect("send");
        let echoed = conn.recv().await.expect("recv");
        assert_eq!(echoed, Some(b"hello connector".to_vec()));

        let text = conn.recv().await.expect("recv text");
        assert_eq!(text, Some(b"as text".to_vec()));

        let _ws = server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_close() {
        let (url, listener) = bind_connector().await;

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("should accept");
            let mut ws = tokio_tungstenite::accept_async(stream)
                .await
                .expect("handshake");
            ws.close(None).await.expect("close");
        });

        let conn = WebSocketConnection::connect(&url)
            .await
            .expect("client should connect");

        let result = conn.recv().await.expect("clean close is not an error");
        assert_eq!(result, None);

        server.await.expect("server task");
    }

    #[tokio::test]
    async fn test_websocket_connect_refused() {
        // Bind then drop so the port is (very likely) closed.
        let (url, listener) = bind_connector().await;
        drop(listener);

        let result = WebSocketConnection::connect(&url).await;

        assert!(matches!(
            result,
            Err(eoslink_transport::TransportError::ConnectFailed(_))
        ));
    }
}

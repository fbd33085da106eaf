//! In-process connection pair backed by tokio channels.

use tokio::sync::{Mutex, mpsc};

use crate::{Connection, ConnectionId, TransportError};

/// One end of an in-process link.
///
/// Frames sent on one end are received, in order, on the other. Closing
/// or dropping an end makes the peer's `recv` return `Ok(None)`.
pub struct MemoryConnection {
    id: ConnectionId,
    tx: Mutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
}

impl MemoryConnection {
    /// Creates two connected endpoints.
    ///
    /// Conventionally the first is handed to the bridge and the second to
    /// the connector (or to a test playing the connector's role).
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        let a = Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(a_tx)),
            rx: Mutex::new(b_rx),
        };
        let b = Self {
            id: ConnectionId::next(),
            tx: Mutex::new(Some(b_tx)),
            rx: Mutex::new(a_rx),
        };
        tracing::debug!(left = %a.id, right = %b.id, "memory connection pair created");
        (a, b)
    }
}

impl Connection for MemoryConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        let tx = self.tx.lock().await;
        let Some(tx) = tx.as_ref() else {
            return Err(TransportError::ConnectionClosed(
                "closed locally".into(),
            ));
        };
        tx.send(data.to_vec()).map_err(|_| {
            TransportError::ConnectionClosed("peer dropped".into())
        })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.rx.lock().await.recv().await)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        // Dropping our sender ends the peer's receive stream.
        if self.tx.lock().await.take().is_some() {
            tracing::debug!(id = %self.id, "memory connection closed");
        }
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_delivers_frames_in_order() {
        let (a, b) = MemoryConnection::pair();

        a.send(b"one").await.unwrap();
        a.send(b"two").await.unwrap();

        assert_eq!(b.recv().await.unwrap(), Some(b"one".to_vec()));
        assert_eq!(b.recv().await.unwrap(), Some(b"two".to_vec()));
    }

    #[tokio::test]
    async fn test_pair_is_bidirectional() {
        let (a, b) = MemoryConnection::pair();

        b.send(b"pong").await.unwrap();

        assert_eq!(a.recv().await.unwrap(), Some(b"pong".to_vec()));
    }

    #[tokio::test]
    async fn test_close_ends_peer_stream() {
        let (a, b) = MemoryConnection::pair();

        a.close().await.unwrap();

        assert_eq!(b.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (a, _b) = MemoryConnection::pair();
        a.close().await.unwrap();

        let result = a.send(b"late").await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        let (a, b) = MemoryConnection::pair();
        drop(b);

        let result = a.send(b"nobody home").await;

        assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
    }

    #[test]
    fn test_pair_ids_differ() {
        let (a, b) = MemoryConnection::pair();
        assert_ne!(a.id(), b.id());
    }
}

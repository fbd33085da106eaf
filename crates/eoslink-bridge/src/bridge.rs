//! `MessageBridge` handle plus its reader and writer tasks.
//!
//! The handle is cheap to clone. All clones share one pending-reply table,
//! one push-handler table, and one outbound queue. A single writer task
//! drains the queue so frames reach the connector in call order; a single
//! reader task decodes inbound frames and settles replies or runs push
//! handlers in the order the transport surfaced them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use eoslink_protocol::{
    Codec, Inbound, Outbound, ProtocolError, Push, PushChannel, Reply, Request,
};
use eoslink_transport::{Connection, ConnectionId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::BridgeError;

/// Callback invoked for every push on the channel it was registered for.
pub type PushHandler = Arc<dyn Fn(Push) + Send + Sync>;

type ReplySender = oneshot::Sender<Result<Reply, BridgeError>>;

/// A request waiting for its reply.
struct Pending {
    channel: &'static str,
    reply: ReplySender,
}

/// Commands consumed by the writer task.
enum WriterCommand {
    Frame(Outbound),
    Close,
}

/// State shared between the handle clones and the background tasks.
struct Shared {
    connection_id: ConnectionId,
    next_id: AtomicU64,
    /// Set once, under the `pending` lock, when the link goes away.
    closed: AtomicBool,
    pending: Mutex<HashMap<u64, Pending>>,
    handlers: RwLock<HashMap<PushChannel, PushHandler>>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, Pending>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(&self, id: u64) -> Option<Pending> {
        self.pending().remove(&id)
    }

    /// Settles the request `id` with the connector's reply.
    fn resolve(&self, id: u64, reply: Reply) {
        let Some(pending) = self.take_pending(id) else {
            tracing::warn!(id, channel = reply.channel(), "reply for unknown request dropped");
            return;
        };

        let result = if reply.channel() == pending.channel {
            tracing::debug!(id, channel = pending.channel, "reply received");
            Ok(reply)
        } else {
            Err(BridgeError::Protocol(ProtocolError::ChannelMismatch {
                expected: pending.channel,
                got: reply.channel(),
            }))
        };

        // The caller may have stopped waiting; that's fine.
        let _ = pending.reply.send(result);
    }

    /// Fails request `id` without a reply.
    fn fail(&self, id: u64, error: BridgeError) {
        if let Some(pending) = self.take_pending(id) {
            let _ = pending.reply.send(Err(error));
        }
    }

    /// Runs the handler registered for the push's channel, if any.
    fn deliver(&self, push: Push) {
        let channel = push.channel();
        let handler = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&channel)
            .cloned();

        match handler {
            Some(handler) => {
                tracing::debug!(%channel, "delivering push");
                handler(push);
            }
            None => {
                tracing::debug!(%channel, "no handler registered, push dropped");
            }
        }
    }

    /// Marks the link closed and fails every pending request.
    fn shutdown(&self) {
        let drained: Vec<Pending> = {
            let mut pending = self.pending();
            if self.closed.swap(true, Ordering::SeqCst) {
                return;
            }
            pending.drain().map(|(_, p)| p).collect()
        };

        tracing::info!(
            connection_id = %self.connection_id,
            failed_requests = drained.len(),
            "connector link closed"
        );

        for pending in drained {
            let _ = pending.reply.send(Err(BridgeError::Closed));
        }
    }
}

/// Handle to the messaging link with the native connector.
///
/// Created with [`MessageBridge::spawn`], which takes ownership of a
/// [`Connection`] and starts the reader and writer tasks. Must be called
/// from within a Tokio runtime.
#[derive(Clone)]
pub struct MessageBridge {
    shared: Arc<Shared>,
    outbound: mpsc::UnboundedSender<WriterCommand>,
}

impl MessageBridge {
    /// Starts the bridge over `conn`, encoding frames with `codec`.
    pub fn spawn<C, K>(conn: C, codec: K) -> Self
    where
        C: Connection,
        K: Codec,
    {
        let conn = Arc::new(conn);
        let codec = Arc::new(codec);
        let shared = Arc::new(Shared {
            connection_id: conn.id(),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            pending: Mutex::new(HashMap::new()),
            handlers: RwLock::new(HashMap::new()),
            reader: Mutex::new(None),
        });
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_writer(
            Arc::clone(&conn),
            Arc::clone(&codec),
            Arc::clone(&shared),
            outbound_rx,
        ));
        let reader = tokio::spawn(run_reader(conn, codec, Arc::clone(&shared)));
        *shared.reader.lock().unwrap_or_else(PoisonError::into_inner) =
            Some(reader);

        tracing::debug!(connection_id = %shared.connection_id, "message bridge started");
        Self { shared, outbound }
    }

    /// Sends a request and waits for the connector's reply.
    ///
    /// # Errors
    /// - [`BridgeError::NoReplyExpected`]: `request` is fire-and-forget
    /// - [`BridgeError::Closed`]: the link is (or becomes) closed
    /// - [`BridgeError::Protocol`]: encoding failed, or the reply arrived
    ///   on a different channel
    pub async fn send_async(&self, request: Request) -> Result<Reply, BridgeError> {
        let channel = request.channel();
        if !request.expects_reply() {
            return Err(BridgeError::NoReplyExpected(channel));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        {
            let mut pending = self.shared.pending();
            if self.shared.closed.load(Ordering::SeqCst) {
                return Err(BridgeError::Closed);
            }
            pending.insert(
                id,
                Pending {
                    channel,
                    reply: reply_tx,
                },
            );
        }

        let frame = Outbound {
            id: Some(id),
            request,
        };
        if self.outbound.send(WriterCommand::Frame(frame)).is_err() {
            self.shared.take_pending(id);
            return Err(BridgeError::Closed);
        }
        tracing::debug!(id, channel, "request queued");

        reply_rx
            .await
            .map_err(|_| BridgeError::ReplyDropped { channel })?
    }

    /// Queues a fire-and-forget message.
    ///
    /// # Errors
    /// Returns [`BridgeError::Closed`] if the link is closed.
    pub fn send(&self, request: Request) -> Result<(), BridgeError> {
        if self.is_closed() {
            return Err(BridgeError::Closed);
        }
        let channel = request.channel();
        self.outbound
            .send(WriterCommand::Frame(Outbound { id: None, request }))
            .map_err(|_| BridgeError::Closed)?;
        tracing::trace!(channel, "message queued");
        Ok(())
    }

    /// Registers the handler for a push channel.
    ///
    /// Each channel has at most one handler; registering again replaces
    /// the previous one.
    pub fn on_push<F>(&self, channel: PushChannel, handler: F)
    where
        F: Fn(Push) + Send + Sync + 'static,
    {
        let previous = self
            .shared
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(channel, Arc::new(handler));

        if previous.is_some() {
            tracing::warn!(%channel, "push handler replaced");
        } else {
            tracing::debug!(%channel, "push handler registered");
        }
    }

    /// Unregisters the handler for a push channel. Returns `true` if one
    /// was registered.
    pub fn remove_push_handler(&self, channel: PushChannel) -> bool {
        let removed = self
            .shared
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&channel)
            .is_some();
        if removed {
            tracing::debug!(%channel, "push handler removed");
        }
        removed
    }

    /// Closes the link: pending requests fail with [`BridgeError::Closed`],
    /// the reader stops, and the writer closes the connection after
    /// flushing frames already queued.
    pub fn close(&self) {
        self.shared.shutdown();
        let _ = self.outbound.send(WriterCommand::Close);
        if let Some(reader) = self
            .shared
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            reader.abort();
        }
    }

    /// Whether the link to the connector has closed.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }

    /// Number of requests still waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.shared.pending().len()
    }

    /// The underlying connection's identifier.
    pub fn connection_id(&self) -> ConnectionId {
        self.shared.connection_id
    }
}

/// Writes queued frames to the connector, in order.
async fn run_writer<C: Connection, K: Codec>(
    conn: Arc<C>,
    codec: Arc<K>,
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<WriterCommand>,
) {
    while let Some(command) = commands.recv().await {
        let frame = match command {
            WriterCommand::Frame(frame) => frame,
            WriterCommand::Close => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(error = %e, "closing connector link failed");
                }
                break;
            }
        };

        let bytes = match codec.encode(&frame) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    channel = frame.request.channel(),
                    error = %e,
                    "failed to encode frame"
                );
                if let Some(id) = frame.id {
                    shared.fail(id, BridgeError::Protocol(e));
                }
                continue;
            }
        };

        if let Err(e) = conn.send(&bytes).await {
            tracing::warn!(
                channel = frame.request.channel(),
                error = %e,
                "send to connector failed"
            );
            shared.shutdown();
            break;
        }
    }
}

/// Shuts the link down when the reader exits, including by abort or by a
/// panicking push handler.
struct ShutdownOnExit<'a>(&'a Shared);

impl Drop for ShutdownOnExit<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            tracing::error!("push handler panicked, closing connector link");
        }
        self.0.shutdown();
    }
}

/// Reads frames from the connector until the link closes.
async fn run_reader<C: Connection, K: Codec>(
    conn: Arc<C>,
    codec: Arc<K>,
    shared: Arc<Shared>,
) {
    let _shutdown = ShutdownOnExit(&shared);
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!("connector closed the link");
                break;
            }
            Err(e) => {
                tracing::warn!(error = %e, "receive from connector failed");
                break;
            }
        };

        match codec.decode::<Inbound>(&data) {
            Ok(Inbound::Reply { id, reply }) => shared.resolve(id, reply),
            Ok(Inbound::Push { push }) => shared.deliver(push),
            Err(e) => {
                tracing::warn!(error = %e, "undecodable frame from connector dropped");
            }
        }
    }
}

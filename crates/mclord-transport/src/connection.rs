//! One upgraded connection: the read side, the shared write handle, and
//! the writer task that connects them.
//!
//! ```text
//!   room / handler ──send()──► [unbounded queue] ──► writer task ──► socket
//!                                                        ▲
//!   close() ──────────► CancellationToken ───────────────┘ (drain, shutdown)
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mclord_protocol::handshake::{self, UpgradeRequest, BAD_REQUEST_RESPONSE};
use mclord_protocol::{frame, tokenize, ProtocolError, ServerMessage};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{ConnectionId, TransportError};

/// How long the writer keeps draining queued frames after a close before
/// giving up on a slow peer.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

// ---------------------------------------------------------------------------
// PeerHandle
// ---------------------------------------------------------------------------

/// The write side of a connection, shared by everyone who talks to it.
///
/// Cloning is cheap (one `Arc`). A room holds a handle for each of its
/// players; the connection's own handler holds another.
///
/// Closing is one-way and idempotent. Once closed, [`send`](Self::send)
/// fails, the handler's pending read wakes up with
/// [`TransportError::Closed`], and the writer task flushes whatever was
/// queued before the close, then shuts the socket down. A write the peer
/// is not draining when the close lands is abandoned.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    inner: Arc<PeerInner>,
}

#[derive(Debug)]
struct PeerInner {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    closed: CancellationToken,
}

impl PeerHandle {
    fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let inner = PeerInner {
            id,
            outbound,
            closed: CancellationToken::new(),
        };
        (Self { inner: Arc::new(inner) }, rx)
    }

    /// Creates a handle with no socket behind it. Everything sent is
    /// collected in the returned [`Outbox`]. Used to drive rooms in tests.
    pub fn detached() -> (Self, Outbox) {
        let (peer, rx) = Self::new(ConnectionId::next());
        (peer, Outbox { rx })
    }

    /// The connection's id.
    pub fn id(&self) -> ConnectionId {
        self.inner.id
    }

    /// Queues `msg` for delivery.
    ///
    /// # Errors
    /// [`TransportError::Closed`] if the connection is closed or its
    /// writer has exited.
    pub fn send(&self, msg: &ServerMessage) -> Result<(), TransportError> {
        let text = msg.to_string();
        self.enqueue(frame::encode_text(&text)?)?;
        tracing::debug!(conn = %self.inner.id, msg = %text, "queued");
        Ok(())
    }

    /// Best-effort [`send`](Self::send): a closed peer is not an error
    /// worth reporting when the server is already ending its session.
    pub fn notify(&self, msg: &ServerMessage) {
        if let Err(e) = self.send(msg) {
            tracing::trace!(conn = %self.inner.id, error = %e, "notify dropped");
        }
    }

    /// Closes the connection. Calling this more than once is harmless.
    pub fn close(&self) {
        if !self.inner.closed.is_cancelled() {
            tracing::debug!(conn = %self.inner.id, "closing");
        }
        self.inner.closed.cancel();
    }

    /// Returns `true` once [`close`](Self::close) has been called or the
    /// writer hit an I/O error.
    pub fn is_closed(&self) -> bool {
        self.inner.closed.is_cancelled()
    }

    /// Resolves when the connection is closed.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await;
    }

    fn enqueue(&self, bytes: Vec<u8>) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.inner
            .outbound
            .send(bytes)
            .map_err(|_| TransportError::Closed)
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for PeerHandle {}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Receiving end of a [`PeerHandle::detached`] handle.
#[derive(Debug)]
pub struct Outbox {
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
}

impl Outbox {
    /// Pops the next queued message as text, if any.
    pub fn try_next_text(&mut self) -> Option<String> {
        self.rx.try_recv().ok().map(|frame| payload_text(&frame))
    }

    /// Pops every queued message as text, oldest first.
    pub fn drain_text(&mut self) -> Vec<String> {
        std::iter::from_fn(|| self.try_next_text()).collect()
    }
}

/// Strips the 2-byte server frame header.
fn payload_text(frame: &[u8]) -> String {
    String::from_utf8_lossy(frame.get(2..).unwrap_or_default()).into_owned()
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// The read side of one client connection.
///
/// Created with [`Connection::open`], which also spawns the writer task.
/// Owned by exactly one handler task.
pub struct Connection {
    peer: PeerHandle,
    reader: BufReader<BoxedReader>,
    read_timeout: Duration,
}

impl Connection {
    /// Splits `stream` and spawns its writer task.
    ///
    /// `read_timeout` bounds how long any single read (handshake or frame)
    /// may take before the session is abandoned.
    pub fn open<S>(stream: S, read_timeout: Duration) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (peer, rx) = PeerHandle::new(ConnectionId::next());
        tokio::spawn(write_loop(
            write_half,
            rx,
            peer.inner.closed.clone(),
            peer.id(),
        ));

        let reader: BoxedReader = Box::new(read_half);
        Self {
            peer,
            reader: BufReader::new(reader),
            read_timeout,
        }
    }

    /// The shared write handle for this connection.
    pub fn peer(&self) -> &PeerHandle {
        &self.peer
    }

    /// Reads the upgrade request and answers it.
    ///
    /// On success the `101` response is queued. On an invalid request a
    /// `400` is queued instead and [`TransportError::HandshakeRejected`] is
    /// returned; the caller should close the peer.
    pub async fn accept_handshake(&mut self) -> Result<(), TransportError> {
        let head = guarded(
            &self.peer.inner.closed,
            self.read_timeout,
            handshake::read_request_head(&mut self.reader),
        )
        .await;

        let parsed = match head {
            Ok(head) => UpgradeRequest::parse(&head),
            Err(TransportError::Protocol(err)) if err.is_violation() => Err(err),
            Err(other) => return Err(other),
        };

        match parsed {
            Ok(request) => {
                self.peer.enqueue(request.accept_response().into_bytes())?;
                tracing::debug!(conn = %self.peer.id(), "handshake accepted");
                Ok(())
            }
            Err(err) => {
                let _ = self.peer.enqueue(BAD_REQUEST_RESPONSE.as_bytes().to_vec());
                Err(TransportError::HandshakeRejected(err))
            }
        }
    }

    /// Reads one frame and splits it into tokens.
    ///
    /// # Errors
    /// - [`TransportError::Closed`] if the peer was closed while waiting
    /// - [`TransportError::TimedOut`] past the read timeout
    /// - [`TransportError::Protocol`] on a bad frame or a dropped socket
    pub async fn read_message(&mut self) -> Result<Vec<String>, TransportError> {
        let text = guarded(
            &self.peer.inner.closed,
            self.read_timeout,
            frame::read_text(&mut self.reader),
        )
        .await?;
        tracing::trace!(conn = %self.peer.id(), %text, "received");
        Ok(tokenize(&text))
    }
}

/// Runs a read, racing it against the close signal and the timeout.
async fn guarded<T>(
    closed: &CancellationToken,
    limit: Duration,
    read: impl Future<Output = Result<T, ProtocolError>>,
) -> Result<T, TransportError> {
    tokio::select! {
        () = closed.cancelled() => Err(TransportError::Closed),
        res = tokio::time::timeout(limit, read) => match res {
            Ok(inner) => inner.map_err(TransportError::from),
            Err(_) => Err(TransportError::TimedOut(limit)),
        },
    }
}

// ---------------------------------------------------------------------------
// Writer task
// ---------------------------------------------------------------------------

async fn write_loop<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    closed: CancellationToken,
    id: ConnectionId,
) where
    W: AsyncWrite + Unpin,
{
    loop {
        tokio::select! {
            biased;
            queued = rx.recv() => match queued {
                Some(bytes) => {
                    // A close abandons a write the peer is not draining.
                    let written = tokio::select! {
                        biased;
                        res = writer.write_all(&bytes) => res,
                        () = closed.cancelled() => {
                            tracing::debug!(conn = %id, "close interrupted a blocked write");
                            let _ = tokio::time::timeout(FLUSH_TIMEOUT, writer.shutdown()).await;
                            return;
                        }
                    };
                    if let Err(e) = written {
                        tracing::debug!(conn = %id, error = %e, "write failed");
                        closed.cancel();
                        return;
                    }
                }
                None => break,
            },
            () = closed.cancelled() => break,
        }
    }

    // Frames queued right before the close still go out.
    let flush = async {
        while let Ok(bytes) = rx.try_recv() {
            writer.write_all(&bytes).await?;
        }
        writer.shutdown().await
    };
    match tokio::time::timeout(FLUSH_TIMEOUT, flush).await {
        Ok(Ok(())) => tracing::trace!(conn = %id, "writer finished"),
        Ok(Err(e)) => tracing::debug!(conn = %id, error = %e, "final flush failed"),
        Err(_) => tracing::debug!(conn = %id, "final flush timed out"),
    }
    closed.cancel();
}

//! Inbound event callbacks
//!
//! The link reports two things to its owner: bytes that arrived, and the end
//! of the session. Implement `ConnectionHandler` directly, wrap two closures
//! in `FnHandler`, or use `ChannelHandler` to receive `ConnectionEvent`s on a
//! tokio channel.

use bytes::Bytes;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Receiver of link events
///
/// # Threading
///
/// `on_data` runs on the reader thread, one chunk at a time, and the next
/// read only starts once it returns. `on_disconnected` runs on whichever
/// thread performed the teardown: the caller of `disconnect()` when
/// `by_remote` is false, the reader thread when it is true.
///
/// Handlers may call back into the `ConnectionManager` (including
/// `disconnect()` from `on_data`). They must not block waiting for another
/// thread that is itself inside `disconnect()`.
pub trait ConnectionHandler: Send + Sync + 'static {
    /// Bytes read from the stream, exactly as many as the read returned
    fn on_data(&self, data: Bytes);

    /// Session ended; called exactly once per successful connect
    fn on_disconnected(&self, by_remote: bool);
}

impl<T: ConnectionHandler + ?Sized> ConnectionHandler for Arc<T> {
    fn on_data(&self, data: Bytes) {
        (**self).on_data(data)
    }

    fn on_disconnected(&self, by_remote: bool) {
        (**self).on_disconnected(by_remote)
    }
}

/// Handler built from two closures
///
/// # Example
///
/// ```ignore
/// let handler = FnHandler::new(
///     |data| println!("rx {} bytes", data.len()),
///     |by_remote| println!("closed (remote: {})", by_remote),
/// );
/// ```
pub struct FnHandler<D, X> {
    on_data: D,
    on_disconnected: X,
}

impl<D, X> FnHandler<D, X>
where
    D: Fn(Bytes) + Send + Sync + 'static,
    X: Fn(bool) + Send + Sync + 'static,
{
    pub fn new(on_data: D, on_disconnected: X) -> Self {
        Self {
            on_data,
            on_disconnected,
        }
    }
}

impl<D, X> ConnectionHandler for FnHandler<D, X>
where
    D: Fn(Bytes) + Send + Sync + 'static,
    X: Fn(bool) + Send + Sync + 'static,
{
    fn on_data(&self, data: Bytes) {
        (self.on_data)(data)
    }

    fn on_disconnected(&self, by_remote: bool) {
        (self.on_disconnected)(by_remote)
    }
}

/// Events emitted by `ChannelHandler`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Bytes received from the peer
    Data(Bytes),
    /// Session closed
    Disconnected { by_remote: bool },
}

/// Forwards link events into an unbounded tokio channel
///
/// Unbounded so that neither the reader thread nor a caller running inside
/// an async task ever blocks on a slow consumer. Events are dropped silently
/// once the receiver is gone.
#[derive(Clone)]
pub struct ChannelHandler {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ChannelHandler {
    /// Create a handler and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ConnectionHandler for ChannelHandler {
    fn on_data(&self, data: Bytes) {
        let _ = self.tx.send(ConnectionEvent::Data(data));
    }

    fn on_disconnected(&self, by_remote: bool) {
        let _ = self.tx.send(ConnectionEvent::Disconnected { by_remote });
    }
}

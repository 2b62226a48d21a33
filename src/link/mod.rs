//! Connection manager - one duplex link, exactly-once teardown
//!
//! The manager owns at most one `Session` at a time:
//! - `connect` opens a stream through the injected opener and starts a
//!   reader thread for it
//! - `write` goes straight to the stream on the caller's thread
//! - `disconnect` tears the session down synchronously
//! - a reader that sees the stream fail tears it down from its own thread
//!
//! Whichever side gets there first runs the cleanup; the other finds it done.
//! The handler hears `on_disconnected` exactly once per session.
//!
//! # Known race
//!
//! A `write` that passed the connected check just before a teardown started
//! may still reach the stream, or fail because the handle closed under it.
//! It is never accepted once the check sees the session closing.

pub mod handler;
mod reader;
pub mod session;
pub mod stats;

pub use handler::{ChannelHandler, ConnectionEvent, ConnectionHandler, FnHandler};
pub use session::LinkState;
pub use stats::Stats;

use self::session::Session;
use crate::config::{LinkConfig, WriteFailurePolicy};
use crate::error::{LinkError, Result};
use crate::transport::StreamOpener;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Manager slot: nothing, an open in flight, or a session
enum Slot {
    Idle,
    Connecting,
    Active(Arc<Session>),
}

/// Manages a single duplex byte-stream connection
///
/// # Example
///
/// ```ignore
/// let (handler, mut events) = ChannelHandler::new();
/// let manager = ConnectionManager::new(SerialOpener::default(), handler);
///
/// manager.connect("/dev/rfcomm0", None)?;
/// manager.write(b"AT\r\n")?;
/// // ... events.recv().await yields Data / Disconnected
/// manager.disconnect();
/// ```
pub struct ConnectionManager {
    opener: Box<dyn StreamOpener>,
    handler: Arc<dyn ConnectionHandler>,
    config: LinkConfig,
    slot: Mutex<Slot>,
    stats: Arc<Stats>,
}

impl ConnectionManager {
    /// Create a manager with default link settings
    pub fn new(opener: impl StreamOpener, handler: impl ConnectionHandler) -> Self {
        Self::with_config(opener, handler, LinkConfig::default())
    }

    /// Create a manager with explicit link settings
    pub fn with_config(
        opener: impl StreamOpener,
        handler: impl ConnectionHandler,
        config: LinkConfig,
    ) -> Self {
        Self {
            opener: Box::new(opener),
            handler: Arc::new(handler),
            config,
            slot: Mutex::new(Slot::Idle),
            stats: Arc::new(Stats::new()),
        }
    }

    /// Open a link to `address`
    ///
    /// `service` defaults to the configured service UUID (SPP unless
    /// overridden). Blocks for as long as the opener's handshake takes.
    ///
    /// # Errors
    ///
    /// - `AlreadyConnected` - a session is connecting, connected or closing
    /// - `DeviceNotFound` - the opener could not resolve `address`
    /// - `SocketFailure` - open/handshake failed, or the reader could not start
    /// - `ConfigValidation` - the link settings are unusable; nothing is opened
    pub fn connect(&self, address: &str, service: Option<Uuid>) -> Result<()> {
        self.config.validate()?;

        {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Connecting => return Err(LinkError::AlreadyConnected),
                Slot::Active(session) if session.state() != LinkState::Closed => {
                    return Err(LinkError::AlreadyConnected);
                }
                _ => {}
            }
            *slot = Slot::Connecting;
        }

        let service = service.unwrap_or(self.config.service_uuid);
        info!(
            "[Link] Connecting to {} via {} (service {})",
            address,
            self.opener.name(),
            service
        );

        let stream = match self.opener.open(address, service) {
            Ok(stream) => stream,
            Err(e) => {
                *self.slot.lock() = Slot::Idle;
                warn!("[Link] Connect to {} failed: {}", address, e);
                return Err(e);
            }
        };

        self.opener.cancel_discovery();

        let session = Arc::new(Session::new(address, stream, self.handler.clone()));
        *self.slot.lock() = Slot::Active(session.clone());

        if let Err(e) = reader::spawn(
            session.clone(),
            self.config.read_chunk_size,
            self.stats.clone(),
        ) {
            session.abandon();
            *self.slot.lock() = Slot::Idle;
            warn!("[Link] Cannot start reader for {}: {}", address, e);
            return Err(LinkError::SocketFailure {
                address: address.to_string(),
                source: e,
            });
        }

        self.stats.add_session();
        info!("[Link] Connected to {}", address);
        Ok(())
    }

    /// True while a session is connected and no local disconnect is underway
    pub fn is_connected(&self) -> bool {
        self.connected_session().is_some()
    }

    /// Current link state
    ///
    /// A session closed by the remote side reports `Closed` until the next
    /// `connect` replaces it; a local `disconnect` leaves `Disconnected`.
    pub fn state(&self) -> LinkState {
        match &*self.slot.lock() {
            Slot::Idle => LinkState::Disconnected,
            Slot::Connecting => LinkState::Connecting,
            Slot::Active(session) => session.state(),
        }
    }

    /// Address of the connected device
    pub fn address(&self) -> Option<String> {
        self.connected_session()
            .map(|session| session.address().to_string())
    }

    /// Write bytes to the link, blocking until the transport takes them
    ///
    /// # Errors
    ///
    /// - `NotConnected` - no connected session
    /// - `WriteFailed` - the stream failed and the policy is `Surface`
    pub fn write(&self, data: &[u8]) -> Result<()> {
        let session = self.connected_session().ok_or(LinkError::NotConnected)?;

        match session.stream().write(data) {
            Ok(()) => {
                self.stats.add_tx(data.len());
                debug!("[Link] Wrote {} bytes to {}", data.len(), session.address());
                Ok(())
            }
            Err(e) => match self.config.write_failure {
                WriteFailurePolicy::Surface => Err(LinkError::WriteFailed { source: e }),
                WriteFailurePolicy::Absorb => {
                    warn!("[Link] Write to {} failed: {}", session.address(), e);
                    Ok(())
                }
            },
        }
    }

    /// Tear down the current session; no-op when not connected
    ///
    /// Runs the cleanup on the calling thread and fires
    /// `on_disconnected(false)` before returning, unless the reader beat
    /// it to a remote teardown.
    ///
    /// The reader thread is detached and may outlive this call by up to one
    /// stream poll interval (the serial read timeout). It delivers nothing
    /// after `on_disconnected`.
    pub fn disconnect(&self) {
        let Some(session) = self.connected_session() else {
            return;
        };

        session.request_close();
        session.cleanup(false);

        let mut slot = self.slot.lock();
        if let Slot::Active(current) = &*slot {
            if Arc::ptr_eq(current, &session) {
                *slot = Slot::Idle;
            }
        }
    }

    /// Traffic counters shared by all sessions of this manager
    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }

    fn connected_session(&self) -> Option<Arc<Session>> {
        match &*self.slot.lock() {
            Slot::Active(session) if session.is_connected() => Some(session.clone()),
            _ => None,
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.disconnect();
    }
}

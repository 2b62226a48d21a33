//! Link session - one connection lifetime and its exactly-once teardown
//!
//! The session handles:
//! - Lifecycle state (`Connected -> Closing -> Closed`)
//! - The local-close request flag read by the reader thread
//! - Ordered, idempotent cleanup of the stream
//! - Serializing data delivery against the disconnect notification
//!
//! The session does NOT handle:
//! - Opening the stream (that's the opener's job)
//! - Deciding when to tear down (manager or reader thread)

use super::handler::ConnectionHandler;
use crate::transport::DuplexStream;
use bytes::Bytes;
use parking_lot::{Mutex, ReentrantMutex};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Observable link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No session
    Disconnected,
    /// Opening the stream
    Connecting,
    /// Stream open, reader running
    Connected,
    /// Cleanup in progress
    Closing,
    /// Cleanup done, session awaiting replacement
    Closed,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Disconnected => write!(f, "disconnected"),
            LinkState::Connecting => write!(f, "connecting"),
            LinkState::Connected => write!(f, "connected"),
            LinkState::Closing => write!(f, "closing"),
            LinkState::Closed => write!(f, "closed"),
        }
    }
}

type CleanupStep = (&'static str, fn(&dyn DuplexStream) -> io::Result<()>);

/// Cleanup order: flush, then the streams, then the handle
const CLEANUP_STEPS: [CleanupStep; 4] = [
    ("flush output", |s| s.flush_output()),
    ("close input", |s| s.close_input()),
    ("close output", |s| s.close_output()),
    ("close handle", |s| s.close_handle()),
];

/// One connection lifetime
pub(crate) struct Session {
    address: String,
    stream: Arc<dyn DuplexStream>,
    handler: Arc<dyn ConnectionHandler>,
    state: Mutex<LinkState>,
    closing_requested: AtomicBool,
    cleanup_performed: AtomicBool,
    /// Held while delivering data and while notifying disconnect
    delivery: ReentrantMutex<()>,
}

impl Session {
    /// Create a connected session around an open stream
    pub fn new(
        address: impl Into<String>,
        stream: Arc<dyn DuplexStream>,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Self {
        Self {
            address: address.into(),
            stream,
            handler,
            state: Mutex::new(LinkState::Connected),
            closing_requested: AtomicBool::new(false),
            cleanup_performed: AtomicBool::new(false),
            delivery: ReentrantMutex::new(()),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn stream(&self) -> &Arc<dyn DuplexStream> {
        &self.stream
    }

    pub fn state(&self) -> LinkState {
        *self.state.lock()
    }

    /// Connected and not being torn down locally
    pub fn is_connected(&self) -> bool {
        !self.closing_requested() && self.state() == LinkState::Connected
    }

    /// Mark the upcoming teardown as caller-initiated
    pub fn request_close(&self) {
        self.closing_requested.store(true, Ordering::SeqCst);
    }

    pub fn closing_requested(&self) -> bool {
        self.closing_requested.load(Ordering::SeqCst)
    }

    /// Hand a chunk to the handler unless teardown has begun
    ///
    /// Returns false when the chunk was dropped because cleanup started.
    pub fn deliver(&self, data: Bytes) -> bool {
        let _guard = self.delivery.lock();
        if self.cleanup_performed.load(Ordering::SeqCst) {
            return false;
        }
        self.handler.on_data(data);
        true
    }

    /// Run the teardown sequence if nobody has yet
    ///
    /// Returns true if this call performed the cleanup. Every step runs
    /// regardless of earlier failures; failures are logged and dropped.
    /// The handler is notified last, exactly once per session.
    pub fn cleanup(&self, by_remote: bool) -> bool {
        if !self.close_stream() {
            return false;
        }

        {
            let _guard = self.delivery.lock();
            self.handler.on_disconnected(by_remote);
        }

        info!(
            "[Link] Disconnected from {} ({})",
            self.address,
            if by_remote { "remote" } else { "local" }
        );
        true
    }

    /// Close the stream without notifying the handler
    ///
    /// For sessions that never became visible to the caller.
    pub fn abandon(&self) {
        self.close_stream();
    }

    /// Claim the cleanup and run the close steps; false if already claimed
    fn close_stream(&self) -> bool {
        if self
            .cleanup_performed
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        *self.state.lock() = LinkState::Closing;

        for (step, op) in CLEANUP_STEPS {
            if let Err(e) = op(&*self.stream) {
                debug!("[Link] Cleanup step '{}' failed for {}: {}", step, self.address, e);
            }
        }

        *self.state.lock() = LinkState::Closed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::handler::FnHandler;
    use std::sync::atomic::AtomicUsize;

    /// Stream that records which cleanup steps ran and fails some of them
    struct StepStream {
        calls: Mutex<Vec<&'static str>>,
        fail_all: bool,
    }

    impl StepStream {
        fn new(fail_all: bool) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_all,
            }
        }

        fn step(&self, name: &'static str) -> io::Result<()> {
            self.calls.lock().push(name);
            if self.fail_all {
                Err(io::Error::other(name))
            } else {
                Ok(())
            }
        }
    }

    impl DuplexStream for StepStream {
        fn read(&self, _buf: &mut [u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn write(&self, _data: &[u8]) -> io::Result<()> {
            self.step("write")
        }
        fn flush_output(&self) -> io::Result<()> {
            self.step("flush")
        }
        fn close_input(&self) -> io::Result<()> {
            self.step("close_input")
        }
        fn close_output(&self) -> io::Result<()> {
            self.step("close_output")
        }
        fn close_handle(&self) -> io::Result<()> {
            self.step("close_handle")
        }
    }

    fn counting_session(
        stream: Arc<StepStream>,
    ) -> (Session, Arc<AtomicUsize>, Arc<Mutex<Vec<bool>>>) {
        let data_count = Arc::new(AtomicUsize::new(0));
        let closes = Arc::new(Mutex::new(Vec::new()));
        let data_clone = data_count.clone();
        let closes_clone = closes.clone();
        let handler = FnHandler::new(
            move |_| {
                data_clone.fetch_add(1, Ordering::SeqCst);
            },
            move |by_remote| closes_clone.lock().push(by_remote),
        );
        let session = Session::new("test", stream, Arc::new(handler));
        (session, data_count, closes)
    }

    #[test]
    fn test_new_session_is_connected() {
        let (session, _, _) = counting_session(Arc::new(StepStream::new(false)));
        assert_eq!(session.state(), LinkState::Connected);
        assert!(session.is_connected());
        assert_eq!(session.address(), "test");
    }

    #[test]
    fn test_request_close_hides_connected() {
        let (session, _, _) = counting_session(Arc::new(StepStream::new(false)));
        session.request_close();
        assert!(!session.is_connected());
        assert_eq!(session.state(), LinkState::Connected);
    }

    #[test]
    fn test_cleanup_runs_steps_in_order() {
        let stream = Arc::new(StepStream::new(false));
        let (session, _, closes) = counting_session(stream.clone());

        assert!(session.cleanup(false));

        assert_eq!(
            stream.calls.lock().as_slice(),
            &["flush", "close_input", "close_output", "close_handle"]
        );
        assert_eq!(closes.lock().as_slice(), &[false]);
        assert_eq!(session.state(), LinkState::Closed);
    }

    #[test]
    fn test_cleanup_continues_past_failures() {
        let stream = Arc::new(StepStream::new(true));
        let (session, _, closes) = counting_session(stream.clone());

        assert!(session.cleanup(true));

        assert_eq!(stream.calls.lock().len(), 4);
        assert_eq!(closes.lock().as_slice(), &[true]);
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let stream = Arc::new(StepStream::new(false));
        let (session, _, closes) = counting_session(stream.clone());

        assert!(session.cleanup(false));
        assert!(!session.cleanup(true));
        assert!(!session.cleanup(false));

        assert_eq!(stream.calls.lock().len(), 4);
        assert_eq!(closes.lock().as_slice(), &[false]);
    }

    #[test]
    fn test_concurrent_cleanup_runs_once() {
        let stream = Arc::new(StepStream::new(false));
        let (session, _, closes) = counting_session(stream.clone());
        let session = Arc::new(session);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let session = session.clone();
                std::thread::spawn(move || session.cleanup(i % 2 == 0))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(closes.lock().len(), 1);
        assert_eq!(stream.calls.lock().len(), 4);
    }

    #[test]
    fn test_no_delivery_after_cleanup() {
        let (session, data_count, _) = counting_session(Arc::new(StepStream::new(false)));

        assert!(session.deliver(Bytes::from_static(b"before")));
        session.cleanup(true);
        assert!(!session.deliver(Bytes::from_static(b"after")));

        assert_eq!(data_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_abandon_skips_notification() {
        let stream = Arc::new(StepStream::new(false));
        let (session, _, closes) = counting_session(stream.clone());

        session.abandon();

        assert_eq!(stream.calls.lock().len(), 4);
        assert!(closes.lock().is_empty());
        assert!(!session.cleanup(true));
        assert!(closes.lock().is_empty());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LinkState::Connected.to_string(), "connected");
        assert_eq!(LinkState::Closed.to_string(), "closed");
    }
}

//! Transport abstraction for byte-level I/O
//!
//! Separates stream plumbing from connection lifecycle:
//! - **Transport**: how a duplex byte stream is opened and driven (Serial, TCP...)
//! - **Link**: who reads, who writes, who tears down (handled in `link`)
//!
//! Streams are blocking. The link runs the read side on its own thread and
//! calls the write/flush/close side from the caller's thread, so every
//! `DuplexStream` method takes `&self` and the implementation must tolerate
//! a `close_*` call while another thread is parked in `read`.
//!
//! # Adding a new transport
//!
//! 1. Create `transport/my_transport.rs`
//! 2. Implement `DuplexStream` for the stream and `StreamOpener` for the opener
//! 3. Add `pub mod my_transport;` here

pub mod serial;
pub mod tcp;

pub use serial::{SerialOpener, SerialStream};
pub use tcp::{TcpOpener, TcpStreamDuplex};

use crate::error::Result;
use std::io;
use std::sync::Arc;
use uuid::Uuid;

/// An established bidirectional byte stream
///
/// # Closing contract
///
/// `close_input` and `close_handle` must unblock a thread parked in `read`,
/// which then returns an error or `Ok(0)`. Closing an already closed side is
/// not an error worth surfacing; implementations may return `Ok(())` or any
/// error, the link ignores both.
pub trait DuplexStream: Send + Sync + 'static {
    /// Blocking read of up to `buf.len()` bytes
    ///
    /// `Ok(0)` means end of stream.
    fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write all bytes, blocking until the transport accepts them
    fn write(&self, data: &[u8]) -> io::Result<()>;

    /// Flush buffered output
    fn flush_output(&self) -> io::Result<()>;

    /// Close the input side, waking any pending `read`
    fn close_input(&self) -> io::Result<()>;

    /// Close the output side
    fn close_output(&self) -> io::Result<()>;

    /// Release the underlying socket/device handle
    ///
    /// A closed session may stay referenced for a while, so after this the
    /// stream must hold no OS handle.
    fn close_handle(&self) -> io::Result<()>;
}

/// Resolves an address and opens a `DuplexStream` to it
///
/// # Errors
///
/// - `DeviceNotFound` - the address does not resolve to a device
/// - `SocketFailure` - the device exists but open/handshake failed
pub trait StreamOpener: Send + Sync + 'static {
    /// Open a stream to `address` for the given service
    fn open(&self, address: &str, service: Uuid) -> Result<Arc<dyn DuplexStream>>;

    /// Stop any discovery/scan activity that would slow the new link down
    fn cancel_discovery(&self) {}

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}

impl<T: StreamOpener + ?Sized> StreamOpener for Arc<T> {
    fn open(&self, address: &str, service: Uuid) -> Result<Arc<dyn DuplexStream>> {
        (**self).open(address, service)
    }

    fn cancel_discovery(&self) {
        (**self).cancel_discovery()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<T: StreamOpener + ?Sized> StreamOpener for Box<T> {
    fn open(&self, address: &str, service: Uuid) -> Result<Arc<dyn DuplexStream>> {
        (**self).open(address, service)
    }

    fn cancel_discovery(&self) {
        (**self).cancel_discovery()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

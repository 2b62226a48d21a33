//! TCP transport for SPP simulation and testing
//!
//! Treats `host:port` as the device address. Useful when the real device
//! sits behind a TCP-to-RFCOMM relay, or for exercising the link without
//! Bluetooth hardware.

use super::{DuplexStream, StreamOpener};
use crate::error::{LinkError, Result};
use parking_lot::RwLock;
use socket2::SockRef;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// TCP opener
///
/// # Example
///
/// ```ignore
/// let opener = TcpOpener::new().with_connect_timeout(Duration::from_secs(5));
/// let manager = ConnectionManager::new(opener, handler);
/// manager.connect("127.0.0.1:9000", None)?;
/// ```
#[derive(Debug, Clone)]
pub struct TcpOpener {
    connect_timeout: Option<Duration>,
    keepalive: bool,
}

impl TcpOpener {
    /// Create an opener with no connect timeout and keepalive enabled
    pub fn new() -> Self {
        Self {
            connect_timeout: None,
            keepalive: true,
        }
    }

    /// Bound the TCP handshake
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Enable or disable SO_KEEPALIVE so a vanished peer surfaces as a read error
    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    fn connect_one(&self, addr: &SocketAddr) -> io::Result<TcpStream> {
        match self.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
    }
}

impl Default for TcpOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamOpener for TcpOpener {
    fn open(&self, address: &str, service: Uuid) -> Result<Arc<dyn DuplexStream>> {
        let addrs: Vec<SocketAddr> = address
            .to_socket_addrs()
            .map(|iter| iter.collect())
            .unwrap_or_default();
        if addrs.is_empty() {
            return Err(LinkError::DeviceNotFound {
                address: address.to_string(),
            });
        }

        debug!("[TCP] Connecting to {} (service {})", address, service);

        let mut last_err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no address tried");
        for addr in &addrs {
            match self.connect_one(addr) {
                Ok(stream) => {
                    let _ = stream.set_nodelay(true);
                    if self.keepalive {
                        let _ = SockRef::from(&stream).set_keepalive(true);
                    }
                    let duplex = TcpStreamDuplex::new(stream);
                    debug!("[TCP] Connected to {:?}", duplex.peer_addr());
                    return Ok(Arc::new(duplex));
                }
                Err(e) => last_err = e,
            }
        }

        Err(LinkError::SocketFailure {
            address: address.to_string(),
            source: last_err,
        })
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}

/// Connected TCP stream with half-close support
///
/// Every operation runs under the read side of the lock; `close_handle`
/// shuts the socket down first, so blocked readers and writers let go, then
/// takes the write side and drops the socket.
pub struct TcpStreamDuplex {
    inner: RwLock<Option<TcpStream>>,
}

impl TcpStreamDuplex {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            inner: RwLock::new(Some(stream)),
        }
    }

    /// Remote socket address; `None` once the handle is released
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.inner.read().as_ref()?.peer_addr().ok()
    }

    fn with_socket<T>(&self, op: impl FnOnce(&TcpStream) -> io::Result<T>) -> io::Result<T> {
        match self.inner.read().as_ref() {
            Some(stream) => op(stream),
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket released")),
        }
    }
}

impl DuplexStream for TcpStreamDuplex {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.with_socket(|mut stream| stream.read(buf))
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        self.with_socket(|mut stream| stream.write_all(data))
    }

    fn flush_output(&self) -> io::Result<()> {
        self.with_socket(|mut stream| stream.flush())
    }

    fn close_input(&self) -> io::Result<()> {
        self.with_socket(|stream| stream.shutdown(Shutdown::Read))
    }

    fn close_output(&self) -> io::Result<()> {
        self.with_socket(|stream| stream.shutdown(Shutdown::Write))
    }

    fn close_handle(&self) -> io::Result<()> {
        // Already shut down by the earlier steps, or by the peer
        let _ = self.with_socket(|stream| stream.shutdown(Shutdown::Both));
        match self.inner.write().take() {
            Some(stream) => {
                debug!("[TCP] Released socket to {:?}", stream.peer_addr().ok());
                Ok(())
            }
            None => Err(io::Error::new(io::ErrorKind::NotConnected, "socket released")),
        }
    }
}

//! Serial transport for SPP devices
//!
//! On Linux a paired RFCOMM channel is exposed as a TTY (`rfcomm bind`
//! creates `/dev/rfcommN`); on Windows and macOS the OS publishes an SPP
//! service as a COM port / `tty.*` device. Either way the link sees a plain
//! serial port.
//!
//! The port is opened with a short read timeout so that `read` can notice a
//! local close: it keeps polling until data arrives, the device goes away,
//! or `close_input`/`close_handle` is called from another thread.

use super::{DuplexStream, StreamOpener};
use crate::constants::{DEFAULT_BAUD_RATE, SERIAL_DISCONNECT_THRESHOLD, SERIAL_READ_POLL_MS};
use crate::error::{LinkError, Result};
use parking_lot::Mutex;
use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Opens serial devices as duplex streams
///
/// # Example
///
/// ```ignore
/// let opener = SerialOpener::new(115_200);
/// let manager = ConnectionManager::new(opener, handler);
/// manager.connect("/dev/rfcomm0", None)?;
/// ```
#[derive(Debug, Clone)]
pub struct SerialOpener {
    baud_rate: u32,
    read_poll: Duration,
}

impl SerialOpener {
    /// Create an opener with the given baud rate and the default poll interval
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            read_poll: Duration::from_millis(SERIAL_READ_POLL_MS),
        }
    }

    /// Override how often a pending read re-checks for a local close
    pub fn with_read_poll(mut self, read_poll: Duration) -> Self {
        self.read_poll = read_poll;
        self
    }
}

impl Default for SerialOpener {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

/// Map a serialport open error onto the link taxonomy
fn map_open_error(port_name: &str, e: serialport::Error) -> LinkError {
    let missing = match e.kind() {
        serialport::ErrorKind::NoDevice => true,
        serialport::ErrorKind::Io(kind) => kind == io::ErrorKind::NotFound,
        _ => false,
    };
    if missing {
        LinkError::DeviceNotFound {
            address: port_name.to_string(),
        }
    } else {
        LinkError::SocketFailure {
            address: port_name.to_string(),
            source: io::Error::from(e),
        }
    }
}

impl StreamOpener for SerialOpener {
    fn open(&self, address: &str, service: Uuid) -> Result<Arc<dyn DuplexStream>> {
        // The OS bound the service to the device node already
        debug!("[Serial] Opening {} (service {})", address, service);

        let port = serialport::new(address, self.baud_rate)
            .timeout(self.read_poll)
            .open()
            .map_err(|e| map_open_error(address, e))?;
        let port_write = port.try_clone().map_err(|e| LinkError::SocketFailure {
            address: address.to_string(),
            source: io::Error::from(e),
        })?;

        Ok(Arc::new(SerialStream::new(address, port, port_write)))
    }

    fn name(&self) -> &'static str {
        "Serial"
    }
}

/// Serial port split into independently closable read and write handles
pub struct SerialStream {
    port_name: String,
    input: Mutex<Option<Box<dyn SerialPort>>>,
    output: Mutex<Option<Box<dyn SerialPort>>>,
    input_closed: AtomicBool,
}

impl SerialStream {
    fn new(port_name: &str, input: Box<dyn SerialPort>, output: Box<dyn SerialPort>) -> Self {
        Self {
            port_name: port_name.to_string(),
            input: Mutex::new(Some(input)),
            output: Mutex::new(Some(output)),
            input_closed: AtomicBool::new(false),
        }
    }
}

fn closed(side: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, format!("{} closed", side))
}

impl DuplexStream for SerialStream {
    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut zero_reads = 0u32;

        loop {
            if self.input_closed.load(Ordering::Acquire) {
                return Err(closed("input"));
            }

            // Lock per poll so close_handle can take the port between polls
            let mut guard = self.input.lock();
            let Some(port) = guard.as_mut() else {
                return Err(closed("input"));
            };

            match port.read(buf) {
                Ok(n) if n > 0 => return Ok(n),
                Ok(_) => {
                    // Zero bytes read - could be normal or port gone
                    zero_reads += 1;
                    if zero_reads > SERIAL_DISCONNECT_THRESHOLD {
                        debug!("[Serial] {} stopped responding", self.port_name);
                        return Ok(0);
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => {
                    zero_reads = 0;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        match self.output.lock().as_mut() {
            Some(port) => port.write_all(data),
            None => Err(closed("output")),
        }
    }

    fn flush_output(&self) -> io::Result<()> {
        match self.output.lock().as_mut() {
            Some(port) => port.flush(),
            None => Err(closed("output")),
        }
    }

    fn close_input(&self) -> io::Result<()> {
        self.input_closed.store(true, Ordering::Release);
        Ok(())
    }

    fn close_output(&self) -> io::Result<()> {
        self.output.lock().take().map(drop).ok_or_else(|| closed("output"))
    }

    fn close_handle(&self) -> io::Result<()> {
        self.input_closed.store(true, Ordering::Release);
        // Waits at most one poll interval for a pending read to let go
        self.input.lock().take();
        self.output.lock().take();
        debug!("[Serial] Released {}", self.port_name);
        Ok(())
    }
}

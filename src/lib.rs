//! spp-link - one serial-port-profile byte stream, managed
//!
//! Opens a duplex byte stream (an RFCOMM/SPP device node, a COM port, or a
//! TCP socket), delivers inbound bytes from a background reader thread, takes
//! outbound writes on the caller's thread, and tears the link down exactly
//! once whichever side closes it.
//!
//! ```ignore
//! use spp_link::{ChannelHandler, ConnectionManager, SerialOpener};
//!
//! let (handler, mut events) = ChannelHandler::new();
//! let manager = ConnectionManager::new(SerialOpener::default(), handler);
//! manager.connect("/dev/rfcomm0", None)?;
//! manager.write(b"hello\n")?;
//! manager.disconnect();
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod link;
pub mod logging;
pub mod transport;

pub use config::{Config, LinkConfig, TransportConfig, TransportKind, WriteFailurePolicy};
pub use constants::SERIAL_PORT_PROFILE_UUID;
pub use error::{LinkError, Result};
pub use link::{
    ChannelHandler, ConnectionEvent, ConnectionHandler, ConnectionManager, FnHandler, LinkState,
    Stats,
};
pub use transport::{DuplexStream, SerialOpener, StreamOpener, TcpOpener};

//! Configuration management
//!
//! Config is a TOML file, `config.toml` next to the executable unless a path
//! is given explicitly. Every section and field has a default, so a missing
//! or partial file is valid.

use crate::constants::{
    DEFAULT_BAUD_RATE, READ_CHUNK_SIZE, SERIAL_PORT_PROFILE_UUID, SERIAL_READ_POLL_MS,
};
use crate::error::{LinkError, Result};
use crate::transport::{SerialOpener, StreamOpener, TcpOpener};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub link: LinkConfig,
    pub transport: TransportConfig,
}

impl Config {
    /// Reject values the link cannot run with
    pub fn validate(&self) -> Result<()> {
        self.link.validate()?;
        if self.transport.read_poll_ms == 0 {
            return Err(LinkError::ConfigValidation {
                field: "transport.read_poll_ms",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Link Configuration
// =============================================================================

/// What `write` does when the stream rejects the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteFailurePolicy {
    /// Return `LinkError::WriteFailed` to the caller
    #[default]
    Surface,
    /// Log the failure and report success (best-effort writes)
    Absorb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Maximum bytes per read, and so per `on_data` delivery
    pub read_chunk_size: usize,
    /// Write failure handling
    pub write_failure: WriteFailurePolicy,
    /// Service used when `connect` is called without one
    pub service_uuid: Uuid,
}

impl LinkConfig {
    /// Reject settings a session cannot run with
    ///
    /// A zero chunk size would make every read look like end of stream.
    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(LinkError::ConfigValidation {
                field: "link.read_chunk_size",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: READ_CHUNK_SIZE,
            write_failure: WriteFailurePolicy::Surface,
            service_uuid: SERIAL_PORT_PROFILE_UUID,
        }
    }
}

// =============================================================================
// Transport Configuration
// =============================================================================

/// Which opener to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Serial device (`/dev/rfcommN`, `COMx`, `/dev/tty.*`)
    #[default]
    Serial,
    /// TCP `host:port` (simulation / relays)
    Tcp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
    /// Serial baud rate (ignored by RFCOMM TTYs)
    pub baud_rate: u32,
    /// How often a blocked serial read re-checks for a local close
    pub read_poll_ms: u64,
    /// TCP handshake timeout, 0 = wait for the OS
    pub tcp_connect_timeout_ms: u64,
    /// Enable SO_KEEPALIVE on TCP links
    pub tcp_keepalive: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::Serial,
            baud_rate: DEFAULT_BAUD_RATE,
            read_poll_ms: SERIAL_READ_POLL_MS,
            tcp_connect_timeout_ms: 0,
            tcp_keepalive: true,
        }
    }
}

impl TransportConfig {
    /// Build the opener this section describes
    pub fn build_opener(&self) -> Box<dyn StreamOpener> {
        match self.kind {
            TransportKind::Serial => Box::new(
                SerialOpener::new(self.baud_rate)
                    .with_read_poll(Duration::from_millis(self.read_poll_ms)),
            ),
            TransportKind::Tcp => {
                let mut opener = TcpOpener::new().with_keepalive(self.tcp_keepalive);
                if self.tcp_connect_timeout_ms > 0 {
                    opener = opener
                        .with_connect_timeout(Duration::from_millis(self.tcp_connect_timeout_ms));
                }
                Box::new(opener)
            }
        }
    }
}

// =============================================================================
// Loading / saving
// =============================================================================

/// Parse a service identifier given on the command line
pub fn parse_service_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| LinkError::InvalidServiceId {
        value: value.to_string(),
    })
}

/// Default config file path (`config.toml` next to the executable)
pub fn default_path() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| LinkError::ConfigRead {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| LinkError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;
    Ok(exe_dir.join("config.toml"))
}

/// Load and validate config from `path`; a missing file yields defaults
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path).map_err(|e| LinkError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| LinkError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })?;

    config.validate()?;
    Ok(config)
}

/// Save config to `path`
pub fn save(config: &Config, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config).map_err(|e| LinkError::ConfigValidation {
        field: "config",
        reason: e.to_string(),
    })?;
    fs::write(path, content).map_err(|e| LinkError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })
}

// ============================================================================
// Tests
// ============================================================================

//! Application-wide constants
//!
//! Centralized constants to avoid duplication and ensure consistency.

use uuid::Uuid;

// =============================================================================
// Service
// =============================================================================

/// Standard Serial Port Profile service class UUID
/// (`00001101-0000-1000-8000-00805F9B34FB`)
pub const SERIAL_PORT_PROFILE_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805F9B34FB);

// =============================================================================
// Buffers
// =============================================================================

/// Maximum bytes pulled from the stream per read
pub const READ_CHUNK_SIZE: usize = 1024;

// =============================================================================
// Serial
// =============================================================================

/// Default baud rate (ignored by RFCOMM TTYs and USB CDC devices)
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial read timeout; the stream re-polls until data or close (milliseconds)
pub const SERIAL_READ_POLL_MS: u64 = 50;

/// Consecutive zero-byte reads before assuming port disconnected
pub const SERIAL_DISCONNECT_THRESHOLD: u32 = 10;

// =============================================================================
// Threads
// =============================================================================

/// Name given to the background reader thread
pub const READER_THREAD_NAME: &str = "spp-reader";

//! Command-line interface definition using clap
//!
//! Provides structured argument parsing with automatic help generation.

use clap::Parser;
use std::path::PathBuf;

// =============================================================================
// CLI Definition
// =============================================================================

/// Interactive terminal over a serial-port-profile link
///
/// Prints everything the device sends and writes each stdin line to it.
#[derive(Parser, Debug, Default)]
#[command(name = "spp-link")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Device address: serial path (/dev/rfcomm0, COM5) or host:port with --tcp
    #[arg(value_name = "ADDRESS")]
    pub address: String,

    /// Service UUID (default: serial port profile)
    #[arg(long, value_name = "UUID")]
    pub uuid: Option<String>,

    /// Treat ADDRESS as host:port (overrides config transport kind)
    #[arg(long)]
    pub tcp: bool,

    /// Config file (default: config.toml next to the executable)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print inbound bytes as hex instead of text
    #[arg(long)]
    pub hex: bool,

    /// Don't append a newline to lines written to the device
    #[arg(long)]
    pub raw: bool,

    /// Enable verbose debug output
    #[arg(short, long)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================

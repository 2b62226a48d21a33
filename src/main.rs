//! spp-link - interactive terminal over a serial-port-profile link
//!
//! Usage:
//!   spp-link /dev/rfcomm0               Talk to a bound RFCOMM device
//!   spp-link COM5 --hex                 Show inbound bytes as hex
//!   spp-link --tcp 127.0.0.1:9000       Talk to an SPP-over-TCP relay

use anyhow::{Context, Result};
use clap::Parser;
use spp_link::cli::Cli;
use spp_link::{
    config, logging, ChannelHandler, Config, ConnectionEvent, ConnectionManager, TransportKind,
};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => config::default_path()?,
    };
    let mut cfg = config::load(&config_path)?;
    if cli.tcp {
        cfg.transport.kind = TransportKind::Tcp;
    }
    let service = cli
        .uuid
        .as_deref()
        .map(config::parse_service_id)
        .transpose()?;

    // Create tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli, cfg, service))
}

async fn run(cli: Cli, cfg: Config, service: Option<Uuid>) -> Result<()> {
    let (handler, mut events) = ChannelHandler::new();
    let manager = Arc::new(ConnectionManager::with_config(
        cfg.transport.build_opener(),
        handler,
        cfg.link.clone(),
    ));

    // Connect blocks for the whole handshake
    let address = cli.address.clone();
    let connector = manager.clone();
    tokio::task::spawn_blocking(move || connector.connect(&address, service))
        .await?
        .with_context(|| format!("cannot connect to {}", cli.address))?;
    eprintln!("Connected to {} (Ctrl-C or EOF to quit)", cli.address);

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ConnectionEvent::Data(data)) => print_inbound(&data, cli.hex),
                Some(ConnectionEvent::Disconnected { by_remote }) => {
                    if by_remote {
                        eprintln!("Connection closed by remote device");
                    } else {
                        eprintln!("Disconnected");
                    }
                    break;
                }
                None => break,
            },

            line = stdin.next_line(), if stdin_open => match line? {
                Some(line) => {
                    let mut payload = line.into_bytes();
                    if !cli.raw {
                        payload.push(b'\n');
                    }
                    let writer = manager.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || writer.write(&payload)).await? {
                        eprintln!("Write failed: {}", e);
                    }
                }
                None => {
                    stdin_open = false;
                    disconnect(&manager).await?;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                disconnect(&manager).await?;
            }
        }
    }

    let stats = manager.stats();
    eprintln!(
        "Sent {} bytes, received {} bytes",
        stats.tx_bytes(),
        stats.rx_bytes()
    );
    Ok(())
}

async fn disconnect(manager: &Arc<ConnectionManager>) -> Result<()> {
    let manager = manager.clone();
    tokio::task::spawn_blocking(move || manager.disconnect()).await?;
    Ok(())
}

fn print_inbound(data: &[u8], hex: bool) {
    let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
    let mut out = std::io::stdout().lock();
    let _ = if hex {
        let bytes: Vec<String> = data.iter().map(|b| format!("{:02X}", b)).collect();
        writeln!(out, "[{}] {}", timestamp, bytes.join(" "))
    } else {
        write!(out, "{}", String::from_utf8_lossy(data))
    };
    let _ = out.flush();
}

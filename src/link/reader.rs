//! Background reader loop
//!
//! One blocking thread per session. It parks in `DuplexStream::read` and
//! wakes with data, with end-of-stream, or with an error caused by the
//! session closing the stream underneath it.

use super::session::Session;
use super::stats::Stats;
use crate::constants::READER_THREAD_NAME;
use bytes::Bytes;
use std::io;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, warn};

/// Start the reader thread for a session
pub(crate) fn spawn(
    session: Arc<Session>,
    chunk_size: usize,
    stats: Arc<Stats>,
) -> io::Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(READER_THREAD_NAME.into())
        .spawn(move || run(&session, chunk_size, &stats))
}

/// Read until the stream fails or a local close is requested
///
/// A failure seen while no local close is pending is the peer going away,
/// so the reader performs the cleanup itself with `by_remote = true`.
pub(crate) fn run(session: &Session, chunk_size: usize, stats: &Stats) {
    let stream = session.stream().clone();
    let mut buf = vec![0u8; chunk_size];

    while !session.closing_requested() {
        match stream.read(&mut buf) {
            Ok(0) => {
                debug!("[Reader] End of stream from {}", session.address());
                break;
            }
            Ok(n) => {
                stats.add_rx(n);
                if !session.deliver(Bytes::copy_from_slice(&buf[..n])) {
                    break;
                }
            }
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                if !session.closing_requested() {
                    warn!("[Reader] Read from {} failed: {}", session.address(), e);
                }
                break;
            }
        }
    }

    if !session.closing_requested() {
        session.cleanup(true);
    }
}

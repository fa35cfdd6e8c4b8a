//! Long-lived event stream connection with watchdog and reconnect.
//!
//! `connect → read until silent/closed/failed → teardown → wait → connect`,
//! forever, until the cancellation token fires. Transport failures are
//! logged here and never reach the caller.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use crate::framer::MessageFramer;
use crate::state::Dispatcher;
use crate::transport::{DeviceStream, Transport};

const READ_CHUNK: usize = 4096;

/// Timing of the connection loop
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConnectionSettings {
    pub watchdog_timeout: Duration,
    pub reconnect_delay: Duration,
}

/// Why a session ended without a transport error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Cancelled,
    WatchdogExpired,
    PeerClosed,
}

/// Drives one controller connection until `cancel` fires
pub(crate) async fn run_connection(
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    settings: ConnectionSettings,
    cancel: CancellationToken,
) {
    let peer = transport.peer();

    while !cancel.is_cancelled() {
        tracing::info!(peer = %peer, "Attempting to connect");

        match session(transport.as_ref(), &dispatcher, settings, &cancel).await {
            Ok(SessionEnd::Cancelled) => tracing::debug!(peer = %peer, "Session cancelled"),
            Ok(SessionEnd::WatchdogExpired) => tracing::warn!(
                peer = %peer,
                timeout_s = settings.watchdog_timeout.as_secs(),
                "Keep-alive timeout, no data received"
            ),
            Ok(SessionEnd::PeerClosed) => tracing::warn!(peer = %peer, "Controller closed the connection"),
            Err(e) => tracing::warn!(peer = %peer, error = %e, "Connection failed"),
        }

        // Teardown: the stream was dropped when `session` returned.
        dispatcher.set_connected(false);

        if cancel.is_cancelled() {
            break;
        }

        tracing::info!(
            peer = %peer,
            delay_ms = settings.reconnect_delay.as_millis() as u64,
            "Reconnecting"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(settings.reconnect_delay) => {}
        }
    }

    tracing::debug!(peer = %peer, "Connection loop exiting");
}

/// One connection: open, then read and dispatch until it ends
async fn session(
    transport: &dyn Transport,
    dispatcher: &Dispatcher,
    settings: ConnectionSettings,
    cancel: &CancellationToken,
) -> io::Result<SessionEnd> {
    let mut stream: DeviceStream = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
        stream = transport.open() => stream?,
    };

    dispatcher.set_connected(true);

    let mut framer = MessageFramer::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),
            read = tokio::time::timeout(settings.watchdog_timeout, stream.read(&mut buf)) => read,
        };

        let n = match read {
            Err(_elapsed) => return Ok(SessionEnd::WatchdogExpired),
            Ok(result) => result?,
        };
        if n == 0 {
            return Ok(SessionEnd::PeerClosed);
        }

        framer.push(&buf[..n]);
        for message in framer.by_ref() {
            dispatcher.dispatch(message);
        }
    }
}

use crate::error::{Result, RgbwwError};
use crate::types::{ClockSlaveStatus, ColorState};
use tokio::sync::broadcast;

/// Change reported by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// Color state changed (new snapshot)
    Color(ColorState),

    /// Stream connection went up or down
    Connection(bool),

    /// An animation step finished
    TransitionFinished { name: String, requeued: bool },

    /// Device info was received
    Info(Box<serde_json::Value>),

    /// Device configuration was received
    Config(Box<serde_json::Value>),

    /// Initial state dump after connecting is complete
    StateCompleted,

    /// Clock slave status was received
    ClockSlaveStatus(ClockSlaveStatus),
}

/// Receiver for controller events
pub struct EventReceiver {
    rx: broadcast::Receiver<ControllerEvent>,
}

impl EventReceiver {
    pub(crate) fn new(rx: broadcast::Receiver<ControllerEvent>) -> Self {
        Self { rx }
    }

    /// Receive the next event
    ///
    /// Fails with `ChannelError` if this receiver fell behind, and with
    /// `Io(BrokenPipe)` once the controller has been dropped.
    pub async fn recv(&mut self) -> Result<ControllerEvent> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => closed(),
            broadcast::error::RecvError::Lagged(n) => {
                RgbwwError::ChannelError(format!("Lagged by {} messages", n))
            }
        })
    }

    /// Try to receive an event without blocking
    ///
    /// Returns `None` if no event is available.
    pub fn try_recv(&mut self) -> Result<Option<ControllerEvent>> {
        match self.rx.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(closed()),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                Err(RgbwwError::ChannelError(format!("Lagged by {} messages", n)))
            }
        }
    }
}

fn closed() -> RgbwwError {
    RgbwwError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "controller dropped",
    ))
}

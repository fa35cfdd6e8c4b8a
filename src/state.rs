use std::sync::{Mutex, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;

use crate::observer::ObserverRegistry;
use crate::protocol::{Method, Notification, TransitionFinished};
use crate::subscription::{ControllerEvent, EventReceiver};
use crate::types::{ClockSlaveStatus, ColorState};

const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Cached view of the controller
#[derive(Debug, Clone, Default)]
pub(crate) struct DeviceState {
    pub connected: bool,
    pub color: ColorState,
    pub info: Option<Value>,
    pub config: Option<Value>,
    pub clock_slave_status: Option<ClockSlaveStatus>,
    /// Set once the device finished its initial state dump
    pub state_completed: bool,
}

impl DeviceState {
    /// Apply a streamed notification and return the event it produces
    pub fn apply(&mut self, msg: Notification) -> Option<ControllerEvent> {
        match msg.kind() {
            Method::Color => {
                self.color.merge(&msg.params);
                Some(ControllerEvent::Color(self.color))
            }
            Method::Info => {
                self.info = Some(msg.params.clone());
                Some(ControllerEvent::Info(Box::new(msg.params)))
            }
            Method::Config => {
                self.config = Some(msg.params.clone());
                Some(ControllerEvent::Config(Box::new(msg.params)))
            }
            Method::TransitionFinished => {
                match serde_json::from_value::<TransitionFinished>(msg.params) {
                    Ok(t) => Some(ControllerEvent::TransitionFinished {
                        name: t.name,
                        requeued: t.requeued,
                    }),
                    Err(e) => {
                        tracing::debug!("Malformed transition_finished: {}", e);
                        None
                    }
                }
            }
            Method::StateCompleted => {
                self.state_completed = true;
                Some(ControllerEvent::StateCompleted)
            }
            Method::ClockSlaveStatus => {
                match serde_json::from_value::<ClockSlaveStatus>(msg.params) {
                    Ok(status) => {
                        self.clock_slave_status = Some(status);
                        Some(ControllerEvent::ClockSlaveStatus(status))
                    }
                    Err(e) => {
                        tracing::debug!("Malformed clock_slave_status: {}", e);
                        None
                    }
                }
            }
            Method::KeepAlive => None,
            Method::Unknown => {
                tracing::debug!("Ignoring unknown method {}", msg.method);
                None
            }
        }
    }
}

/// Single writer for [`DeviceState`], fanning changes out to observers and
/// event subscribers
pub(crate) struct Dispatcher {
    state: Mutex<DeviceState>,
    observers: ObserverRegistry,
    events: broadcast::Sender<ControllerEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(DeviceState::default()),
            observers: ObserverRegistry::default(),
            events,
        }
    }

    /// Handle one decoded stream object
    pub fn dispatch(&self, message: Value) {
        tracing::debug!("Received: {}", message);

        let msg: Notification = match serde_json::from_value(message) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!("Ignoring message without method: {}", e);
                return;
            }
        };

        // The lock is released before observers run.
        let event = self.update(|state| state.apply(msg));
        if let Some(event) = event {
            self.publish(event);
        }
    }

    /// Record a connection state change; no-op if unchanged
    pub fn set_connected(&self, connected: bool) {
        let changed = self.update(|state| {
            let changed = state.connected != connected;
            state.connected = connected;
            changed
        });
        if changed {
            self.publish(ControllerEvent::Connection(connected));
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&DeviceState) -> R) -> R {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DeviceState) -> R) -> R {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.events.subscribe())
    }

    fn publish(&self, event: ControllerEvent) {
        self.observers.notify(&event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

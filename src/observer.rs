//! Synchronous state observers.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::error::{Result, RgbwwError};
use crate::subscription::ControllerEvent;
use crate::types::{ClockSlaveStatus, ColorState};

/// Receives controller state changes.
///
/// Callbacks run on the connection task in registration order and must not
/// block. All methods default to doing nothing.
pub trait StateObserver: Send + Sync {
    fn on_color_update(&self, _color: &ColorState) {}
    fn on_connection_update(&self, _connected: bool) {}
    fn on_transition_finished(&self, _name: &str, _requeued: bool) {}
    fn on_config_update(&self, _config: &Value) {}
    fn on_state_completed(&self) {}
    fn on_clock_slave_status_update(&self, _status: &ClockSlaveStatus) {}
}

/// Ordered set of distinct observers
#[derive(Default)]
pub(crate) struct ObserverRegistry {
    observers: Mutex<Vec<Arc<dyn StateObserver>>>,
}

impl ObserverRegistry {
    pub fn register(&self, observer: Arc<dyn StateObserver>) -> Result<()> {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        if observers.iter().any(|o| same(o, &observer)) {
            return Err(RgbwwError::AlreadyRegistered);
        }
        observers.push(observer);
        Ok(())
    }

    pub fn unregister(&self, observer: &Arc<dyn StateObserver>) -> Result<()> {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let index = observers
            .iter()
            .position(|o| same(o, observer))
            .ok_or(RgbwwError::NotRegistered)?;
        observers.remove(index);
        Ok(())
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Deliver an event to every observer
    pub fn notify(&self, event: &ControllerEvent) {
        // Snapshot so callbacks may (un)register without deadlocking.
        let observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner).clone();
        for observer in &observers {
            deliver(observer.as_ref(), event);
        }
    }
}

fn same(a: &Arc<dyn StateObserver>, b: &Arc<dyn StateObserver>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

fn deliver(observer: &dyn StateObserver, event: &ControllerEvent) {
    match event {
        ControllerEvent::Color(color) => observer.on_color_update(color),
        ControllerEvent::Connection(connected) => observer.on_connection_update(*connected),
        ControllerEvent::TransitionFinished { name, requeued } => {
            observer.on_transition_finished(name, *requeued)
        }
        ControllerEvent::Config(config) => observer.on_config_update(config),
        ControllerEvent::StateCompleted => observer.on_state_completed(),
        ControllerEvent::ClockSlaveStatus(status) => observer.on_clock_slave_status_update(status),
        ControllerEvent::Info(_) => {}
    }
}

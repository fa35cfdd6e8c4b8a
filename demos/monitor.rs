//! Watch a controller's event stream.
//!
//! ```text
//! cargo run --example monitor -- 192.168.1.50
//! SIMULATION=1 cargo run --example monitor
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::sync::Arc;

use rgbww_controller::{
    ClockSlaveStatus, ColorState, ControllerConfig, ControllerEvent, RgbwwController,
    RgbwwError, StateObserver,
};
use tracing_subscriber::EnvFilter;

struct LogObserver;

impl StateObserver for LogObserver {
    fn on_color_update(&self, color: &ColorState) {
        tracing::info!(
            "Color: mode={:?} hsv=({}, {}, {}) ct={} raw=({}, {}, {}, {}, {})",
            color.color_mode,
            color.hue,
            color.saturation,
            color.brightness,
            color.color_temp,
            color.raw_r,
            color.raw_g,
            color.raw_b,
            color.raw_cw,
            color.raw_ww,
        );
    }

    fn on_connection_update(&self, connected: bool) {
        tracing::info!("Connected: {}", connected);
    }

    fn on_transition_finished(&self, name: &str, requeued: bool) {
        tracing::info!("Transition '{}' finished (requeued: {})", name, requeued);
    }

    fn on_state_completed(&self) {
        tracing::info!("Initial state received");
    }

    fn on_clock_slave_status_update(&self, status: &ClockSlaveStatus) {
        tracing::debug!(
            "Clock: offset={} interval={}",
            status.offset,
            status.current_interval
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let host = std::env::args().nth(1).unwrap_or_else(|| "192.168.1.50".to_string());
    let controller = RgbwwController::from_env(host, ControllerConfig::default())?;
    controller.register_observer(Arc::new(LogObserver))?;

    let mut events = controller.subscribe();
    controller.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ControllerEvent::StateCompleted) => {
                    if let Ok(Some(name)) = controller.device_name() {
                        println!("Device: {}", name);
                    }
                    if let Ok(Some(mac)) = controller.mac() {
                        println!("MAC: {}", mac);
                    }
                    if let Ok(Some((ww, cw))) = controller.color_temp_range() {
                        println!("Color temperature: {}K - {}K", ww, cw);
                    }
                }
                Ok(ControllerEvent::Info(info)) => println!("Info: {}", info),
                Ok(ControllerEvent::Config(config)) => println!("Config: {}", config),
                Ok(_) => {}
                Err(RgbwwError::ChannelError(e)) => tracing::warn!("Missed events: {}", e),
                Err(e) => return Err(e.into()),
            },
        }
    }

    controller.disconnect().await;
    Ok(())
}

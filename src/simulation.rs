//! Offline stand-in for a real controller.
//!
//! Produces the same byte stream a freshly connected controller would: an
//! initial info/config/color dump followed by periodic clock slave status.

use std::io;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::{json, Value};
use tokio::io::{AsyncWriteExt, DuplexStream};
use tokio::time::Instant;

use crate::protocol::Notification;
use crate::transport::{DeviceStream, Transport};

const PIPE_CAPACITY: usize = 8192;
const DUMP_STEP: Duration = Duration::from_millis(300);
const TICK: Duration = Duration::from_secs(1);
const CLOCK_STATUS_EVERY: Duration = Duration::from_secs(5);

/// Transport that synthesizes controller traffic instead of opening a socket
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    name: String,
}

impl SimulatedTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `GET /info` as served by the simulated device
    pub fn info() -> Value {
        json!({
            "firmware": "9.0-sim",
            "heap_free": 21123,
            "connection": { "mac": "a020a60836aa" },
            "git_version": "9.00-sim.git",
            "webapp_version": "1.0-Shojo",
        })
    }

    /// `GET /config` as served by the simulated device
    pub fn config() -> Value {
        json!({
            "general": { "device_name": "Simulated RGBWW" },
            "network": { "mqtt": { "enabled": true, "server": "mqtthost" } },
            "color": { "colortemp": { "cw": 5000, "ww": 2700 } },
            "sync": { "cmd_slave_enabled": true },
        })
    }

    /// `GET /color` as served by the simulated device
    pub fn color() -> Value {
        json!({
            "hsv": { "h": 54, "s": 50, "v": 50, "ct": 3000 },
            "raw": { "r": 500, "g": 500, "b": 500, "cw": 500, "ww": 500 },
            "mode": "hsv",
        })
    }
}

impl Transport for SimulatedTransport {
    fn open(&self) -> BoxFuture<'_, io::Result<DeviceStream>> {
        async move {
            let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
            let name = self.name.clone();
            tokio::spawn(async move {
                if let Err(e) = feed(writer).await {
                    // Reader dropped: the connection was torn down.
                    tracing::debug!(peer = %name, "Simulation stopped: {}", e);
                }
            });
            Ok(Box::new(reader) as DeviceStream)
        }
        .boxed()
    }

    fn peer(&self) -> String {
        format!("{} (simulated)", self.name)
    }
}

async fn feed(mut writer: DuplexStream) -> io::Result<()> {
    tokio::time::sleep(DUMP_STEP).await;
    send(&mut writer, "info", SimulatedTransport::info()).await?;
    tokio::time::sleep(DUMP_STEP).await;
    send(&mut writer, "config", SimulatedTransport::config()).await?;
    tokio::time::sleep(DUMP_STEP).await;
    send(&mut writer, "color_event", SimulatedTransport::color()).await?;
    send(&mut writer, "state_completed", json!({})).await?;

    let mut last_status = Instant::now();
    let mut tick: u32 = 0;
    loop {
        tokio::time::sleep(TICK).await;
        if last_status.elapsed() < CLOCK_STATUS_EVERY {
            continue;
        }
        last_status = Instant::now();
        tick = tick.wrapping_add(1);
        let (offset, interval) = jitter(tick);
        send(
            &mut writer,
            "clock_slave_status",
            json!({ "offset": offset, "current_interval": interval }),
        )
        .await?;
    }
}

async fn send(writer: &mut DuplexStream, method: &str, params: Value) -> io::Result<()> {
    let bytes = serde_json::to_vec(&Notification::new(method, params))?;
    writer.write_all(&bytes).await
}

/// Deterministic spread of offset (-10..=10) and interval (19000..=21000)
fn jitter(tick: u32) -> (i64, i64) {
    let phase = f64::from(tick) * 7.3;
    let offset = (phase.sin() * 10.0).round() as i64;
    let interval = 20_000 + (phase.cos() * 1000.0).round() as i64;
    (offset, interval)
}

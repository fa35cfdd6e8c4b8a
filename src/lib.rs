//! Rust library for controlling FHEM RGBWW LED controllers
//!
//! This library provides an async client for the ESP8266-based RGBWW LED
//! controller firmware. It supports:
//!
//! - A persistent event stream connection (TCP port 9090) with keep-alive
//!   watchdog and automatic reconnect
//! - Cached device state (color, info, config, clock slave status)
//! - State observers and broadcast event subscriptions
//! - Color commands over HTTP, including a compact textual command language
//!   for fades, stays, queueing and animations
//! - Channel control (pause, continue, stop)
//! - Subnet scanning for controllers
//! - An offline simulator selected by the `SIMULATION` environment variable
//!
//! # Quick Start
//!
//! ```no_run
//! use rgbww_controller::{ControllerConfig, ControllerEvent, RgbwwController};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let controller = RgbwwController::from_env("192.168.1.50", ControllerConfig::default())?;
//!     let mut events = controller.subscribe();
//!     controller.connect();
//!
//!     while let Ok(event) = events.recv().await {
//!         if event == ControllerEvent::StateCompleted {
//!             break;
//!         }
//!     }
//!     println!("Current color: {:?}", controller.color());
//!
//!     controller.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! # Command strings
//!
//! ```
//! use rgbww_controller::{parse_color_command, ChannelLayout, Fade};
//!
//! let cmd = parse_color_command("120,100,50 3 qr", ChannelLayout::Hsv).unwrap();
//! assert_eq!(cmd.fade, Some(Fade::Duration(3000)));
//! assert!(cmd.requeue);
//! ```
//!
//! # Architecture
//!
//! - **Client**: [`RgbwwController`], lifecycle and command API
//! - **Connection**: Reconnecting event stream reader over a [`Transport`]
//! - **Framer**: Splits the raw byte stream into JSON messages
//! - **State**: Cached device state and event dispatch to observers
//! - **Command**: Textual command parser and payload types
//! - **Sender**: HTTP requests to the controller
//! - **Discovery**: Local network detection and subnet scanning

mod client;
mod command;
mod config;
mod connection;
mod discovery;
mod error;
mod framer;
mod observer;
mod protocol;
mod sender;
mod simulation;
mod state;
mod subscription;
mod transport;
mod types;

// Public exports
pub use client::RgbwwController;
pub use command::{
    parse_color_command, parse_color_commands, ChannelLayout, ChannelValue, ChannelValues,
    ColorCommand, Direction, Fade, HsvValues, QueueingPolicy, RawValues,
};
pub use config::{ControllerConfig, SIMULATION_ENV_VAR};
pub use discovery::{local_scan_range, scan, subnet_hosts};
pub use error::{Result, RgbwwError};
pub use framer::MessageFramer;
pub use observer::StateObserver;
pub use protocol::{Endpoint, Method, Notification, TransitionFinished};
pub use sender::CommandSender;
pub use simulation::SimulatedTransport;
pub use subscription::{ControllerEvent, EventReceiver};
pub use transport::{DeviceStream, TcpTransport, Transport};
pub use types::{
    Channel, ChannelCommand, ClockSlaveStatus, ColorMode, ColorState, DiscoveredController,
};

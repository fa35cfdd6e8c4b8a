use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::command::{parse_color_commands, ChannelLayout, ColorCommand, Fade, HsvValues, RawValues};
use crate::config::ControllerConfig;
use crate::connection::{run_connection, ConnectionSettings};
use crate::error::{Result, RgbwwError};
use crate::observer::StateObserver;
use crate::protocol::{AnimationPayload, ChannelsPayload, Endpoint};
use crate::sender::CommandSender;
use crate::simulation::SimulatedTransport;
use crate::state::Dispatcher;
use crate::subscription::EventReceiver;
use crate::transport::{TcpTransport, Transport};
use crate::types::{Channel, ChannelCommand, ClockSlaveStatus, ColorState};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// Where HTTP requests go
enum Commands {
    Http(CommandSender),
    /// Answers reads from canned documents and accepts every write
    Simulated,
}

impl Commands {
    async fn get(&self, endpoint: Endpoint) -> Result<Value> {
        match self {
            Commands::Http(sender) => sender.get(endpoint).await,
            Commands::Simulated => Ok(match endpoint {
                Endpoint::Info => SimulatedTransport::info(),
                Endpoint::Config => SimulatedTransport::config(),
                Endpoint::Color => SimulatedTransport::color(),
                _ => Value::Null,
            }),
        }
    }

    async fn post<T: serde::Serialize + ?Sized>(&self, endpoint: Endpoint, payload: &T) -> Result<()> {
        match self {
            Commands::Http(sender) => sender.post(endpoint, payload).await,
            Commands::Simulated => {
                tracing::debug!(
                    "Simulated POST /{}: {}",
                    endpoint.path(),
                    serde_json::to_string(payload)?
                );
                Ok(())
            }
        }
    }
}

struct ConnectionTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Client for a FHEM RGBWW LED controller
///
/// Keeps a background connection to the controller's event stream (see
/// [`connect`](Self::connect)), caches the state it reports, and sends
/// color and animation commands over HTTP.
///
/// # Example
///
/// ```no_run
/// use rgbww_controller::{ChannelLayout, RgbwwController};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let controller = RgbwwController::new("192.168.1.50")?;
///     controller.connect();
///
///     // Fade to red over 2s, stay 5s, then to blue
///     controller
///         .send_command_string("0,100,100 2 5s;240,100,100 2", ChannelLayout::Hsv)
///         .await?;
///
///     controller.disconnect().await;
///     Ok(())
/// }
/// ```
pub struct RgbwwController {
    host: String,
    config: ControllerConfig,
    commands: Commands,
    dispatcher: Arc<Dispatcher>,
    transport: Arc<dyn Transport>,
    task: Mutex<Option<ConnectionTask>>,
}

impl RgbwwController {
    /// Controller at `host` with default ports and timeouts
    pub fn new(host: impl Into<String>) -> Result<Self> {
        Self::with_config(host, ControllerConfig::default())
    }

    /// Controller at `host` reached over TCP and HTTP
    pub fn with_config(host: impl Into<String>, config: ControllerConfig) -> Result<Self> {
        let host = host.into();
        let transport = TcpTransport::new(host.clone(), config.tcp_port, config.connect_timeout);
        Self::with_transport(host, config, Arc::new(transport))
    }

    /// Controller whose event stream comes from a custom transport
    pub fn with_transport(
        host: impl Into<String>,
        config: ControllerConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let host = host.into();
        let sender = CommandSender::new(host.clone(), config.http_port, config.http_timeout)?;
        Ok(Self::build(host, config, Commands::Http(sender), transport))
    }

    /// Controller backed entirely by the simulator
    pub fn simulated(host: impl Into<String>, config: ControllerConfig) -> Self {
        let host = host.into();
        let transport = Arc::new(SimulatedTransport::new(host.clone()));
        Self::build(host, config, Commands::Simulated, transport)
    }

    /// Real or simulated controller, depending on the `SIMULATION`
    /// environment variable
    pub fn from_env(host: impl Into<String>, config: ControllerConfig) -> Result<Self> {
        if ControllerConfig::simulation_requested() {
            Ok(Self::simulated(host, config))
        } else {
            Self::with_config(host, config)
        }
    }

    fn build(
        host: String,
        config: ControllerConfig,
        commands: Commands,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            host,
            config,
            commands,
            dispatcher: Arc::new(Dispatcher::new()),
            transport,
            task: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ========== Connection ==========

    /// Start the background connection, reconnecting until
    /// [`disconnect`](Self::disconnect). No-op if already running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return;
        }

        let cancel = CancellationToken::new();
        let settings = ConnectionSettings {
            watchdog_timeout: self.config.watchdog_timeout,
            reconnect_delay: self.config.reconnect_delay,
        };
        let handle = tokio::spawn(run_connection(
            self.transport.clone(),
            self.dispatcher.clone(),
            settings,
            cancel.clone(),
        ));
        *task = Some(ConnectionTask { cancel, handle });
    }

    /// Stop the background connection. Safe to call repeatedly.
    ///
    /// An open stream is closed at once, interrupting any pending read, and
    /// no further reconnection is attempted.
    pub async fn disconnect(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();
        let Some(task) = task else { return };

        tracing::info!(host = %self.host, "Disconnecting");
        task.cancel.cancel();
        if tokio::time::timeout(SHUTDOWN_GRACE, task.handle).await.is_err() {
            tracing::warn!(host = %self.host, "Connection task did not stop in time");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.dispatcher.read(|s| s.connected)
    }

    // ========== Cached state ==========

    /// Last reported color
    pub fn color(&self) -> ColorState {
        self.dispatcher.read(|s| s.color)
    }

    /// Device info (firmware, MAC, versions)
    pub fn info(&self) -> Result<Value> {
        self.dispatcher
            .read(|s| s.info.clone())
            .ok_or(RgbwwError::NotLoaded("Info"))
    }

    /// Device configuration
    pub fn device_config(&self) -> Result<Value> {
        self.dispatcher
            .read(|s| s.config.clone())
            .ok_or(RgbwwError::NotLoaded("Config"))
    }

    /// MAC address from the device info
    pub fn mac(&self) -> Result<Option<String>> {
        let info = self.info()?;
        Ok(info["connection"]["mac"].as_str().map(String::from))
    }

    /// Configured device name
    pub fn device_name(&self) -> Result<Option<String>> {
        let config = self.device_config()?;
        Ok(config["general"]["device_name"].as_str().map(String::from))
    }

    /// `(warm white, cold white)` color temperatures in Kelvin
    pub fn color_temp_range(&self) -> Result<Option<(u32, u32)>> {
        let config = self.device_config()?;
        let colortemp = &config["color"]["colortemp"];
        let kelvin = |key: &str| colortemp[key].as_u64().and_then(|k| u32::try_from(k).ok());
        Ok(kelvin("ww").zip(kelvin("cw")))
    }

    pub fn clock_slave_status(&self) -> Option<ClockSlaveStatus> {
        self.dispatcher.read(|s| s.clock_slave_status)
    }

    /// Whether the initial state dump after connecting has completed.
    ///
    /// Color and config notifications before this point describe a device
    /// that is still syncing.
    pub fn state_completed(&self) -> bool {
        self.dispatcher.read(|s| s.state_completed)
    }

    // ========== Observers ==========

    /// Add an observer; fails if it is already registered
    pub fn register_observer(&self, observer: Arc<dyn StateObserver>) -> Result<()> {
        self.dispatcher.observers().register(observer)
    }

    /// Remove an observer; fails if it was never registered
    pub fn unregister_observer(&self, observer: &Arc<dyn StateObserver>) -> Result<()> {
        self.dispatcher.observers().unregister(observer)
    }

    /// Subscribe to controller events
    pub fn subscribe(&self) -> EventReceiver {
        self.dispatcher.subscribe()
    }

    // ========== HTTP ==========

    /// Reload info, config and color over HTTP
    pub async fn refresh(&self) -> Result<()> {
        let info = self.commands.get(Endpoint::Info).await?;
        self.dispatcher.update(|s| s.info = Some(info));

        let config = self.commands.get(Endpoint::Config).await?;
        self.dispatcher.update(|s| s.config = Some(config));

        let color = self.commands.get(Endpoint::Color).await?;
        self.dispatcher.update(|s| s.color.merge(&color));
        Ok(())
    }

    /// Set HSV channels, optionally fading over `fade_ms` milliseconds
    pub async fn set_hsv(&self, values: HsvValues, fade_ms: Option<u64>) -> Result<()> {
        let mut cmd = ColorCommand::hsv(values);
        cmd.fade = fade_ms.map(Fade::Duration);
        self.send_color_command(&cmd).await
    }

    /// Set raw diode levels
    pub async fn set_raw(&self, values: RawValues) -> Result<()> {
        self.send_color_command(&ColorCommand::raw(values)).await
    }

    /// Send a single transition
    pub async fn send_color_command(&self, cmd: &ColorCommand) -> Result<()> {
        self.commands.post(Endpoint::Color, cmd).await
    }

    /// Send an animation: the steps run in order
    pub async fn send_color_commands(&self, cmds: &[ColorCommand]) -> Result<()> {
        self.commands.post(Endpoint::Color, &AnimationPayload { cmds }).await
    }

    /// Parse a `;` separated command string and send it as an animation
    pub async fn send_command_string(&self, input: &str, layout: ChannelLayout) -> Result<()> {
        let cmds = parse_color_commands(input, layout)?;
        self.send_color_commands(&cmds).await
    }

    /// Pause, continue or stop animations on the given channels
    pub async fn send_channel_command(&self, command: ChannelCommand, channels: &[Channel]) -> Result<()> {
        let endpoint = match command {
            ChannelCommand::Pause => Endpoint::Pause,
            ChannelCommand::Continue => Endpoint::Continue,
            ChannelCommand::Stop => Endpoint::Stop,
        };
        let mut selected = Vec::with_capacity(channels.len());
        for channel in channels {
            if !selected.contains(channel) {
                selected.push(*channel);
            }
        }
        self.commands
            .post(endpoint, &ChannelsPayload { channels: selected })
            .await
    }
}

impl Drop for RgbwwController {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::StateObserver;
    use futures_util::future::BoxFuture;
    use futures_util::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Completed(AtomicUsize);

    impl StateObserver for Completed {
        fn on_state_completed(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_not_loaded_before_first_message() {
        let controller = RgbwwController::simulated("sim", ControllerConfig::default());
        assert!(matches!(controller.info(), Err(RgbwwError::NotLoaded("Info"))));
        assert!(matches!(controller.device_config(), Err(RgbwwError::NotLoaded("Config"))));
        assert!(controller.mac().is_err());
        assert!(!controller.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_session() {
        let controller = RgbwwController::simulated("sim", ControllerConfig::default());
        let observer = Arc::new(Completed::default());
        controller.register_observer(observer.clone()).unwrap();

        controller.connect();
        controller.connect();
        tokio::time::sleep(Duration::from_secs(7)).await;

        assert!(controller.is_connected());
        assert!(controller.state_completed());
        assert_eq!(observer.0.load(Ordering::SeqCst), 1);
        assert_eq!(controller.mac().unwrap().as_deref(), Some("a020a60836aa"));
        assert_eq!(controller.color_temp_range().unwrap(), Some((2700, 5000)));
        assert_eq!(controller.color().hue, 54);
        assert!(controller.clock_slave_status().is_some());

        controller.disconnect().await;
        controller.disconnect().await;
        assert!(!controller.is_connected());
    }

    /// Counts stream openings and keeps every stream open
    #[derive(Default)]
    struct CountingTransport {
        attempts: AtomicUsize,
        writers: Mutex<Vec<tokio::io::DuplexStream>>,
    }

    impl Transport for CountingTransport {
        fn open(&self) -> BoxFuture<'_, std::io::Result<crate::transport::DeviceStream>> {
            async move {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                let (reader, writer) = tokio::io::duplex(64);
                self.writers.lock().unwrap().push(writer);
                Ok(Box::new(reader) as crate::transport::DeviceStream)
            }
            .boxed()
        }

        fn peer(&self) -> String {
            "counting".to_string()
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_is_idempotent() {
        let transport = Arc::new(CountingTransport::default());
        let controller =
            RgbwwController::with_transport("10.0.0.1", ControllerConfig::default(), transport.clone())
                .unwrap();

        controller.connect();
        controller.connect();
        settle().await;
        controller.connect();
        settle().await;
        assert!(controller.is_connected());
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);

        controller.disconnect().await;
        assert!(!controller.is_connected());

        controller.connect();
        settle().await;
        assert!(controller.is_connected());
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);

        controller.disconnect().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_simulated_refresh() {
        let controller = RgbwwController::simulated("sim", ControllerConfig::default());
        controller.refresh().await.unwrap();
        assert_eq!(controller.device_name().unwrap().as_deref(), Some("Simulated RGBWW"));
        assert_eq!(controller.color().brightness, 50);
        controller
            .send_channel_command(ChannelCommand::Pause, &[Channel::Hue])
            .await
            .unwrap();
    }
}

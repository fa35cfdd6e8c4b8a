//! Controller connection settings.

use std::time::Duration;

/// Environment variable that switches [`RgbwwController::from_env`] to the
/// simulated transport
///
/// [`RgbwwController::from_env`]: crate::RgbwwController::from_env
pub const SIMULATION_ENV_VAR: &str = "SIMULATION";

/// Ports and timeouts used to talk to a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Port of the JSON event stream. Default: 9090.
    pub tcp_port: u16,

    /// Port of the HTTP API. Default: 80.
    pub http_port: u16,

    /// A stream silent for this long is considered dead. Default: 70s.
    pub watchdog_timeout: Duration,

    /// Pause between a dropped connection and the next attempt. Default: 10s.
    pub reconnect_delay: Duration,

    /// Upper bound on establishing the stream connection. Default: 10s.
    pub connect_timeout: Duration,

    /// Timeout applied to every HTTP request. Default: 5s.
    pub http_timeout: Duration,

    /// Hosts probed in parallel by [`scan`](crate::scan). Default: 64.
    pub scan_concurrency: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            tcp_port: 9090,
            http_port: 80,
            watchdog_timeout: Duration::from_secs(70),
            reconnect_delay: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(10),
            http_timeout: Duration::from_secs(5),
            scan_concurrency: 64,
        }
    }
}

impl ControllerConfig {
    pub fn with_tcp_port(mut self, port: u16) -> Self {
        self.tcp_port = port;
        self
    }

    pub fn with_http_port(mut self, port: u16) -> Self {
        self.http_port = port;
        self
    }

    pub fn with_watchdog_timeout(mut self, timeout: Duration) -> Self {
        self.watchdog_timeout = timeout;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_scan_concurrency(mut self, concurrency: usize) -> Self {
        self.scan_concurrency = concurrency.max(1);
        self
    }

    /// Whether the simulation toggle is set in the environment
    pub fn simulation_requested() -> bool {
        std::env::var_os(SIMULATION_ENV_VAR).is_some_and(|v| !v.is_empty())
    }
}

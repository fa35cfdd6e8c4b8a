use thiserror::Error;

/// Result type for controller operations
pub type Result<T> = std::result::Result<T, RgbwwError>;

/// Errors that can occur when talking to an RGBWW controller
#[derive(Error, Debug)]
pub enum RgbwwError {
    /// A token of a color command string could not be parsed
    #[error("invalid command token {token:?}: {reason}")]
    Parse {
        /// The offending token
        token: String,
        /// Why it was rejected
        reason: String,
    },

    /// More than one queueing policy flag was given in a single command
    #[error("cannot use multiple queueing policy flags (in {token:?})")]
    ConflictingPolicy {
        /// Flag bundle that introduced the second policy
        token: String,
    },

    /// The controller did not answer an HTTP request
    #[error("failed to connect to controller {host}: {source}")]
    ControllerUnavailable {
        /// Host the request was sent to
        host: String,
        /// Underlying transport, timeout or status error
        #[source]
        source: reqwest::Error,
    },

    /// Cached device data was read before the controller delivered it
    #[error("{0} not loaded yet")]
    NotLoaded(&'static str),

    /// Observer is already in the registry
    #[error("observer already registered")]
    AlreadyRegistered,

    /// Observer was never registered
    #[error("observer not registered")]
    NotRegistered,

    /// Subnet prefix outside the scannable range
    #[error("network prefix /{prefix} is out of range, use /13 to /32")]
    InvalidScanRange {
        /// Requested prefix length
        prefix: u8,
    },

    /// No IPv4 interface with a usable network was found
    #[error("no active IPv4 network interface to scan")]
    NoScanRange,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Event channel receive error
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl RgbwwError {
    pub(crate) fn parse(token: &str, reason: impl Into<String>) -> Self {
        RgbwwError::Parse {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unavailable(host: &str, source: reqwest::Error) -> Self {
        RgbwwError::ControllerUnavailable {
            host: host.to_string(),
            source,
        }
    }
}

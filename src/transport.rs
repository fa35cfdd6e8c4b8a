use std::io;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;

/// Readable byte stream from a controller
pub type DeviceStream = Box<dyn AsyncRead + Send + Unpin>;

/// Source of the controller's event stream.
///
/// The connection manager calls [`open`](Transport::open) for every
/// (re)connection attempt and drops the stream to close it.
pub trait Transport: Send + Sync + 'static {
    fn open(&self) -> BoxFuture<'_, io::Result<DeviceStream>>;

    /// Human-readable peer description for logs
    fn peer(&self) -> String;
}

/// Plain TCP connection to the controller's event port
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
        }
    }
}

impl Transport for TcpTransport {
    fn open(&self) -> BoxFuture<'_, io::Result<DeviceStream>> {
        async move {
            let connect = TcpStream::connect((self.host.as_str(), self.port));
            let stream = tokio::time::timeout(self.connect_timeout, connect)
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;
            stream.set_nodelay(true)?;
            Ok(Box::new(stream) as DeviceStream)
        }
        .boxed()
    }

    fn peer(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

//! Raw TCP printing (port 9100)

use super::Printer;
use crate::error::{PrintError, PrintResult};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{info, instrument, warn};

/// Connect timeout used when none is configured
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How long the socket stays open after the last write
///
/// Some firmware drops the tail of the job when the peer closes right away.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Network printer (TCP port 9100)
///
/// Most thermal printers support raw TCP printing on port 9100.
#[derive(Debug, Clone)]
pub struct NetworkPrinter {
    host: String,
    port: u16,
    timeout: Duration,
    settle: Duration,
}

impl NetworkPrinter {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout: DEFAULT_CONNECT_TIMEOUT,
            settle: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Set connection timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the post-write settle delay
    pub fn with_settle_delay(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }
}

impl Printer for NetworkPrinter {
    #[instrument(skip(data), fields(host = %self.host, port = self.port, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let target = format!("{}:{}", self.host, self.port);

        let mut stream =
            tokio::time::timeout(self.timeout, TcpStream::connect((self.host.as_str(), self.port)))
                .await
                .map_err(|_| PrintError::Timeout(format!("Connection timeout: {}", target)))?
                .map_err(|e| PrintError::Connection(format!("{}: {}", target, e)))?;

        stream.write_all(data).await.map_err(|e| {
            PrintError::Io(std::io::Error::new(e.kind(), format!("Write failed: {}", e)))
        })?;
        stream.flush().await?;

        tokio::time::sleep(self.settle).await;
        if let Err(e) = stream.shutdown().await {
            warn!(error = %e, "socket shutdown after print failed");
        }

        info!("Print job sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_print_delivers_all_bytes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let printer =
            NetworkPrinter::new("127.0.0.1", port).with_settle_delay(Duration::from_millis(20));
        printer.print(b"\x1b@hello\n").await.unwrap();

        assert_eq!(server.await.unwrap(), b"\x1b@hello\n");
    }

    #[tokio::test]
    async fn test_print_to_closed_port_fails() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let printer = NetworkPrinter::new("127.0.0.1", port).with_timeout(Duration::from_secs(1));
        let err = printer.print(b"x").await.unwrap_err();
        assert!(err.is_transport_failure());
    }
}

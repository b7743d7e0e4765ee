//! Serial/COM port printing, 8N1

use super::Printer;
use crate::device::DEFAULT_BAUD_RATE;
use crate::error::{PrintError, PrintResult};
use tokio::io::AsyncWriteExt;
use tokio_serial::{DataBits, Parity, SerialStream, StopBits};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct SerialPrinter {
    path: String,
    baud_rate: u32,
}

impl SerialPrinter {
    pub fn new(path: &str, baud_rate: u32) -> Self {
        Self {
            path: path.to_string(),
            baud_rate: if baud_rate == 0 {
                DEFAULT_BAUD_RATE
            } else {
                baud_rate
            },
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl Printer for SerialPrinter {
    /// Open, write, drain, close; no fallback on any failure
    #[instrument(skip(data), fields(path = %self.path, baud = self.baud_rate, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let builder = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .stop_bits(StopBits::One)
            .parity(Parity::None);

        let mut port = SerialStream::open(&builder)
            .map_err(|e| PrintError::Serial(format!("{}: {}", self.path, e)))?;

        port.write_all(data)
            .await
            .map_err(|e| PrintError::Serial(format!("{}: write failed: {}", self.path, e)))?;
        port.flush()
            .await
            .map_err(|e| PrintError::Serial(format!("{}: drain failed: {}", self.path, e)))?;
        drop(port);

        info!("Print job sent");
        Ok(())
    }
}

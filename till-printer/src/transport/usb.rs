//! Raw USB printing over the first bulk OUT endpoint

use super::Printer;
use crate::error::{PrintError, PrintResult};
use nusb::transfer::{Direction, EndpointType};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Bytes per bulk transfer
const CHUNK_SIZE: usize = 4096;

/// Per-transfer timeout
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct UsbPrinter {
    vendor_id: u16,
    product_id: u16,
    timeout: Duration,
}

impl UsbPrinter {
    pub fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
            timeout: DEFAULT_WRITE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn open(&self) -> PrintResult<(nusb::Interface, u8)> {
        let info = nusb::list_devices()
            .map_err(|e| PrintError::Usb(e.to_string()))?
            .find(|d| d.vendor_id() == self.vendor_id && d.product_id() == self.product_id)
            .ok_or_else(|| {
                PrintError::Usb(format!(
                    "device {:04x}:{:04x} not present",
                    self.vendor_id, self.product_id
                ))
            })?;

        let device = info
            .open()
            .map_err(|e| PrintError::Usb(format!("open failed: {}", e)))?;
        let config = device
            .active_configuration()
            .map_err(|e| PrintError::Usb(format!("no active configuration: {}", e)))?;

        let (interface_number, endpoint) = config
            .interface_alt_settings()
            .find_map(|alt| {
                alt.endpoints()
                    .find(|ep| {
                        ep.direction() == Direction::Out && ep.transfer_type() == EndpointType::Bulk
                    })
                    .map(|ep| (alt.interface_number(), ep.address()))
            })
            .ok_or_else(|| PrintError::Usb("no bulk OUT endpoint".to_string()))?;

        let interface = device
            .detach_and_claim_interface(interface_number)
            .map_err(|e| {
                PrintError::Usb(format!("claim interface {} failed: {}", interface_number, e))
            })?;

        debug!(interface_number, endpoint, "USB interface claimed");
        Ok((interface, endpoint))
    }
}

impl Printer for UsbPrinter {
    /// Handle is opened and released within this call
    #[instrument(skip(data), fields(vid = self.vendor_id, pid = self.product_id, data_len = data.len()))]
    async fn print(&self, data: &[u8]) -> PrintResult<()> {
        let this = self.clone();
        let (interface, endpoint) = tokio::task::spawn_blocking(move || this.open())
            .await
            .map_err(|e| PrintError::Usb(format!("Task join failed: {}", e)))??;

        for chunk in data.chunks(CHUNK_SIZE) {
            tokio::time::timeout(self.timeout, interface.bulk_out(endpoint, chunk.to_vec()))
                .await
                .map_err(|_| PrintError::Timeout("USB bulk transfer".to_string()))?
                .into_result()
                .map_err(|e| PrintError::Usb(format!("bulk transfer failed: {}", e)))?;
        }

        info!("Print job sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_absent_device_is_usb_error() {
        // Vendor 0xffff is reserved and never enumerates
        let printer = UsbPrinter::new(0xffff, 0xffff);
        let err = printer.print(b"x").await.unwrap_err();
        assert!(err.is_transport_failure());
    }
}

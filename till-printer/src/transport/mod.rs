//! Printer transports
//!
//! Supports:
//! - Raw USB (bulk OUT endpoint)
//! - Serial/COM ports
//! - Network printers (TCP port 9100)
//! - OS spooler queues (Windows `copy /b`, CUPS `lp -o raw`)

mod network;
mod serial;
mod spooler;
mod usb;

pub use network::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_SETTLE_DELAY, NetworkPrinter};
pub use serial::SerialPrinter;
pub use spooler::SpoolerPrinter;
pub use usb::UsbPrinter;

use crate::device::{Connection, DEFAULT_BAUD_RATE, PrinterDescriptor};
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use std::time::Duration;

/// Trait for printer adapters
#[allow(async_fn_in_trait)]
pub trait Printer {
    /// Send raw ESC/POS data to the printer
    async fn print(&self, data: &[u8]) -> PrintResult<()>;
}

/// One concrete way to deliver bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Usb { vendor_id: u16, product_id: u16 },
    Serial { path: String, baud_rate: u32 },
    Network { host: String, port: u16 },
    Spooler { printer_name: String },
}

impl Route {
    pub fn kind(&self) -> &'static str {
        match self {
            Route::Usb { .. } => "usb",
            Route::Serial { .. } => "serial",
            Route::Network { .. } => "network",
            Route::Spooler { .. } => "spooler",
        }
    }
}

/// Ordered routes for a descriptor
///
/// USB gets the matching OS queue as a single fallback hop when one was
/// found during discovery. Every other transport has exactly one route.
pub fn transport_plan(printer: &PrinterDescriptor) -> PrintResult<Vec<Route>> {
    match &printer.connection {
        Connection::Usb {
            vendor_id,
            product_id,
            spooler_name,
        } => {
            let mut plan = vec![Route::Usb {
                vendor_id: *vendor_id,
                product_id: *product_id,
            }];
            if let Some(name) = spooler_name.as_deref().filter(|n| !n.is_empty()) {
                plan.push(Route::Spooler {
                    printer_name: name.to_string(),
                });
            }
            Ok(plan)
        }
        Connection::Serial {
            path, baud_rate, ..
        } => Ok(vec![Route::Serial {
            path: path.clone(),
            baud_rate: *baud_rate,
        }]),
        Connection::Network { host, port } => Ok(vec![Route::Network {
            host: host.clone(),
            port: *port,
        }]),
        Connection::Windows { printer_name, .. } => Ok(vec![Route::Spooler {
            printer_name: printer_name.clone(),
        }]),
        Connection::Unknown => Err(PrintError::UnsupportedTransport(printer.id.clone())),
    }
}

/// Delivers bytes over one route
#[async_trait]
pub trait Connector: Send + Sync {
    async fn send(&self, route: &Route, data: &[u8]) -> PrintResult<()>;
}

/// Transport tuning
#[derive(Debug, Clone, Copy)]
pub struct TransportOptions {
    pub network_timeout: Duration,
    pub settle_delay: Duration,
    pub default_baud_rate: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            network_timeout: DEFAULT_CONNECT_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            default_baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

/// Connector backed by the real transports
#[derive(Debug, Clone, Default)]
pub struct SystemConnector {
    options: TransportOptions,
}

impl SystemConnector {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl Connector for SystemConnector {
    async fn send(&self, route: &Route, data: &[u8]) -> PrintResult<()> {
        match route {
            Route::Usb {
                vendor_id,
                product_id,
            } => UsbPrinter::new(*vendor_id, *product_id).print(data).await,
            Route::Serial { path, baud_rate } => {
                let baud = if *baud_rate == 0 {
                    self.options.default_baud_rate
                } else {
                    *baud_rate
                };
                SerialPrinter::new(path, baud).print(data).await
            }
            Route::Network { host, port } => {
                NetworkPrinter::new(host, *port)
                    .with_timeout(self.options.network_timeout)
                    .with_settle_delay(self.options.settle_delay)
                    .print(data)
                    .await
            }
            Route::Spooler { printer_name } => SpoolerPrinter::new(printer_name).print(data).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usb_plan_with_spooler_fallback() {
        let d = PrinterDescriptor::usb(0x0416, 0x5011, "POS", Some("POS-58".to_string()));
        assert_eq!(
            transport_plan(&d).unwrap(),
            vec![
                Route::Usb {
                    vendor_id: 0x0416,
                    product_id: 0x5011
                },
                Route::Spooler {
                    printer_name: "POS-58".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_usb_plan_without_spooler() {
        let d = PrinterDescriptor::usb(0x0416, 0x5011, "POS", Some(String::new()));
        assert_eq!(transport_plan(&d).unwrap().len(), 1);
    }

    #[test]
    fn test_single_route_transports() {
        let serial = PrinterDescriptor::serial("COM3", "COM3", 19200, true);
        assert_eq!(
            transport_plan(&serial).unwrap(),
            vec![Route::Serial {
                path: "COM3".to_string(),
                baud_rate: 19200
            }]
        );

        let queue = PrinterDescriptor::os_queue("Kitchen", None, None);
        assert_eq!(transport_plan(&queue).unwrap()[0].kind(), "spooler");
    }

    #[test]
    fn test_unknown_is_unsupported() {
        let mut d = PrinterDescriptor::network("10.0.0.5", 9100, "");
        d.connection = Connection::Unknown;
        let err = transport_plan(&d).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::UnsupportedTransport);
    }
}

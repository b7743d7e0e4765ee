//! Serial/COM port discovery
//!
//! Every listed port is returned. Ports that look like printers (USB-serial
//! bridge from a known vendor, or a manufacturer/product string that says
//! so) are flagged, but the flag is advisory only.

use super::usb::vendor_name;
use crate::device::{DEFAULT_BAUD_RATE, PrinterDescriptor};
use crate::error::{PrintError, PrintResult};
use tokio_serial::{SerialPortInfo, SerialPortType};
use tracing::{debug, instrument, warn};

const PRINTER_HINTS: &[&str] = &[
    "printer", "pos", "receipt", "thermal", "epson", "star", "xprinter",
];

/// Enumerate serial ports; never fails
#[instrument]
pub async fn detect_serial_printers() -> Vec<PrinterDescriptor> {
    let ports = match list_ports().await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "serial enumeration failed");
            return Vec::new();
        }
    };

    let printers: Vec<PrinterDescriptor> = ports.iter().map(serial_descriptor).collect();
    debug!(count = printers.len(), "serial ports listed");
    printers
}

/// Descriptor for one port
pub fn serial_descriptor(port: &SerialPortInfo) -> PrinterDescriptor {
    let likely = is_likely_printer(&port.port_type);
    let short = port
        .port_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(&port.port_name);
    let name = match &port.port_type {
        SerialPortType::UsbPort(usb) => {
            match usb.product.as_deref().or(usb.manufacturer.as_deref()) {
                Some(label) => format!("{} ({})", label, short),
                None => short.to_string(),
            }
        }
        _ => short.to_string(),
    };
    PrinterDescriptor::serial(&port.port_name, &name, DEFAULT_BAUD_RATE, likely)
}

fn is_likely_printer(port_type: &SerialPortType) -> bool {
    let SerialPortType::UsbPort(usb) = port_type else {
        return false;
    };
    if vendor_name(usb.vid).is_some() {
        return true;
    }
    [usb.manufacturer.as_deref(), usb.product.as_deref()]
        .into_iter()
        .flatten()
        .map(str::to_lowercase)
        .any(|s| PRINTER_HINTS.iter().any(|hint| s.contains(hint)))
}

async fn list_ports() -> PrintResult<Vec<SerialPortInfo>> {
    tokio::task::spawn_blocking(|| {
        tokio_serial::available_ports().map_err(|e| PrintError::Serial(e.to_string()))
    })
    .await
    .map_err(|e| PrintError::Serial(format!("Task join failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_serial::UsbPortInfo;

    fn usb_port(
        name: &str,
        vid: u16,
        manufacturer: Option<&str>,
        product: Option<&str>,
    ) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type: SerialPortType::UsbPort(UsbPortInfo {
                vid,
                pid: 0x0001,
                serial_number: None,
                manufacturer: manufacturer.map(str::to_string),
                product: product.map(str::to_string),
            }),
        }
    }

    #[test]
    fn test_known_vendor_is_flagged() {
        let d = serial_descriptor(&usb_port("/dev/ttyACM0", 0x0519, None, None));
        assert_eq!(d.id, "serial-/dev/ttyACM0");
        assert_eq!(d.name, "ttyACM0");
        assert!(matches!(
            d.connection,
            crate::device::Connection::Serial { likely_printer: true, baud_rate: 9600, .. }
        ));
    }

    #[test]
    fn test_manufacturer_hint_is_flagged() {
        let port = usb_port("COM3", 0x067b, Some("Prolific"), Some("Thermal Printer"));
        let d = serial_descriptor(&port);
        assert_eq!(d.name, "Thermal Printer (COM3)");
        assert!(matches!(
            d.connection,
            crate::device::Connection::Serial { likely_printer: true, .. }
        ));
    }

    #[test]
    fn test_other_ports_still_listed() {
        let port = SerialPortInfo {
            port_name: "/dev/ttyS0".to_string(),
            port_type: SerialPortType::Unknown,
        };
        let d = serial_descriptor(&port);
        assert!(matches!(
            d.connection,
            crate::device::Connection::Serial { likely_printer: false, .. }
        ));
    }
}

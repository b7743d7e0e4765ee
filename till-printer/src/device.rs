//! Printer descriptors
//!
//! A descriptor is recomputed on every discovery pass and only lives for the
//! duration of one list/print call.

use serde::{Deserialize, Serialize};

/// Serial baud rate used when nothing else is configured
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// How to reach a printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Connection {
    #[serde(rename_all = "camelCase")]
    Usb {
        vendor_id: u16,
        product_id: u16,
        /// OS queue that drives the same device, used when the raw
        /// handle cannot be claimed
        spooler_name: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Serial {
        path: String,
        baud_rate: u32,
        likely_printer: bool,
    },
    #[serde(rename_all = "camelCase")]
    Network { host: String, port: u16 },
    /// A queue managed by the OS spooler
    #[serde(rename_all = "camelCase")]
    Windows {
        printer_name: String,
        driver_name: Option<String>,
        port_name: Option<String>,
    },
    /// Anything this build cannot drive
    #[serde(other)]
    Unknown,
}

impl Connection {
    pub fn kind(&self) -> &'static str {
        match self {
            Connection::Usb { .. } => "usb",
            Connection::Serial { .. } => "serial",
            Connection::Network { .. } => "network",
            Connection::Windows { .. } => "windows",
            Connection::Unknown => "unknown",
        }
    }
}

/// One discovered printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterDescriptor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(flatten)]
    pub connection: Connection,
}

impl PrinterDescriptor {
    pub fn usb(vendor_id: u16, product_id: u16, name: &str, spooler_name: Option<String>) -> Self {
        Self {
            id: format!("usb-{:04x}-{:04x}", vendor_id, product_id),
            name: name.to_string(),
            is_default: false,
            connection: Connection::Usb {
                vendor_id,
                product_id,
                spooler_name,
            },
        }
    }

    pub fn serial(path: &str, name: &str, baud_rate: u32, likely_printer: bool) -> Self {
        Self {
            id: format!("serial-{}", path),
            name: name.to_string(),
            is_default: false,
            connection: Connection::Serial {
                path: path.to_string(),
                baud_rate,
                likely_printer,
            },
        }
    }

    pub fn network(host: &str, port: u16, name: &str) -> Self {
        let name = if name.is_empty() {
            format!("Network printer {}", host)
        } else {
            name.to_string()
        };
        Self {
            id: format!("network-{}:{}", host, port),
            name,
            is_default: false,
            connection: Connection::Network {
                host: host.to_string(),
                port,
            },
        }
    }

    pub fn os_queue(
        printer_name: &str,
        driver_name: Option<String>,
        port_name: Option<String>,
    ) -> Self {
        Self {
            id: format!("windows-{}", printer_name),
            name: printer_name.to_string(),
            is_default: false,
            connection: Connection::Windows {
                printer_name: printer_name.to_string(),
                driver_name,
                port_name,
            },
        }
    }

    /// `usb`, `serial`, `network`, `windows` or `unknown`
    pub fn kind(&self) -> &'static str {
        self.connection.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids() {
        assert_eq!(PrinterDescriptor::usb(0x04b8, 0x0202, "Epson", None).id, "usb-04b8-0202");
        assert_eq!(
            PrinterDescriptor::serial("/dev/ttyUSB0", "ttyUSB0", 9600, true).id,
            "serial-/dev/ttyUSB0"
        );
        assert_eq!(PrinterDescriptor::network("10.0.0.5", 9100, "").id, "network-10.0.0.5:9100");
        assert_eq!(PrinterDescriptor::os_queue("POS-58", None, None).id, "windows-POS-58");
    }

    #[test]
    fn test_serialized_shape() {
        let d = PrinterDescriptor::usb(0x0416, 0x5011, "POS", Some("POS-58".to_string()));
        let v = serde_json::to_value(&d).unwrap();
        assert_eq!(v["type"], json!("usb"));
        assert_eq!(v["vendorId"], json!(0x0416));
        assert_eq!(v["spoolerName"], json!("POS-58"));
        assert_eq!(v["isDefault"], json!(false));
    }

    #[test]
    fn test_unknown_type_deserializes() {
        let d: PrinterDescriptor = serde_json::from_value(json!({
            "id": "bt-00:11", "name": "Pocket", "type": "bluetooth"
        }))
        .unwrap();
        assert_eq!(d.connection, Connection::Unknown);
        assert_eq!(d.kind(), "unknown");
    }
}

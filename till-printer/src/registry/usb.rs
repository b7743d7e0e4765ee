//! USB printer discovery
//!
//! Devices are matched against a curated vendor table. The vendor name is
//! also the key for finding the OS queue that drives the same device, which
//! is what makes the USB → spooler fallback possible.

use super::DiscoveryPass;
use super::os::OsPrinter;
use crate::device::PrinterDescriptor;
use crate::error::{PrintError, PrintResult};
use tracing::{info, instrument, warn};

/// Known receipt/label printer vendors (USB vendor id → name)
pub const PRINTER_VENDORS: &[(u16, &str)] = &[
    (0x04b8, "Epson"),
    (0x0519, "Star"),
    (0x1504, "Bixolon"),
    (0x1d90, "Citizen"),
    (0x0dd4, "Custom"),
    (0x154f, "SNBC"),
    (0x20d1, "Rongta"),
    (0x6868, "Gprinter"),
    (0x0483, "Xprinter"),
    (0x1fc9, "Xprinter"),
    (0x28e9, "Xprinter"),
    (0x0416, "POS"),
    (0x0fe6, "POS"),
];

/// Vendor name for a USB vendor id
pub fn vendor_name(vendor_id: u16) -> Option<&'static str> {
    PRINTER_VENDORS
        .iter()
        .find(|(id, _)| *id == vendor_id)
        .map(|(_, name)| *name)
}

/// A USB device as seen on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsbDevice {
    pub vendor_id: u16,
    pub product_id: u16,
    pub product: Option<String>,
}

/// Enumerate USB printers; never fails
///
/// OS queues for the spooler match come from the pass, so they are only
/// enumerated when a known vendor is on the bus.
#[instrument(skip(pass))]
pub async fn detect_usb_printers(pass: &DiscoveryPass) -> Vec<PrinterDescriptor> {
    let devices = match list_usb_devices().await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "USB enumeration failed");
            return Vec::new();
        }
    };

    let candidates: Vec<UsbDevice> = devices
        .into_iter()
        .filter(|d| vendor_name(d.vendor_id).is_some())
        .collect();
    if candidates.is_empty() {
        return Vec::new();
    }

    let printers = usb_descriptors(&candidates, pass.os_printers().await);
    info!(count = printers.len(), "USB printers detected");
    printers
}

/// Pair each device with an OS queue by vendor-name substring
///
/// Ambiguous when several queues share a vendor name; the first match wins.
pub fn usb_descriptors(devices: &[UsbDevice], os_printers: &[OsPrinter]) -> Vec<PrinterDescriptor> {
    devices
        .iter()
        .filter_map(|d| {
            let vendor = vendor_name(d.vendor_id)?;
            let name = match &d.product {
                Some(product) if !product.is_empty() => format!("{} {}", vendor, product),
                _ => format!("{} USB printer", vendor),
            };
            let spooler_name = match_spooler(vendor, os_printers);
            Some(PrinterDescriptor::usb(
                d.vendor_id,
                d.product_id,
                &name,
                spooler_name,
            ))
        })
        .collect()
}

fn match_spooler(vendor: &str, os_printers: &[OsPrinter]) -> Option<String> {
    let needle = vendor.to_lowercase();
    os_printers
        .iter()
        .find(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.driver_name
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .map(|p| p.name.clone())
}

async fn list_usb_devices() -> PrintResult<Vec<UsbDevice>> {
    tokio::task::spawn_blocking(|| -> PrintResult<Vec<UsbDevice>> {
        let devices = nusb::list_devices().map_err(|e| PrintError::Usb(e.to_string()))?;
        Ok(devices
            .map(|d| UsbDevice {
                vendor_id: d.vendor_id(),
                product_id: d.product_id(),
                product: d.product_string().map(str::to_string),
            })
            .collect())
    })
    .await
    .map_err(|e| PrintError::Usb(format!("Task join failed: {}", e)))?
}

//! # till-printer
//!
//! Receipt and label printing for a point-of-sale till.
//!
//! ## Scope
//!
//! - ESC/POS command building: receipts, labels, barcodes, QR codes
//! - Code page aware text encoding (UTF-8, GBK, single-byte code pages)
//! - Printer discovery: USB, serial, OS queues, configured network printers
//! - Persisted preferences: default printer, network printers, settings
//! - Transports: raw USB, serial, TCP port 9100, OS spooler
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use till_printer::{ConfigStore, DeviceRegistry, PrintDispatcher};
//!
//! let registry = Arc::new(DeviceRegistry::new(ConfigStore::default_location()?));
//! let dispatcher = PrintDispatcher::new(registry);
//!
//! // No id: the saved default, else the first printer found
//! dispatcher.print_test_receipt(None).await?;
//! ```

pub mod amount;
pub mod barcode;
pub mod config;
pub mod device;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod escpos;
pub mod label;
pub mod receipt;
pub mod registry;
pub mod transport;

// Re-exports
pub use barcode::BarcodeType;
pub use config::{ConfigStore, NetworkPrinterEntry, PrinterConfig, PrinterSettings};
pub use device::{Connection, PrinterDescriptor};
pub use dispatcher::{PrintDispatcher, PrinterStatus, TextOptions};
pub use encoding::TextEncoding;
pub use error::{ErrorKind, PrintError, PrintResult};
pub use escpos::{CommandBuffer, DrawerPin, EscPosBuilder};
pub use label::{LabelData, LabelProfile, build_label};
pub use receipt::{
    ReceiptData, ReceiptItem, ReceiptType, RenderOptions, StoreInfo, build_receipt,
    build_test_receipt,
};
pub use registry::{DeviceRegistry, DiscoveryPass, DiscoverySource, RegistryOptions};
pub use transport::{Connector, Printer, Route, SystemConnector, TransportOptions};

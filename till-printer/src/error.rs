//! Error types for the printer library

use thiserror::Error;

/// Printer error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// Requested id absent from a fresh discovery pass
    #[error("Printer not found: {0}")]
    PrinterNotFound(String),

    /// Discovery returned nothing at all
    #[error("No printers available")]
    NoPrinters,

    /// Descriptor type outside usb/serial/network/windows
    #[error("Unsupported transport: {0}")]
    UnsupportedTransport(String),

    /// Network connection error
    #[error("Connection failed: {0}")]
    Connection(String),

    /// IO error during printing
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout waiting for printer
    #[error("Timeout: {0}")]
    Timeout(String),

    /// USB open/claim/transfer error
    #[error("USB error: {0}")]
    Usb(String),

    /// Serial port open/write error
    #[error("Serial error: {0}")]
    Serial(String),

    /// OS spooler submission error
    #[error("Spooler error: {0}")]
    Spooler(String),

    /// Invalid printer configuration
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Persisted config could not be written
    #[error("Config store error: {0}")]
    Config(String),

    /// Some labels of a batch failed; the others were printed
    #[error("{failed} of {total} labels failed, first error: {first}")]
    LabelBatch {
        failed: usize,
        total: usize,
        first: Box<PrintError>,
    },
}

/// Coarse classification surfaced to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PrinterNotFound,
    UnsupportedTransport,
    TransportFailure,
    Config,
}

impl PrintError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PrintError::PrinterNotFound(_) | PrintError::NoPrinters => ErrorKind::PrinterNotFound,
            PrintError::UnsupportedTransport(_) => ErrorKind::UnsupportedTransport,
            PrintError::Connection(_)
            | PrintError::Io(_)
            | PrintError::Timeout(_)
            | PrintError::Usb(_)
            | PrintError::Serial(_)
            | PrintError::Spooler(_) => ErrorKind::TransportFailure,
            PrintError::InvalidConfig(_) | PrintError::Config(_) => ErrorKind::Config,
            PrintError::LabelBatch { first, .. } => first.kind(),
        }
    }

    /// True for open/write/timeout failures at the transport layer
    pub fn is_transport_failure(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }
}

/// Result type for printer operations
pub type PrintResult<T> = Result<T, PrintError>;

//! Persisted printer preferences
//!
//! One JSON document holds the default printer, the user-added network
//! printers and per-printer settings. Every mutation reads the whole
//! document, changes it and writes it back. There is no lock between
//! processes: the last writer wins.

use crate::error::{PrintError, PrintResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Raw TCP printing port used when none is given
pub const DEFAULT_NETWORK_PORT: u16 = 9100;

/// Config file name inside the data directory
pub const CONFIG_FILE_NAME: &str = "printer-config.json";

/// A user-added network printer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPrinterEntry {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub name: String,
}

fn default_port() -> u16 {
    DEFAULT_NETWORK_PORT
}

/// Free-form per-printer settings (`width`, `height`, `encoding`, ...)
pub type PrinterSettings = Map<String, Value>;

/// The persisted document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrinterConfig {
    pub default_printer_id: Option<String>,
    pub network_printers: Vec<NetworkPrinterEntry>,
    pub printer_settings: BTreeMap<String, PrinterSettings>,
}

/// File-backed access to `PrinterConfig`
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform data directory
    pub fn default_location() -> PrintResult<Self> {
        let dirs = directories::ProjectDirs::from("", "", "till-printer").ok_or_else(|| {
            PrintError::InvalidConfig("No home directory for printer config".to_string())
        })?;
        Ok(Self::new(dirs.data_dir().join(CONFIG_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document
    ///
    /// A missing, unreadable or corrupt file yields the empty default so
    /// discovery keeps working.
    pub fn load(&self) -> PrinterConfig {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no printer config yet");
                return PrinterConfig::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "printer config unreadable, using defaults");
                return PrinterConfig::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "printer config corrupt, using defaults");
                PrinterConfig::default()
            }
        }
    }

    /// Write the whole document
    pub fn save(&self, config: &PrinterConfig) -> PrintResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| PrintError::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let content =
            serde_json::to_string_pretty(config).map_err(|e| PrintError::Config(e.to_string()))?;
        std::fs::write(&self.path, content)
            .map_err(|e| PrintError::Config(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }

    /// Read-modify-write
    pub fn update<R>(&self, f: impl FnOnce(&mut PrinterConfig) -> R) -> PrintResult<R> {
        let mut config = self.load();
        let result = f(&mut config);
        self.save(&config)?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nope.json"));
        assert_eq!(store.load(), PrinterConfig::default());
    }

    #[test]
    fn test_corrupt_file_self_heals() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = ConfigStore::new(&path);
        assert_eq!(store.load(), PrinterConfig::default());

        store
            .update(|c| c.default_printer_id = Some("usb-0416-5011".to_string()))
            .unwrap();
        assert_eq!(
            store.load().default_printer_id.as_deref(),
            Some("usb-0416-5011")
        );
    }

    #[test]
    fn test_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("nested/dir/config.json"));
        store
            .update(|c| {
                c.default_printer_id = Some("network-10.0.0.5:9100".to_string());
                c.network_printers.push(NetworkPrinterEntry {
                    host: "10.0.0.5".to_string(),
                    port: 9100,
                    name: "Kitchen".to_string(),
                });
                let mut s = PrinterSettings::new();
                s.insert("width".to_string(), json!(58));
                c.printer_settings.insert("network-10.0.0.5:9100".to_string(), s);
            })
            .unwrap();

        let raw: Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["defaultPrinterId"], json!("network-10.0.0.5:9100"));
        assert_eq!(
            raw["networkPrinters"][0],
            json!({"host": "10.0.0.5", "port": 9100, "name": "Kitchen"})
        );
        assert_eq!(raw["printerSettings"]["network-10.0.0.5:9100"]["width"], json!(58));
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"networkPrinters": [{"host": "10.0.0.9"}]}"#).unwrap();

        let config = ConfigStore::new(&path).load();
        assert_eq!(config.default_printer_id, None);
        assert_eq!(config.network_printers[0].port, 9100);
    }
}

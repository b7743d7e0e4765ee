//! Printer discovery and persisted preferences
//!
//! Four sources (USB, serial, OS queues, user-added network printers) run
//! concurrently on every `list_printers` call. A failing source contributes
//! nothing and never fails the pass. The OS queue list is enumerated at most
//! once per pass and shared through [`DiscoveryPass`].

pub mod network;
pub mod os;
pub mod serial;
pub mod usb;

use crate::config::{ConfigStore, DEFAULT_NETWORK_PORT, NetworkPrinterEntry, PrinterSettings};
use crate::device::PrinterDescriptor;
use crate::error::{PrintError, PrintResult};
use async_trait::async_trait;
use futures::future::join_all;
use os::OsPrinter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Registry tuning
#[derive(Debug, Clone, Copy)]
pub struct RegistryOptions {
    /// Reachability probe for a single network printer
    pub probe_timeout: Duration,
    /// Per-host timeout during a subnet sweep
    pub scan_timeout: Duration,
    /// OS enumeration shell calls
    pub shell_timeout: Duration,
    pub default_port: u16,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(3),
            scan_timeout: Duration::from_millis(1500),
            shell_timeout: Duration::from_secs(10),
            default_port: DEFAULT_NETWORK_PORT,
        }
    }
}

/// State shared by the sources of one discovery pass
pub struct DiscoveryPass {
    shell_timeout: Duration,
    os_printers: OnceCell<Vec<OsPrinter>>,
}

impl DiscoveryPass {
    pub fn new(shell_timeout: Duration) -> Self {
        Self {
            shell_timeout,
            os_printers: OnceCell::new(),
        }
    }

    /// A pass whose OS queue list is already known
    pub fn with_os_printers(printers: Vec<OsPrinter>) -> Self {
        Self {
            shell_timeout: Duration::ZERO,
            os_printers: OnceCell::from(printers),
        }
    }

    /// OS queues, enumerated on first use; a failed enumeration is empty
    pub async fn os_printers(&self) -> &[OsPrinter] {
        self.os_printers
            .get_or_init(|| async {
                os::list_os_printers(self.shell_timeout)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, "OS printer enumeration failed");
                        Vec::new()
                    })
            })
            .await
    }
}

/// One enumeration source
#[async_trait]
pub trait DiscoverySource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn discover(&self, pass: &DiscoveryPass) -> PrintResult<Vec<PrinterDescriptor>>;
}

/// Vendor-matched USB devices
pub struct UsbSource;

#[async_trait]
impl DiscoverySource for UsbSource {
    fn name(&self) -> &'static str {
        "usb"
    }

    async fn discover(&self, pass: &DiscoveryPass) -> PrintResult<Vec<PrinterDescriptor>> {
        Ok(usb::detect_usb_printers(pass).await)
    }
}

/// All serial/COM ports
pub struct SerialSource;

#[async_trait]
impl DiscoverySource for SerialSource {
    fn name(&self) -> &'static str {
        "serial"
    }

    async fn discover(&self, _pass: &DiscoveryPass) -> PrintResult<Vec<PrinterDescriptor>> {
        Ok(serial::detect_serial_printers().await)
    }
}

/// OS spooler queues
pub struct OsPrinterSource;

#[async_trait]
impl DiscoverySource for OsPrinterSource {
    fn name(&self) -> &'static str {
        "windows"
    }

    async fn discover(&self, pass: &DiscoveryPass) -> PrintResult<Vec<PrinterDescriptor>> {
        Ok(os::detect_windows_printers(pass).await)
    }
}

/// Network printers the user added to the config document
pub struct ConfiguredNetworkSource {
    pub store: ConfigStore,
}

#[async_trait]
impl DiscoverySource for ConfiguredNetworkSource {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn discover(&self, _pass: &DiscoveryPass) -> PrintResult<Vec<PrinterDescriptor>> {
        Ok(self
            .store
            .load()
            .network_printers
            .iter()
            .map(|p| PrinterDescriptor::network(&p.host, p.port, &p.name))
            .collect())
    }
}

/// Discovery plus the persisted printer document
pub struct DeviceRegistry {
    store: ConfigStore,
    sources: Vec<Arc<dyn DiscoverySource>>,
    options: RegistryOptions,
}

impl DeviceRegistry {
    /// Registry over the four built-in sources
    pub fn new(store: ConfigStore) -> Self {
        Self::with_options(store, RegistryOptions::default())
    }

    pub fn with_options(store: ConfigStore, options: RegistryOptions) -> Self {
        let sources: Vec<Arc<dyn DiscoverySource>> = vec![
            Arc::new(UsbSource),
            Arc::new(SerialSource),
            Arc::new(OsPrinterSource),
            Arc::new(ConfiguredNetworkSource {
                store: store.clone(),
            }),
        ];
        Self::with_sources(store, sources, options)
    }

    /// Registry over caller-supplied sources
    pub fn with_sources(
        store: ConfigStore,
        sources: Vec<Arc<dyn DiscoverySource>>,
        options: RegistryOptions,
    ) -> Self {
        Self {
            store,
            sources,
            options,
        }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    // ========== Discovery ==========

    pub async fn detect_usb_printers(&self) -> Vec<PrinterDescriptor> {
        usb::detect_usb_printers(&self.new_pass()).await
    }

    pub async fn detect_serial_printers(&self) -> Vec<PrinterDescriptor> {
        serial::detect_serial_printers().await
    }

    pub async fn detect_windows_printers(&self) -> Vec<PrinterDescriptor> {
        os::detect_windows_printers(&self.new_pass()).await
    }

    fn new_pass(&self) -> DiscoveryPass {
        DiscoveryPass::new(self.options.shell_timeout)
    }

    /// Run every source concurrently and mark the persisted default
    #[instrument(skip(self))]
    pub async fn list_printers(&self) -> Vec<PrinterDescriptor> {
        self.list_printers_in(&self.new_pass()).await
    }

    async fn list_printers_in(&self, pass: &DiscoveryPass) -> Vec<PrinterDescriptor> {
        let results = join_all(self.sources.iter().map(|source| async move {
            match source.discover(pass).await {
                Ok(found) => {
                    debug!(source = source.name(), count = found.len(), "source done");
                    found
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "discovery source failed");
                    Vec::new()
                }
            }
        }))
        .await;

        let default_id = self.get_default_printer();
        let mut printers: Vec<PrinterDescriptor> = results.into_iter().flatten().collect();
        for printer in &mut printers {
            printer.is_default = default_id.as_deref() == Some(printer.id.as_str());
        }

        info!(count = printers.len(), "printers discovered");
        printers
    }

    /// Fresh discovery pass, then look up by id
    pub async fn find_printer_by_id(&self, id: &str) -> Option<PrinterDescriptor> {
        self.list_printers().await.into_iter().find(|p| p.id == id)
    }

    // ========== Network printers ==========

    pub fn get_configured_network_printers(&self) -> Vec<NetworkPrinterEntry> {
        self.store.load().network_printers
    }

    /// Add a network printer; an existing (host, port) pair is left as is
    pub fn add_network_printer(
        &self,
        host: &str,
        port: Option<u16>,
        name: &str,
    ) -> PrintResult<PrinterDescriptor> {
        let host = host.trim().to_string();
        if host.is_empty() {
            return Err(PrintError::InvalidConfig(
                "Network printer host is empty".to_string(),
            ));
        }
        let port = port.unwrap_or(self.options.default_port);

        let entry = self.store.update(|config| {
            match config
                .network_printers
                .iter()
                .find(|p| p.host == host && p.port == port)
            {
                Some(existing) => existing.clone(),
                None => {
                    let entry = NetworkPrinterEntry {
                        host: host.clone(),
                        port,
                        name: name.to_string(),
                    };
                    config.network_printers.push(entry.clone());
                    entry
                }
            }
        })?;

        info!(host = %entry.host, port = entry.port, "network printer saved");
        Ok(PrinterDescriptor::network(&entry.host, entry.port, &entry.name))
    }

    /// Returns whether an entry was removed
    pub fn remove_network_printer(&self, host: &str, port: Option<u16>) -> PrintResult<bool> {
        let host = host.trim();
        let port = port.unwrap_or(self.options.default_port);
        let removed = self.store.update(|config| {
            let before = config.network_printers.len();
            config
                .network_printers
                .retain(|p| !(p.host == host && p.port == port));
            before != config.network_printers.len()
        })?;
        if removed {
            info!(host, port, "network printer removed");
        }
        Ok(removed)
    }

    pub async fn check_network_printer(
        &self,
        host: &str,
        port: Option<u16>,
        timeout: Option<Duration>,
    ) -> bool {
        network::check_network_printer(
            host,
            port.unwrap_or(self.options.default_port),
            timeout.unwrap_or(self.options.probe_timeout),
        )
        .await
    }

    /// Sweep `subnet.start ..= subnet.end`; defaults to hosts 1 to 254
    pub async fn scan_network_printers(
        &self,
        subnet: Option<&str>,
        start: Option<u8>,
        end: Option<u8>,
    ) -> PrintResult<Vec<PrinterDescriptor>> {
        network::scan_network_printers(
            subnet,
            start.unwrap_or(1),
            end.unwrap_or(254),
            self.options.default_port,
            self.options.scan_timeout,
        )
        .await
    }

    // ========== Preferences ==========

    /// `None` clears the pointer
    pub fn set_default_printer(&self, id: Option<&str>) -> PrintResult<()> {
        self.store
            .update(|config| config.default_printer_id = id.map(str::to_string))?;
        info!(id = ?id, "default printer set");
        Ok(())
    }

    pub fn get_default_printer(&self) -> Option<String> {
        self.store
            .load()
            .default_printer_id
            .filter(|id| !id.is_empty())
    }

    /// Empty map when nothing was saved
    pub fn get_printer_settings(&self, id: &str) -> PrinterSettings {
        self.store
            .load()
            .printer_settings
            .remove(id)
            .unwrap_or_default()
    }

    /// Merge keys into the stored settings; returns the merged map
    pub fn save_printer_settings(
        &self,
        id: &str,
        settings: PrinterSettings,
    ) -> PrintResult<PrinterSettings> {
        self.store.update(|config| {
            let stored = config.printer_settings.entry(id.to_string()).or_default();
            stored.extend(settings);
            stored.clone()
        })
    }
}

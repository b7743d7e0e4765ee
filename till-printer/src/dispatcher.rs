//! Print dispatch
//!
//! Resolves a printer, renders the job with that printer's settings and
//! sends it over the transport plan. There is no queue: concurrent jobs to
//! one device are not serialized here.

use crate::amount::coerce_number;
use crate::config::PrinterSettings;
use crate::device::{Connection, PrinterDescriptor};
use crate::encoding::TextEncoding;
use crate::error::{PrintError, PrintResult};
use crate::escpos::{CommandBuffer, DrawerPin, EscPosBuilder, drawer_kick};
use crate::label::{LabelData, build_label_with};
use crate::receipt::{
    RECEIPT_WIDTH, ReceiptData, RenderOptions, build_receipt_with, test_receipt_data,
};
use crate::registry::DeviceRegistry;
use crate::transport::{Connector, SystemConnector, TransportOptions, transport_plan};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Formatting flags for `print_text`
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    pub center: bool,
    pub bold: bool,
    pub cut: bool,
}

/// Result of a status check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrinterStatus {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Real probe for network printers; found-by-discovery for the rest
    pub online: bool,
}

/// Resolves printers and sends jobs
pub struct PrintDispatcher {
    registry: Arc<DeviceRegistry>,
    connector: Arc<dyn Connector>,
}

impl PrintDispatcher {
    pub fn new(registry: Arc<DeviceRegistry>) -> Self {
        Self::with_options(registry, TransportOptions::default())
    }

    pub fn with_options(registry: Arc<DeviceRegistry>, options: TransportOptions) -> Self {
        Self::with_connector(registry, Arc::new(SystemConnector::new(options)))
    }

    pub fn with_connector(registry: Arc<DeviceRegistry>, connector: Arc<dyn Connector>) -> Self {
        Self {
            registry,
            connector,
        }
    }

    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.registry
    }

    // ========== Resolution ==========

    /// Explicit id, else the persisted default, else the first printer found
    ///
    /// An explicit id must be present in a fresh discovery pass. A default
    /// that vanished falls through to the first printer.
    pub async fn resolve_printer(&self, id: Option<&str>) -> PrintResult<PrinterDescriptor> {
        let printers = self.registry.list_printers().await;

        if let Some(id) = id.filter(|id| !id.is_empty()) {
            return printers
                .into_iter()
                .find(|p| p.id == id)
                .ok_or_else(|| PrintError::PrinterNotFound(id.to_string()));
        }

        if let Some(default) = printers.iter().find(|p| p.is_default) {
            return Ok(default.clone());
        }

        printers.into_iter().next().ok_or(PrintError::NoPrinters)
    }

    /// Resolve and apply the printer's stored settings
    async fn prepare(&self, id: Option<&str>) -> PrintResult<(PrinterDescriptor, PrinterSettings)> {
        let mut printer = self.resolve_printer(id).await?;
        let settings = self.registry.get_printer_settings(&printer.id);

        if let Connection::Serial { baud_rate, .. } = &mut printer.connection {
            let configured = settings.get("baudRate").map(coerce_number).unwrap_or(0.0);
            if configured >= 1.0 && configured <= u32::MAX as f64 {
                *baud_rate = configured as u32;
            }
        }
        Ok((printer, settings))
    }

    // ========== Sending ==========

    /// Try each route of the plan in order; the last error wins
    #[instrument(skip(self, data), fields(printer = %printer.id, data_len = data.len()))]
    pub async fn send_to(&self, printer: &PrinterDescriptor, data: &[u8]) -> PrintResult<()> {
        let plan = transport_plan(printer)?;
        let mut last_error = None;

        for (i, route) in plan.iter().enumerate() {
            match self.connector.send(route, data).await {
                Ok(()) => {
                    info!(route = route.kind(), "Print job sent");
                    return Ok(());
                }
                Err(e) => {
                    if i + 1 < plan.len() {
                        warn!(route = route.kind(), error = %e, "Transport failed, trying fallback");
                    } else {
                        error!(route = route.kind(), error = %e, "Print failed");
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PrintError::UnsupportedTransport(printer.id.clone())))
    }

    // ========== Jobs ==========

    pub async fn print_receipt(&self, id: Option<&str>, receipt: &ReceiptData) -> PrintResult<()> {
        let (printer, settings) = self.prepare(id).await?;
        let data = build_receipt_with(receipt, &render_options(&settings));
        self.send_to(&printer, &data).await
    }

    /// Fixed sample receipt
    pub async fn print_test_receipt(&self, id: Option<&str>) -> PrintResult<()> {
        self.print_receipt(id, &test_receipt_data()).await
    }

    pub async fn print_text(
        &self,
        id: Option<&str>,
        text: &str,
        options: TextOptions,
    ) -> PrintResult<()> {
        let (printer, settings) = self.prepare(id).await?;
        let data = build_text_job(text, options, &render_options(&settings));
        self.send_to(&printer, &data).await
    }

    /// Only the drawer-kick pulse is sent
    pub async fn open_cash_drawer(&self, id: Option<&str>) -> PrintResult<()> {
        let (printer, settings) = self.prepare(id).await?;
        let kick = drawer_kick(render_options(&settings).drawer_pin);
        self.send_to(&printer, &kick).await
    }

    pub async fn print_barcode_label(
        &self,
        id: Option<&str>,
        label: &LabelData,
    ) -> PrintResult<()> {
        let (printer, settings) = self.prepare(id).await?;
        let data = build_label_with(label, &render_options(&settings), paper_size(&settings));
        self.send_to(&printer, &data).await
    }

    /// Print labels one by one
    ///
    /// Non-transactional: a failed label does not stop the rest and does not
    /// undo earlier ones. Any failure fails the call.
    #[instrument(skip(self, labels), fields(count = labels.len()))]
    pub async fn print_barcode_labels(
        &self,
        id: Option<&str>,
        labels: &[LabelData],
    ) -> PrintResult<()> {
        let (printer, settings) = self.prepare(id).await?;
        let options = render_options(&settings);
        let fallback = paper_size(&settings);

        let mut failed = 0;
        let mut first = None;
        for (i, label) in labels.iter().enumerate() {
            let data = build_label_with(label, &options, fallback);
            if let Err(e) = self.send_to(&printer, &data).await {
                warn!(index = i, error = %e, "Label failed, continuing");
                failed += 1;
                first.get_or_insert(e);
            }
        }

        match first {
            None => Ok(()),
            Some(first) => Err(PrintError::LabelBatch {
                failed,
                total: labels.len(),
                first: Box::new(first),
            }),
        }
    }

    /// Reachability of one printer
    ///
    /// Only network printers get a real probe. For other transports being
    /// found by discovery counts as online.
    pub async fn get_printer_status(&self, id: Option<&str>) -> PrintResult<PrinterStatus> {
        let printer = self.resolve_printer(id).await?;
        let online = match &printer.connection {
            Connection::Network { host, port } => {
                self.registry
                    .check_network_printer(host, Some(*port), None)
                    .await
            }
            _ => true,
        };
        Ok(PrinterStatus {
            kind: printer.kind().to_string(),
            id: printer.id,
            name: printer.name,
            online,
        })
    }
}

/// Encoding and drawer pin from the `encoding` and `drawerPin` settings
pub fn render_options(settings: &PrinterSettings) -> RenderOptions {
    let encoding = match settings.get("encoding").and_then(Value::as_str) {
        Some(label) => TextEncoding::from_label(label).unwrap_or_else(|e| {
            warn!(error = %e, "Ignoring printer encoding setting");
            TextEncoding::default()
        }),
        None => TextEncoding::default(),
    };
    let drawer_pin = settings
        .get("drawerPin")
        .map(|v| DrawerPin::from_number(coerce_number(v) as u64))
        .unwrap_or_default();
    RenderOptions {
        encoding,
        drawer_pin,
    }
}

/// Paper size in mm from the `width` and `height` settings
pub fn paper_size(settings: &PrinterSettings) -> Option<(f64, f64)> {
    let width = coerce_number(settings.get("width")?);
    let height = settings.get("height").map(coerce_number).unwrap_or(0.0);
    (width > 0.0).then_some((width, height))
}

/// Plain text job
pub fn build_text_job(text: &str, options: TextOptions, render: &RenderOptions) -> CommandBuffer {
    let mut b = EscPosBuilder::with_encoding(RECEIPT_WIDTH, render.encoding);
    if options.center {
        b.center();
    }
    if options.bold {
        b.bold();
    }
    for line in text.lines() {
        b.line(line);
    }
    if options.bold {
        b.bold_off();
    }
    b.finish_text();
    if options.cut {
        b.feed(4);
        b.cut_partial();
    } else {
        b.feed(1);
    }
    b.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings(value: Value) -> PrinterSettings {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_render_options_from_settings() {
        let opts = render_options(&settings(json!({"encoding": "cp866", "drawerPin": "5"})));
        assert_eq!(opts.encoding.name(), "IBM866");
        assert_eq!(opts.drawer_pin, DrawerPin::Pin5);

        let opts = render_options(&settings(json!({"encoding": "klingon"})));
        assert_eq!(opts.encoding, TextEncoding::default());
        assert_eq!(opts.drawer_pin, DrawerPin::Pin2);
    }

    #[test]
    fn test_paper_size() {
        assert_eq!(paper_size(&settings(json!({"width": 58, "height": "40"}))), Some((58.0, 40.0)));
        assert_eq!(paper_size(&settings(json!({"width": 0}))), None);
        assert_eq!(paper_size(&settings(json!({}))), None);
    }

    #[test]
    fn test_text_job_layout() {
        let data = build_text_job(
            "Hello\nWorld",
            TextOptions {
                center: true,
                bold: true,
                cut: true,
            },
            &RenderOptions::default(),
        );
        let bytes = data.as_bytes();
        assert!(bytes.starts_with(&[0x1B, 0x40, 0x1B, 0x61, 0x01, 0x1B, 0x45, 0x01]));
        assert!(bytes.windows(12).any(|w| w == b"Hello\nWorld\n"));
        assert!(bytes.ends_with(&[0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_text_job_without_cut() {
        let data = build_text_job("x", TextOptions::default(), &RenderOptions::default());
        assert!(!data.as_bytes().windows(3).any(|w| w == [0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_gbk_text_job_ends_with_cut() {
        let render = RenderOptions {
            encoding: TextEncoding::gbk(),
            ..Default::default()
        };
        let options = TextOptions {
            cut: true,
            ..Default::default()
        };
        let data = build_text_job("你好", options, &render);
        assert!(data.ends_with(&[0x1C, 0x2E, 0x1B, 0x64, 4, 0x1D, 0x56, 0x01]));
    }
}

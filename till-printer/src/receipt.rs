//! Sale/refund receipt rendering
//!
//! Renders `ReceiptData` into a 32-column ESC/POS job for 58mm printers.

use crate::amount::{self, format_amount, format_quantity};
use crate::barcode::BarcodeType;
use crate::encoding::TextEncoding;
use crate::escpos::{CommandBuffer, DrawerPin, EscPosBuilder};
use serde::{Deserialize, Serialize};

/// Receipt width in characters
pub const RECEIPT_WIDTH: usize = 32;

/// Receipt type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReceiptType {
    #[default]
    Sale,
    Refund,
    #[serde(alias = "defective_refund", alias = "defective")]
    DefectiveRefund,
}

impl ReceiptType {
    pub fn is_refund(self) -> bool {
        matches!(self, ReceiptType::Refund | ReceiptType::DefectiveRefund)
    }
}

/// Store identity printed in the header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreInfo {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// One line item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptItem {
    pub name: String,
    pub sku: Option<String>,
    #[serde(deserialize_with = "amount::lenient")]
    pub quantity: f64,
    #[serde(deserialize_with = "amount::lenient")]
    pub price: f64,
    #[serde(deserialize_with = "amount::lenient")]
    pub discount: f64,
}

impl ReceiptItem {
    /// quantity × price, before the item discount
    pub fn line_total(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Receipt payload produced by the business layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReceiptData {
    pub items: Vec<ReceiptItem>,
    #[serde(deserialize_with = "amount::lenient")]
    pub subtotal: f64,
    #[serde(deserialize_with = "amount::lenient")]
    pub discount: f64,
    #[serde(deserialize_with = "amount::lenient")]
    pub total: f64,
    pub payment_method: String,
    pub store: StoreInfo,
    pub date: String,
    pub receipt_number: String,
    pub cashier_name: Option<String>,
    #[serde(rename = "type")]
    pub receipt_type: ReceiptType,
    #[serde(deserialize_with = "amount::lenient_opt")]
    pub cash_received: Option<f64>,
    #[serde(deserialize_with = "amount::lenient_opt")]
    pub change: Option<f64>,
    pub barcode: Option<String>,
    pub qr_code: Option<String>,
    pub open_drawer: bool,
}

/// Per-printer rendering choices
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub encoding: TextEncoding,
    pub drawer_pin: DrawerPin,
}

/// Build a receipt with default options (UTF-8, drawer pin 2)
pub fn build_receipt(receipt: &ReceiptData) -> CommandBuffer {
    build_receipt_with(receipt, &RenderOptions::default())
}

/// Build a receipt
pub fn build_receipt_with(receipt: &ReceiptData, options: &RenderOptions) -> CommandBuffer {
    let mut b = EscPosBuilder::with_encoding(RECEIPT_WIDTH, options.encoding);

    render_header(&mut b, receipt);
    render_items(&mut b, &receipt.items);
    render_totals(&mut b, receipt);
    render_codes(&mut b, receipt);

    // Footer
    b.center();
    b.line("Thank you for your purchase!");
    b.left();
    b.finish_text();
    b.feed(4);
    b.cut_partial();

    // The drawer opens only after the paper is cut
    if receipt.open_drawer {
        b.open_drawer(options.drawer_pin);
    }

    b.build()
}

fn render_header(b: &mut EscPosBuilder, receipt: &ReceiptData) {
    b.center();
    b.bold();
    b.line(&receipt.store.name);
    b.bold_off();

    if let Some(address) = receipt.store.address.as_deref().filter(|s| !s.is_empty()) {
        b.line(address);
    }
    if let Some(phone) = receipt.store.phone.as_deref().filter(|s| !s.is_empty()) {
        b.line(&format!("Tel: {}", phone));
    }

    b.newline();
    b.bold();
    b.double_height();
    match receipt.receipt_type {
        ReceiptType::Sale => b.line("CHECK"),
        ReceiptType::Refund => b.line("REFUND"),
        ReceiptType::DefectiveRefund => b.line("REFUND"),
    };
    b.reset_size();
    if receipt.receipt_type == ReceiptType::DefectiveRefund {
        b.line("(defective item)");
    }
    b.bold_off();

    b.left();
    b.line(&format!("Date: {}", receipt.date));
    b.line(&format!("Receipt #: {}", receipt.receipt_number));
    if let Some(cashier) = receipt.cashier_name.as_deref().filter(|s| !s.is_empty()) {
        b.line(&format!("Cashier: {}", cashier));
    }
    b.sep_single();
}

fn render_items(b: &mut EscPosBuilder, items: &[ReceiptItem]) {
    for item in items {
        let name = b.encoding().truncate(&item.name, RECEIPT_WIDTH);
        b.line(&name);

        let prefix = format!(
            "{} x {}",
            format_quantity(item.quantity),
            format_amount(item.price)
        );
        b.line(&item_price_line(&prefix, &format_amount(item.line_total())));

        if item.discount > 0.0 {
            b.line(&format!("  Discount: -{}", format_amount(item.discount)));
        }
    }
    b.sep_single();
}

/// `prefix` + padding + `total`, exactly `RECEIPT_WIDTH` columns when it fits
///
/// Falls back to a single space when the content is already too wide.
pub fn item_price_line(prefix: &str, total: &str) -> String {
    let used = prefix.chars().count() + total.chars().count();
    let padding = RECEIPT_WIDTH.saturating_sub(used).max(1);
    format!("{}{}{}", prefix, " ".repeat(padding), total)
}

fn render_totals(b: &mut EscPosBuilder, receipt: &ReceiptData) {
    b.line_lr("Subtotal:", &format_amount(receipt.subtotal));
    if receipt.discount > 0.0 {
        b.line_lr("Discount:", &format!("-{}", format_amount(receipt.discount)));
    }

    let total = format_amount(receipt.total.abs());
    let total = if receipt.receipt_type.is_refund() {
        format!("-{}", total)
    } else {
        total
    };
    b.bold();
    b.line_lr("TOTAL:", &total);
    b.bold_off();

    if !receipt.payment_method.is_empty() {
        b.line_lr("Payment:", &receipt.payment_method);
    }
    if let Some(cash) = receipt.cash_received {
        b.line_lr("Cash:", &format_amount(cash));
    }
    if let Some(change) = receipt.change {
        b.line_lr("Change:", &format_amount(change));
    }
}

fn render_codes(b: &mut EscPosBuilder, receipt: &ReceiptData) {
    let barcode = receipt.barcode.as_deref().filter(|s| !s.is_empty());
    let qr = receipt.qr_code.as_deref().filter(|s| !s.is_empty());
    if barcode.is_none() && qr.is_none() {
        return;
    }

    b.newline();
    b.center();
    if let Some(data) = barcode {
        b.barcode(data, BarcodeType::Code128, 60, 2);
        b.newline();
    }
    if let Some(data) = qr {
        b.qr_code(data, 6);
        b.newline();
    }
    b.left();
}

/// Fixed payload for printer setup checks
pub fn test_receipt_data() -> ReceiptData {
    ReceiptData {
        items: vec![
            ReceiptItem {
                name: "Test item".to_string(),
                sku: Some("TEST-001".to_string()),
                quantity: 1.0,
                price: 10000.0,
                discount: 0.0,
            },
            ReceiptItem {
                name: "Second test item".to_string(),
                sku: Some("TEST-002".to_string()),
                quantity: 2.0,
                price: 2500.0,
                discount: 500.0,
            },
        ],
        subtotal: 15000.0,
        discount: 500.0,
        total: 14500.0,
        payment_method: "Cash".to_string(),
        store: StoreInfo {
            name: "TEST PRINT".to_string(),
            address: Some("Printer setup check".to_string()),
            phone: None,
        },
        date: "2024-01-01 12:00".to_string(),
        receipt_number: "000000".to_string(),
        cashier_name: Some("Setup".to_string()),
        receipt_type: ReceiptType::Sale,
        cash_received: Some(20000.0),
        change: Some(5500.0),
        barcode: Some("000000".to_string()),
        qr_code: None,
        open_drawer: false,
    }
}

/// Build the fixed test receipt
pub fn build_test_receipt() -> CommandBuffer {
    build_receipt(&test_receipt_data())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escpos::drawer_kick;

    fn sample(items: usize) -> ReceiptData {
        ReceiptData {
            items: (0..items)
                .map(|i| ReceiptItem {
                    name: format!("Item number {}", i),
                    sku: None,
                    quantity: (i + 1) as f64,
                    price: 1500.0,
                    discount: 0.0,
                })
                .collect(),
            subtotal: 3000.0,
            total: 3000.0,
            payment_method: "Card".to_string(),
            store: StoreInfo {
                name: "Corner Shop".to_string(),
                address: Some("1 Main St".to_string()),
                phone: Some("555-0100".to_string()),
            },
            date: "2024-05-01 10:15".to_string(),
            receipt_number: "42".to_string(),
            ..Default::default()
        }
    }

    fn lines(buf: &CommandBuffer) -> Vec<String> {
        String::from_utf8_lossy(buf)
            .split('\n')
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_item_table_has_pair_per_item() {
        for n in [0, 1, 2, 7] {
            let out = lines(&build_receipt(&sample(n)));
            let price_lines: Vec<_> = out.iter().filter(|l| l.contains(" x 1 500")).collect();
            assert_eq!(price_lines.len(), n);
            for l in price_lines {
                assert_eq!(l.chars().count(), RECEIPT_WIDTH, "{:?}", l);
            }
            for i in 0..n {
                assert!(out.iter().any(|l| l == &format!("Item number {}", i)));
            }
        }
    }

    #[test]
    fn test_item_price_line_padding() {
        let line = item_price_line("2 x 1 500", "3 000");
        assert_eq!(line.len(), 32);
        assert_eq!(line, format!("2 x 1 500{}3 000", " ".repeat(18)));

        let prefix = "1000000 x 1 000 000 000";
        let total = "1 000 000 000 000 000";
        let line = item_price_line(prefix, total);
        assert_eq!(line, format!("{} {}", prefix, total));
    }

    #[test]
    fn test_refund_banner_and_sign() {
        let mut r = sample(1);
        r.receipt_type = ReceiptType::Refund;
        let out = lines(&build_receipt(&r));
        assert!(out.iter().any(|l| l.ends_with("REFUND")));
        assert!(out.iter().any(|l| l.contains("TOTAL:") && l.ends_with("-3 000")));
        assert!(!out.iter().any(|l| l.ends_with("CHECK")));
    }

    #[test]
    fn test_sale_banner() {
        let out = lines(&build_receipt(&sample(1)));
        assert!(out.iter().any(|l| l.ends_with("CHECK")));
        let total = out.iter().find(|l| l.contains("TOTAL:")).unwrap();
        assert!(total.ends_with(" 3 000"));
    }

    #[test]
    fn test_discount_sub_line() {
        let mut r = sample(2);
        r.items[1].discount = 250.0;
        let out = lines(&build_receipt(&r));
        let discounts: Vec<_> = out.iter().filter(|l| l.starts_with("  Discount:")).collect();
        assert_eq!(discounts, vec!["  Discount: -250"]);
    }

    #[test]
    fn test_drawer_kick_after_cut() {
        let mut r = sample(1);
        r.open_drawer = true;
        let data = build_receipt(&r).into_vec();
        let kick = drawer_kick(DrawerPin::Pin2);
        assert!(data.ends_with(&kick));
        let cut_at = data.windows(3).rposition(|w| w == [0x1D, 0x56, 0x01]).unwrap();
        assert_eq!(cut_at + 3, data.len() - kick.len());
    }

    #[test]
    fn test_gbk_drawer_kick_stays_last() {
        let mut r = sample(1);
        r.open_drawer = true;
        let options = RenderOptions {
            encoding: TextEncoding::gbk(),
            ..Default::default()
        };
        let data = build_receipt_with(&r, &options).into_vec();
        let mut tail = vec![0x1C, 0x2E, 0x1B, 0x64, 4, 0x1D, 0x56, 0x01];
        tail.extend_from_slice(&drawer_kick(DrawerPin::Pin2));
        assert!(data.ends_with(&tail));
    }

    #[test]
    fn test_no_drawer_kick_by_default() {
        let data = build_receipt(&sample(1)).into_vec();
        assert!(data.ends_with(&[0x1D, 0x56, 0x01]));
    }

    #[test]
    fn test_optional_codes() {
        let mut r = sample(1);
        r.barcode = Some("R-42".to_string());
        r.qr_code = Some("https://example.com/r/42".to_string());
        let data = build_receipt(&r).into_vec();
        assert!(data.windows(4).any(|w| w == [0x1D, 0x6B, 0x49, 4]));
        assert!(data.windows(3).any(|w| w == [0x31, 0x50, 0x30]));
    }

    #[test]
    fn test_malformed_numbers_coerce_to_zero() {
        let json = r#"{
            "items": [{"name": "Tea", "quantity": "two", "price": "1 200", "discount": null}],
            "subtotal": "oops",
            "total": {"nested": true},
            "paymentMethod": "Cash",
            "store": {"name": "Cafe"},
            "date": "today",
            "receiptNumber": "7",
            "type": "defective-refund",
            "cashReceived": "5000"
        }"#;
        let r: ReceiptData = serde_json::from_str(json).unwrap();
        assert_eq!(r.items[0].quantity, 0.0);
        assert_eq!(r.items[0].price, 1200.0);
        assert_eq!(r.subtotal, 0.0);
        assert_eq!(r.total, 0.0);
        assert_eq!(r.cash_received, Some(5000.0));
        assert_eq!(r.change, None);
        assert_eq!(r.receipt_type, ReceiptType::DefectiveRefund);

        let out = lines(&build_receipt(&r));
        assert!(out.iter().any(|l| l == "(defective item)"));
        assert!(out.iter().any(|l| l.starts_with("0 x 1 200") && l.ends_with(" 0")));
    }

    #[test]
    fn test_test_receipt_is_stable() {
        assert_eq!(build_test_receipt(), build_test_receipt());
        let out = lines(&build_test_receipt());
        assert!(out.iter().any(|l| l.contains("TEST PRINT")));
    }
}

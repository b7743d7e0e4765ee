//! Price/barcode label rendering
//!
//! Label stock is narrow and short, so layout is driven by the paper width:
//! the name budget comes from a width lookup and fonts/barcodes scale up on
//! wider stock.

use crate::amount::{self, format_amount, format_quantity};
use crate::barcode::BarcodeType;
use crate::escpos::{CommandBuffer, EscPosBuilder};
use crate::receipt::RenderOptions;
use serde::{Deserialize, Serialize};

/// A named paper size preset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelProfile {
    pub name: &'static str,
    pub width_mm: f64,
    pub height_mm: f64,
    pub barcode_height: u8,
    pub barcode_width: u8,
}

/// Built-in label sizes
pub const LABEL_PROFILES: &[LabelProfile] = &[
    LabelProfile {
        name: "30x20",
        width_mm: 30.0,
        height_mm: 20.0,
        barcode_height: 40,
        barcode_width: 1,
    },
    LabelProfile {
        name: "40x30",
        width_mm: 40.0,
        height_mm: 30.0,
        barcode_height: 50,
        barcode_width: 2,
    },
    LabelProfile {
        name: "50x30",
        width_mm: 50.0,
        height_mm: 30.0,
        barcode_height: 60,
        barcode_width: 2,
    },
    LabelProfile {
        name: "58x40",
        width_mm: 58.0,
        height_mm: 40.0,
        barcode_height: 70,
        barcode_width: 2,
    },
    LabelProfile {
        name: "60x40",
        width_mm: 60.0,
        height_mm: 40.0,
        barcode_height: 80,
        barcode_width: 3,
    },
    LabelProfile {
        name: "80x50",
        width_mm: 80.0,
        height_mm: 50.0,
        barcode_height: 100,
        barcode_width: 3,
    },
];

/// Profile used when nothing else says how big the label is
pub const DEFAULT_PROFILE: &str = "40x30";

impl LabelProfile {
    /// Look up a profile by name; `small`, `medium` and `large` are aliases
    pub fn by_name(name: &str) -> Option<LabelProfile> {
        let key = match name.trim().to_ascii_lowercase().as_str() {
            "small" => "30x20".to_string(),
            "medium" => "40x30".to_string(),
            "large" => "58x40".to_string(),
            other => other.replace(['*', '×', ' '], "x"),
        };
        LABEL_PROFILES.iter().copied().find(|p| p.name == key)
    }

    /// Profile for explicit dimensions; barcode size follows the scale
    pub fn custom(width_mm: f64, height_mm: f64) -> LabelProfile {
        let (barcode_height, barcode_width) = match LabelScale::for_width(width_mm) {
            LabelScale::Large => (80, 3),
            LabelScale::Medium => (50, 2),
            LabelScale::Small => (40, 1),
        };
        LabelProfile {
            name: "custom",
            width_mm,
            height_mm,
            barcode_height,
            barcode_width,
        }
    }

    fn default_profile() -> LabelProfile {
        LABEL_PROFILES
            .iter()
            .copied()
            .find(|p| p.name == DEFAULT_PROFILE)
            .unwrap_or(LABEL_PROFILES[1])
    }
}

/// Font/barcode scale derived from paper width
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelScale {
    Small,
    Medium,
    Large,
}

impl LabelScale {
    pub fn for_width(width_mm: f64) -> Self {
        if width_mm >= 50.0 {
            LabelScale::Large
        } else if width_mm >= 40.0 {
            LabelScale::Medium
        } else {
            LabelScale::Small
        }
    }
}

/// Label payload produced by the business layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelData {
    pub product_name: String,
    #[serde(deserialize_with = "amount::lenient")]
    pub price: f64,
    pub sku: Option<String>,
    pub barcode: Option<String>,
    pub barcode_type: Option<String>,
    #[serde(deserialize_with = "amount::lenient_opt")]
    pub stock: Option<f64>,
    /// Named profile, e.g. `40x30`
    pub size: Option<String>,
    #[serde(deserialize_with = "amount::lenient_opt")]
    pub width: Option<f64>,
    #[serde(deserialize_with = "amount::lenient_opt")]
    pub height: Option<f64>,
}

impl LabelData {
    /// Resolve the paper profile
    ///
    /// Explicit width wins, then the named profile, then `fallback`
    /// (per-printer settings), then the default profile.
    pub fn profile(&self, fallback: Option<(f64, f64)>) -> LabelProfile {
        if let Some(width) = self.width.filter(|w| *w > 0.0) {
            return LabelProfile::custom(width, self.height.unwrap_or(0.0));
        }
        if let Some(profile) = self.size.as_deref().and_then(LabelProfile::by_name) {
            return profile;
        }
        if let Some((width, height)) = fallback.filter(|(w, _)| *w > 0.0) {
            return LabelProfile::custom(width, height);
        }
        LabelProfile::default_profile()
    }
}

/// Maximum product-name characters for a paper width
pub fn name_budget(width_mm: f64) -> usize {
    let width = if width_mm.is_finite() && width_mm > 0.0 {
        width_mm.floor() as usize
    } else {
        0
    };
    match width {
        30 => 16,
        40 => 20,
        50 => 26,
        60 => 32,
        80 => 42,
        w => w / 2,
    }
}

/// Cut a name to `budget - 2` characters plus `..` when it overflows
pub fn truncate_name(name: &str, budget: usize) -> String {
    if name.chars().count() <= budget {
        return name.to_string();
    }
    let keep: String = name.chars().take(budget.saturating_sub(2)).collect();
    format!("{}..", keep)
}

/// Build a label with default options
pub fn build_label(label: &LabelData) -> CommandBuffer {
    build_label_with(label, &RenderOptions::default(), None)
}

/// Build a label
///
/// `fallback_size` is the printer's configured paper size in mm, used when
/// the label carries neither a profile nor explicit dimensions.
pub fn build_label_with(
    label: &LabelData,
    options: &RenderOptions,
    fallback_size: Option<(f64, f64)>,
) -> CommandBuffer {
    let profile = label.profile(fallback_size);
    let scale = LabelScale::for_width(profile.width_mm);
    let budget = name_budget(profile.width_mm);

    let mut b = EscPosBuilder::with_encoding(budget.max(1), options.encoding);
    b.center();

    // Name
    b.bold();
    if scale == LabelScale::Large {
        b.double_height();
    }
    b.line(&truncate_name(&label.product_name, budget));
    b.reset_size();
    b.bold_off();

    // Price
    match scale {
        LabelScale::Large => b.double_size(),
        LabelScale::Medium => b.double_height(),
        LabelScale::Small => b.bold(),
    };
    b.line(&format_amount(label.price));
    b.reset_size();
    b.bold_off();

    if let Some(code) = label.barcode.as_deref().filter(|s| !s.is_empty()) {
        let kind = label
            .barcode_type
            .as_deref()
            .map(BarcodeType::from_name)
            .unwrap_or_default();
        b.barcode(code, kind, profile.barcode_height, profile.barcode_width);
        b.newline();
    }

    if let Some(sku) = label.sku.as_deref().filter(|s| !s.is_empty()) {
        b.line(&format!("SKU: {}", sku));
    }
    if let Some(stock) = label.stock {
        b.line(&format!("Stock: {}", format_quantity(stock)));
    }

    b.finish_text();
    b.feed(2);
    b.cut_partial();
    b.build()
}

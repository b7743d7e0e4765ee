//! Barcode and QR code commands
//!
//! Two `GS k` wire forms exist and firmware families usually implement only
//! one of them, so both are kept byte-exact:
//! - function A (`m` = 0..6): payload terminated by NUL
//! - function B (`m` = 65..73): length byte, then payload

/// Symbologies accepted by `GS k`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BarcodeType {
    UpcA,
    UpcE,
    Ean13,
    Ean8,
    Code39,
    Itf,
    Codabar,
    Code93,
    #[default]
    Code128,
    /// Function A variants for firmware without length-prefixed support
    UpcALegacy,
    UpcELegacy,
    Ean13Legacy,
    Ean8Legacy,
    Code39Legacy,
    ItfLegacy,
    CodabarLegacy,
}

impl BarcodeType {
    /// Map a symbolic name; unknown names fall back to CODE128
    pub fn from_name(name: &str) -> Self {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_uppercase)
            .collect();

        match normalized.as_str() {
            "UPCA" => BarcodeType::UpcA,
            "UPCE" => BarcodeType::UpcE,
            "EAN13" | "JAN13" => BarcodeType::Ean13,
            "EAN8" | "JAN8" => BarcodeType::Ean8,
            "CODE39" => BarcodeType::Code39,
            "ITF" => BarcodeType::Itf,
            "CODABAR" | "NW7" => BarcodeType::Codabar,
            "CODE93" => BarcodeType::Code93,
            "CODE128" => BarcodeType::Code128,
            "UPCALEGACY" => BarcodeType::UpcALegacy,
            "UPCELEGACY" => BarcodeType::UpcELegacy,
            "EAN13LEGACY" => BarcodeType::Ean13Legacy,
            "EAN8LEGACY" => BarcodeType::Ean8Legacy,
            "CODE39LEGACY" => BarcodeType::Code39Legacy,
            "ITFLEGACY" => BarcodeType::ItfLegacy,
            "CODABARLEGACY" => BarcodeType::CodabarLegacy,
            _ => BarcodeType::Code128,
        }
    }

    /// The `m` byte of `GS k m`
    pub fn code(self) -> u8 {
        match self {
            BarcodeType::UpcALegacy => 0x00,
            BarcodeType::UpcELegacy => 0x01,
            BarcodeType::Ean13Legacy => 0x02,
            BarcodeType::Ean8Legacy => 0x03,
            BarcodeType::Code39Legacy => 0x04,
            BarcodeType::ItfLegacy => 0x05,
            BarcodeType::CodabarLegacy => 0x06,
            BarcodeType::UpcA => 0x41,
            BarcodeType::UpcE => 0x42,
            BarcodeType::Ean13 => 0x43,
            BarcodeType::Ean8 => 0x44,
            BarcodeType::Code39 => 0x45,
            BarcodeType::Itf => 0x46,
            BarcodeType::Codabar => 0x47,
            BarcodeType::Code93 => 0x48,
            BarcodeType::Code128 => 0x49,
        }
    }

    /// Whether the payload is preceded by a length byte
    pub fn is_length_prefixed(self) -> bool {
        self.code() >= 0x41
    }
}

/// `GS k` barcode print command
///
/// Length-prefixed payloads longer than 255 bytes are cut to 255.
/// NUL bytes are dropped from terminated payloads since they would end
/// the symbol early.
pub fn build_barcode(data: &str, kind: BarcodeType) -> Vec<u8> {
    let code = kind.code();
    let mut out = vec![0x1D, 0x6B, code];

    if kind.is_length_prefixed() {
        let payload = &data.as_bytes()[..data.len().min(u8::MAX as usize)];
        out.push(payload.len() as u8);
        out.extend_from_slice(payload);
    } else {
        out.extend(data.bytes().filter(|b| *b != 0x00));
        out.push(0x00);
    }

    out
}

/// `GS h n` - barcode height in dots
pub fn barcode_height(dots: u8) -> [u8; 3] {
    [0x1D, 0x68, dots.max(1)]
}

/// `GS w n` - barcode module width (2..=6 on most firmware)
pub fn barcode_width(module: u8) -> [u8; 3] {
    [0x1D, 0x77, module.clamp(1, 6)]
}

/// `GS H 2` - print human readable digits below the bars
pub fn barcode_hri_below() -> [u8; 3] {
    [0x1D, 0x48, 0x02]
}

/// QR code: model, module size, error correction, store, print
///
/// Module size is clamped to 1..=16 dots.
pub fn build_qr_code(data: &str, module_size: u8) -> Vec<u8> {
    let size = module_size.clamp(1, 16);
    let data_bytes = &data.as_bytes()[..data.len().min(u16::MAX as usize - 3)];
    let mut out = Vec::with_capacity(data_bytes.len() + 40);

    // Function 165: Select model (Model 2)
    out.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x04, 0x00, 0x31, 0x41, 0x32, 0x00]);

    // Function 167: Set module size
    out.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x43, size]);

    // Function 169: Set error correction (M)
    out.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x45, 0x31]);

    // Function 180: Store data
    let len = data_bytes.len() + 3;
    let p_l = (len & 0xFF) as u8;
    let p_h = ((len >> 8) & 0xFF) as u8;
    out.extend_from_slice(&[0x1D, 0x28, 0x6B, p_l, p_h, 0x31, 0x50, 0x30]);
    out.extend_from_slice(data_bytes);

    // Function 181: Print
    out.extend_from_slice(&[0x1D, 0x28, 0x6B, 0x03, 0x00, 0x31, 0x51, 0x30]);

    out
}

//! ESC/POS command builder
//!
//! Provides a fluent API for building ESC/POS print data. Text is encoded
//! for the builder's code page as it is written, so the finished buffer
//! never needs a second conversion pass.

use crate::barcode::{self, BarcodeType};
use crate::encoding::TextEncoding;
use std::ops::Deref;

/// Cash drawer connector pin for `ESC p`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DrawerPin {
    #[default]
    Pin2,
    Pin5,
}

impl DrawerPin {
    /// `2` or `5`; anything else keeps pin 2
    pub fn from_number(n: u64) -> Self {
        if n == 5 { DrawerPin::Pin5 } else { DrawerPin::Pin2 }
    }
}

/// `ESC p m t1 t2` - pulse the drawer solenoid
pub fn drawer_kick(pin: DrawerPin) -> [u8; 5] {
    let m = match pin {
        DrawerPin::Pin2 => 0x00,
        DrawerPin::Pin5 => 0x01,
    };
    [0x1B, 0x70, m, 25, 250]
}

/// A finished, read-only print job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandBuffer(Vec<u8>);

impl CommandBuffer {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for CommandBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for CommandBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// ESC/POS command builder
///
/// Builds ESC/POS byte sequences for thermal printers.
pub struct EscPosBuilder {
    buf: Vec<u8>,
    width: usize,
    encoding: TextEncoding,
    text_finished: bool,
}

impl EscPosBuilder {
    /// Create a new builder with the specified paper width in characters
    ///
    /// Common widths:
    /// - 58mm paper: 32 characters
    /// - 80mm paper: 48 characters
    pub fn new(width: usize) -> Self {
        Self::with_encoding(width, TextEncoding::default())
    }

    /// Create a builder whose text is encoded for `encoding`
    ///
    /// The code page select command follows the initialize command.
    pub fn with_encoding(width: usize, encoding: TextEncoding) -> Self {
        let mut buf = Vec::with_capacity(1024);
        // Initialize printer (ESC @)
        buf.extend_from_slice(&[0x1B, 0x40]);
        buf.extend_from_slice(&encoding.select_command());
        Self {
            buf,
            width,
            encoding,
            text_finished: false,
        }
    }

    /// Get the text encoding
    pub fn encoding(&self) -> &TextEncoding {
        &self.encoding
    }

    // === Text Output ===

    /// Write encoded text
    pub fn text(&mut self, s: &str) -> &mut Self {
        let bytes = self.encoding.encode(s);
        self.buf.extend_from_slice(&bytes);
        self
    }

    /// Write text followed by newline
    pub fn line(&mut self, s: &str) -> &mut Self {
        self.text(s);
        self.buf.push(b'\n');
        self
    }

    /// Write empty line
    pub fn newline(&mut self) -> &mut Self {
        self.buf.push(b'\n');
        self
    }

    /// Feed paper by n lines
    pub fn feed(&mut self, lines: u8) -> &mut Self {
        // ESC d n - Print and feed n lines
        self.buf.extend_from_slice(&[0x1B, 0x64, lines]);
        self
    }

    // === Alignment ===

    /// Align text to center
    pub fn center(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x01]);
        self
    }

    /// Align text to left (default)
    pub fn left(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x61, 0x00]);
        self
    }

    // === Text Style ===

    /// Enable bold text
    pub fn bold(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x01]);
        self
    }

    /// Disable bold text
    pub fn bold_off(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, 0x45, 0x00]);
        self
    }

    /// Double width and height
    pub fn double_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x11]);
        self
    }

    /// Double height only
    pub fn double_height(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x01]);
        self
    }

    /// Reset to normal size
    pub fn reset_size(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1D, 0x21, 0x00]);
        self
    }

    // === Separators ===

    /// Print a line of '-' characters
    pub fn sep_single(&mut self) -> &mut Self {
        self.line(&"-".repeat(self.width))
    }

    // === Layout Helpers ===

    /// Print left and right text on the same line
    ///
    /// Left text is left-aligned, right text is right-aligned,
    /// with spaces filling the gap. At least one space is kept.
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let lw = self.encoding.width(left);
        let rw = self.encoding.width(right);
        let spaces = self.width.saturating_sub(lw + rw).max(1);

        self.text(left);
        self.text(&" ".repeat(spaces));
        self.line(right)
    }

    // === Barcodes ===

    /// Print a barcode below the current position
    ///
    /// Sets height and module width, enables HRI digits below the bars.
    pub fn barcode(&mut self, data: &str, kind: BarcodeType, height: u8, module: u8) -> &mut Self {
        self.buf.extend_from_slice(&barcode::barcode_height(height));
        self.buf.extend_from_slice(&barcode::barcode_width(module));
        self.buf.extend_from_slice(&barcode::barcode_hri_below());
        self.buf.extend_from_slice(&barcode::build_barcode(data, kind));
        self
    }

    /// Print a QR code
    ///
    /// Size: 1-16 (module size in dots)
    pub fn qr_code(&mut self, data: &str, size: u8) -> &mut Self {
        self.buf.extend_from_slice(&barcode::build_qr_code(data, size));
        self
    }

    // === Paper Control ===

    /// Partial cut (leave a small connection)
    pub fn cut_partial(&mut self) -> &mut Self {
        // GS V 1 - Partial cut
        self.buf.extend_from_slice(&[0x1D, 0x56, 0x01]);
        self
    }

    // === Cash Drawer ===

    /// Open cash drawer on the given pin
    pub fn open_drawer(&mut self, pin: DrawerPin) -> &mut Self {
        self.buf.extend_from_slice(&drawer_kick(pin));
        self
    }

    // === Build ===

    /// Leave the code page mode if it needs an exit
    ///
    /// Call before the trailing feed, cut and drawer pulse so those stay
    /// the last bytes of the job. Only the first call emits anything.
    pub fn finish_text(&mut self) -> &mut Self {
        if !self.text_finished {
            self.buf.extend_from_slice(&self.encoding.deselect_command());
            self.text_finished = true;
        }
        self
    }

    /// Finish the job; text mode is closed here unless `finish_text` ran
    pub fn build(mut self) -> CommandBuffer {
        self.finish_text();
        CommandBuffer(self.buf)
    }
}

impl Default for EscPosBuilder {
    fn default() -> Self {
        Self::new(32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_basic() {
        let mut b = EscPosBuilder::new(32);
        b.center()
            .double_size()
            .line("Title")
            .reset_size()
            .left()
            .line("Body");

        let data = b.build();
        assert_eq!(&data[..2], &[0x1B, 0x40]);
        let s = String::from_utf8_lossy(&data);
        assert!(s.contains("Title\n"));
    }

    #[test]
    fn test_line_lr() {
        let mut b = EscPosBuilder::new(20);
        b.line_lr("Left", "Right");

        let data = b.build();
        let s = String::from_utf8_lossy(&data[2..]);
        assert_eq!(s, format!("Left{}Right\n", " ".repeat(11)));
    }

    #[test]
    fn test_line_lr_keeps_one_space_when_too_long() {
        let mut b = EscPosBuilder::new(8);
        b.line_lr("Subtotal", "1 000");

        let data = b.build();
        assert_eq!(&data[2..], b"Subtotal 1 000\n");
    }

    #[test]
    fn test_separators() {
        let mut b = EscPosBuilder::new(10);
        b.sep_single();

        let data = b.build();
        assert_eq!(&data[2..], b"----------\n");
    }

    #[test]
    fn test_gbk_builder_wraps_mode() {
        let mut b = EscPosBuilder::with_encoding(32, TextEncoding::gbk());
        b.line("你好");

        let data = b.build().into_vec();
        assert_eq!(&data[..7], &[0x1B, 0x40, 0x1C, 0x26, 0x1C, 0x43, 0x01]);
        assert_eq!(&data[data.len() - 2..], &[0x1C, 0x2E]);
        // 你好 in GBK
        assert_eq!(&data[7..11], &[0xC4, 0xE3, 0xBA, 0xC3]);
    }

    #[test]
    fn test_gbk_finish_text_before_cut() {
        let mut b = EscPosBuilder::with_encoding(32, TextEncoding::gbk());
        b.line("你好").finish_text().finish_text();
        b.feed(2).cut_partial();

        let data = b.build().into_vec();
        assert!(data.ends_with(&[0x1C, 0x2E, 0x1B, 0x64, 0x02, 0x1D, 0x56, 0x01]));
        let exits = data.windows(2).filter(|w| *w == [0x1C, 0x2E]).count();
        assert_eq!(exits, 1);
    }

    #[test]
    fn test_finish_text_is_empty_for_utf8() {
        let mut b = EscPosBuilder::new(32);
        b.line("Tea").finish_text().cut_partial();

        let data = b.build();
        assert_eq!(&data[..], b"\x1B\x40Tea\n\x1D\x56\x01");
    }

    #[test]
    fn test_drawer_kick_pins() {
        assert_eq!(drawer_kick(DrawerPin::Pin2), [0x1B, 0x70, 0x00, 25, 250]);
        assert_eq!(drawer_kick(DrawerPin::from_number(5)), [0x1B, 0x70, 0x01, 25, 250]);
        assert_eq!(DrawerPin::from_number(7), DrawerPin::Pin2);
    }
}

//! Text encoding for thermal printers
//!
//! Printers render text through a selected code page, so every string has to
//! be encoded for the code page the printer was switched to. This module
//! provides:
//! - Code-page aware encoding (`ESC t n` pages and GBK Kanji mode)
//! - Column widths and truncation measured in printed cells
//! - `build_text` for a single encoded line

use crate::error::{PrintError, PrintResult};
use encoding_rs::Encoding;

/// How text must be switched on at the printer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Bytes go out untouched (UTF-8 capable firmware)
    Passthrough,
    /// Single-byte page selected with `ESC t n`
    CodePage(u8),
    /// Double-byte Chinese mode (`FS &` ... `FS .`)
    Kanji,
}

/// A printer text encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
    mode: Mode,
}

impl TextEncoding {
    /// UTF-8 pass-through, no code page command
    pub fn utf8() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            mode: Mode::Passthrough,
        }
    }

    /// GBK with Chinese mode enabled
    pub fn gbk() -> Self {
        Self {
            encoding: encoding_rs::GBK,
            mode: Mode::Kanji,
        }
    }

    /// Resolve an encoding label such as `cp866`, `windows-1251` or `gbk`
    pub fn from_label(label: &str) -> PrintResult<Self> {
        let normalized = label.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "" | "utf8" | "utf-8" => return Ok(Self::utf8()),
            "gbk" | "gb2312" | "gb18030" | "cp936" => return Ok(Self::gbk()),
            "cp866" | "pc866" => return Ok(Self::code_page(encoding_rs::IBM866, 17)),
            _ => {}
        }

        let encoding = Encoding::for_label(normalized.as_bytes())
            .ok_or_else(|| PrintError::InvalidConfig(format!("Unknown encoding: {}", label)))?;

        let page = epson_code_page(encoding).ok_or_else(|| {
            PrintError::InvalidConfig(format!("No printer code page for: {}", encoding.name()))
        })?;

        Ok(Self::code_page(encoding, page))
    }

    fn code_page(encoding: &'static Encoding, page: u8) -> Self {
        Self {
            encoding,
            mode: Mode::CodePage(page),
        }
    }

    /// Encoding name as reported by encoding_rs
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Command that switches the printer into this encoding
    pub fn select_command(&self) -> Vec<u8> {
        match self.mode {
            Mode::Passthrough => Vec::new(),
            // ESC t n - Select character code table
            Mode::CodePage(n) => vec![0x1B, 0x74, n],
            // FS & - Enable Chinese mode, FS C 1 - Select GBK
            Mode::Kanji => vec![0x1C, 0x26, 0x1C, 0x43, 0x01],
        }
    }

    /// Command that leaves this encoding (only Chinese mode needs one)
    pub fn deselect_command(&self) -> Vec<u8> {
        match self.mode {
            // FS . - Cancel Chinese mode
            Mode::Kanji => vec![0x1C, 0x2E],
            _ => Vec::new(),
        }
    }

    /// Encode text; characters missing from the code page become `?`
    pub fn encode(&self, s: &str) -> Vec<u8> {
        if self.mode == Mode::Passthrough {
            return s.as_bytes().to_vec();
        }

        let (cow, _, had_errors) = self.encoding.encode(s);
        if !had_errors {
            return cow.into_owned();
        }

        let mut out = Vec::with_capacity(s.len());
        let mut tmp = [0u8; 4];
        for c in s.chars() {
            let (bytes, _, unmappable) = self.encoding.encode(c.encode_utf8(&mut tmp));
            if unmappable {
                out.push(b'?');
            } else {
                out.extend_from_slice(&bytes);
            }
        }
        out
    }

    /// Printed width in character cells
    ///
    /// Double-byte characters occupy two cells in Chinese mode.
    pub fn width(&self, s: &str) -> usize {
        s.chars().map(|c| self.char_width(c)).sum()
    }

    fn char_width(&self, c: char) -> usize {
        match self.mode {
            Mode::Kanji if !c.is_ascii() => 2,
            _ => 1,
        }
    }

    /// Truncate a string to fit within `max_width` cells
    pub fn truncate(&self, s: &str, max_width: usize) -> String {
        let mut width = 0;
        let mut result = String::new();
        for c in s.chars() {
            let w = self.char_width(c);
            if width + w > max_width {
                break;
            }
            result.push(c);
            width += w;
        }
        result
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

/// Epson `ESC t` table numbers for the single-byte pages encoding_rs knows
fn epson_code_page(encoding: &'static Encoding) -> Option<u8> {
    let page = if encoding == encoding_rs::WINDOWS_1252 {
        16
    } else if encoding == encoding_rs::IBM866 {
        17
    } else if encoding == encoding_rs::WINDOWS_1250 {
        45
    } else if encoding == encoding_rs::WINDOWS_1251 {
        46
    } else if encoding == encoding_rs::WINDOWS_1253 {
        47
    } else if encoding == encoding_rs::WINDOWS_1254 {
        48
    } else if encoding == encoding_rs::WINDOWS_1255 {
        49
    } else if encoding == encoding_rs::WINDOWS_1256 {
        50
    } else if encoding == encoding_rs::WINDOWS_1257 {
        51
    } else if encoding == encoding_rs::WINDOWS_1258 {
        52
    } else {
        return None;
    };
    Some(page)
}

/// Encode one line of text and terminate it with LF
///
/// The caller is responsible for having sent `encoding.select_command()`
/// first; no transliteration happens here.
pub fn build_text(text: &str, encoding: &TextEncoding) -> Vec<u8> {
    let mut out = encoding.encode(text);
    out.push(b'\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_text_utf8() {
        assert_eq!(build_text("Hi", &TextEncoding::utf8()), b"Hi\n");
    }

    #[test]
    fn test_build_text_cyrillic_cp866() {
        let enc = TextEncoding::from_label("cp866").unwrap();
        // 'П' is 0x8F in CP866
        assert_eq!(build_text("П", &enc), vec![0x8F, b'\n']);
        assert_eq!(enc.select_command(), vec![0x1B, 0x74, 17]);
    }

    #[test]
    fn test_windows_1251_label() {
        let enc = TextEncoding::from_label("windows-1251").unwrap();
        assert_eq!(enc.select_command(), vec![0x1B, 0x74, 46]);
        // 'Я' is 0xDF in windows-1251
        assert_eq!(enc.encode("Я"), vec![0xDF]);
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        let enc = TextEncoding::from_label("windows-1252").unwrap();
        assert_eq!(enc.encode("a你b"), b"a?b".to_vec());
    }

    #[test]
    fn test_unknown_label() {
        assert!(TextEncoding::from_label("klingon").is_err());
    }

    #[test]
    fn test_gbk_width() {
        let enc = TextEncoding::gbk();
        assert_eq!(enc.width("hello"), 5);
        assert_eq!(enc.width("你好"), 4);
        assert_eq!(enc.width("AB中文CD"), 8);
        assert_eq!(TextEncoding::utf8().width("你好"), 2);
    }

    #[test]
    fn test_truncate() {
        let enc = TextEncoding::gbk();
        assert_eq!(enc.truncate("hello world", 5), "hello");
        assert_eq!(enc.truncate("你好世界", 4), "你好");
        assert_eq!(enc.truncate("AB中文", 4), "AB中");
    }
}

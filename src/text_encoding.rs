use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use log::debug;

// @module: Text decoding of raw input and encoding of produced output

/// Decode raw bytes to text: BOM first, then strict UTF-8, then Windows-1252
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            debug!("Input is not valid UTF-8, decoding as Windows-1252");
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.into_owned()
        }
    }
}

/// Output text encoding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextEncoding {
    encoding: &'static Encoding,
    write_bom: bool,
}

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    /// UTF-8 with a byte-order mark
    pub fn utf8() -> Self {
        TextEncoding {
            encoding: UTF_8,
            write_bom: true,
        }
    }

    /// UTF-8 without a byte-order mark
    pub fn utf8_without_bom() -> Self {
        TextEncoding {
            encoding: UTF_8,
            write_bom: false,
        }
    }

    /// Resolve a WHATWG encoding label (`utf-8`, `windows-1252`, `utf-16le`, ...).
    /// Unicode encodings are written with a byte-order mark.
    pub fn resolve(label: &str) -> Result<Self, String> {
        let label = label.trim();
        if label.is_empty() {
            return Ok(Self::utf8());
        }
        match Encoding::for_label(label.as_bytes()) {
            Some(encoding) => Ok(TextEncoding {
                encoding,
                write_bom: encoding == UTF_8 || encoding == UTF_16LE || encoding == UTF_16BE,
            }),
            None => Err(format!("unknown encoding '{}'", label)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Encode text, prefixing the byte-order mark when configured.
    /// Characters the target cannot represent become numeric references.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        if self.encoding == UTF_16LE || self.encoding == UTF_16BE {
            let little_endian = self.encoding == UTF_16LE;
            let mut bytes = Vec::with_capacity(text.len() * 2 + 2);
            let units = std::iter::once(0xFEFF_u16).take(self.write_bom as usize).chain(text.encode_utf16());
            for unit in units {
                if little_endian {
                    bytes.extend_from_slice(&unit.to_le_bytes());
                } else {
                    bytes.extend_from_slice(&unit.to_be_bytes());
                }
            }
            return bytes;
        }

        let mut bytes = Vec::with_capacity(text.len() + 3);
        if self.write_bom && self.encoding == UTF_8 {
            bytes.extend_from_slice(&[0xEF, 0xBB, 0xBF]);
        }
        let (encoded, _, _) = self.encoding.encode(text);
        bytes.extend_from_slice(&encoded);
        bytes
    }
}

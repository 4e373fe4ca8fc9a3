/*!
 * EBU Tech 3264 subtitle file (.stl, binary) codec.
 *
 * Layout:
 * - a 1024 byte General Subtitle Information (GSI) block, ASCII fields,
 *   `CPN` code page at 0..3, disk format code (`STL25.01`/`STL30.01`) at
 *   3..11 and the TTI block count at 238..243;
 * - 128 byte Text and Timing Information (TTI) blocks: subtitle number,
 *   extension block number, time code in/out as `h m s f` bytes and a
 *   112 byte text field.
 *
 * Text uses the Latin teletext repertoire: ASCII plus ISO 6937 non-spacing
 * diacritic prefixes for accented letters. Italic and underline are the
 * 0x80..0x83 control codes, 0x8A breaks a line and 0x8F pads the field.
 */

use chrono::Local;
use log::{debug, warn};

use super::{CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::{self, TimeCode};

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "EBU STL",
    extension: ".stl",
    is_text_based: false,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

pub const GSI_SIZE: usize = 1024;
pub const TTI_SIZE: usize = 128;
const TEXT_FIELD_SIZE: usize = 112;

/// Code page written when none was requested
pub const DEFAULT_CODE_PAGE: u32 = 850;
const VALID_CODE_PAGES: [u32; 5] = [437, 850, 860, 863, 865];

const ITALIC_ON: u8 = 0x80;
const ITALIC_OFF: u8 = 0x81;
const UNDERLINE_ON: u8 = 0x82;
const UNDERLINE_OFF: u8 = 0x83;
const NEWLINE: u8 = 0x8A;
const FILLER: u8 = 0x8F;
const LAST_EXTENSION_BLOCK: u8 = 0xFF;

/// (composed, diacritic prefix, base letter)
const DIACRITICS: &[(char, u8, char)] = &[
    ('à', 0xC1, 'a'), ('è', 0xC1, 'e'), ('ì', 0xC1, 'i'), ('ò', 0xC1, 'o'), ('ù', 0xC1, 'u'),
    ('À', 0xC1, 'A'), ('È', 0xC1, 'E'), ('Ì', 0xC1, 'I'), ('Ò', 0xC1, 'O'), ('Ù', 0xC1, 'U'),
    ('á', 0xC2, 'a'), ('é', 0xC2, 'e'), ('í', 0xC2, 'i'), ('ó', 0xC2, 'o'), ('ú', 0xC2, 'u'),
    ('ý', 0xC2, 'y'), ('Á', 0xC2, 'A'), ('É', 0xC2, 'E'), ('Í', 0xC2, 'I'), ('Ó', 0xC2, 'O'),
    ('Ú', 0xC2, 'U'), ('Ý', 0xC2, 'Y'),
    ('â', 0xC3, 'a'), ('ê', 0xC3, 'e'), ('î', 0xC3, 'i'), ('ô', 0xC3, 'o'), ('û', 0xC3, 'u'),
    ('Â', 0xC3, 'A'), ('Ê', 0xC3, 'E'), ('Î', 0xC3, 'I'), ('Ô', 0xC3, 'O'), ('Û', 0xC3, 'U'),
    ('ã', 0xC4, 'a'), ('ñ', 0xC4, 'n'), ('õ', 0xC4, 'o'), ('Ã', 0xC4, 'A'), ('Ñ', 0xC4, 'N'),
    ('Õ', 0xC4, 'O'),
    ('ä', 0xC8, 'a'), ('ë', 0xC8, 'e'), ('ï', 0xC8, 'i'), ('ö', 0xC8, 'o'), ('ü', 0xC8, 'u'),
    ('ÿ', 0xC8, 'y'), ('Ä', 0xC8, 'A'), ('Ë', 0xC8, 'E'), ('Ï', 0xC8, 'I'), ('Ö', 0xC8, 'O'),
    ('Ü', 0xC8, 'U'),
    ('å', 0xCA, 'a'), ('Å', 0xCA, 'A'),
    ('ç', 0xCB, 'c'), ('Ç', 0xCB, 'C'),
];

const SHARP_S: u8 = 0xFB;

static STYLE_CODES: [(&str, u8); 4] = [
    ("<i>", ITALIC_ON),
    ("</i>", ITALIC_OFF),
    ("<u>", UNDERLINE_ON),
    ("</u>", UNDERLINE_OFF),
];

/// EBU STL codec
#[derive(Debug, Clone, Copy, Default)]
pub struct EbuStl;

impl EbuStl {
    /// Frame rate declared by a disk format code
    pub fn frame_rate_of(disk_format_code: &str) -> Option<f64> {
        match disk_format_code {
            "STL25.01" => Some(25.0),
            "STL30.01" => Some(30.0),
            _ => None,
        }
    }

    fn disk_format_code(fps: f64) -> (&'static str, f64) {
        if (fps - 30.0).abs() < 1.5 {
            ("STL30.01", 30.0)
        } else {
            ("STL25.01", 25.0)
        }
    }

    fn decode_time(bytes: &[u8], fps: f64) -> Result<TimeCode, SubtitleError> {
        let [h, m, s, f] = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if m >= 60 || s >= 60 || f64::from(f) >= fps.ceil() {
            return Err(SubtitleError::Parse(format!(
                "time code out of range: {:02}:{:02}:{:02}:{:02}",
                h, m, s, f
            )));
        }
        Ok(TimeCode::from_milliseconds(
            f64::from(h) * 3_600_000.0
                + f64::from(m) * 60_000.0
                + f64::from(s) * 1_000.0
                + timecode::frames_to_milliseconds(i64::from(f), fps),
        ))
    }

    fn encode_time(time: &TimeCode, fps: f64) -> [u8; 4] {
        let (h, m, s, f) = time.to_hms_frames(fps);
        [h.min(99) as u8, m as u8, s as u8, f as u8]
    }

    /// Text field bytes to markup
    pub fn decode_text(field: &[u8]) -> String {
        let mut text = String::new();
        let mut i = 0;
        while i < field.len() {
            let byte = field[i];
            match byte {
                FILLER => break,
                NEWLINE => {
                    if !text.ends_with('\n') {
                        text.push('\n');
                    }
                }
                ITALIC_ON => text.push_str("<i>"),
                ITALIC_OFF => text.push_str("</i>"),
                UNDERLINE_ON => text.push_str("<u>"),
                UNDERLINE_OFF => text.push_str("</u>"),
                SHARP_S => text.push('ß'),
                0xC1..=0xCF => {
                    let base = field.get(i + 1).map(|b| *b as char);
                    let composed = DIACRITICS
                        .iter()
                        .find(|(_, prefix, letter)| *prefix == byte && Some(*letter) == base)
                        .map(|(c, _, _)| *c);
                    match (composed, base) {
                        (Some(c), _) => text.push(c),
                        (None, Some(b)) if b.is_ascii_graphic() => text.push(b),
                        _ => {}
                    }
                    i += 1;
                }
                0x20..=0x7E => text.push(byte as char),
                // Teletext spacing attributes (colour, double height, boxing)
                _ => {}
            }
            i += 1;
        }
        let lines: Vec<&str> = text.split('\n').map(str::trim).filter(|l| !l.is_empty()).collect();
        lines.join("\n")
    }

    /// Markup to text field bytes, without padding
    pub fn encode_text(text: &str) -> Vec<u8> {
        let text = formatting::normalize_style_tags(text);
        let text = text.replace("<b>", "").replace("</b>", "");
        let mut bytes = Vec::with_capacity(text.len());
        let mut rest = text.as_str();
        while let Some(c) = rest.chars().next() {
            let control = STYLE_CODES.iter().find(|(tag, _)| rest.starts_with(tag));
            if let Some((tag, code)) = control {
                bytes.push(*code);
                rest = &rest[tag.len()..];
                continue;
            }
            match c {
                '\n' => bytes.push(NEWLINE),
                ' '..='~' => bytes.push(c as u8),
                'ß' => bytes.push(SHARP_S),
                _ => match DIACRITICS.iter().find(|(composed, _, _)| *composed == c) {
                    Some((_, prefix, base)) => {
                        bytes.push(*prefix);
                        bytes.push(*base as u8);
                    }
                    None => bytes.push(b'?'),
                },
            }
            rest = &rest[c.len_utf8()..];
        }
        bytes
    }

    pub fn parse_bytes(bytes: &[u8]) -> DecodeOutcome {
        if bytes.len() < GSI_SIZE + TTI_SIZE {
            return DecodeOutcome::default();
        }
        let dfc = String::from_utf8_lossy(&bytes[3..11]);
        let Some(fps) = Self::frame_rate_of(&dfc) else {
            return DecodeOutcome::default();
        };

        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let mut pending: Option<(Result<(TimeCode, TimeCode), SubtitleError>, Vec<u8>)> = None;

        for block in bytes[GSI_SIZE..].chunks_exact(TTI_SIZE) {
            let extension_block = block[3];
            let comment = block[15] == 1;
            if comment {
                continue;
            }
            let (_, text) = pending.get_or_insert_with(|| {
                let times = Self::decode_time(&block[5..9], fps)
                    .and_then(|start| Self::decode_time(&block[9..13], fps).map(|end| (start, end)));
                (times, Vec::new())
            });
            text.extend(block[16..].iter().take_while(|b| **b != FILLER));

            if extension_block == LAST_EXTENSION_BLOCK {
                if let Some((times, text)) = pending.take() {
                    match times {
                        Ok((start, end)) => {
                            paragraphs.push(Paragraph::new(start, end, Self::decode_text(&text)));
                        }
                        Err(e) => {
                            debug!("Skipping EBU STL block: {}", e);
                            error_count += 1;
                        }
                    }
                }
            }
        }
        if pending.is_some() {
            // Extension chain never terminated
            error_count += 1;
        }
        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }

    fn gsi_block(subtitle: &Subtitle, ctx: &CodecContext, block_count: usize, dfc: &str) -> Vec<u8> {
        let mut gsi = vec![b' '; GSI_SIZE];
        let mut put = |offset: usize, width: usize, value: &str| {
            for (i, b) in value.bytes().filter(u8::is_ascii).take(width).enumerate() {
                gsi[offset + i] = b;
            }
        };

        let code_page = match ctx.options.code_page {
            Some(cp) if VALID_CODE_PAGES.contains(&cp) => cp,
            Some(cp) => {
                warn!("Unsupported EBU STL code page {}, using {}", cp, DEFAULT_CODE_PAGE);
                DEFAULT_CODE_PAGE
            }
            None => DEFAULT_CODE_PAGE,
        };
        let today = Local::now().format("%y%m%d").to_string();

        put(0, 3, &format!("{:03}", code_page));
        put(3, 8, dfc);
        put(11, 1, "0");
        put(12, 2, "00");
        put(14, 2, "09");
        put(16, 32, &ctx.title);
        put(48, 32, &ctx.title);
        put(224, 6, &today);
        put(230, 6, &today);
        put(236, 2, "00");
        put(238, 5, &format!("{:05}", block_count.min(99_999)));
        put(243, 5, &format!("{:05}", subtitle.paragraphs.len().min(99_999)));
        put(248, 3, "001");
        put(251, 2, "40");
        put(253, 2, "23");
        put(255, 1, "1");
        put(256, 8, "00000000");
        put(264, 8, "00000000");
        put(272, 1, "1");
        put(273, 1, "1");
        gsi
    }
}

impl SubtitleFormat for EbuStl {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_bytes(source.bytes())
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let (dfc, fps) = Self::disk_format_code(ctx.frame_rate);
        let mut blocks = Vec::new();

        for (index, p) in subtitle.paragraphs.iter().enumerate() {
            let number = u16::try_from(index + 1)
                .map_err(|_| SubtitleError::Encode("more than 65535 subtitles".to_string()))?;
            let text = Self::encode_text(&p.text);
            let chunks: Vec<&[u8]> = if text.is_empty() {
                vec![&[][..]]
            } else {
                text.chunks(TEXT_FIELD_SIZE).collect()
            };
            for (chunk_index, chunk) in chunks.iter().enumerate() {
                let mut tti = [0u8; TTI_SIZE];
                tti[0] = 0;
                tti[1..3].copy_from_slice(&number.to_le_bytes());
                tti[3] = if chunk_index + 1 == chunks.len() {
                    LAST_EXTENSION_BLOCK
                } else {
                    u8::try_from(chunk_index).unwrap_or(0xFE)
                };
                tti[4] = 0;
                tti[5..9].copy_from_slice(&Self::encode_time(&p.start_time, fps));
                tti[9..13].copy_from_slice(&Self::encode_time(&p.end_time, fps));
                tti[13] = 20;
                tti[14] = 2;
                tti[15] = 0;
                tti[16..].fill(FILLER);
                tti[16..16 + chunk.len()].copy_from_slice(chunk);
                blocks.push(tti);
            }
        }

        let mut bytes = Self::gsi_block(subtitle, ctx, blocks.len(), dfc);
        for block in &blocks {
            bytes.extend_from_slice(block);
        }
        Ok(EncodedOutput::Binary(bytes))
    }
}

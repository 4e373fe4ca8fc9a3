use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

// @module: MicroDVD (.sub) codec, frame based: {start}{end}text|second line

static LINE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{(\d+)\}\{(\d*)\}(.*)$").unwrap());

/// `{y:i}` applies to one line, `{Y:i}` to the rest of the paragraph
static STYLE_PREFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{([yY]):([ibuIBU]+)\}").unwrap());

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "MicroDVD",
    extension: ".sub",
    is_text_based: true,
    is_frame_based: true,
    is_time_based: false,
    utf8_without_bom: false,
};

/// MicroDVD codec
#[derive(Debug, Clone, Copy, Default)]
pub struct MicroDvd;

impl MicroDvd {
    fn decode_text(raw: &str) -> String {
        let mut paragraph_styles = String::new();
        let mut lines = Vec::new();
        for part in raw.split('|') {
            let mut styles = paragraph_styles.clone();
            let mut text = part;
            if let Some(caps) = STYLE_PREFIX_REGEX.captures(part) {
                let found = caps[2].to_ascii_lowercase();
                if &caps[1] == "Y" {
                    paragraph_styles = found.clone();
                }
                styles = found;
                text = &part[caps[0].len()..];
            }
            let mut line = text.to_string();
            for style in styles.chars().rev() {
                line = format!("<{}>{}</{}>", style, line, style);
            }
            lines.push(line);
        }
        lines.join("\n")
    }

    fn encode_text(text: &str) -> String {
        formatting::normalize_style_tags(text)
            .split('\n')
            .map(|line| {
                let mut prefix = String::new();
                let mut inner = line;
                for style in ["i", "b", "u"] {
                    let open = format!("<{}>", style);
                    let close = format!("</{}>", style);
                    if inner.starts_with(&open)
                        && inner.ends_with(&close)
                        && formatting::count_tag(inner, &open) == 1
                    {
                        inner = &inner[open.len()..inner.len() - close.len()];
                        prefix.push_str(style);
                    }
                }
                let inner = formatting::remove_html_tags(inner);
                if prefix.is_empty() {
                    inner
                } else {
                    format!("{{y:{}}}{}", prefix, inner)
                }
            })
            .collect::<Vec<_>>()
            .join("|")
    }

    pub fn parse_str(content: &str, fps: f64) -> DecodeOutcome {
        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let mut fps = fps;

        for (index, line) in split_lines(content).enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(caps) = LINE_REGEX.captures(line) else {
                error_count += 1;
                continue;
            };
            let (Ok(start_frame), end_frame) = (caps[1].parse::<i64>(), caps[2].parse::<i64>()) else {
                error_count += 1;
                continue;
            };

            // {1}{1}23.976 declares the frame rate
            if paragraphs.is_empty() && start_frame == 1 && end_frame == Ok(1) {
                if let Ok(declared) = caps[3].trim().replace(',', ".").parse::<f64>() {
                    if declared > 0.0 && declared.is_finite() {
                        debug!("MicroDVD frame rate declared on line {}: {}", index + 1, declared);
                        fps = declared;
                        continue;
                    }
                }
            }

            // An empty end frame lasts one second
            let end_frame = end_frame.unwrap_or(start_frame.saturating_add(fps.round() as i64));
            let mut p = Paragraph::new(
                TimeCode::from_frames(start_frame, fps),
                TimeCode::from_frames(end_frame, fps),
                Self::decode_text(&caps[3]),
            );
            p.start_frame = Some(start_frame);
            p.end_frame = Some(end_frame);
            paragraphs.push(p);
        }

        let mut subtitle = Subtitle::from_paragraphs(paragraphs);
        subtitle.was_loaded_with_frame_numbers = true;
        DecodeOutcome::new(subtitle, error_count)
    }
}

impl SubtitleFormat for MicroDvd {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text(), ctx.frame_rate)
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let mut out = String::new();
        for p in &subtitle.paragraphs {
            let start = p.start_frame.unwrap_or_else(|| p.start_time.to_frames(ctx.frame_rate));
            let end = p.end_frame.unwrap_or_else(|| p.end_time.to_frames(ctx.frame_rate));
            out.push_str(&format!("{{{}}}{{{}}}{}\n", start, end, Self::encode_text(&p.text)));
        }
        Ok(EncodedOutput::Text(out))
    }
}

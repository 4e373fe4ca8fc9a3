/*!
 * Timed Text (TTML, .xml) codec.
 *
 * Paragraphs are the `<p>` elements of the document body. Times may be
 * clock values (`00:00:01.500`), frame values (`00:00:01:12`, read at the
 * file's frame rate) or offsets (`1.5s`, `1500ms`). Consumers of this
 * format reject a byte-order mark, so it is always written as plain UTF-8.
 */

use log::debug;

use super::{
    xml_content_to_markup, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent,
    SubtitleFormat,
};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Timed Text",
    extension: ".xml",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: true,
};

const TTML_NAMESPACE: &str = "http://www.w3.org/ns/ttml";

/// Timed Text codec
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedText;

impl TimedText {
    /// Parse a TTML time expression
    pub fn parse_time(value: &str, fps: f64) -> Result<TimeCode, SubtitleError> {
        let value = value.trim();
        let invalid = || SubtitleError::Parse(format!("invalid TTML time '{}'", value));

        if value.contains(':') {
            let parts: Vec<&str> = value.split([':', '.', ',']).collect();
            return match parts.as_slice() {
                [h, m, s] => TimeCode::from_timestamp_tokens(h, m, s, "0"),
                [h, m, s, fraction] if value.contains('.') || value.contains(',') => {
                    TimeCode::from_timestamp_tokens(h, m, s, fraction)
                }
                [h, m, s, frames] => TimeCode::from_frame_tokens(h, m, s, frames, fps),
                _ => Err(invalid()),
            };
        }

        let (number, unit_ms) = if let Some(n) = value.strip_suffix("ms") {
            (n, 1.0)
        } else if let Some(n) = value.strip_suffix('s') {
            (n, 1000.0)
        } else if let Some(n) = value.strip_suffix('m') {
            (n, 60_000.0)
        } else if let Some(n) = value.strip_suffix('h') {
            (n, 3_600_000.0)
        } else if let Some(n) = value.strip_suffix('f') {
            (n, 1000.0 / fps)
        } else {
            return Err(invalid());
        };
        let number: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !number.is_finite() {
            return Err(invalid());
        }
        Ok(TimeCode::from_milliseconds(number * unit_ms))
    }

    pub fn parse_str(content: &str, fps: f64) -> DecodeOutcome {
        if !content.contains("<tt") {
            return DecodeOutcome::default();
        }
        let document = match roxmltree::Document::parse(content) {
            Ok(document) => document,
            Err(e) => {
                debug!("Timed Text XML rejected: {}", e);
                return DecodeOutcome::new(Subtitle::new(), 1);
            }
        };
        let root = document.root_element();
        if root.tag_name().name() != "tt" {
            return DecodeOutcome::default();
        }

        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        for node in root
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "p")
        {
            match parse_paragraph(node, fps) {
                Ok(p) => paragraphs.push(p),
                Err(e) => {
                    debug!("Skipping Timed Text paragraph: {}", e);
                    error_count += 1;
                }
            }
        }
        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }
}

fn attribute<'a>(node: roxmltree::Node<'a, '_>, local_name: &str) -> Option<&'a str> {
    node.attributes()
        .find(|a| a.name() == local_name)
        .map(|a| a.value())
}

fn parse_paragraph(node: roxmltree::Node, fps: f64) -> Result<Paragraph, SubtitleError> {
    let begin = attribute(node, "begin").ok_or_else(|| SubtitleError::Parse("missing begin".to_string()))?;
    let start = TimedText::parse_time(begin, fps)?;
    let end = match (attribute(node, "end"), attribute(node, "dur")) {
        (Some(end), _) => TimedText::parse_time(end, fps)?,
        (None, Some(dur)) => start + TimedText::parse_time(dur, fps)?,
        (None, None) => return Err(SubtitleError::Parse("missing end".to_string())),
    };
    let text = xml_content_to_markup(node, &span_style);
    Ok(Paragraph::new(start, end, text))
}

fn span_style(node: roxmltree::Node) -> Option<&'static str> {
    if attribute(node, "fontStyle") == Some("italic") {
        Some("i")
    } else if attribute(node, "fontWeight") == Some("bold") {
        Some("b")
    } else if attribute(node, "textDecoration") == Some("underline") {
        Some("u")
    } else {
        None
    }
}

fn open_span(tag: &str) -> String {
    match tag {
        "i" => "<span tts:fontStyle=\"italic\">".to_string(),
        "b" => "<span tts:fontWeight=\"bold\">".to_string(),
        _ => "<span tts:textDecoration=\"underline\">".to_string(),
    }
}

impl SubtitleFormat for TimedText {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text(), ctx.frame_rate)
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n");
        out.push_str(&format!(
            "<tt xmlns=\"{}\" xmlns:tts=\"{}#styling\" xmlns:ttm=\"{}#metadata\" xml:lang=\"en\">\n",
            TTML_NAMESPACE, TTML_NAMESPACE, TTML_NAMESPACE
        ));
        out.push_str("  <head>\n    <metadata>\n");
        out.push_str(&format!("      <ttm:title>{}</ttm:title>\n", formatting::xml_escape(&ctx.title)));
        out.push_str("    </metadata>\n  </head>\n  <body>\n    <div>\n");
        for p in &subtitle.paragraphs {
            let text = formatting::markup_to_xml(&p.text, open_span, |_| "</span>".to_string());
            out.push_str(&format!(
                "      <p begin=\"{}\" end=\"{}\">{}</p>\n",
                p.start_time.to_display_string_dot(),
                p.end_time.to_display_string_dot(),
                text
            ));
        }
        out.push_str("    </div>\n  </body>\n</tt>\n");
        Ok(EncodedOutput::Text(out))
    }
}

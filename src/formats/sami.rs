/*!
 * SAMI (.smi) codec.
 *
 * A SAMI document is an HTML-like file: a `<HEAD>` with a `<STYLE>` block
 * declaring `.CLASS { ... }` selectors, then `<SYNC Start=ms>` blocks in the
 * body. A paragraph lasts until the next `<SYNC>`; a block holding only
 * `&nbsp;` clears the screen.
 *
 * The class attribute of `<P>` is kept in `Paragraph::extra` (several classes
 * separated by whitespace), which is what drives per-class output splitting.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use super::{CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "SAMI",
    extension: ".smi",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

static SYNC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<sync\b([^>]*)>").unwrap());

static START_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)start\s*=\s*"?\s*(-?\d+)"#).unwrap());

static CLASS_ATTR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<p\b[^>]*?class\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap());

static CLASS_SELECTOR_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.([A-Za-z0-9_-]+)\s*\{").unwrap());

static BREAK_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Tags other than the basic style markup
static FOREIGN_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</?(?:p|span|font|sync|body|sami)\b[^>]*>").unwrap());

static BODY_END_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</body>").unwrap());

/// Display time given to a final paragraph that is never cleared
const LAST_PARAGRAPH_MS: f64 = 2500.0;

const DEFAULT_CLASS: &str = "ENUSCC";

fn default_header(title: &str) -> String {
    format!(
        "<SAMI>\n\
         <HEAD>\n\
         <TITLE>{}</TITLE>\n\
         <STYLE TYPE=\"text/css\">\n\
         <!--\n\
         P {{ font-family: Arial; font-weight: normal; color: white; background-color: black; text-align: center; }}\n\
         .{} {{ name: English; lang: en-US; SAMIType: CC; }}\n\
         -->\n\
         </STYLE>\n\
         </HEAD>\n\
         <BODY>\n",
        formatting::xml_escape(title),
        DEFAULT_CLASS
    )
}

/// SAMI codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Sami;

impl Sami {
    /// Class names declared by `.NAME {` selectors in a header
    pub fn classes_from_header(header: &str) -> Vec<String> {
        let mut classes: Vec<String> = Vec::new();
        for caps in CLASS_SELECTOR_REGEX.captures_iter(header) {
            let name = caps[1].to_string();
            if !classes.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
                classes.push(name);
            }
        }
        classes
    }

    pub fn parse_str(content: &str) -> DecodeOutcome {
        let syncs: Vec<regex::Captures> = SYNC_REGEX.captures_iter(content).collect();
        if syncs.is_empty() {
            return DecodeOutcome::default();
        }

        let mut error_count = 0;
        let body_end = BODY_END_REGEX
            .find(content)
            .map(|m| m.start())
            .unwrap_or(content.len());

        // (start, class, text); an empty text clears the screen
        let mut blocks: Vec<(f64, Option<String>, String)> = Vec::new();
        for (i, caps) in syncs.iter().enumerate() {
            let Some(whole) = caps.get(0) else { continue };
            let Some(start) = START_ATTR_REGEX
                .captures(&caps[1])
                .and_then(|c| c[1].parse::<i64>().ok())
            else {
                debug!("SAMI sync without a start time: {}", whole.as_str());
                error_count += 1;
                continue;
            };
            let block_end = syncs
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(body_end)
                .max(whole.end());
            let raw = &content[whole.end()..block_end];
            let class = CLASS_ATTR_REGEX.captures(raw).and_then(|c| {
                c.get(1)
                    .or_else(|| c.get(2))
                    .or_else(|| c.get(3))
                    .map(|m| m.as_str().trim().to_string())
            });
            blocks.push((start as f64, class.filter(|c| !c.is_empty()), clean_text(raw)));
        }

        let mut paragraphs = Vec::new();
        for (i, (start, class, text)) in blocks.iter().enumerate() {
            if text.is_empty() {
                continue;
            }
            let end = blocks
                .get(i + 1)
                .map(|(next_start, _, _)| *next_start)
                .unwrap_or(start + LAST_PARAGRAPH_MS);
            let mut p = Paragraph::new(
                TimeCode::from_milliseconds(*start),
                TimeCode::from_milliseconds(end),
                text.clone(),
            );
            p.extra = class.clone();
            paragraphs.push(p);
        }

        let mut subtitle = Subtitle::from_paragraphs(paragraphs);
        if let Some(first) = syncs.first().and_then(|c| c.get(0)) {
            let header = &content[..first.start()];
            if !header.trim().is_empty() {
                subtitle.header = Some(header.to_string());
            }
        }
        DecodeOutcome::new(subtitle, error_count)
    }
}

fn clean_text(raw: &str) -> String {
    let text = BREAK_REGEX.replace_all(raw, "\n");
    let text = FOREIGN_TAG_REGEX.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&");
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    formatting::normalize_style_tags(&lines.join("\n"))
}

fn is_own_header(header: &str) -> bool {
    header.to_ascii_lowercase().contains("<sami")
}

impl SubtitleFormat for Sami {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text())
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let own_header = subtitle.header.as_deref().filter(|h| is_own_header(h));
        let mut out = match own_header {
            Some(header) => header.to_string(),
            None => default_header(&ctx.title),
        };
        if !out.ends_with('\n') {
            out.push('\n');
        }

        for (i, p) in subtitle.paragraphs.iter().enumerate() {
            let class = match (own_header, p.extra.as_deref()) {
                (Some(_), Some(extra)) if !extra.trim().is_empty() => extra.trim(),
                _ => DEFAULT_CLASS,
            };
            let class_attr = if class.contains(char::is_whitespace) {
                format!("\"{}\"", class)
            } else {
                class.to_string()
            };
            let start = p.start_time.total_milliseconds().round() as i64;
            let end = p.end_time.total_milliseconds().round() as i64;
            out.push_str(&format!(
                "<SYNC Start={}><P Class={}>{}</P></SYNC>\n",
                start,
                class_attr,
                p.text.replace('\n', "<br>")
            ));
            let next_start = subtitle
                .paragraphs
                .get(i + 1)
                .map(|next| next.start_time.total_milliseconds().round() as i64);
            if next_start.is_none_or(|next| next > end) {
                out.push_str(&format!(
                    "<SYNC Start={}><P Class={}>&nbsp;</P></SYNC>\n",
                    end, class_attr
                ));
            }
        }
        out.push_str("</BODY>\n</SAMI>\n");
        Ok(EncodedOutput::Text(out))
    }

    fn style_classes(&self, subtitle: &Subtitle) -> Vec<String> {
        subtitle
            .header
            .as_deref()
            .map(Self::classes_from_header)
            .unwrap_or_default()
    }
}

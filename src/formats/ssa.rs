/*!
 * Advanced Sub Station Alpha (.ass) codec.
 *
 * Reads both the v4+ (ASS) and v4 (SSA) dialects: event fields are located
 * through the `Format:` line of the `[Events]` section. Basic `{\i1}`-style
 * toggles become markup and `\N` becomes a line break. Any other override
 * block (`{\an8}`, `{\pos(..)}`) is native formatting and is kept verbatim
 * until `remove_native_formatting` strips it.
 */

use log::debug;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Advanced Sub Station Alpha",
    extension: ".ass",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

const DEFAULT_EVENT_FORMAT: &str = "Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text";

const DEFAULT_STYLE: &str = "Default";

/// Script header used when the subtitle carries none of its own
pub fn default_header(title: &str) -> String {
    format!(
        "[Script Info]\n\
         ; Written by subconv\n\
         Title: {}\n\
         ScriptType: v4.00+\n\
         PlayResX: 384\n\
         PlayResY: 288\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Default,Arial,20,&H00FFFFFF,&H0300FFFF,&H00000000,&H02000000,0,0,0,0,100,100,0,0,1,2,1,2,10,10,10,1\n",
        title
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Other,
    Events,
}

/// Field positions taken from an `[Events]` `Format:` line
#[derive(Debug, Clone)]
struct EventLayout {
    field_count: usize,
    start: usize,
    end: usize,
    style: Option<usize>,
    text: usize,
}

impl EventLayout {
    fn parse(format_line: &str) -> Option<Self> {
        let fields: Vec<String> = format_line
            .split(',')
            .map(|f| f.trim().to_ascii_lowercase())
            .collect();
        let position = |name: &str| fields.iter().position(|f| f == name);
        Some(EventLayout {
            field_count: fields.len(),
            start: position("start")?,
            end: position("end")?,
            style: position("style"),
            text: position("text")?,
        })
    }
}

/// Advanced Sub Station Alpha codec
#[derive(Debug, Clone, Copy, Default)]
pub struct AdvancedSubStationAlpha;

impl AdvancedSubStationAlpha {
    /// Parse `h:mm:ss.cc`
    pub fn parse_time(value: &str) -> Result<TimeCode, SubtitleError> {
        let parts: Vec<&str> = value.trim().split([':', '.']).collect();
        if parts.len() != 4 {
            return Err(SubtitleError::Parse(format!("invalid ASS time '{}'", value)));
        }
        TimeCode::from_timestamp_tokens(parts[0], parts[1], parts[2], parts[3])
    }

    /// Format as `h:mm:ss.cc`, rounding to the nearest centisecond
    pub fn format_time(time: &TimeCode) -> String {
        let centis = (time.total_milliseconds().max(0.0) / 10.0).round() as u64;
        let (h, m, s, cs) = (centis / 360_000, (centis / 6_000) % 60, (centis / 100) % 60, centis % 100);
        format!("{}:{:02}:{:02}.{:02}", h, m, s, cs)
    }

    /// Parse a complete script
    pub fn parse_str(content: &str) -> DecodeOutcome {
        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let mut header = String::new();
        let mut section = Section::Preamble;
        let mut layout = EventLayout::parse(DEFAULT_EVENT_FORMAT);

        for line in split_lines(content) {
            let trimmed = line.trim();
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                section = if trimmed.eq_ignore_ascii_case("[events]") {
                    Section::Events
                } else {
                    Section::Other
                };
                if section != Section::Events {
                    header.push_str(trimmed);
                    header.push('\n');
                }
                continue;
            }

            if section != Section::Events {
                if section == Section::Other {
                    header.push_str(line);
                    header.push('\n');
                }
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with(';') || starts_with_key(trimmed, "comment:") {
                continue;
            }
            if let Some(rest) = strip_key(trimmed, "format:") {
                layout = EventLayout::parse(rest);
                continue;
            }
            let Some(rest) = strip_key(trimmed, "dialogue:") else {
                error_count += 1;
                continue;
            };
            let Some(layout) = layout.as_ref() else {
                error_count += 1;
                continue;
            };
            match parse_dialogue(rest, layout) {
                Ok(p) => paragraphs.push(p),
                Err(e) => {
                    debug!("Skipping ASS event: {}", e);
                    error_count += 1;
                }
            }
        }

        let mut subtitle = Subtitle::from_paragraphs(paragraphs);
        if !header.trim().is_empty() {
            subtitle.header = Some(header);
        }
        DecodeOutcome::new(subtitle, error_count)
    }
}

fn starts_with_key(line: &str, key: &str) -> bool {
    line.get(..key.len()).is_some_and(|head| head.eq_ignore_ascii_case(key))
}

fn strip_key<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    if starts_with_key(line, key) {
        line.get(key.len()..)
    } else {
        None
    }
}

fn parse_dialogue(rest: &str, layout: &EventLayout) -> Result<Paragraph, SubtitleError> {
    let fields: Vec<&str> = rest.splitn(layout.field_count, ',').collect();
    if fields.len() != layout.field_count {
        return Err(SubtitleError::Parse(format!("expected {} fields", layout.field_count)));
    }
    let start = AdvancedSubStationAlpha::parse_time(fields[layout.start])?;
    let end = AdvancedSubStationAlpha::parse_time(fields[layout.end])?;
    let text = fields[layout.text]
        .replace("\\N", "\n")
        .replace("\\n", "\n")
        .replace("\\h", " ");
    let mut paragraph = Paragraph::new(start, end, formatting::ass_toggles_to_markup(&text));
    if let Some(style) = layout.style.map(|i| fields[i].trim()).filter(|s| !s.is_empty()) {
        paragraph.extra = Some(style.to_string());
    }
    Ok(paragraph)
}

impl SubtitleFormat for AdvancedSubStationAlpha {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text())
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        // Styles only resolve against a script header of our own dialect
        let own_header = subtitle
            .header
            .as_deref()
            .filter(|h| h.contains("[V4+ Styles]"));
        let mut out = match own_header {
            Some(header) => header.trim_end().to_string() + "\n",
            None => default_header(&ctx.title),
        };
        out.push_str("\n[Events]\n");
        out.push_str(&format!("Format: {}\n", DEFAULT_EVENT_FORMAT));
        for p in &subtitle.paragraphs {
            let style = if own_header.is_some() {
                p.extra.as_deref().unwrap_or(DEFAULT_STYLE)
            } else {
                DEFAULT_STYLE
            };
            let text = formatting::markup_to_ass_toggles(&p.text).replace('\n', "\\N");
            out.push_str(&format!(
                "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
                Self::format_time(&p.start_time),
                Self::format_time(&p.end_time),
                style,
                text
            ));
        }
        Ok(EncodedOutput::Text(out))
    }

    fn remove_native_formatting(&self, subtitle: &mut Subtitle, target: &FormatDescriptor) {
        if target.name == DESCRIPTOR.name {
            return;
        }
        for p in &mut subtitle.paragraphs {
            p.text = formatting::remove_ass_override_tags(&p.text);
        }
    }
}

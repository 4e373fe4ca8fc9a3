/*!
 * Spruce Subtitle File (.stl) codec.
 *
 * Plain text lines of `hh:mm:ss:ff,hh:mm:ss:ff,text` at a fixed 25 fps,
 * preceded by a `$Key = value` / `//comment` style header. `|` breaks a line
 * and `^B`, `^I`, `^U` toggle bold, italic and underline.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

/// Spruce always runs at PAL rate, whatever the file's frame rate
pub const SPRUCE_FRAME_RATE: f64 = 25.0;

static LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{2}:[0-9]{2}:[0-9]{2}:[0-9]{2},.+").unwrap());

// Files named *.stl may carry empty captions
static LINE_REGEX_EMPTY_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{2}:[0-9]{2}:[0-9]{2}:[0-9]{2},[0-9]{2}:[0-9]{2}:[0-9]{2}:[0-9]{2},").unwrap());

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Spruce Subtitle File",
    extension: ".stl",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

const HEADER: &str = "//Font select and font size
$FontName       = Arial
$FontSize       = 30

//Character attributes (global)
$Bold           = FALSE
$UnderLined     = FALSE
$Italic         = FALSE

//Position Control
$HorzAlign      = Center
$VertAlign      = Bottom
$XOffset        = 0
$YOffset        = 0

//Contrast Control
$TextContrast           = 15
$Outline1Contrast       = 8
$Outline2Contrast       = 15
$BackgroundContrast     = 0

//Effects Control
$ForceDisplay   = FALSE
$FadeIn         = 0
$FadeOut        = 0

//Other Controls
$TapeOffset          = FALSE
//$SetFilePathToken  = <<:>>

//Colors
$ColorIndex1    = 0
$ColorIndex2    = 1
$ColorIndex3    = 2
$ColorIndex4    = 3

//Subtitles
";

/// Spruce codec
#[derive(Debug, Clone, Copy, Default)]
pub struct Spruce;

impl Spruce {
    fn decode_time(time: &str) -> Result<TimeCode, SubtitleError> {
        let tokens: Vec<&str> = time.split(':').collect();
        match tokens.as_slice() {
            [h, m, s, f] => TimeCode::from_frame_tokens(h, m, s, f, SPRUCE_FRAME_RATE),
            _ => Err(SubtitleError::Parse(format!("invalid Spruce time '{}'", time))),
        }
    }

    fn decode_text(text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut open = [false; 3];
        let mut rest = text;
        while let Some(pos) = rest.find(['^', '|']) {
            result.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if let Some(after) = tail.strip_prefix('|') {
                result.push('\n');
                rest = after;
                continue;
            }
            let index = match tail.as_bytes().get(1) {
                Some(b'B') => Some(0),
                Some(b'I') => Some(1),
                Some(b'U') => Some(2),
                _ => None,
            };
            match index {
                Some(i) => {
                    let tag = ["b", "i", "u"][i];
                    result.push_str(&if open[i] { format!("</{}>", tag) } else { format!("<{}>", tag) });
                    open[i] = !open[i];
                    rest = &tail[2..];
                }
                None => {
                    result.push('^');
                    rest = &tail[1..];
                }
            }
        }
        result.push_str(rest);
        formatting::close_open_tags(&result)
    }

    fn encode_text(text: &str) -> String {
        formatting::normalize_style_tags(text)
            .replace("<b>", "^B")
            .replace("</b>", "^B")
            .replace("<i>", "^I")
            .replace("</i>", "^I")
            .replace("<u>", "^U")
            .replace("</u>", "^U")
            .replace('\n', "|")
    }

    pub fn parse_lines<'a>(lines: impl Iterator<Item = &'a str>, allow_empty_text: bool) -> DecodeOutcome {
        let regex = if allow_empty_text {
            &LINE_REGEX_EMPTY_TEXT
        } else {
            &LINE_REGEX
        };
        let mut paragraphs = Vec::new();
        let mut error_count = 0;

        for line in lines {
            if line.find(':') == Some(2) && regex.is_match(line) {
                let parsed = Self::decode_time(&line[0..11])
                    .and_then(|start| Self::decode_time(&line[12..23]).map(|end| (start, end)));
                match parsed {
                    Ok((start, end)) => {
                        paragraphs.push(Paragraph::new(start, end, Self::decode_text(&line[24..])));
                    }
                    Err(e) => {
                        debug!("Skipping Spruce line: {}", e);
                        error_count += 1;
                    }
                }
            } else if !line.trim().is_empty() && !line.starts_with("//") && !line.starts_with('$') {
                error_count += 1;
            }
        }
        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }
}

impl SubtitleFormat for Spruce {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        let text = source.text();
        Self::parse_lines(split_lines(&text), source.has_extension(DESCRIPTOR.extension))
    }

    fn encode(&self, subtitle: &Subtitle, _ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let mut out = String::from(HEADER);
        for p in &subtitle.paragraphs {
            out.push_str(&format!(
                "{},{},{}\n",
                p.start_time.to_hhmmssff(SPRUCE_FRAME_RATE),
                p.end_time.to_hhmmssff(SPRUCE_FRAME_RATE),
                Self::encode_text(&p.text)
            ));
        }
        Ok(EncodedOutput::Text(out))
    }
}

use once_cell::sync::Lazy;
use regex::Regex;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

// @module: SubViewer 2.0 (.sub) codec
//
// 00:00:06.61,00:00:13.75
// text1[br]text2

static TIME_CODES_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d\d:\d\d:\d\d.\d+,\d\d:\d\d:\d\d.\d+$").unwrap());

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "SubViewer 2.0",
    extension: ".sub",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

// Markup <-> SubViewer style toggles; the bare `{\i}` form also closes
const TAG_MAP: [(&str, &str); 6] = [
    ("<i>", "{\\i1}"),
    ("</i>", "{\\i0}"),
    ("<b>", "{\\b1}"),
    ("</b>", "{\\b0}"),
    ("<u>", "{\\u1}"),
    ("</u>", "{\\u0}"),
];

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expecting {
    TimeCodes,
    Text,
}

/// SubViewer 2.0 codec
#[derive(Debug, Clone, Copy, Default)]
pub struct SubViewer20;

impl SubViewer20 {
    fn header(title: &str) -> String {
        format!(
            "[INFORMATION]\n\
             [TITLE]{}\n\
             [AUTHOR]\n\
             [SOURCE]\n\
             [PRG]\n\
             [FILEPATH]\n\
             [DELAY]0\n\
             [CD TRACK]0\n\
             [COMMENT]\n\
             [END INFORMATION]\n\
             [SUBTITLE]\n\
             [COLF]&H000000,[STYLE]bd,[SIZE]25,[FONT]Arial\n",
            title
        )
    }

    /// `hh:mm:ss.cc`, carrying a rounded-up centisecond into the seconds
    fn format_time(time: &TimeCode) -> String {
        let centis = (time.total_milliseconds().max(0.0) / 10.0).round() as u64;
        format!(
            "{:02}:{:02}:{:02}.{:02}",
            centis / 360_000,
            (centis / 6_000) % 60,
            (centis / 100) % 60,
            centis % 100
        )
    }

    fn decode_text(line: &str) -> String {
        let mut text = line.replace("[br]", "\n");
        for (markup, native) in TAG_MAP {
            text = text.replace(native, markup);
        }
        text.replace("{\\i}", "</i>")
            .replace("{\\b}", "</b>")
            .replace("{\\u}", "</u>")
    }

    fn encode_text(text: &str) -> String {
        let mut text = crate::formatting::normalize_style_tags(text).replace('\n', "[br]");
        for (markup, native) in TAG_MAP {
            text = text.replace(markup, native);
        }
        text
    }

    pub fn parse_str(content: &str) -> DecodeOutcome {
        let mut paragraphs = Vec::new();
        let mut expecting = Expecting::TimeCodes;
        let mut times: Option<(TimeCode, TimeCode)> = None;

        for line in split_lines(content) {
            if TIME_CODES_REGEX.is_match(line) {
                let parts: Vec<&str> = line.split([':', ',', '.']).filter(|p| !p.is_empty()).collect();
                if parts.len() == 8 {
                    let start = TimeCode::from_timestamp_tokens(parts[0], parts[1], parts[2], parts[3]);
                    let end = TimeCode::from_timestamp_tokens(parts[4], parts[5], parts[6], parts[7]);
                    if let (Ok(start), Ok(end)) = (start, end) {
                        times = Some((start, end));
                        expecting = Expecting::Text;
                    }
                }
            } else if expecting == Expecting::Text && !line.is_empty() {
                if let Some((start, end)) = times.take() {
                    paragraphs.push(Paragraph::new(start, end, Self::decode_text(line)));
                }
                expecting = Expecting::TimeCodes;
            }
        }

        // Unparseable lines are skipped silently; the error tally stays zero
        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), 0)
    }
}

impl SubtitleFormat for SubViewer20 {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text())
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let mut out = Self::header(&ctx.title);
        for p in &subtitle.paragraphs {
            out.push_str(&format!(
                "{},{}\n{}\n\n",
                Self::format_time(&p.start_time),
                Self::format_time(&p.end_time),
                Self::encode_text(&p.text)
            ));
        }
        Ok(EncodedOutput::Text(out.trim_end().to_string() + "\n"))
    }
}

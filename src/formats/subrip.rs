use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

// @module: SubRip (.srt) codec

// @const: SRT timestamp line, tolerating a dot separator and short fields
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{1,2}):(\d{1,2})[,.](\d{1,3})")
        .unwrap()
});

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "SubRip",
    extension: ".srt",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Expecting {
    Number,
    TimeCodes,
    Text,
}

/// SubRip codec
#[derive(Debug, Clone, Copy, Default)]
pub struct SubRip;

impl SubRip {
    /// Parse a `-->` line into start and end times
    pub fn parse_timestamp_line(line: &str) -> Result<(TimeCode, TimeCode), SubtitleError> {
        let caps = TIMESTAMP_REGEX
            .captures(line.trim())
            .ok_or_else(|| SubtitleError::Parse(format!("not a timestamp line: '{}'", line)))?;
        let start = TimeCode::from_timestamp_tokens(&caps[1], &caps[2], &caps[3], &pad_millis(&caps[4]))?;
        let end = TimeCode::from_timestamp_tokens(&caps[5], &caps[6], &caps[7], &pad_millis(&caps[8]))?;
        Ok((start, end))
    }

    /// Parse SRT text into paragraphs, counting lines that fit nowhere
    pub fn parse_str(content: &str) -> DecodeOutcome {
        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let mut expecting = Expecting::Number;
        let mut current: Option<Paragraph> = None;
        let mut current_text = String::new();

        let mut finish = |current: &mut Option<Paragraph>, text: &mut String| {
            if let Some(mut p) = current.take() {
                p.text = formatting::normalize_style_tags(text.trim_end());
                paragraphs.push(p);
            }
            text.clear();
        };

        for (line_count, line) in split_lines(content).enumerate() {
            let trimmed = line.trim();

            match expecting {
                Expecting::Number => {
                    if trimmed.is_empty() {
                        continue;
                    }
                    if trimmed.parse::<usize>().is_ok() {
                        expecting = Expecting::TimeCodes;
                    } else if let Ok((start, end)) = Self::parse_timestamp_line(trimmed) {
                        // Missing sequence number
                        current = Some(Paragraph::new(start, end, String::new()));
                        expecting = Expecting::Text;
                    } else {
                        debug!("Unexpected SubRip line {}: {}", line_count + 1, trimmed);
                        error_count += 1;
                    }
                }
                Expecting::TimeCodes => match Self::parse_timestamp_line(trimmed) {
                    Ok((start, end)) => {
                        current = Some(Paragraph::new(start, end, String::new()));
                        expecting = Expecting::Text;
                    }
                    Err(_) => {
                        debug!("Invalid SubRip timestamp at line {}: {}", line_count + 1, trimmed);
                        error_count += 1;
                        expecting = Expecting::Number;
                    }
                },
                Expecting::Text => {
                    if trimmed.is_empty() {
                        finish(&mut current, &mut current_text);
                        expecting = Expecting::Number;
                    } else {
                        if !current_text.is_empty() {
                            current_text.push('\n');
                        }
                        current_text.push_str(trimmed);
                    }
                }
            }
        }
        finish(&mut current, &mut current_text);

        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }

    /// Render paragraphs as SRT text
    pub fn to_srt_string(subtitle: &Subtitle) -> String {
        let mut out = String::new();
        for (i, p) in subtitle.paragraphs.iter().enumerate() {
            out.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                i + 1,
                p.start_time,
                p.end_time,
                formatting::normalize_style_tags(&p.text)
            ));
        }
        out
    }
}

fn pad_millis(token: &str) -> String {
    // `0:00:01,5` means 5 ms in SubRip, not 500
    format!("{:0>3}", token)
}

impl SubtitleFormat for SubRip {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text())
    }

    fn encode(&self, subtitle: &Subtitle, _ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        Ok(EncodedOutput::Text(Self::to_srt_string(subtitle)))
    }
}

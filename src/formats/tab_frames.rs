use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use super::{split_lines, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::{self, TimeCode};

// @module: Tab-delimited frame time code format (.txt)
//
// 25    10:03:20:23 02:07   10:03:23:05
// I see, on my way.
//
// Columns are number, appearance, duration (ss:ff) and disappearance; the
// frame part is counted at the file's frame rate.

static TIME_CODE_LINE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\t\d\d:\d\d:\d\d:\d\d\t\d\d:\d\d\t\d\d:\d\d:\d\d:\d\d$").unwrap());

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Tab Frames",
    extension: ".txt",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

/// Tab Frames codec
#[derive(Debug, Clone, Copy, Default)]
pub struct TabFrames;

impl TabFrames {
    fn decode_time(value: &str, fps: f64) -> Result<TimeCode, SubtitleError> {
        let tokens: Vec<&str> = value.split([':', ';', ',']).filter(|t| !t.is_empty()).collect();
        match tokens.as_slice() {
            [h, m, s, f] => TimeCode::from_frame_tokens(h, m, s, f, fps),
            _ => Err(SubtitleError::Parse(format!("invalid time code '{}'", value))),
        }
    }

    /// Frame count capped to the last frame of a second
    fn frames_of(ms: f64, fps: f64) -> i64 {
        let max_frame = (fps.ceil() as i64 - 1).max(0);
        timecode::milliseconds_to_frames(ms, fps).clamp(0, max_frame)
    }

    fn encode_time(time: &TimeCode, fps: f64) -> String {
        let (h, m, s, f) = time.to_hms_frames(fps);
        format!("{:02}:{:02}:{:02}:{:02}", h, m, s, (f as i64).min((fps.ceil() as i64 - 1).max(0)))
    }

    pub fn parse_str(content: &str, fps: f64) -> DecodeOutcome {
        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let mut current: Option<Paragraph> = None;
        let mut text = String::new();

        let mut finish = |current: &mut Option<Paragraph>, text: &mut String| {
            if let Some(mut p) = current.take() {
                p.text = text.trim().to_string();
                paragraphs.push(p);
            }
            text.clear();
        };

        for line in split_lines(content) {
            let line = line.trim_end();
            if TIME_CODE_LINE_REGEX.is_match(line) {
                finish(&mut current, &mut text);
                let columns: Vec<&str> = line.split('\t').collect();
                let parsed = Self::decode_time(columns[1], fps)
                    .and_then(|start| Self::decode_time(columns[3], fps).map(|end| (start, end)));
                match parsed {
                    Ok((start, end)) => current = Some(Paragraph::new(start, end, String::new())),
                    Err(e) => {
                        debug!("Skipping tab frames entry: {}", e);
                        error_count += 1;
                    }
                }
            } else if !line.trim().is_empty() && current.is_some() {
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(line);
            }
        }
        finish(&mut current, &mut text);

        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }
}

impl SubtitleFormat for TabFrames {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text(), ctx.frame_rate)
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let fps = ctx.frame_rate;
        let mut out = String::from("#\tAppearance\tCaption\t\n\n");
        for (i, p) in subtitle.paragraphs.iter().enumerate() {
            let duration = p.duration();
            out.push_str(&format!(
                "{}\t{}\t{:02}:{:02}\t{}\r\n{}\r\n\n",
                i + 1,
                Self::encode_time(&p.start_time, fps),
                duration.seconds(),
                Self::frames_of(f64::from(duration.milliseconds()), fps),
                Self::encode_time(&p.end_time, fps),
                formatting::remove_html_tags(&p.text)
            ));
        }
        Ok(EncodedOutput::Text(out))
    }
}

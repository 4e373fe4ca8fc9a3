use std::fmt;

use crate::timecode::{self, TimeCode};

// @module: In-memory subtitle model shared by all codecs

/// Single timed caption unit
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    /// Sequence number, maintained by `Subtitle::renumber`
    pub number: usize,

    pub start_time: TimeCode,

    pub end_time: TimeCode,

    /// Caption text; line breaks are `\n`, markup limited to `<i>`, `<b>`, `<u>`
    pub text: String,

    /// Format-specific class or style name
    pub extra: Option<String>,

    /// Native frame numbers for frame-based sources
    pub start_frame: Option<i64>,
    pub end_frame: Option<i64>,
}

impl Paragraph {
    pub fn new(start_time: TimeCode, end_time: TimeCode, text: impl Into<String>) -> Self {
        Paragraph {
            number: 0,
            start_time,
            end_time,
            text: text.into(),
            extra: None,
            start_frame: None,
            end_frame: None,
        }
    }

    /// Convenience constructor from whole milliseconds
    pub fn from_millis(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self::new(
            TimeCode::from_milliseconds(start_ms as f64),
            TimeCode::from_milliseconds(end_ms as f64),
            text,
        )
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn duration(&self) -> TimeCode {
        self.end_time - self.start_time
    }
}

/// Ordered caption sequence plus an opaque per-format header
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subtitle {
    pub paragraphs: Vec<Paragraph>,

    /// Free-form preamble owned by the producing codec
    pub header: Option<String>,

    /// Frame numbers, not times, are authoritative
    pub was_loaded_with_frame_numbers: bool,
}

impl Subtitle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_paragraphs(paragraphs: Vec<Paragraph>) -> Self {
        let mut subtitle = Subtitle {
            paragraphs,
            ..Default::default()
        };
        subtitle.renumber(1);
        subtitle
    }

    pub fn len(&self) -> usize {
        self.paragraphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Shift every paragraph by a signed offset
    pub fn add_time_to_all_paragraphs(&mut self, offset: TimeCode) {
        for p in &mut self.paragraphs {
            p.start_time = p.start_time + offset;
            p.end_time = p.end_time + offset;
        }
    }

    /// Derive frame numbers from times at `fps`
    pub fn calculate_frame_numbers_from_time_codes(&mut self, fps: f64) {
        for p in &mut self.paragraphs {
            p.start_frame = Some(p.start_time.to_frames(fps));
            p.end_frame = Some(p.end_time.to_frames(fps));
        }
    }

    /// Derive times from frame numbers at `fps`; paragraphs without frame
    /// numbers keep their times
    pub fn calculate_time_codes_from_frame_numbers(&mut self, fps: f64) {
        for p in &mut self.paragraphs {
            if let Some(frame) = p.start_frame {
                p.start_time = TimeCode::from_frames(frame, fps);
            }
            if let Some(frame) = p.end_frame {
                p.end_time = TimeCode::from_frames(frame, fps);
            }
        }
    }

    /// Rescale all times by `new_rate / old_rate`. Frame numbers, when present,
    /// are recomputed at the new rate.
    pub fn change_frame_rate(&mut self, old_rate: f64, new_rate: f64) {
        if !(old_rate > 0.0 && new_rate > 0.0) {
            return;
        }
        let factor = new_rate / old_rate;
        for p in &mut self.paragraphs {
            p.start_time = TimeCode::from_milliseconds(p.start_time.total_milliseconds() * factor);
            p.end_time = TimeCode::from_milliseconds(p.end_time.total_milliseconds() * factor);
            if p.start_frame.is_some() {
                p.start_frame = Some(timecode::milliseconds_to_frames(p.start_time.total_milliseconds(), new_rate));
            }
            if p.end_frame.is_some() {
                p.end_frame = Some(timecode::milliseconds_to_frames(p.end_time.total_milliseconds(), new_rate));
            }
        }
    }

    pub fn renumber(&mut self, start: usize) {
        for (i, p) in self.paragraphs.iter_mut().enumerate() {
            p.number = start + i;
        }
    }

    /// New subtitle holding only the paragraphs whose `extra` names `class`.
    /// `extra` may list several whitespace-separated classes; matching is
    /// case-insensitive. The header is carried over.
    pub fn filter_by_class(&self, class: &str) -> Subtitle {
        let class = class.trim();
        let paragraphs = self
            .paragraphs
            .iter()
            .filter(|p| {
                p.extra
                    .as_deref()
                    .is_some_and(|extra| extra.split_whitespace().any(|c| c.eq_ignore_ascii_case(class)))
            })
            .cloned()
            .collect();
        let mut subtitle = Subtitle {
            paragraphs,
            header: self.header.clone(),
            was_loaded_with_frame_numbers: self.was_loaded_with_frame_numbers,
        };
        subtitle.renumber(1);
        subtitle
    }
}

impl fmt::Display for Subtitle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Subtitle")?;
        writeln!(f, "Paragraphs: {}", self.paragraphs.len())?;
        writeln!(f, "Frame based: {}", self.was_loaded_with_frame_numbers)?;
        Ok(())
    }
}

/*!
 * Time model shared by every codec.
 *
 * A `TimeCode` is a signed millisecond count. Frame-based formats convert
 * through a frame rate: `frames = floor(ms / (1000 / fps))` and
 * `ms = frames * (1000 / fps)`. Frame derivation always floors, never rounds,
 * so fixed frame-rate boundaries map deterministically.
 */

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

use crate::errors::SubtitleError;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_MINUTE: f64 = 60_000.0;
const MS_PER_SECOND: f64 = 1_000.0;

// Absorbs float error from a frames -> ms -> frames trip
const FRAME_EPSILON: f64 = 1e-6;

/// Duration of one frame in milliseconds
pub fn frame_duration_ms(fps: f64) -> f64 {
    MS_PER_SECOND / fps
}

/// Milliseconds to a frame index, flooring
pub fn milliseconds_to_frames(ms: f64, fps: f64) -> i64 {
    (ms / frame_duration_ms(fps) + FRAME_EPSILON).floor() as i64
}

/// Frame index to milliseconds
pub fn frames_to_milliseconds(frames: i64, fps: f64) -> f64 {
    frames as f64 * frame_duration_ms(fps)
}

/// A point in time (or a signed offset) in milliseconds
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeCode {
    total_milliseconds: f64,
}

impl TimeCode {
    /// Zero time
    pub const ZERO: TimeCode = TimeCode { total_milliseconds: 0.0 };

    pub fn from_milliseconds(ms: f64) -> Self {
        TimeCode { total_milliseconds: ms }
    }

    pub fn from_seconds(seconds: f64) -> Self {
        Self::from_milliseconds(seconds * MS_PER_SECOND)
    }

    pub fn from_hms_ms(hours: u32, minutes: u32, seconds: u32, milliseconds: u32) -> Self {
        Self::from_milliseconds(
            hours as f64 * MS_PER_HOUR
                + minutes as f64 * MS_PER_MINUTE
                + seconds as f64 * MS_PER_SECOND
                + milliseconds as f64,
        )
    }

    /// Parse `hh`, `mm`, `ss`, `ff` tokens where the last token is a frame
    /// count at `fps`.
    pub fn from_frame_tokens(
        hours: &str,
        minutes: &str,
        seconds: &str,
        frames: &str,
        fps: f64,
    ) -> Result<Self, SubtitleError> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(SubtitleError::Parse(format!("invalid frame rate {}", fps)));
        }
        let (h, m, s) = parse_hms(hours, minutes, seconds)?;
        let f = parse_token(frames, "frames")?;
        if f as f64 >= fps.ceil() {
            return Err(SubtitleError::Parse(format!(
                "frame {} out of range at {} fps",
                f, fps
            )));
        }
        Ok(Self::from_milliseconds(
            h as f64 * MS_PER_HOUR
                + m as f64 * MS_PER_MINUTE
                + s as f64 * MS_PER_SECOND
                + frames_to_milliseconds(f as i64, fps),
        ))
    }

    /// Parse `hh`, `mm`, `ss`, `fraction` tokens. A three digit fraction is
    /// milliseconds; shorter or longer fractions are read as decimal fractions
    /// of a second (`"61"` is 610 ms).
    pub fn from_timestamp_tokens(
        hours: &str,
        minutes: &str,
        seconds: &str,
        fraction: &str,
    ) -> Result<Self, SubtitleError> {
        let (h, m, s) = parse_hms(hours, minutes, seconds)?;
        let fraction = fraction.trim();
        if fraction.is_empty() || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SubtitleError::Parse(format!(
                "invalid millisecond token '{}'",
                fraction
            )));
        }
        let mut digits: String = fraction.chars().take(3).collect();
        while digits.len() < 3 {
            digits.push('0');
        }
        let ms = parse_token(&digits, "milliseconds")?;
        Ok(Self::from_hms_ms(h, m, s, ms))
    }

    pub fn total_milliseconds(&self) -> f64 {
        self.total_milliseconds
    }

    pub fn total_seconds(&self) -> f64 {
        self.total_milliseconds / MS_PER_SECOND
    }

    pub fn set_total_milliseconds(&mut self, ms: f64) {
        self.total_milliseconds = ms;
    }

    pub fn is_negative(&self) -> bool {
        self.total_milliseconds < 0.0
    }

    fn whole_milliseconds(&self) -> i64 {
        self.total_milliseconds.abs().round() as i64
    }

    pub fn hours(&self) -> u32 {
        (self.whole_milliseconds() / 3_600_000) as u32
    }

    pub fn minutes(&self) -> u32 {
        ((self.whole_milliseconds() % 3_600_000) / 60_000) as u32
    }

    pub fn seconds(&self) -> u32 {
        ((self.whole_milliseconds() % 60_000) / 1_000) as u32
    }

    pub fn milliseconds(&self) -> u32 {
        (self.whole_milliseconds() % 1_000) as u32
    }

    /// Frame index of this time at `fps`
    pub fn to_frames(&self, fps: f64) -> i64 {
        milliseconds_to_frames(self.total_milliseconds, fps)
    }

    pub fn from_frames(frames: i64, fps: f64) -> Self {
        Self::from_milliseconds(frames_to_milliseconds(frames, fps))
    }

    /// Split into `(hours, minutes, seconds, frames)` at `fps`; the frame
    /// part is floored from the sub-second remainder.
    pub fn to_hms_frames(&self, fps: f64) -> (u32, u32, u32, u32) {
        let total = self.total_milliseconds.abs();
        let whole_seconds = (total / MS_PER_SECOND + FRAME_EPSILON).floor();
        let remainder = (total - whole_seconds * MS_PER_SECOND).max(0.0);
        let frames = milliseconds_to_frames(remainder, fps).max(0) as u32;
        let whole_seconds = whole_seconds as u64;
        (
            (whole_seconds / 3600) as u32,
            ((whole_seconds % 3600) / 60) as u32,
            (whole_seconds % 60) as u32,
            frames,
        )
    }

    /// `hh:mm:ss:ff` at `fps`
    pub fn to_hhmmssff(&self, fps: f64) -> String {
        let (h, m, s, f) = self.to_hms_frames(fps);
        format!("{}{:02}:{:02}:{:02}:{:02}", self.sign(), h, m, s, f)
    }

    /// `hh:mm:ss.mmm`
    pub fn to_display_string_dot(&self) -> String {
        format!(
            "{}{:02}:{:02}:{:02}.{:03}",
            self.sign(),
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.milliseconds()
        )
    }

    fn sign(&self) -> &'static str {
        if self.is_negative() && self.whole_milliseconds() > 0 {
            "-"
        } else {
            ""
        }
    }
}

fn parse_token(token: &str, what: &str) -> Result<u32, SubtitleError> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SubtitleError::Parse(format!("invalid {} token '{}'", what, token)));
    }
    token
        .parse::<u32>()
        .map_err(|e| SubtitleError::Parse(format!("invalid {} token '{}': {}", what, token, e)))
}

fn parse_hms(hours: &str, minutes: &str, seconds: &str) -> Result<(u32, u32, u32), SubtitleError> {
    let h = parse_token(hours, "hours")?;
    let m = parse_token(minutes, "minutes")?;
    let s = parse_token(seconds, "seconds")?;
    if m >= 60 || s >= 60 {
        return Err(SubtitleError::Parse(format!(
            "time component out of range: {}:{}:{}",
            hours, minutes, seconds
        )));
    }
    Ok((h, m, s))
}

/// `hh:mm:ss,mmm`
impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:02}:{:02}:{:02},{:03}",
            self.sign(),
            self.hours(),
            self.minutes(),
            self.seconds(),
            self.milliseconds()
        )
    }
}

impl PartialEq for TimeCode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for TimeCode {}

impl PartialOrd for TimeCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.total_milliseconds.total_cmp(&other.total_milliseconds)
    }
}

impl Add for TimeCode {
    type Output = TimeCode;

    fn add(self, rhs: TimeCode) -> TimeCode {
        TimeCode::from_milliseconds(self.total_milliseconds + rhs.total_milliseconds)
    }
}

impl Sub for TimeCode {
    type Output = TimeCode;

    fn sub(self, rhs: TimeCode) -> TimeCode {
        TimeCode::from_milliseconds(self.total_milliseconds - rhs.total_milliseconds)
    }
}

impl Neg for TimeCode {
    type Output = TimeCode;

    fn neg(self) -> TimeCode {
        TimeCode::from_milliseconds(-self.total_milliseconds)
    }
}

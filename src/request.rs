/*!
 * Conversion request: everything one `convert` invocation asks for.
 *
 * Option values arrive as strings from the command line; the parsers here
 * turn them into typed values and report malformed input as
 * `SubtitleError::Parse`.
 */

use std::path::PathBuf;

use crate::errors::SubtitleError;
use crate::formats::CodecOptions;
use crate::timecode::TimeCode;

/// One batch conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    /// Comma list, literal path or wildcard
    pub pattern: String,
    /// Target format name, matched case- and whitespace-insensitively
    pub target_format: String,
    /// Signed time shift applied to every paragraph
    pub offset: Option<TimeCode>,
    /// Frame rate of the input; overrides container metadata and the default
    pub source_frame_rate: Option<f64>,
    /// Retarget times from the source rate to this rate
    pub target_frame_rate: Option<f64>,
    /// Output text encoding label
    pub encoding: Option<String>,
    pub input_folder: Option<PathBuf>,
    pub output_folder: Option<PathBuf>,
    pub overwrite: bool,
    /// Skip detection and decode with this format
    pub source_format: Option<String>,
    pub codec_options: CodecOptions,
}

impl ConversionRequest {
    pub fn new(pattern: impl Into<String>, target_format: impl Into<String>) -> Self {
        ConversionRequest {
            pattern: pattern.into(),
            target_format: target_format.into(),
            offset: None,
            source_frame_rate: None,
            target_frame_rate: None,
            encoding: None,
            input_folder: None,
            output_folder: None,
            overwrite: false,
            source_format: None,
            codec_options: CodecOptions::default(),
        }
    }

    pub fn with_input_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.input_folder = Some(folder.into());
        self
    }

    pub fn with_output_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.output_folder = Some(folder.into());
        self
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Parse `[-]hh:mm:ss:ms`
pub fn parse_offset(value: &str) -> Result<TimeCode, SubtitleError> {
    let value = value.trim();
    let (negative, body) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };
    let parts: Vec<&str> = body.split([':', ',', '.']).collect();
    if parts.len() != 4 {
        return Err(SubtitleError::Parse(format!(
            "invalid offset '{}', expected [-]hh:mm:ss:ms",
            value
        )));
    }
    let mut numbers = [0u32; 4];
    for (slot, part) in numbers.iter_mut().zip(&parts) {
        *slot = part
            .trim()
            .parse()
            .map_err(|_| SubtitleError::Parse(format!("invalid offset component '{}'", part)))?;
    }
    let offset = TimeCode::from_hms_ms(numbers[0], numbers[1], numbers[2], numbers[3]);
    Ok(if negative {
        TimeCode::from_milliseconds(-offset.total_milliseconds())
    } else {
        offset
    })
}

/// Parse a positive frame rate; a decimal comma is accepted
pub fn parse_frame_rate(value: &str) -> Result<f64, SubtitleError> {
    let normalized = value.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(fps) if fps.is_finite() && fps > 0.0 => Ok(fps),
        _ => Err(SubtitleError::Parse(format!("invalid frame rate '{}'", value))),
    }
}

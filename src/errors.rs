/*!
 * Error types for the subconv engine.
 *
 * This module contains custom error types for the different stages of a
 * conversion, using the thiserror crate for ergonomic error definitions.
 * Per-paragraph parse failures are absorbed by the codecs into a decode
 * error tally; everything else surfaces as one `ConversionError` per input.
 */

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while decoding, encoding or demuxing subtitle data
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// A timecode or other token could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// A codec cannot represent the given subtitle
    #[error("Encode error: {0}")]
    Encode(String),

    /// The binary container is structurally invalid
    #[error("Container error: {0}")]
    Container(String),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a detection cascade that found no codec
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    /// Every codec rejected the content
    #[error("input file format unknown")]
    NotRecognized,

    /// The content was not offered to the cascade at all
    #[error("input file too large ({size} bytes)")]
    TooLarge {
        /// Size of the rejected input in bytes
        size: u64,
    },
}

/// Failure kinds counted by the batch orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    FileNotFound,
    FormatNotRecognized,
    FormatTooLarge,
    TargetFormatNotFound,
    WriteFailure,
    DecodeFailure,
    EncodeFailure,
    Unexpected,
}

/// A failure converting one input file
#[derive(Error, Debug)]
pub enum ConversionError {
    /// The input path does not exist
    #[error("file not found")]
    FileNotFound(PathBuf),

    /// No codec claimed the input
    #[error("input file format unknown")]
    FormatNotRecognized(PathBuf),

    /// The input exceeded the detection size gate
    #[error("input file too large")]
    FormatTooLarge {
        /// Input path
        path: PathBuf,
        /// Size in bytes
        size: u64,
    },

    /// The requested target format does not exist
    #[error("target format '{0}' not found")]
    TargetFormatNotFound(String),

    /// The output file could not be written
    #[error("unable to write {path}: {source}")]
    WriteFailure {
        /// Output path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An explicitly requested source codec could not decode the input
    #[error("unable to decode as {format}")]
    Decode {
        /// Name of the requested source format
        format: String,
    },

    /// The target codec refused the subtitle
    #[error("encode failed: {0}")]
    Encode(#[from] SubtitleError),

    /// A panic caught at the per-file boundary
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl ConversionError {
    /// Classify the error for counters and reporting
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::FileNotFound(_) => FailureKind::FileNotFound,
            Self::FormatNotRecognized(_) => FailureKind::FormatNotRecognized,
            Self::FormatTooLarge { .. } => FailureKind::FormatTooLarge,
            Self::TargetFormatNotFound(_) => FailureKind::TargetFormatNotFound,
            Self::WriteFailure { .. } => FailureKind::WriteFailure,
            Self::Decode { .. } => FailureKind::DecodeFailure,
            Self::Encode(_) => FailureKind::EncodeFailure,
            Self::Unexpected(_) => FailureKind::Unexpected,
        }
    }

    /// Attach the input path to a detection failure
    pub fn from_detection(error: DetectionError, path: PathBuf) -> Self {
        match error {
            DetectionError::NotRecognized => Self::FormatNotRecognized(path),
            DetectionError::TooLarge { size } => Self::FormatTooLarge { path, size },
        }
    }
}

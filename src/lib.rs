/*!
 * # subconv - subtitle format conversion engine
 *
 * A Rust library for converting subtitles between text and binary formats,
 * one file or a whole batch at a time.
 *
 * ## Features
 *
 * - Shared codec contract with a fixed-order format registry
 * - Auto-detection of unlabeled input through a size-gated cascade
 * - Subtitle track extraction from Matroska containers
 * - Millisecond and frame based timing with frame-rate retargeting
 * - Batch conversion with per-file failure isolation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `timecode`, `subtitle`: the time model and in-memory subtitle
 * - `formats`: the codec contract, the registry and every codec:
 *   - `formats::registry`: format order used for detection and lookup
 * - `detection`: the detection cascade
 * - `container`: Matroska demuxing:
 *   - `container::ebml`: EBML element reader
 *   - `container::matroska`: track and block extraction
 * - `app_controller`: the batch orchestrator
 * - `request`: conversion requests and option parsing
 * - `app_config`: configuration management
 * - `file_utils`: pattern expansion and output naming
 * - `formatting`, `text_encoding`: markup and text encoding helpers
 * - `errors`: custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod container;
pub mod detection;
pub mod errors;
pub mod file_utils;
pub mod formats;
pub mod formatting;
pub mod request;
pub mod subtitle;
pub mod text_encoding;
pub mod timecode;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BatchSummary, ConversionOutcome, Controller};
pub use detection::{Detection, DetectionCascade};
pub use errors::{ConversionError, DetectionError, FailureKind, SubtitleError};
pub use formats::{FormatKind, FormatRegistry, SubtitleFormat};
pub use request::ConversionRequest;
pub use subtitle::{Paragraph, Subtitle};
pub use timecode::TimeCode;

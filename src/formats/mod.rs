/*!
 * Codec contract shared by every subtitle format.
 *
 * Each format implements `SubtitleFormat`: static metadata, a decoder that
 * tallies per-paragraph parse errors instead of aborting, an encoder, and a
 * `detect` judgement that is simply "decode, then check plausibility".
 * There is no separate cheap sniff: detection costs a full decode.
 *
 * The known formats and their load-bearing priority order live in
 * `registry`.
 */

use std::path::{Path, PathBuf};

use crate::errors::SubtitleError;
use crate::subtitle::Subtitle;
use crate::text_encoding;

pub mod ebu_stl;
pub mod micro_dvd;
pub mod plain_text;
pub mod registry;
pub mod sami;
pub mod spruce;
pub mod ssa;
pub mod subrip;
pub mod subviewer;
pub mod tab_frames;
pub mod timed_text;
pub mod usf;

pub use registry::{FormatKind, FormatRegistry};

/// Static metadata of a format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescriptor {
    /// Display name, matched case- and whitespace-insensitively
    pub name: &'static str,
    /// File extension including the dot
    pub extension: &'static str,
    pub is_text_based: bool,
    pub is_frame_based: bool,
    pub is_time_based: bool,
    /// Consumers reject a byte-order mark; always written as plain UTF-8
    pub utf8_without_bom: bool,
}

/// Lower-case, whitespace-free form of a format name
pub fn normalize_format_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Codec-specific options supplied by the caller
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodecOptions {
    /// Code page selector for binary formats
    pub code_page: Option<u32>,
}

/// Per-file state handed to every decode and encode call
#[derive(Debug, Clone, PartialEq)]
pub struct CodecContext {
    /// Frame rate in effect for this file
    pub frame_rate: f64,
    /// Title written into formats that carry one
    pub title: String,
    pub options: CodecOptions,
}

impl CodecContext {
    pub fn new(frame_rate: f64) -> Self {
        CodecContext {
            frame_rate,
            title: String::new(),
            options: CodecOptions::default(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

impl Default for CodecContext {
    fn default() -> Self {
        Self::new(crate::app_config::DEFAULT_FRAME_RATE)
    }
}

/// Raw input plus its text view
#[derive(Debug, Clone)]
pub struct SourceContent {
    bytes: Vec<u8>,
    lines: Vec<String>,
    file_name: Option<PathBuf>,
}

impl SourceContent {
    pub fn from_bytes(bytes: Vec<u8>, file_name: Option<PathBuf>) -> Self {
        let lines = text_encoding::decode_text(&bytes)
            .lines()
            .map(str::to_string)
            .collect();
        SourceContent {
            bytes,
            lines,
            file_name,
        }
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_bytes(text.as_bytes().to_vec(), None)
    }

    pub fn with_file_name(mut self, file_name: impl Into<PathBuf>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines joined with `\n`
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn has_extension(&self, extension: &str) -> bool {
        let wanted = extension.trim_start_matches('.');
        self.file_name
            .as_deref()
            .and_then(Path::extension)
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
    }
}

/// Decoded subtitle plus the number of tokens that failed to parse
#[derive(Debug, Clone, Default)]
pub struct DecodeOutcome {
    pub subtitle: Subtitle,
    pub error_count: usize,
}

impl DecodeOutcome {
    pub fn new(subtitle: Subtitle, error_count: usize) -> Self {
        DecodeOutcome {
            subtitle,
            error_count,
        }
    }

    /// A format claims content only when recognized paragraphs outnumber errors
    pub fn is_plausible(&self) -> bool {
        self.subtitle.paragraphs.len() > self.error_count
    }
}

/// Encoder output
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedOutput {
    Text(String),
    Binary(Vec<u8>),
}

/// Capability set every subtitle format implements
pub trait SubtitleFormat: Send + Sync {
    fn descriptor(&self) -> &'static FormatDescriptor;

    /// Decode content, tallying per-paragraph failures
    fn decode(&self, source: &SourceContent, ctx: &CodecContext) -> DecodeOutcome;

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError>;

    /// Run a full decode and judge plausibility
    fn detect(&self, source: &SourceContent, ctx: &CodecContext) -> bool {
        self.decode(source, ctx).is_plausible()
    }

    fn name(&self) -> &'static str {
        self.descriptor().name
    }

    /// Named paragraph classes declared by the subtitle's header
    fn style_classes(&self, _subtitle: &Subtitle) -> Vec<String> {
        Vec::new()
    }

    /// Strip styling that only makes sense inside this format before handing
    /// the subtitle to `target`
    fn remove_native_formatting(&self, _subtitle: &mut Subtitle, _target: &FormatDescriptor) {}
}

/// Split `text` into lines, accepting `\r\n` and `\n`
pub(crate) fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line))
}

/// Flatten an XML element's content to markup. `br` elements become line
/// breaks and `style_of` maps styled elements to `i`, `b` or `u`.
pub(crate) fn xml_content_to_markup<F>(node: roxmltree::Node, style_of: &F) -> String
where
    F: Fn(roxmltree::Node) -> Option<&'static str>,
{
    fn walk<F>(node: roxmltree::Node, style_of: &F, out: &mut String)
    where
        F: Fn(roxmltree::Node) -> Option<&'static str>,
    {
        for child in node.children() {
            if child.is_text() {
                let text = child.text().unwrap_or_default();
                let mut previous_space = false;
                for c in text.chars() {
                    if c.is_whitespace() {
                        if !previous_space {
                            out.push(' ');
                        }
                        previous_space = true;
                    } else {
                        out.push(c);
                        previous_space = false;
                    }
                }
            } else if child.is_element() {
                if child.tag_name().name().eq_ignore_ascii_case("br") {
                    out.push('\n');
                    continue;
                }
                match style_of(child) {
                    Some(tag) => {
                        out.push_str(&format!("<{}>", tag));
                        walk(child, style_of, out);
                        out.push_str(&format!("</{}>", tag));
                    }
                    None => walk(child, style_of, out),
                }
            }
        }
    }

    let mut raw = String::new();
    walk(node, style_of, &mut raw);
    raw.split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

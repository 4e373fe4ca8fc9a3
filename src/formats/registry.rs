/*!
 * Fixed-order format registry.
 *
 * The order of `PRIMARY_ORDER` is the tie-break for content that satisfies
 * more than one format, so it is a constant sequence pinned by tests rather
 * than an accident of declaration order:
 *
 * 1. SubRip
 * 2. Advanced Sub Station Alpha
 * 3. SAMI
 * 4. Timed Text
 * 5. Universal Subtitle Format
 * 6. SubViewer 2.0
 * 7. MicroDVD
 * 8. Spruce Subtitle File
 * 9. Tab Frames
 *
 * Binary formats are only tried after every primary format declined
 * (`FALLBACK_ORDER`). Targets resolve against the primary list, then the
 * binary target list, then the plain text export.
 */

use std::fmt;

use super::ebu_stl::EbuStl;
use super::micro_dvd::MicroDvd;
use super::plain_text::PlainText;
use super::sami::Sami;
use super::spruce::Spruce;
use super::ssa::AdvancedSubStationAlpha;
use super::subrip::SubRip;
use super::subviewer::SubViewer20;
use super::tab_frames::TabFrames;
use super::timed_text::TimedText;
use super::usf::UniversalSubtitleFormat;
use super::{normalize_format_name, SubtitleFormat};

/// Every format known to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatKind {
    SubRip,
    AdvancedSubStationAlpha,
    Sami,
    TimedText,
    UniversalSubtitleFormat,
    SubViewer20,
    MicroDvd,
    Spruce,
    TabFrames,
    EbuStl,
    PlainText,
}

/// Text formats in detection priority order
pub const PRIMARY_ORDER: [FormatKind; 9] = [
    FormatKind::SubRip,
    FormatKind::AdvancedSubStationAlpha,
    FormatKind::Sami,
    FormatKind::TimedText,
    FormatKind::UniversalSubtitleFormat,
    FormatKind::SubViewer20,
    FormatKind::MicroDvd,
    FormatKind::Spruce,
    FormatKind::TabFrames,
];

/// Specialized formats tried once the primary list is exhausted
pub const FALLBACK_ORDER: [FormatKind; 1] = [FormatKind::EbuStl];

/// Binary-only target formats
pub const BINARY_TARGETS: [FormatKind; 1] = [FormatKind::EbuStl];

/// Formats that can be written but never read
pub const EXPORT_ONLY: [FormatKind; 1] = [FormatKind::PlainText];

impl FormatKind {
    /// Codec implementing this format
    pub fn codec(self) -> &'static dyn SubtitleFormat {
        match self {
            FormatKind::SubRip => &SubRip,
            FormatKind::AdvancedSubStationAlpha => &AdvancedSubStationAlpha,
            FormatKind::Sami => &Sami,
            FormatKind::TimedText => &TimedText,
            FormatKind::UniversalSubtitleFormat => &UniversalSubtitleFormat,
            FormatKind::SubViewer20 => &SubViewer20,
            FormatKind::MicroDvd => &MicroDvd,
            FormatKind::Spruce => &Spruce,
            FormatKind::TabFrames => &TabFrames,
            FormatKind::EbuStl => &EbuStl,
            FormatKind::PlainText => &PlainText,
        }
    }

    pub fn name(self) -> &'static str {
        self.codec().descriptor().name
    }

    pub fn extension(self) -> &'static str {
        self.codec().descriptor().extension
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lookup over the fixed format lists
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatRegistry;

impl FormatRegistry {
    pub fn new() -> Self {
        FormatRegistry
    }

    /// Primary formats in priority order
    pub fn primary(&self) -> &'static [FormatKind] {
        &PRIMARY_ORDER
    }

    /// Fallback formats in priority order
    pub fn fallback(&self) -> &'static [FormatKind] {
        &FALLBACK_ORDER
    }

    /// Full detection sequence: primary then fallback
    pub fn detection_order(&self) -> impl Iterator<Item = FormatKind> {
        PRIMARY_ORDER.iter().chain(FALLBACK_ORDER.iter()).copied()
    }

    /// Resolve a target name: primary formats, binary targets, then plain
    /// text export. Matching ignores case and whitespace.
    pub fn resolve_target(&self, name: &str) -> Option<FormatKind> {
        let wanted = normalize_format_name(name);
        if wanted.is_empty() {
            return None;
        }
        PRIMARY_ORDER
            .iter()
            .chain(BINARY_TARGETS.iter())
            .chain(EXPORT_ONLY.iter())
            .copied()
            .find(|kind| normalize_format_name(kind.name()) == wanted)
    }

    /// Resolve a source name among the decodable formats
    pub fn resolve_source(&self, name: &str) -> Option<FormatKind> {
        let wanted = normalize_format_name(name);
        self.detection_order()
            .find(|kind| normalize_format_name(kind.name()) == wanted)
    }

    /// Listing used by `--list`, grouped the way targets resolve
    pub fn listing(&self) -> Vec<String> {
        let mut lines = Vec::new();
        lines.push("Supported subtitle formats (input/output):".to_string());
        for kind in PRIMARY_ORDER {
            lines.push(format!("    {} ({})", kind.name(), kind.extension()));
        }
        lines.push(String::new());
        lines.push("Supported binary subtitle formats (input/output):".to_string());
        for kind in BINARY_TARGETS {
            lines.push(format!("    {} ({})", kind.name(), kind.extension()));
        }
        lines.push(String::new());
        lines.push("Export only:".to_string());
        for kind in EXPORT_ONLY {
            lines.push(format!("    {} ({})", kind.name(), kind.extension()));
        }
        lines
    }
}

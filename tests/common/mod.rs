/*!
 * Common test utilities for the subconv test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: impl AsRef<[u8]>) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:04,000
This is a <i>test</i> subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains
multiple lines.

3
00:00:10,000 --> 00:00:14,000
For <b>testing</b> purposes.
";

/// Creates a sample SubRip file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    create_test_file(dir, filename, SAMPLE_SRT)
}

/// SAMI document declaring classes A and B; A covers both paragraphs, B one
pub const SAMI_WITH_CLASSES: &str = r#"<SAMI>
<HEAD>
<TITLE>Classes</TITLE>
<STYLE TYPE="text/css">
<!--
P { margin-left: 8pt; font-family: Arial; }
.A { Name: Alpha; lang: en-US; }
.B { Name: Beta; lang: fr-FR; }
-->
</STYLE>
</HEAD>
<BODY>
<SYNC Start=1000><P Class="A B">Both classes</P>
<SYNC Start=2000><P Class=A>&nbsp;</P>
<SYNC Start=3000><P Class=A>Only alpha</P>
<SYNC Start=4000><P Class=A>&nbsp;</P>
</BODY>
</SAMI>
"#;

/// Read an output file as text, whatever its byte-order mark
pub fn read_text(path: &Path) -> Result<String> {
    Ok(subconv::text_encoding::decode_text(&fs::read(path)?))
}

/// File names in a directory, sorted
pub fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

/// Encode one EBML element with an 8-byte size field
fn element(id: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.push(0x01);
    out.extend_from_slice(&(payload.len() as u64).to_be_bytes()[1..]);
    out.extend_from_slice(payload);
    out
}

/// Minimal Matroska writer: tracks, then one cluster per block
#[derive(Default)]
pub struct MatroskaBuilder {
    tracks: Vec<Vec<u8>>,
    clusters: Vec<Vec<u8>>,
}

impl MatroskaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn track(mut self, number: u8, track_type: u8, codec: &str, extra: Vec<u8>) -> Self {
        let mut payload = element(&[0xD7], &[number]);
        payload.extend(element(&[0x83], &[track_type]));
        payload.extend(element(&[0x86], codec.as_bytes()));
        payload.extend(extra);
        self.tracks.push(element(&[0xAE], &payload));
        self
    }

    /// Video track declaring a frame duration in nanoseconds
    pub fn video_track(self, number: u8, default_duration_ns: u32) -> Self {
        let extra = element(&[0x23, 0xE3, 0x83], &default_duration_ns.to_be_bytes());
        self.track(number, 1, "V_MPEG4/ISO/AVC", extra)
    }

    /// Subtitle track; an empty language leaves the element out
    pub fn subtitle_track(self, number: u8, codec: &str, language: &str, codec_private: &[u8]) -> Self {
        let mut extra = Vec::new();
        if !language.is_empty() {
            extra.extend(element(&[0x22, 0xB5, 0x9C], language.as_bytes()));
        }
        if !codec_private.is_empty() {
            extra.extend(element(&[0x63, 0xA2], codec_private));
        }
        self.track(number, 0x11, codec, extra)
    }

    /// Block starting at `start_ms`; with a duration it is written as a
    /// `BlockGroup`, otherwise as a `SimpleBlock`
    pub fn block(mut self, track: u8, start_ms: u32, duration_ms: Option<u32>, data: &[u8]) -> Self {
        let mut block = vec![0x80 | track, 0x00, 0x00];
        block.push(if duration_ms.is_some() { 0x00 } else { 0x80 });
        block.extend_from_slice(data);

        let mut cluster = element(&[0xE7], &start_ms.to_be_bytes());
        match duration_ms {
            Some(duration) => {
                let mut group = element(&[0xA1], &block);
                group.extend(element(&[0x9B], &duration.to_be_bytes()));
                cluster.extend(element(&[0xA0], &group));
            }
            None => cluster.extend(element(&[0xA3], &block)),
        }
        self.clusters.push(element(&[0x1F, 0x43, 0xB6, 0x75], &cluster));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = element(&[0x1A, 0x45, 0xDF, 0xA3], &element(&[0x42, 0x82], b"matroska"));
        let mut segment = element(&[0x15, 0x49, 0xA9, 0x66], &element(&[0x2A, 0xD7, 0xB1], &1_000_000u32.to_be_bytes()));
        segment.extend(element(&[0x16, 0x54, 0xAE, 0x6B], &self.tracks.concat()));
        segment.extend(self.clusters.concat());
        out.extend(element(&[0x18, 0x53, 0x80, 0x67], &segment));
        out
    }
}

/// Script header carried in the codec private data of ASS tracks
pub const ASS_CODEC_PRIVATE: &str = "[Script Info]
ScriptType: v4.00+

[V4+ Styles]
Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding
Style: Default,Arial,20,&H00FFFFFF,&H0300FFFF,&H00000000,&H02000000,0,0,0,0,100,100,0,0,1,2,1,2,10,10,10,1

[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
";

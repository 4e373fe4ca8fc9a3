use super::{CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent, SubtitleFormat};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::Subtitle;

// @module: Plain text export, markup stripped, one blank line between paragraphs

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Plain Text",
    extension: ".txt",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

/// Export-only plain text writer
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainText;

impl SubtitleFormat for PlainText {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    /// Never claims content; plain text is export only
    fn decode(&self, _source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        DecodeOutcome::default()
    }

    fn encode(&self, subtitle: &Subtitle, _ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let blocks: Vec<String> = subtitle
            .paragraphs
            .iter()
            .map(|p| formatting::remove_ass_override_tags(&formatting::remove_html_tags(&p.text)))
            .map(|text| text.trim().to_string())
            .collect();
        let mut out = blocks.join("\n\n");
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(EncodedOutput::Text(out))
    }
}

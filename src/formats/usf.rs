use chrono::Local;
use log::debug;

use super::{
    xml_content_to_markup, CodecContext, DecodeOutcome, EncodedOutput, FormatDescriptor, SourceContent,
    SubtitleFormat,
};
use crate::errors::SubtitleError;
use crate::formatting;
use crate::subtitle::{Paragraph, Subtitle};
use crate::timecode::TimeCode;

// @module: Universal Subtitle Format (.usf) codec

static DESCRIPTOR: FormatDescriptor = FormatDescriptor {
    name: "Universal Subtitle Format",
    extension: ".usf",
    is_text_based: true,
    is_frame_based: false,
    is_time_based: true,
    utf8_without_bom: false,
};

/// Universal Subtitle Format codec
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalSubtitleFormat;

impl UniversalSubtitleFormat {
    /// Parse `hh:mm:ss.mmm`
    pub fn parse_time(value: &str) -> Result<TimeCode, SubtitleError> {
        let tokens: Vec<&str> = value
            .trim()
            .split([':', '.', ','])
            .filter(|t| !t.is_empty())
            .collect();
        match tokens.as_slice() {
            [h, m, s, ms] => TimeCode::from_timestamp_tokens(h, m, s, ms),
            [h, m, s] => TimeCode::from_timestamp_tokens(h, m, s, "0"),
            _ => Err(SubtitleError::Parse(format!("invalid USF time '{}'", value))),
        }
    }

    pub fn parse_str(content: &str) -> DecodeOutcome {
        if !content.contains("<USFSubtitles") || !content.contains("<subtitles>") {
            return DecodeOutcome::default();
        }
        let document = match roxmltree::Document::parse(content) {
            Ok(document) => document,
            Err(e) => {
                debug!("USF XML rejected: {}", e);
                return DecodeOutcome::new(Subtitle::new(), 1);
            }
        };

        let mut paragraphs = Vec::new();
        let mut error_count = 0;
        let subtitles = document
            .root_element()
            .children()
            .filter(|n| n.has_tag_name("subtitles"))
            .flat_map(|n| n.children().filter(|c| c.has_tag_name("subtitle")));
        for node in subtitles {
            match parse_subtitle(node) {
                Ok(p) => paragraphs.push(p),
                Err(e) => {
                    debug!("Skipping USF subtitle: {}", e);
                    error_count += 1;
                }
            }
        }
        DecodeOutcome::new(Subtitle::from_paragraphs(paragraphs), error_count)
    }
}

fn parse_subtitle(node: roxmltree::Node) -> Result<Paragraph, SubtitleError> {
    let missing = |what: &str| SubtitleError::Parse(format!("missing {}", what));
    let start = UniversalSubtitleFormat::parse_time(node.attribute("start").ok_or_else(|| missing("start"))?)?;
    let stop = UniversalSubtitleFormat::parse_time(node.attribute("stop").ok_or_else(|| missing("stop"))?)?;
    let text_node = node
        .children()
        .find(|c| c.has_tag_name("text"))
        .ok_or_else(|| missing("text"))?;
    let text = xml_content_to_markup(text_node, &style_element);
    Ok(Paragraph::new(start, stop, text))
}

fn style_element(node: roxmltree::Node) -> Option<&'static str> {
    match node.tag_name().name() {
        "i" => Some("i"),
        "b" => Some("b"),
        "u" => Some("u"),
        _ => None,
    }
}

impl SubtitleFormat for UniversalSubtitleFormat {
    fn descriptor(&self) -> &'static FormatDescriptor {
        &DESCRIPTOR
    }

    fn decode(&self, source: &SourceContent, _ctx: &CodecContext) -> DecodeOutcome {
        Self::parse_str(&source.text())
    }

    fn encode(&self, subtitle: &Subtitle, ctx: &CodecContext) -> Result<EncodedOutput, SubtitleError> {
        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n");
        out.push_str("<USFSubtitles version=\"1.0\">\n");
        out.push_str("  <metadata>\n");
        out.push_str(&format!("    <title>{}</title>\n", formatting::xml_escape(&ctx.title)));
        out.push_str("    <author>\n      <name>subconv</name>\n    </author>\n");
        out.push_str("    <language code=\"eng\">English</language>\n");
        out.push_str(&format!("    <date>{}</date>\n", Local::now().format("%Y-%m-%d")));
        out.push_str("  </metadata>\n");
        out.push_str("  <styles>\n");
        out.push_str("    <style name=\"Default\">\n");
        out.push_str("      <fontstyle face=\"Arial\" size=\"24\" color=\"#FFFFFF\" back-color=\"#AAAAAA\" />\n");
        out.push_str("      <position alignment=\"BottomCenter\" vertical-margin=\"20%\" relative-to=\"Window\" />\n");
        out.push_str("    </style>\n");
        out.push_str("  </styles>\n\n");
        out.push_str("  <subtitles>\n");
        for p in &subtitle.paragraphs {
            let text = formatting::markup_to_xml(&p.text, |t| format!("<{}>", t), |t| format!("</{}>", t));
            out.push_str(&format!(
                "    <subtitle start=\"{}\" stop=\"{}\">\n      <text style=\"Default\">{}</text>\n    </subtitle>\n",
                p.start_time.to_display_string_dot(),
                p.end_time.to_display_string_dot(),
                text
            ));
        }
        out.push_str("  </subtitles>\n</USFSubtitles>\n");
        Ok(EncodedOutput::Text(out))
    }
}

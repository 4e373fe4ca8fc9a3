/*!
 * Tests for the detection cascade and its size gate
 */

use anyhow::Result;
use subconv::formats::{CodecContext, FormatKind, SourceContent};
use subconv::{DetectionCascade, DetectionError};

const MIB: usize = 1024 * 1024;

/// Prose that no codec claims
fn prose(size: usize) -> Vec<u8> {
    let line = b"Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n";
    line.iter().copied().cycle().take(size).collect()
}

#[test]
fn test_detect_withElevenMibInput_shouldReportTooLarge() {
    let source = SourceContent::from_bytes(prose(11 * MIB), None);
    let result = DetectionCascade::default().detect(&source, &CodecContext::default());
    assert_eq!(result.unwrap_err(), DetectionError::TooLarge { size: (11 * MIB) as u64 });
}

#[test]
fn test_detect_withTwoMibProse_shouldReportNotRecognized() {
    let source = SourceContent::from_bytes(prose(2 * MIB), None);
    let result = DetectionCascade::default().detect(&source, &CodecContext::default());
    assert_eq!(result.unwrap_err(), DetectionError::NotRecognized);
}

#[test]
fn test_admits_withSizeAtGate_shouldReject() {
    let cascade = DetectionCascade::new(100);
    assert!(cascade.admits(99));
    assert!(!cascade.admits(100));
}

#[test]
fn test_detect_withRepeatedRuns_shouldPickSameCodec() -> Result<()> {
    let source = SourceContent::from_text("{100}{200}Hello|world\n{300}{400}{y:i}Again\n");
    let cascade = DetectionCascade::default();
    let ctx = CodecContext::new(25.0);
    let first = cascade.detect(&source, &ctx)?;
    for _ in 0..5 {
        assert_eq!(cascade.detect(&source, &ctx)?.format, first.format);
    }
    assert_eq!(first.format, FormatKind::MicroDvd);
    assert_eq!(first.outcome.subtitle.paragraphs[0].text, "Hello\nworld");
    Ok(())
}

#[test]
fn test_detect_withAssScript_shouldPickAss() -> Result<()> {
    let script = "[Script Info]\nTitle: x\n\n[Events]\nFormat: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\nDialogue: 0,0:00:01.00,0:00:02.50,Default,,0,0,0,,{\\i1}Hi{\\i0}\n";
    let detection = DetectionCascade::default().detect(&SourceContent::from_text(script), &CodecContext::default())?;
    assert_eq!(detection.format, FormatKind::AdvancedSubStationAlpha);
    assert_eq!(detection.outcome.subtitle.paragraphs[0].text, "<i>Hi</i>");
    Ok(())
}

#[test]
fn test_detect_withNonAsciiDigitInSpruceTime_shouldReportNotRecognized() {
    // U+0660 is a decimal digit, but not one a time field can hold
    let source = SourceContent::from_text("00:00:00:0\u{0660},00:00:00:00,x\n");
    let result = DetectionCascade::default().detect(&source, &CodecContext::default());
    assert_eq!(result.unwrap_err(), DetectionError::NotRecognized);
}

/*!
 * Decode(Encode(s)) across codecs, within each format's time precision
 */

use anyhow::{ensure, Result};
use subconv::formats::{CodecContext, EncodedOutput, FormatKind, SourceContent};
use subconv::{Paragraph, Subtitle};

use crate::common;

fn styled_subtitle() -> Subtitle {
    Subtitle::from_paragraphs(vec![
        Paragraph::from_millis(1000, 3500, "Hello <i>world</i>"),
        Paragraph::from_millis(4000, 6000, "Two\nlines"),
    ])
}

/// Encode with `format`, then decode the output with the same codec
fn round_trip(format: FormatKind, subtitle: &Subtitle, ctx: &CodecContext) -> Result<Subtitle> {
    let source = match format.codec().encode(subtitle, ctx)? {
        EncodedOutput::Text(text) => SourceContent::from_text(&text),
        EncodedOutput::Binary(bytes) => SourceContent::from_bytes(bytes, None),
    }
    .with_file_name(format!("round_trip{}", format.extension()));

    let outcome = format.codec().decode(&source, ctx);
    ensure!(outcome.is_plausible(), "{} rejected its own output", format);
    Ok(outcome.subtitle)
}

fn assert_times(decoded: &Subtitle, expected: &Subtitle, tolerance_ms: f64) {
    assert_eq!(decoded.len(), expected.len());
    for (got, want) in decoded.paragraphs.iter().zip(&expected.paragraphs) {
        let start = got.start_time.total_milliseconds() - want.start_time.total_milliseconds();
        let end = got.end_time.total_milliseconds() - want.end_time.total_milliseconds();
        assert!(start.abs() <= tolerance_ms, "start off by {} ms", start);
        assert!(end.abs() <= tolerance_ms, "end off by {} ms", end);
    }
}

fn texts(subtitle: &Subtitle) -> Vec<&str> {
    subtitle.paragraphs.iter().map(|p| p.text.as_str()).collect()
}

#[test]
fn test_roundTrip_withMarkupPreservingFormats_shouldKeepTextAndTimes() -> Result<()> {
    let original = styled_subtitle();
    let ctx = CodecContext::new(25.0);
    let cases = [
        (FormatKind::SubRip, 0.5),
        (FormatKind::AdvancedSubStationAlpha, 5.0),
        (FormatKind::Sami, 0.5),
        (FormatKind::TimedText, 0.5),
        (FormatKind::UniversalSubtitleFormat, 0.5),
        (FormatKind::SubViewer20, 5.0),
        (FormatKind::Spruce, 40.0),
        (FormatKind::EbuStl, 40.0),
    ];

    for (format, tolerance_ms) in cases {
        let decoded = round_trip(format, &original, &ctx)?;
        assert_eq!(texts(&decoded), vec!["Hello <i>world</i>", "Two\nlines"], "{}", format);
        assert_times(&decoded, &original, tolerance_ms);
    }
    Ok(())
}

#[test]
fn test_roundTrip_withMicroDvd_shouldKeepFramesAndWholeLineStyle() -> Result<()> {
    let original = Subtitle::from_paragraphs(vec![
        Paragraph::from_millis(1000, 3500, "<i>Whole line</i>\nplain"),
        Paragraph::from_millis(4000, 6000, "Hello <i>world</i>"),
    ]);
    let ctx = CodecContext::new(25.0);
    let decoded = round_trip(FormatKind::MicroDvd, &original, &ctx)?;

    assert!(decoded.was_loaded_with_frame_numbers);
    assert_eq!(decoded.paragraphs[0].start_frame, Some(25));
    assert_eq!(decoded.paragraphs[0].end_frame, Some(87));
    // partial styling has no MicroDVD form
    assert_eq!(texts(&decoded), vec!["<i>Whole line</i>\nplain", "Hello world"]);
    assert_times(&decoded, &original, 40.0);
    Ok(())
}

#[test]
fn test_roundTrip_withTabFrames_shouldDropMarkupAndKeepFrameTimes() -> Result<()> {
    let original = styled_subtitle();
    let ctx = CodecContext::new(25.0);
    let decoded = round_trip(FormatKind::TabFrames, &original, &ctx)?;

    assert_eq!(texts(&decoded), vec!["Hello world", "Two\nlines"]);
    assert_times(&decoded, &original, 40.0);
    Ok(())
}

#[test]
fn test_roundTrip_withAccentedText_shouldSurviveEbuStl() -> Result<()> {
    let original = Subtitle::from_paragraphs(vec![Paragraph::from_millis(2000, 4000, "Grüße, <u>señor</u>")]);
    let decoded = round_trip(FormatKind::EbuStl, &original, &CodecContext::new(25.0))?;
    assert_eq!(texts(&decoded), vec!["Grüße, <u>señor</u>"]);
    Ok(())
}

#[test]
fn test_roundTrip_withChainOfFormats_shouldEndWhereItStarted() -> Result<()> {
    let ctx = CodecContext::new(25.0);
    let source = SourceContent::from_text(common::SAMPLE_SRT);
    let original = FormatKind::SubRip.codec().decode(&source, &ctx).subtitle;

    let mut current = original.clone();
    for format in [
        FormatKind::AdvancedSubStationAlpha,
        FormatKind::Sami,
        FormatKind::TimedText,
        FormatKind::SubRip,
    ] {
        current = round_trip(format, &current, &ctx)?;
    }

    assert_eq!(texts(&current), texts(&original));
    assert_times(&current, &original, 0.5);
    Ok(())
}

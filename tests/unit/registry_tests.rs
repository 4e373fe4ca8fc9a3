/*!
 * Tests for the format registry and its fixed priority order
 */

use subconv::formats::{CodecContext, FormatKind, FormatRegistry, SourceContent};

/// Content valid for both SubRip (3 entries) and SubViewer 2.0 (1 entry)
const AMBIGUOUS: &str = "1
00:00:01,000 --> 00:00:02,000
One

2
00:00:03,000 --> 00:00:04,000
Two

3
00:00:05,000 --> 00:00:06,000
Three

00:00:07.00,00:00:08.00
Four
";

#[test]
fn test_detectionOrder_withFullRegistry_shouldListPrimaryThenFallback() {
    let order: Vec<FormatKind> = FormatRegistry::new().detection_order().collect();
    assert_eq!(
        order,
        vec![
            FormatKind::SubRip,
            FormatKind::AdvancedSubStationAlpha,
            FormatKind::Sami,
            FormatKind::TimedText,
            FormatKind::UniversalSubtitleFormat,
            FormatKind::SubViewer20,
            FormatKind::MicroDvd,
            FormatKind::Spruce,
            FormatKind::TabFrames,
            FormatKind::EbuStl,
        ]
    );
}

#[test]
fn test_ambiguousContent_withTwoPlausibleCodecs_shouldPreferEarlierFormat() {
    let source = SourceContent::from_text(AMBIGUOUS);
    let ctx = CodecContext::default();
    assert!(FormatKind::SubViewer20.codec().detect(&source, &ctx));
    assert!(FormatKind::SubRip.codec().detect(&source, &ctx));

    let winner = FormatRegistry::new()
        .detection_order()
        .find(|kind| kind.codec().detect(&source, &ctx));
    assert_eq!(winner, Some(FormatKind::SubRip));
}

#[test]
fn test_resolveTarget_withBinaryAndExportNames_shouldFallThroughLists() {
    let registry = FormatRegistry::new();
    assert_eq!(registry.resolve_target("EBU STL"), Some(FormatKind::EbuStl));
    assert_eq!(registry.resolve_target("plain text"), Some(FormatKind::PlainText));
    assert_eq!(registry.resolve_target("subviewer2.0"), Some(FormatKind::SubViewer20));
    assert_eq!(registry.resolve_target("NoSuchFormat"), None);
}

#[test]
fn test_listing_withAllGroups_shouldNameEveryFormat() {
    let listing = FormatRegistry::new().listing().join("\n");
    for kind in FormatRegistry::new().detection_order().chain([FormatKind::PlainText]) {
        assert!(listing.contains(kind.name()), "missing {}", kind.name());
    }
}

#[test]
fn test_descriptors_withFrameBasedFormats_shouldBeFlagged() {
    assert!(FormatKind::MicroDvd.codec().descriptor().is_frame_based);
    assert!(!FormatKind::SubRip.codec().descriptor().is_frame_based);
    assert!(FormatKind::TimedText.codec().descriptor().utf8_without_bom);
    assert!(!FormatKind::EbuStl.codec().descriptor().is_text_based);
}

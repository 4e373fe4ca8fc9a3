/*!
 * Tests for the time model
 */

use subconv::subtitle::{Paragraph, Subtitle};
use subconv::timecode::{frame_duration_ms, TimeCode};

#[test]
fn test_changeFrameRate_withRoundTrip_shouldStayWithinOneFrame() {
    let original = Subtitle::from_paragraphs(vec![
        Paragraph::from_millis(1_001, 2_502, "One"),
        Paragraph::from_millis(61_337, 65_000, "Two"),
    ]);
    let mut changed = original.clone();
    changed.change_frame_rate(23.976, 25.0);
    changed.change_frame_rate(25.0, 23.976);

    let tolerance = frame_duration_ms(23.976);
    for (a, b) in original.paragraphs.iter().zip(&changed.paragraphs) {
        assert!((a.start_time.total_milliseconds() - b.start_time.total_milliseconds()).abs() <= tolerance);
        assert!((a.end_time.total_milliseconds() - b.end_time.total_milliseconds()).abs() <= tolerance);
    }
}

#[test]
fn test_changeFrameRate_withFactor_shouldScaleByNewOverOld() {
    let mut subtitle = Subtitle::from_paragraphs(vec![Paragraph::from_millis(1_000, 2_000, "x")]);
    subtitle.change_frame_rate(25.0, 50.0);
    assert_eq!(subtitle.paragraphs[0].start_time.total_milliseconds(), 2_000.0);
}

#[test]
fn test_frames_withTimeAndBack_shouldLandOnFrameGrid() {
    let time = TimeCode::from_milliseconds(10_000.0);
    let frames = time.to_frames(25.0);
    assert_eq!(frames, 250);
    assert_eq!(TimeCode::from_frames(frames, 25.0).total_milliseconds(), 10_000.0);
}

#[test]
fn test_display_withHours_shouldUseCommaMilliseconds() {
    assert_eq!(TimeCode::from_hms_ms(1, 2, 3, 45).to_string(), "01:02:03,045");
}

#[test]
fn test_fromFrameTokens_withInvalidRate_shouldFail() {
    assert!(TimeCode::from_frame_tokens("00", "00", "01", "00", 0.0).is_err());
}

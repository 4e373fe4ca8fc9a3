/*!
 * Tests for conversion request parsing
 */

use subconv::request::{parse_frame_rate, parse_offset, ConversionRequest};

#[test]
fn test_parse_offset_withPositiveValue_shouldBuildTimeCode() {
    let offset = parse_offset("00:01:02:250").unwrap();
    assert_eq!(offset.total_milliseconds(), 62_250.0);
    assert!(!offset.is_negative());
}

#[test]
fn test_parse_offset_withNegativeValue_shouldBeNegative() {
    let offset = parse_offset("-00:00:00:500").unwrap();
    assert!(offset.is_negative());
    assert_eq!(offset.total_milliseconds(), -500.0);
}

#[test]
fn test_parse_frame_rate_withInvalidValues_shouldFail() {
    assert!(parse_frame_rate("-25").is_err());
    assert!(parse_frame_rate("").is_err());
    assert!(parse_frame_rate("NaN").is_err());
    assert_eq!(parse_frame_rate(" 29,97 ").unwrap(), 29.97);
}

#[test]
fn test_new_withDefaults_shouldLeaveOptionsUnset() {
    let request = ConversionRequest::new("*.srt", "SubRip");
    assert!(request.offset.is_none());
    assert!(request.source_frame_rate.is_none());
    assert!(!request.overwrite);
    assert!(request.codec_options.code_page.is_none());
}

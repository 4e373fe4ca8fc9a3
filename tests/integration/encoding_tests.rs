/*!
 * Output text encoding selection
 */

use anyhow::Result;
use std::fs;
use subconv::{Config, ConversionRequest, Controller};

use crate::common;

fn convert(target: &str, encoding: Option<&str>, output_name: &str) -> Result<Vec<u8>> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "movie.srt")?;
    let out_dir = dir.join("out");

    let mut request = ConversionRequest::new("movie.srt", target)
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    request.encoding = encoding.map(str::to_string);
    let summary = Controller::default().run(&request, &mut Vec::new());
    anyhow::ensure!(summary.converted == 1, "conversion failed");

    Ok(fs::read(out_dir.join(output_name))?)
}

#[test]
fn test_run_withTimedTextTarget_shouldNeverWriteBom() -> Result<()> {
    let bytes = convert("Timed Text", Some("utf-16le"), "movie.xml")?;
    assert!(bytes.starts_with(b"<?xml"));
    Ok(())
}

#[test]
fn test_run_withUtf16Request_shouldWriteLittleEndianBom() -> Result<()> {
    let bytes = convert("SubRip", Some("utf-16le"), "movie.srt")?;
    assert_eq!(&bytes[..4], &[0xFF, 0xFE, b'1', 0x00]);
    Ok(())
}

#[test]
fn test_run_withUnknownEncoding_shouldFallBackToUtf8WithBom() -> Result<()> {
    let bytes = convert("SubRip", Some("klingon-8"), "movie.srt")?;
    assert_eq!(&bytes[..4], &[0xEF, 0xBB, 0xBF, b'1']);
    Ok(())
}

#[test]
fn test_run_withDefaultEncoding_shouldWriteUtf8WithBom() -> Result<()> {
    let bytes = convert("SubRip", None, "movie.srt")?;
    assert_eq!(&bytes[..3], &[0xEF, 0xBB, 0xBF]);
    Ok(())
}

#[test]
fn test_run_withConfiguredLegacyEncoding_shouldWriteSingleByteText() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "accents.srt", "1\n00:00:01,000 --> 00:00:02,000\nCafé\n")?;

    let config = Config {
        default_encoding: "windows-1252".to_string(),
        ..Config::default()
    };
    let request = ConversionRequest::new("accents.srt", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(dir.join("out"));
    Controller::with_config(config).run(&request, &mut Vec::new());

    let bytes = fs::read(dir.join("out").join("accents.srt"))?;
    assert_eq!(bytes[0], b'1');
    assert!(bytes.windows(4).any(|w| w == [b'C', b'a', b'f', 0xE9]));
    // reading it back goes through the legacy fallback
    assert!(common::read_text(&dir.join("out").join("accents.srt"))?.contains("Café"));
    Ok(())
}

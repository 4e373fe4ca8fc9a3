/*!
 * Matroska track extraction through the batch orchestrator
 */

use anyhow::Result;
use subconv::{ConversionRequest, Controller};

use crate::common::{self, MatroskaBuilder};

fn multi_track_movie() -> Vec<u8> {
    MatroskaBuilder::new()
        .video_track(1, 40_000_000)
        .subtitle_track(2, "S_TEXT/UTF8", "", &[])
        .subtitle_track(3, "S_TEXT/ASS", "ger", common::ASS_CODEC_PRIVATE.as_bytes())
        .subtitle_track(4, "S_HDMV/PGS", "eng", &[])
        .block(2, 1000, Some(1500), b"Hello <i>there</i>")
        .block(4, 1000, None, &[0u8; 16])
        .block(3, 2000, None, b"0,0,Default,,0,0,0,,{\\an8}{\\i1}Top{\\i0}")
        .block(2, 4000, None, b"Second")
        .block(3, 5000, Some(1000), b"1,0,Default,,0,0,0,,Bottom")
        .build()
}

#[test]
fn test_run_withSeveralTextTracks_shouldWriteOneFilePerTrack() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "movie.mkv", multi_track_movie())?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("movie.mkv", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    let mut out = Vec::new();
    let summary = Controller::default().run(&request, &mut out);

    assert_eq!((summary.attempted, summary.converted, summary.errors), (1, 1, 0));
    assert_eq!(summary.outcomes[0].outputs.len(), 2);
    assert_eq!(common::file_names(&out_dir)?, vec!["movie_2_eng.srt", "movie_3_ger.srt"]);

    let printed = String::from_utf8(out)?;
    assert_eq!(printed.lines().filter(|l| l.contains("is image based, skipped")).count(), 1);
    assert!(printed.contains("1: movie.mkv - track 4 (S_HDMV/PGS) is image based, skipped"));
    assert_eq!(printed.lines().filter(|l| l.ends_with("... done.")).count(), 2);
    Ok(())
}

#[test]
fn test_run_withPlainTextTrack_shouldTimeBlocksFromDurations() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "movie.mkv", multi_track_movie())?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("movie.mkv", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    Controller::default().run(&request, &mut Vec::new());

    let text = common::read_text(&out_dir.join("movie_2_eng.srt"))?;
    assert!(text.contains("00:00:01,000 --> 00:00:02,500"));
    assert!(text.contains("Hello <i>there</i>"));
    // last block without a duration is shown for a fixed time
    assert!(text.contains("00:00:04,000 --> 00:00:06,500"));
    Ok(())
}

#[test]
fn test_run_withScriptTrackToSubRip_shouldStripOverrides() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "movie.mkv", multi_track_movie())?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("movie.mkv", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    Controller::default().run(&request, &mut Vec::new());

    let text = common::read_text(&out_dir.join("movie_3_ger.srt"))?;
    assert!(text.contains("00:00:02,000 --> 00:00:05,000"));
    assert!(text.contains("<i>Top</i>"));
    assert!(!text.contains("an8"));
    assert!(text.contains("00:00:05,000 --> 00:00:06,000"));
    assert!(text.contains("Bottom"));
    Ok(())
}

#[test]
fn test_run_withScriptTrackToAss_shouldKeepOverridesAndStyles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let movie = MatroskaBuilder::new()
        .subtitle_track(1, "S_TEXT/ASS", "ger", common::ASS_CODEC_PRIVATE.as_bytes())
        .block(1, 2000, Some(1500), b"0,0,Default,,0,0,0,,{\\an8}Oben")
        .build();
    common::create_test_file(dir, "single.mkv", movie)?;

    let request = ConversionRequest::new("single.mkv", "Advanced Sub Station Alpha").with_input_folder(dir);
    let summary = Controller::default().run(&request, &mut Vec::new());
    assert_eq!(summary.converted, 1);

    // a single text track keeps the plain output name
    let text = common::read_text(&dir.join("single.ass"))?;
    assert!(text.contains("[V4+ Styles]"));
    assert!(text.contains("Dialogue: 0,0:00:02.00,0:00:03.50,Default,,0,0,0,,{\\an8}Oben"));
    Ok(())
}

#[test]
fn test_run_withFrameBasedTarget_shouldUseContainerFrameRate() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let movie = MatroskaBuilder::new()
        .video_track(1, 40_000_000)
        .subtitle_track(2, "S_TEXT/UTF8", "eng", &[])
        .block(2, 1000, Some(1500), b"Hello <i>there</i>")
        .build();
    common::create_test_file(dir, "movie.mkv", movie)?;

    let request = ConversionRequest::new("movie.mkv", "MicroDVD").with_input_folder(dir);
    Controller::default().run(&request, &mut Vec::new());

    let text = common::read_text(&dir.join("movie.sub"))?;
    assert_eq!(text.lines().next(), Some("{25}{62}Hello there"));
    Ok(())
}

#[test]
fn test_run_withOnlyImageTracks_shouldFallBackToCascade() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    let movie = MatroskaBuilder::new()
        .subtitle_track(1, "S_VOBSUB", "eng", &[])
        .block(1, 1000, None, &[1, 2, 3, 4])
        .build();
    common::create_test_file(dir, "bitmap.mkv", movie)?;

    let request = ConversionRequest::new("bitmap.mkv", "SubRip").with_input_folder(dir);
    let mut out = Vec::new();
    let summary = Controller::default().run(&request, &mut out);

    let printed = String::from_utf8(out)?;
    assert!(printed.contains("track 1 (S_VOBSUB) is image based, skipped"));
    assert!(printed.contains("1: bitmap.mkv - input file format unknown!"));
    assert_eq!((summary.converted, summary.errors), (0, 1));
    Ok(())
}

#[test]
fn test_run_withTextFileNamedMkv_shouldDetectContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "renamed.mkv", common::SAMPLE_SRT)?;

    let request = ConversionRequest::new("renamed.mkv", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(dir.join("out"));
    let summary = Controller::default().run(&request, &mut Vec::new());

    assert_eq!((summary.converted, summary.errors), (1, 0));
    assert!(dir.join("out").join("renamed.srt").is_file());
    Ok(())
}

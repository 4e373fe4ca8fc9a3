/*!
 * Batch counters, failure classification and exit status
 */

use anyhow::Result;
use subconv::{ConversionRequest, Controller, FailureKind};

use crate::common;

fn printed(out: Vec<u8>) -> String {
    String::from_utf8(out).unwrap_or_default()
}

#[test]
fn test_runAll_withMixedInputs_shouldCountEachFailureOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "good1.srt")?;
    common::create_test_subtitle(dir, "good2.srt")?;
    common::create_test_subtitle(dir, "good3.srt")?;
    common::create_test_file(dir, "prose.txt", "Just some words.\nNothing that looks like a subtitle.\n")?;
    let out_dir = dir.join("out");

    let requests = vec![
        ConversionRequest::new("good1.srt,good2.srt,missing.srt,prose.txt", "MicroDVD")
            .with_input_folder(dir)
            .with_output_folder(&out_dir),
        ConversionRequest::new("good3.srt", "NoSuchFormat")
            .with_input_folder(dir)
            .with_output_folder(&out_dir),
    ];

    let mut out = Vec::new();
    let summary = Controller::default().run_all(&requests, &mut out);

    assert_eq!(summary.attempted, 5);
    assert_eq!(summary.converted, 2);
    assert_eq!(summary.errors, 3);
    assert_eq!(summary.exit_code(), 1);
    assert!(!summary.cancelled);

    let kinds: Vec<Option<FailureKind>> = summary
        .outcomes
        .iter()
        .map(|outcome| outcome.error.as_ref().map(|e| e.kind()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            None,
            None,
            Some(FailureKind::FileNotFound),
            Some(FailureKind::FormatNotRecognized),
            Some(FailureKind::TargetFormatNotFound),
        ]
    );

    assert_eq!(common::file_names(&out_dir)?, vec!["good1.sub", "good2.sub"]);

    let text = printed(out);
    assert!(text.contains("3: missing.srt - file not found!"));
    assert!(text.contains("4: prose.txt - input file format unknown!"));
    assert!(text.contains("5: good3.srt - target format 'NoSuchFormat' not found!"));
    assert!(text.ends_with("\n2 file(s) converted\n"));
    Ok(())
}

#[test]
fn test_run_withAllInputsConverted_shouldExitZero() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "a.srt")?;
    common::create_test_subtitle(dir, "b.srt")?;

    let request = ConversionRequest::new("*.srt", "Advanced Sub Station Alpha")
        .with_input_folder(dir)
        .with_output_folder(dir.join("out"));
    let mut out = Vec::new();
    let summary = Controller::default().run(&request, &mut out);

    assert_eq!((summary.attempted, summary.converted, summary.errors), (2, 2, 0));
    assert!(summary.is_success());
    assert_eq!(summary.exit_code(), 0);

    let text = printed(out);
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines[0].starts_with("1: a.srt -> "));
    assert!(lines[0].ends_with("a.ass... done."));
    assert!(lines[1].starts_with("2: b.srt -> "));
    Ok(())
}

#[test]
fn test_run_withUnmatchedWildcard_shouldBeEmptySuccess() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let request = ConversionRequest::new("*.nothing", "SubRip").with_input_folder(temp_dir.path());
    let mut out = Vec::new();
    let summary = Controller::default().run(&request, &mut out);

    assert_eq!((summary.attempted, summary.converted, summary.errors), (0, 0, 0));
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(printed(out), "\n0 file(s) converted\n");
    Ok(())
}

#[test]
fn test_run_withInputAboveSizeGate_shouldReportTooLarge() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let line = "Plain prose that no codec claims, repeated many times.\n";
    let big = line.repeat(11 * 1024 * 1024 / line.len() + 1);
    common::create_test_file(temp_dir.path(), "big.txt", &big)?;

    let request = ConversionRequest::new("big.txt", "SubRip").with_input_folder(temp_dir.path());
    let summary = Controller::default().run(&request, &mut Vec::new());

    assert_eq!(summary.errors, 1);
    let error = summary.outcomes[0].error.as_ref().map(|e| e.kind());
    assert_eq!(error, Some(FailureKind::FormatTooLarge));
    Ok(())
}

#[test]
fn test_run_withExistingTarget_shouldKeepBothWithoutOverwrite() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "movie.srt")?;
    let out_dir = dir.join("out");
    let controller = Controller::default();

    let request = ConversionRequest::new("movie.srt", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    controller.run(&request, &mut Vec::new());
    controller.run(&request, &mut Vec::new());
    assert_eq!(common::file_names(&out_dir)?.len(), 2);

    controller.run(&request.clone().with_overwrite(true), &mut Vec::new());
    assert_eq!(common::file_names(&out_dir)?.len(), 2);
    Ok(())
}

#[test]
fn test_run_withExplicitSourceFormatMismatch_shouldReportDecodeFailure() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "movie.srt")?;

    let mut request = ConversionRequest::new("movie.srt", "SubRip").with_input_folder(temp_dir.path());
    request.source_format = Some("MicroDVD".to_string());
    let summary = Controller::default().run(&request, &mut Vec::new());

    let error = summary.outcomes[0].error.as_ref().map(|e| e.kind());
    assert_eq!(error, Some(FailureKind::DecodeFailure));
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}

#[test]
fn test_run_withTargetFrameRateOnFrameSource_shouldSnapTimesToFrameGrid() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "frames.sub", "{25}{62}Hi\n{100}{150}Bye\n")?;
    let out_dir = dir.join("out");

    let mut request = ConversionRequest::new("frames.sub", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    request.source_frame_rate = Some(25.0);
    request.target_frame_rate = Some(30.0);
    let summary = Controller::default().run(&request, &mut Vec::new());
    assert_eq!(summary.converted, 1);

    // 2480 ms * 1.2 = 2976 ms lands inside frame 89 at 30 fps, which starts at 2966.67 ms
    let text = common::read_text(&out_dir.join("frames.srt"))?;
    assert!(text.contains("00:00:01,200 --> 00:00:02,967"));
    assert!(text.contains("00:00:04,800 --> 00:00:07,200"));
    Ok(())
}

/*!
 * Per-class output splitting for subtitles that declare paragraph classes
 */

use anyhow::Result;
use subconv::{ConversionRequest, Controller};

use crate::common;

#[test]
fn test_run_withPartialClass_shouldWriteExtraFileForThatClassOnly() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "movie.smi", common::SAMI_WITH_CLASSES)?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("movie.smi", "SubRip")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    let mut out = Vec::new();
    let summary = Controller::default().run(&request, &mut out);

    // class A covers every paragraph, so only B gets its own file
    assert_eq!(common::file_names(&out_dir)?, vec!["movie.srt", "movie_B.srt"]);
    assert_eq!((summary.converted, summary.errors), (1, 0));
    assert_eq!(summary.outcomes[0].outputs.len(), 2);

    let full = common::read_text(&out_dir.join("movie.srt"))?;
    assert!(full.contains("Both classes"));
    assert!(full.contains("Only alpha"));

    let beta = common::read_text(&out_dir.join("movie_B.srt"))?;
    assert!(beta.contains("Both classes"));
    assert!(!beta.contains("Only alpha"));

    // the progress line names only the primary output
    let printed = String::from_utf8(out)?;
    assert_eq!(printed.lines().filter(|l| l.ends_with("... done.")).count(), 1);
    Ok(())
}

#[test]
fn test_run_withBinaryTarget_shouldNotSplitByClass() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_file(dir, "movie.smi", common::SAMI_WITH_CLASSES)?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("movie.smi", "EBU STL")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    let summary = Controller::default().run(&request, &mut Vec::new());

    assert_eq!(summary.converted, 1);
    assert_eq!(common::file_names(&out_dir)?, vec!["movie.stl"]);
    Ok(())
}

#[test]
fn test_run_withSourceWithoutClasses_shouldWriteSingleFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_test_subtitle(dir, "plain.srt")?;
    let out_dir = dir.join("out");

    let request = ConversionRequest::new("plain.srt", "SAMI")
        .with_input_folder(dir)
        .with_output_folder(&out_dir);
    Controller::default().run(&request, &mut Vec::new());

    assert_eq!(common::file_names(&out_dir)?, vec!["plain.smi"]);
    Ok(())
}

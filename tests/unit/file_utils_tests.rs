/*!
 * Tests for file utility functions
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use subconv::file_utils::FileManager;

use crate::common;

/// Test that file_exists returns true for existing files
#[test]
fn test_file_exists_withExistingFile_shouldReturnTrue() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let test_file = common::create_test_file(temp_dir.path(), "exists.srt", "x")?;

    assert!(FileManager::file_exists(&test_file));
    assert!(!FileManager::file_exists(temp_dir.path()));
    Ok(())
}

/// Test that a path-qualified pattern wins over the input folder
#[test]
fn test_expand_pattern_withRelativeDirectory_shouldResolveFromWorkingDirectory() -> Result<()> {
    // a directory relative to the working directory, holding the real episodes
    let season = tempfile::Builder::new().prefix("season").tempdir_in(".")?;
    let season_name = PathBuf::from(season.path().file_name().unwrap_or_default());
    common::create_test_subtitle(season.path(), "e01.srt")?;
    common::create_test_subtitle(season.path(), "e02.srt")?;

    // a decoy of the same name inside the input folder
    let input_dir = common::create_temp_dir()?;
    fs::create_dir(input_dir.path().join(&season_name))?;
    common::create_test_subtitle(&input_dir.path().join(&season_name), "decoy.srt")?;

    let pattern = format!("{}/*.srt", season_name.display());
    let files = FileManager::expand_pattern(&pattern, input_dir.path());
    assert_eq!(files, vec![season_name.join("e01.srt"), season_name.join("e02.srt")]);
    Ok(())
}

/// Test that a comma only separates names when no such file exists
#[test]
fn test_expand_pattern_withExistingCommaFileName_shouldKeepItWhole() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_subtitle(temp_dir.path(), "Hello, world.srt")?;

    let files = FileManager::expand_pattern("Hello, world.srt", temp_dir.path());
    assert_eq!(files, vec![temp_dir.path().join("Hello, world.srt")]);

    let files = FileManager::expand_pattern("one.srt,two.srt", temp_dir.path());
    assert_eq!(files, vec![temp_dir.path().join("one.srt"), temp_dir.path().join("two.srt")]);
    Ok(())
}

/// Test that a wildcard matching nothing expands to nothing
#[test]
fn test_expand_pattern_withNoMatches_shouldBeEmpty() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(FileManager::expand_pattern("*.ass", temp_dir.path()).is_empty());
    Ok(())
}

/// Test that a missing input folder falls back to the working directory
#[test]
fn test_resolve_input_folder_withMissingFolder_shouldUseWorkingDirectory() {
    let resolved = FileManager::resolve_input_folder(Some(Path::new("./non_existent_directory_12345")));
    assert_eq!(resolved, std::env::current_dir().unwrap());
}

/// Test that output paths move into the output folder with a new extension
#[test]
fn test_output_path_withOutputFolder_shouldRelocate() {
    let path = FileManager::output_path(
        Path::new("/tmp/input/video.mkv"),
        Some(Path::new("/tmp/output_that_does_not_exist")),
        "_2_eng",
        ".srt",
        false,
    );
    assert_eq!(path, PathBuf::from("/tmp/output_that_does_not_exist/video_2_eng.srt"));
}

/// Test that writing creates missing parent directories
#[test]
fn test_write_bytes_withMissingParent_shouldCreateIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let target = temp_dir.path().join("a/b/out.srt");
    FileManager::write_bytes(&target, b"data")?;
    assert_eq!(fs::read(&target)?, b"data");
    Ok(())
}

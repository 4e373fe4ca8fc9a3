/*!
 * Tests for application configuration
 */

use anyhow::Result;
use subconv::app_config::{Config, LogLevel, DEFAULT_CONFIG_FILE, DEFAULT_FRAME_RATE};

use crate::common;

#[test]
fn test_load_withoutAnyFile_shouldUseDefaults() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let config = Config::load(None, temp_dir.path())?;
    assert_eq!(config, Config::default());
    assert_eq!(config.default_frame_rate, DEFAULT_FRAME_RATE);
    assert!(!temp_dir.path().join(DEFAULT_CONFIG_FILE).exists());
    Ok(())
}

#[test]
fn test_load_withWorkingDirectoryFile_shouldReadIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(
        temp_dir.path(),
        DEFAULT_CONFIG_FILE,
        r#"{ "default_frame_rate": 25.0, "log_level": "debug" }"#,
    )?;
    let config = Config::load(None, temp_dir.path())?;
    assert_eq!(config.default_frame_rate, 25.0);
    assert_eq!(config.log_level, LogLevel::Debug);
    Ok(())
}

#[test]
fn test_load_withMissingExplicitFile_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let missing = temp_dir.path().join("nope.json");
    assert!(Config::load(Some(missing.as_path()), temp_dir.path()).is_err());
    Ok(())
}

#[test]
fn test_from_file_withZeroSizeLimit_shouldFailValidation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "bad.json", r#"{ "cascade_size_limit_bytes": 0 }"#)?;
    assert!(Config::from_file(&path).is_err());
    Ok(())
}

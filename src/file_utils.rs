use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;

// @module: File and directory utilities

/// Characters removed from text spliced into output file names
const UNSAFE_FILE_NAME_CHARS: [char; 11] = ['?', '!', '*', ',', '/', '\\', ':', '<', '>', '"', '|'];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            fs::create_dir_all(path)
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        }
        Ok(())
    }

    /// Input folder for a run; a missing folder falls back to the working
    /// directory
    pub fn resolve_input_folder(folder: Option<&Path>) -> PathBuf {
        let current = || std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        match folder {
            Some(dir) if Self::dir_exists(dir) => dir.to_path_buf(),
            Some(dir) => {
                warn!("Input folder {} does not exist, using the working directory", dir.display());
                current()
            }
            None => current(),
        }
    }

    // @expands: Source pattern into candidate paths
    // @params: pattern (comma list, literal path or wildcard), input_folder
    /// A comma-separated pattern is a literal list resolved against
    /// `input_folder`, unless a file with that exact name exists. Otherwise a
    /// directory component in the pattern replaces `input_folder` and is taken
    /// as given (relative to the working directory), and a wildcard file name
    /// is matched case-insensitively against that directory's files in name
    /// order. A literal file name is returned as is, existing or not.
    pub fn expand_pattern(pattern: &str, input_folder: &Path) -> Vec<PathBuf> {
        let pattern = pattern.trim();
        let names_a_file = Self::file_exists(pattern) || Self::file_exists(input_folder.join(pattern));
        if pattern.contains(',') && !names_a_file {
            return pattern
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| input_folder.join(part))
                .collect();
        }

        let as_path = Path::new(pattern);
        let directory = match as_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => input_folder.to_path_buf(),
        };
        let Some(file_pattern) = as_path.file_name().map(|name| name.to_string_lossy().into_owned()) else {
            return Vec::new();
        };

        if !file_pattern.contains(['*', '?', '[']) {
            return vec![directory.join(file_pattern)];
        }

        let matcher = match Pattern::new(&file_pattern) {
            Ok(matcher) => matcher,
            Err(e) => {
                warn!("Invalid file pattern '{}': {}", file_pattern, e);
                return Vec::new();
            }
        };
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };

        let files: Vec<PathBuf> = WalkDir::new(&directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| matcher.matches_with(&entry.file_name().to_string_lossy(), options))
            .map(|entry| entry.into_path())
            .collect();
        debug!("Pattern '{}' matched {} file(s) in {}", pattern, files.len(), directory.display());
        files
    }

    // @generates: Output path for a converted subtitle
    // @params: input_file, output_dir, suffix inserted after the stem, extension with dot
    /// Without `overwrite`, an existing target gets a random infix:
    /// `name.<uuid>.ext`.
    pub fn output_path(
        input_file: &Path,
        output_dir: Option<&Path>,
        suffix: &str,
        extension: &str,
        overwrite: bool,
    ) -> PathBuf {
        let stem = input_file.file_stem().unwrap_or_default().to_string_lossy();
        let directory = output_dir
            .map(Path::to_path_buf)
            .or_else(|| input_file.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        let candidate = directory.join(format!("{}{}{}", stem, suffix, extension));
        if overwrite || !candidate.exists() {
            return candidate;
        }
        let unique = directory.join(format!("{}{}.{}{}", stem, suffix, Uuid::new_v4(), extension));
        debug!("{} exists, writing {} instead", candidate.display(), unique.display());
        unique
    }

    /// Strip characters that are unsafe in file names, then trim
    pub fn sanitize_file_name(text: &str) -> String {
        text.chars()
            .filter(|c| !UNSAFE_FILE_NAME_CHARS.contains(c))
            .collect::<String>()
            .trim()
            .to_string()
    }

    // @writes: Bytes to a file, creating parent directories
    pub fn write_bytes(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }
}

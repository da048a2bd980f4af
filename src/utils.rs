// ABOUTME: Utility functions for the deck-export application
// ABOUTME: Provides file-name sanitising, artifact writing and path validation helpers

use crate::errors::{DeckError, Result};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Fallback base name when a title sanitises to nothing
pub const DEFAULT_ARTIFACT_NAME: &str = "presentation";

/// Make a presentation title safe to use as a file name
pub fn sanitize_file_name(title: &str) -> String {
    let replaced: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c: char| c.is_whitespace() || c == '.');
    if trimmed.is_empty() {
        DEFAULT_ARTIFACT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// File name of an exported artifact: `<sanitized title>.<ext>`
pub fn artifact_file_name(title: &str, extension: &str) -> String {
    format!("{}.{}", sanitize_file_name(title), extension)
}

/// Write an exported artifact into `output_dir`, named after the title
pub fn write_artifact(
    output_dir: &Path,
    title: &str,
    extension: &str,
    contents: &[u8],
) -> Result<PathBuf> {
    ensure_directory_exists(output_dir)?;
    let path = output_dir.join(artifact_file_name(title, extension));
    info!("Writing {} bytes to {:?}", contents.len(), path);
    fs::write(&path, contents)?;
    Ok(path)
}

/// Validate that a file exists
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(DeckError::ValidationError(format!(
            "Path not found: {:?}",
            path
        )));
    }
    if !path.is_file() {
        return Err(DeckError::ValidationError(format!(
            "Path is not a file: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(DeckError::ValidationError(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Validate write permissions for a directory
pub fn validate_directory_writable(path: &Path) -> Result<()> {
    ensure_directory_exists(path)?;

    let test_file = path.join(format!("test_write_{}.tmp", uuid::Uuid::new_v4()));
    match fs::File::create(&test_file) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&test_file) {
                warn!("Failed to clean up test file {:?}: {}", test_file, e);
            }
            Ok(())
        }
        Err(e) => Err(DeckError::ValidationError(format!(
            "Directory is not writable: {:?} - {}",
            path, e
        ))),
    }
}

//! Renaming a PDF after the citation it was resolved to.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::CitationRecord;

/// Longest title kept in a generated filename, in characters
const MAX_TITLE_CHARS: usize = 120;

const DEFAULT_EXTENSION: &str = "pdf";

/// Errors that can occur while renaming a file
#[derive(Debug, Error)]
pub enum RenameError {
    #[error("File not found: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error("Cannot name a file after a record without a title")]
    UntitledRecord,

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    RenameTargetExists(PathBuf),

    #[error("Not permitted to rename {}", .0.display())]
    RenameNotPermitted(PathBuf),

    #[error("Rename failed: {0}")]
    Io(#[from] io::Error),
}

/// Rename `original` to `{year}-{surname}-{title}.{ext}` in its own directory
///
/// Returns the new path. Never overwrites: an occupied target fails with
/// [`RenameError::RenameTargetExists`] and leaves both files as they were.
pub fn rename_file(original: &Path, record: &CitationRecord) -> Result<PathBuf, RenameError> {
    let metadata = match std::fs::metadata(original) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(RenameError::SourceMissing(original.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if metadata.permissions().readonly() {
        return Err(RenameError::RenameNotPermitted(original.to_path_buf()));
    }

    let extension = original
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(DEFAULT_EXTENSION);
    let filename = target_filename(record, extension)?;
    let target = original.with_file_name(filename);

    if target == original {
        tracing::debug!("{} already has its citation name", original.display());
        return Ok(target);
    }
    if target.exists() {
        return Err(RenameError::RenameTargetExists(target));
    }

    std::fs::rename(original, &target).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => RenameError::RenameNotPermitted(original.to_path_buf()),
        _ => RenameError::Io(e),
    })?;

    tracing::info!("Renamed {} to {}", original.display(), target.display());
    Ok(target)
}

/// Build the filename a record's file should carry
///
/// Missing year or author are left out, so a record with only a title
/// yields `{title}.{ext}`.
pub fn target_filename(record: &CitationRecord, extension: &str) -> Result<String, RenameError> {
    let title: String = sanitize_component(&record.title)
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect();
    let title = trim_trailing(&title);
    if title.is_empty() {
        return Err(RenameError::UntitledRecord);
    }

    let year = record.year.as_deref().map(sanitize_component);
    let surname = record.first_author_surname().map(sanitize_component);

    let stem = [year, surname, Some(title.to_string())]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    Ok(format!("{}.{}", stem, extension))
}

/// Replace characters unsafe in filenames with `_` and collapse whitespace
fn sanitize_component(value: &str) -> String {
    let mapped: String = value
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() && !c.is_whitespace() => '_',
            c => c,
        })
        .collect();

    let collapsed = mapped.split_whitespace().collect::<Vec<_>>().join(" ");
    trim_trailing(&collapsed).to_string()
}

fn trim_trailing(value: &str) -> &str {
    value.trim_end_matches(['.', ' '])
}

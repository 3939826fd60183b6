//! Persisted width decision of a built index
//!
//! The record is a text file next to the index holding `32` or `64`. It is
//! written once a construction has fully succeeded and read by every query.
//! A missing or unreadable record is fatal: querying with the wrong variant
//! would read a mismatched on-disk layout.

use crate::index::artifacts::{MODE_SUFFIX, artifact_path};
use crate::index::variant::Width;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModeError {
    #[error("no mode record at {} (was the index constructed?)", .path.display())]
    MissingMode { path: PathBuf },

    #[error("mode record {} holds '{content}', expected 32 or 64", .path.display())]
    Corrupt { path: PathBuf, content: String },

    #[error("cannot access mode record {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub fn mode_path(input: &Path) -> PathBuf {
    artifact_path(input, MODE_SUFFIX)
}

/// Record the width used to build the index of `input`, replacing any
/// earlier record
pub fn write_mode(input: &Path, width: Width) -> Result<(), ModeError> {
    let path = mode_path(input);
    fs::write(&path, width.tag().to_string()).map_err(|source| ModeError::Io { path, source })
}

/// Read back the width recorded for `input`
pub fn read_mode(input: &Path) -> Result<Width, ModeError> {
    let path = mode_path(input);
    let content = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ModeError::MissingMode { path });
        }
        Err(source) => return Err(ModeError::Io { path, source }),
    };

    content
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(Width::from_tag)
        .ok_or_else(|| ModeError::Corrupt {
            path,
            content: content.trim().to_string(),
        })
}

/// Drop the record, e.g. before rebuilding. A missing record is fine.
pub fn clear_mode(input: &Path) -> Result<(), ModeError> {
    let path = mode_path(input);
    match fs::remove_file(&path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ModeError::Io { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");

        for width in [Width::W32, Width::W64] {
            write_mode(&input, width).unwrap();
            assert_eq!(read_mode(&input).unwrap(), width);
        }
        assert_eq!(fs::read_to_string(mode_path(&input)).unwrap(), "64");
    }

    #[test]
    fn test_missing_mode() {
        let dir = tempdir().unwrap();
        let err = read_mode(&dir.path().join("never-built.fa")).unwrap_err();
        assert!(matches!(err, ModeError::MissingMode { .. }));
    }

    #[test]
    fn test_corrupt_mode_is_not_guessed() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");

        for content in ["48", "sixty-four", ""] {
            fs::write(mode_path(&input), content).unwrap();
            assert!(matches!(
                read_mode(&input),
                Err(ModeError::Corrupt { .. })
            ));
        }
    }

    #[test]
    fn test_surrounding_whitespace_accepted() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");
        fs::write(mode_path(&input), "32\n").unwrap();
        assert_eq!(read_mode(&input).unwrap(), Width::W32);
    }

    #[test]
    fn test_clear_mode() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fa");

        clear_mode(&input).unwrap();
        write_mode(&input, Width::W32).unwrap();
        clear_mode(&input).unwrap();
        assert!(matches!(
            read_mode(&input),
            Err(ModeError::MissingMode { .. })
        ));
    }
}

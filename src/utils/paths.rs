//! Artifact naming helpers
//!
//! Image artifacts are named by their millisecond timestamp
//! (`frame_<ms>.jpg`, `single_<ms>.jpg`, `IMG_<ms>.jpg`). Two artifacts
//! stamped within the same millisecond must not overwrite each other.

use crate::utils::clock::TimestampMs;
use std::path::{Path, PathBuf};

/// Streamed frame prefix
pub const FRAME_PREFIX: &str = "frame";

/// Single-shot frame prefix
pub const SINGLE_SHOT_PREFIX: &str = "single";

/// Triggered still capture prefix
pub const CAPTURE_PREFIX: &str = "IMG";

/// File extension for every encoded image
pub const JPEG_EXTENSION: &str = "jpg";

/// Build `<prefix>_<timestamp>.<ext>`
pub fn timestamped_name(prefix: &str, timestamp_ms: TimestampMs, extension: &str) -> String {
    format!("{prefix}_{timestamp_ms}.{extension}")
}

/// Path for a timestamped artifact in `dir` that does not exist yet
///
/// Falls back to `<prefix>_<timestamp>-<n>.<ext>` when the plain name is taken.
pub fn timestamped_path(
    dir: &Path,
    prefix: &str,
    timestamp_ms: TimestampMs,
    extension: &str,
) -> PathBuf {
    let path = dir.join(timestamped_name(prefix, timestamp_ms, extension));
    if !path.exists() {
        return path;
    }

    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{prefix}_{timestamp_ms}-{n}.{extension}"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// First free `name`, `name (1).ext`, `name (2).ext`, ... in `dir`
pub fn available_path(dir: &Path, file_name: &str) -> PathBuf {
    let path = dir.join(file_name);
    if !path.exists() {
        return path;
    }

    let (stem, extension) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };

    let mut n = 1u32;
    loop {
        let candidate = match extension {
            Some(ext) => dir.join(format!("{stem} ({n}).{ext}")),
            None => dir.join(format!("{stem} ({n})")),
        };
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_timestamped_name() {
        assert_eq!(
            timestamped_name(FRAME_PREFIX, 1_700_000_000_123, JPEG_EXTENSION),
            "frame_1700000000123.jpg"
        );
    }

    #[test]
    fn test_timestamped_path_avoids_collisions() {
        let dir = tempdir().unwrap();
        let first = timestamped_path(dir.path(), "frame", 42, "jpg");
        assert_eq!(first.file_name().unwrap(), "frame_42.jpg");
        fs::write(&first, b"x").unwrap();

        let second = timestamped_path(dir.path(), "frame", 42, "jpg");
        assert_eq!(second.file_name().unwrap(), "frame_42-1.jpg");
    }

    #[test]
    fn test_available_path() {
        let dir = tempdir().unwrap();
        assert_eq!(
            available_path(dir.path(), "sensor_data.csv").file_name().unwrap(),
            "sensor_data.csv"
        );

        fs::write(dir.path().join("sensor_data.csv"), "a").unwrap();
        fs::write(dir.path().join("sensor_data (1).csv"), "b").unwrap();
        assert_eq!(
            available_path(dir.path(), "sensor_data.csv").file_name().unwrap(),
            "sensor_data (2).csv"
        );

        fs::write(dir.path().join("README"), "c").unwrap();
        assert_eq!(
            available_path(dir.path(), "README").file_name().unwrap(),
            "README (1)"
        );
    }
}

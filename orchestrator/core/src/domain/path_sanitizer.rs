// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Guards every identifier that ends up as a path segment in the entity store
//! (collection names, record ids, attachment filenames). This is a domain
//! service rather than infrastructure because "no record escapes its root" is
//! a business rule of the store, independent of the backing filesystem.
//!
//! Two layers are applied:
//!
//! 1. [`PathSanitizer::validate_segment`] - purely syntactic, no I/O.
//! 2. [`PathSanitizer::ensure_contained`] - compares the *resolved* candidate
//!    against the *resolved* root, which catches symlink and normalization
//!    escapes that survive the syntactic filter.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Reject unsafe identifiers before any filesystem mutation

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Default maximum segment length in bytes (NAME_MAX on common filesystems)
pub const DEFAULT_MAX_SEGMENT_LEN: usize = 255;

/// Path sanitization errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathSanitizerError {
    #[error("Path segment is empty")]
    Empty,

    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid character in path segment: {0:?}")]
    InvalidCharacter(String),

    #[error("Path segment too long: {0}")]
    PathTooLong(String),

    #[error("Path outside storage boundary: {0}")]
    OutsideBoundary(String),
}

/// Path sanitizer domain service
///
/// # Security Guarantees
/// - Rejects empty segments, `.` and `..`
/// - Rejects separators (`/` and `\`) so a segment is always one component
/// - Rejects NUL bytes
/// - Rejects resolved paths that are not strict descendants of the root
#[derive(Debug, Clone)]
pub struct PathSanitizer {
    /// Maximum allowed segment length (default: 255)
    max_segment_len: usize,
}

impl PathSanitizer {
    /// Create a new path sanitizer with default settings
    pub fn new() -> Self {
        Self {
            max_segment_len: DEFAULT_MAX_SEGMENT_LEN,
        }
    }

    /// Create a path sanitizer with custom max segment length
    pub fn with_max_length(max_segment_len: usize) -> Self {
        Self { max_segment_len }
    }

    /// Validate a single path segment without touching the filesystem
    ///
    /// # Examples
    /// ```
    /// use agentry_core::domain::path_sanitizer::PathSanitizer;
    ///
    /// let sanitizer = PathSanitizer::new();
    /// assert!(sanitizer.validate_segment("agent-1").is_ok());
    /// assert!(sanitizer.validate_segment("../etc").is_err());
    /// ```
    pub fn validate_segment(&self, segment: &str) -> Result<(), PathSanitizerError> {
        if segment.is_empty() {
            return Err(PathSanitizerError::Empty);
        }

        if segment.len() > self.max_segment_len {
            return Err(PathSanitizerError::PathTooLong(segment.to_string()));
        }

        if segment.contains('\0') {
            tracing::warn!(segment = %segment.escape_debug(), "Path segment contains NUL byte");
            return Err(PathSanitizerError::InvalidCharacter(segment.to_string()));
        }

        if segment.contains('/') || segment.contains('\\') {
            tracing::warn!(segment = %segment, "Path segment contains a separator");
            return Err(PathSanitizerError::PathTraversal(segment.to_string()));
        }

        if segment == "." || segment == ".." {
            tracing::warn!(segment = %segment, "Path traversal attempt detected");
            return Err(PathSanitizerError::PathTraversal(segment.to_string()));
        }

        // Windows drive prefixes ("C:") would make `join` discard the root.
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(()),
            _ => {
                tracing::warn!(segment = %segment, "Path segment is not a single normal component");
                Err(PathSanitizerError::PathTraversal(segment.to_string()))
            }
        }
    }

    /// Validate several segments in order, failing on the first bad one
    pub fn validate_segments<'a, I>(&self, segments: I) -> Result<(), PathSanitizerError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        segments
            .into_iter()
            .try_for_each(|segment| self.validate_segment(segment))
    }

    /// Verify that an already *resolved* candidate lies strictly below the
    /// already *resolved* root
    ///
    /// Resolution (symlink following) is the caller's job because it depends
    /// on the backing filesystem; see `FileSystem::resolve`.
    pub fn ensure_contained(
        &self,
        resolved_root: &Path,
        resolved_candidate: &Path,
    ) -> Result<(), PathSanitizerError> {
        let escapes = resolved_candidate
            .components()
            .any(|c| c == Component::ParentDir);

        if escapes
            || resolved_candidate == resolved_root
            || !resolved_candidate.starts_with(resolved_root)
        {
            tracing::warn!(
                root = %resolved_root.display(),
                path = %resolved_candidate.display(),
                "Path outside storage boundary detected"
            );
            return Err(PathSanitizerError::OutsideBoundary(
                resolved_candidate.display().to_string(),
            ));
        }

        Ok(())
    }

    /// Join validated segments onto a root
    ///
    /// Every segment is validated first; nothing is joined if any fails.
    pub fn join(&self, root: &Path, segments: &[&str]) -> Result<PathBuf, PathSanitizerError> {
        self.validate_segments(segments.iter().copied())?;
        Ok(segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s)))
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_segment() {
        let sanitizer = PathSanitizer::new();
        assert!(sanitizer.validate_segment("a1").is_ok());
        assert!(sanitizer.validate_segment("report.final.json").is_ok());
        assert!(sanitizer.validate_segment("a..b").is_ok());
    }

    #[test]
    fn test_reject_empty() {
        let sanitizer = PathSanitizer::new();
        assert_eq!(sanitizer.validate_segment(""), Err(PathSanitizerError::Empty));
    }

    #[test]
    fn test_reject_parent_dir() {
        let sanitizer = PathSanitizer::new();
        for bad in ["..", ".", "../etc", "..\\etc", "a/../b"] {
            assert!(
                matches!(
                    sanitizer.validate_segment(bad),
                    Err(PathSanitizerError::PathTraversal(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_reject_absolute_and_separators() {
        let sanitizer = PathSanitizer::new();
        assert!(sanitizer.validate_segment("/etc/passwd").is_err());
        assert!(sanitizer.validate_segment("C:\\Windows").is_err());
        assert!(sanitizer.validate_segment("nested/id").is_err());
    }

    #[test]
    fn test_reject_null_byte() {
        let sanitizer = PathSanitizer::new();
        assert!(matches!(
            sanitizer.validate_segment("ab\0c"),
            Err(PathSanitizerError::InvalidCharacter(_))
        ));
    }

    #[test]
    fn test_segment_too_long() {
        let sanitizer = PathSanitizer::with_max_length(10);
        assert!(matches!(
            sanitizer.validate_segment("much-too-long-identifier"),
            Err(PathSanitizerError::PathTooLong(_))
        ));
    }

    #[test]
    fn test_contained() {
        let sanitizer = PathSanitizer::new();
        let root = Path::new("/data/agents");
        assert!(sanitizer
            .ensure_contained(root, Path::new("/data/agents/a1.json"))
            .is_ok());
    }

    #[test]
    fn test_outside_boundary() {
        let sanitizer = PathSanitizer::new();
        let root = Path::new("/data/agents");
        for bad in ["/etc/passwd", "/data/agents", "/data/agents-evil/x", "/data/agents/../x"] {
            assert!(
                matches!(
                    sanitizer.ensure_contained(root, Path::new(bad)),
                    Err(PathSanitizerError::OutsideBoundary(_))
                ),
                "{bad} should be outside"
            );
        }
    }

    #[test]
    fn test_join_validates_every_segment() {
        let sanitizer = PathSanitizer::new();
        let root = Path::new("/data");
        assert_eq!(
            sanitizer.join(root, &["agents", "a1.json"]).unwrap(),
            PathBuf::from("/data/agents/a1.json")
        );
        assert!(sanitizer.join(root, &["agents", ".."]).is_err());
    }
}

//! Archive entry path normalization and validation

use serde::Serialize;
use std::fmt;

/// Why an entry path was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PathRejection {
    /// A `..` segment would climb above the archive root
    Traversal,
    /// Leading separator or drive prefix
    Absolute,
    /// Last segment of the original name is longer than allowed
    NameTooLong { length: usize, max: usize },
    /// Another entry already resolves to the same path
    Duplicate,
}

impl fmt::Display for PathRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathRejection::Traversal => write!(f, "path escapes the archive root"),
            PathRejection::Absolute => write!(f, "absolute path"),
            PathRejection::NameTooLong { max, .. } => {
                write!(f, "file names longer than {} characters", max)
            }
            PathRejection::Duplicate => write!(f, "duplicate entry path"),
        }
    }
}

/// Normalize an archive-relative path, or `None` when it is unsafe.
///
/// Backslashes become slashes, repeated slashes collapse, `.` segments are
/// dropped and `..` pops the previous segment. A `..` with nothing left to pop
/// rejects the whole path, as does an absolute result.
pub fn sanitize_path(path: &str) -> Option<String> {
    let normalized = collapse_separators(&path.replace('\\', "/"));
    if normalized.starts_with('/') {
        return None;
    }

    let mut resolved: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "." => continue,
            ".." => {
                resolved.pop()?;
            }
            other => resolved.push(other),
        }
    }

    let joined = resolved.join("/");
    if has_drive_prefix(&joined) {
        return None;
    }
    Some(joined)
}

fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut previous_slash = false;
    for c in path.chars() {
        if c == '/' {
            if !previous_slash {
                out.push(c);
            }
            previous_slash = true;
        } else {
            out.push(c);
            previous_slash = false;
        }
    }
    out
}

/// `C:` alone or followed by a separator; `a:b.pdf` is an ordinary name.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'/' || bytes[2] == b'\\')
}

/// Character length of the last non-empty segment of the name as stored.
pub fn last_segment_len(raw: &str) -> usize {
    raw.split(|c: char| c == '/' || c == '\\')
        .filter(|segment| !segment.is_empty())
        .last()
        .map(|segment| segment.chars().count())
        .unwrap_or(0)
}

/// Sanitize one entry name and enforce the name length limit on its original form.
pub fn validate_entry_path(raw: &str, max_name_length: usize) -> Result<String, PathRejection> {
    let length = last_segment_len(raw);
    if length > max_name_length {
        return Err(PathRejection::NameTooLong {
            length,
            max: max_name_length,
        });
    }

    match sanitize_path(raw) {
        Some(path) => Ok(path),
        None if raw.replace('\\', "/").starts_with('/') => Err(PathRejection::Absolute),
        None if has_drive_prefix(raw) => Err(PathRejection::Absolute),
        None => Err(PathRejection::Traversal),
    }
}

//! Mapping request paths onto the root directory.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

use crate::error::RequestError;

/// Resolve a raw (percent-encoded) URI path against `root`.
///
/// Empty and `.` segments are skipped and `..` removes the previous segment.
/// A `..` with nothing left to remove, or a segment that is not a plain file
/// name (backslash, NUL, drive prefix), is forbidden. The result is purely
/// lexical; symlinks are checked by the caller after canonicalization.
pub(crate) fn resolve_request_path(root: &Path, uri_path: &str) -> Result<PathBuf, RequestError> {
    let decoded = percent_decode_str(uri_path)
        .decode_utf8()
        .map_err(|_| RequestError::NotFound(uri_path.to_owned()))?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(RequestError::Forbidden(uri_path.to_owned()));
                }
            }
            name if is_plain_name(name) => segments.push(name),
            _ => return Err(RequestError::Forbidden(uri_path.to_owned())),
        }
    }

    Ok(segments
        .into_iter()
        .fold(root.to_path_buf(), |path, segment| path.join(segment)))
}

/// Whether `name` is a single normal path component.
fn is_plain_name(name: &str) -> bool {
    if name.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

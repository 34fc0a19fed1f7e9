//! Filesystem name sanitization and library-root containment.
//!
//! Artist, album, and track names arrive from a *remote* server and are
//! used to build paths under the local library root. Two independent
//! checks apply to every computed path:
//!
//! 1. [`sanitize_name`] strips control characters, path separators, and
//!    other characters that are unsafe in file names, and caps the length.
//! 2. [`resolve_under_root`] lexically normalizes the joined path and
//!    verifies it is still a strict descendant of the library root.
//!
//! Either check alone would be sufficient for the known attacks; both are
//! applied so a bug in one does not silently open the other.

use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

/// Maximum length of a sanitized file or folder name, in bytes.
const MAX_NAME_LEN: usize = 120;

/// Fallback name when sanitization leaves nothing usable.
const FALLBACK_NAME: &str = "unknown";

/// Characters stripped from names in addition to control characters and
/// path separators. Windows forbids most of these; stripping them keeps
/// library folders portable.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Sanitize a remote-supplied name for use as a single path component.
pub fn sanitize_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .filter(|c| !c.is_control() && *c != '/' && *c != '\\' && *c != '\0')
        .filter(|c| !FORBIDDEN.contains(c))
        .collect();

    // Leading/trailing dots and whitespace make hidden or invalid entries.
    out = out.trim().trim_matches('.').trim().to_string();

    if out.len() > MAX_NAME_LEN {
        let mut end = MAX_NAME_LEN;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
        out = out.trim_end().to_string();
    }

    if out.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        out
    }
}

/// Join `parts` onto `root` and verify the result stays inside `root`.
///
/// The check is lexical: `..` and absolute components are rejected before
/// any normalization, then the normalized result is compared against the
/// root prefix. Nothing is required to exist on disk yet.
pub fn resolve_under_root(root: &Path, parts: &[&str]) -> Result<PathBuf, CoreError> {
    let mut path = root.to_path_buf();
    for part in parts {
        let component = Path::new(part);
        for c in component.components() {
            match c {
                Component::Normal(_) => {}
                _ => {
                    return Err(CoreError::Validation(format!(
                        "Unsafe path component in '{part}'"
                    )));
                }
            }
        }
        path.push(component);
    }

    let normalized = normalize_lexically(&path);
    if normalized.starts_with(root) && normalized != root {
        Ok(normalized)
    } else {
        Err(CoreError::Validation(format!(
            "Path '{}' escapes the library root",
            path.display()
        )))
    }
}

/// Remove `.` and resolve `..` components without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_passes_ordinary_names() {
        assert_eq!(sanitize_name("Abbey Road"), "Abbey Road");
        assert_eq!(sanitize_name("AC DC"), "AC DC");
    }

    #[test]
    fn sanitize_strips_separators_and_controls() {
        assert_eq!(sanitize_name("a/b\\c"), "abc");
        assert_eq!(sanitize_name("evil\0name"), "evilname");
        assert_eq!(sanitize_name("tab\there"), "tabhere");
    }

    #[test]
    fn sanitize_strips_traversal_dots() {
        assert_eq!(sanitize_name(".."), "unknown");
        assert_eq!(sanitize_name("..hidden.."), "hidden");
    }

    #[test]
    fn sanitize_strips_windows_forbidden_chars() {
        assert_eq!(sanitize_name("a<b>c:d\"e|f?g*h"), "abcdefgh");
    }

    #[test]
    fn sanitize_caps_length_on_char_boundary() {
        let long = "é".repeat(200);
        let out = sanitize_name(&long);
        assert!(out.len() <= 120);
        assert!(!out.is_empty());
    }

    #[test]
    fn sanitize_empty_falls_back() {
        assert_eq!(sanitize_name(""), "unknown");
        assert_eq!(sanitize_name("///"), "unknown");
    }

    #[test]
    fn resolve_accepts_plain_names() {
        let root = Path::new("/library");
        let path = resolve_under_root(root, &["Artist", "Album"]).unwrap();
        assert_eq!(path, Path::new("/library/Artist/Album"));
    }

    #[test]
    fn resolve_rejects_parent_traversal() {
        let root = Path::new("/library");
        assert!(resolve_under_root(root, &["..", "etc"]).is_err());
        assert!(resolve_under_root(root, &["a", "../../etc"]).is_err());
    }

    #[test]
    fn resolve_rejects_absolute_components() {
        let root = Path::new("/library");
        assert!(resolve_under_root(root, &["/etc/passwd"]).is_err());
    }

    #[test]
    fn resolve_rejects_empty_result() {
        let root = Path::new("/library");
        assert!(resolve_under_root(root, &[]).is_err());
    }

    #[test]
    fn sanitized_hostile_names_stay_inside_root() {
        let root = Path::new("/library");
        for hostile in ["../../../etc", "..\\..\\win", "a\0b", "x/../../y"] {
            let safe = sanitize_name(hostile);
            let path = resolve_under_root(root, &[&safe]).unwrap();
            assert!(path.starts_with(root), "{hostile:?} -> {path:?}");
        }
    }
}
